// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `swarm run` - execute one work item
//!
//! Progress events go to stderr; the summary (or JSON result) to stdout.
//! Ctrl-C cancels the run; sub-tasks not yet finished are reported as cancelled.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::info;

use swarm_engine::{
    AggregatedResult, EngineConfig, ExecuteOptions, SwarmEvent, SwarmEventEnvelope, Verdict, WorkItem,
};

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Source file to analyze
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Task description (scanned for keywords instead of the code)
    #[arg(short, long)]
    pub description: Option<String>,

    /// Roster size (default: from config)
    #[arg(long)]
    pub agents: Option<usize>,

    /// Sub-tasks dispatched per batch (default: logical cores)
    #[arg(short, long)]
    pub parallelism: Option<usize>,

    /// Per-sub-task timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Minimum number of participating agents
    #[arg(long)]
    pub min_agents: Option<usize>,

    /// Print the aggregated result as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn handle_command(args: RunArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = super::load_config(config_path)?;
    let task = load_work_item(&args.file, args.description.clone())?;
    let options = build_options(&args, &config);

    let mut engine = super::init_engine(config, args.agents)?;
    engine.on_event(print_progress);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "Cancelling swarm...".yellow());
            trigger.cancel();
        }
    });

    info!(file = %args.file.display(), lines = task.line_count(), "Running swarm");
    let result = engine
        .execute_swarm_with_cancel(&task, options, cancel)
        .await
        .context("Swarm execution failed")?;
    engine.shutdown();

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("Failed to serialize result")?
        );
    } else {
        print_summary(&result);
    }

    if result.verdict() == Verdict::Failure {
        anyhow::bail!("All {} sub-tasks failed", result.failed_agents);
    }
    Ok(())
}

pub fn load_work_item(path: &Path, description: Option<String>) -> Result<WorkItem> {
    let code = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read source file {:?}", path))?;
    let item = WorkItem::new(code);
    Ok(match description {
        Some(d) => item.with_description(d),
        None => item,
    })
}

/// CLI flags take precedence over the configured defaults.
pub fn build_options(args: &RunArgs, config: &EngineConfig) -> ExecuteOptions {
    let mut options = config.execute_options();
    if let Some(p) = args.parallelism {
        options = options.with_parallelism(p);
    }
    if let Some(t) = args.timeout_ms {
        options = options.with_timeout_ms(t);
    }
    if let Some(m) = args.min_agents {
        options = options.with_min_agents(m);
    }
    options
}

fn print_progress(envelope: &SwarmEventEnvelope) {
    match &envelope.event {
        SwarmEvent::SwarmReady { agent_count, cpu_cores, elapsed_ms } => eprintln!(
            "{}",
            format!("✓ Swarm ready: {} agents on {} cores ({}ms)", agent_count, cpu_cores, elapsed_ms).green()
        ),
        SwarmEvent::BatchStart { batch, total_batches, agents, .. } => eprintln!(
            "{}",
            format!("  batch {}/{}: dispatching {} sub-tasks", batch, total_batches, agents).dimmed()
        ),
        SwarmEvent::BatchComplete { batch, completed, total, succeeded, failed, .. } => eprintln!(
            "  batch {} done: {} ok, {} failed ({}/{})",
            batch,
            succeeded.to_string().green(),
            failed.to_string().red(),
            completed,
            total
        ),
        SwarmEvent::SwarmComplete { elapsed_ms, cancelled, .. } => {
            if *cancelled {
                eprintln!("{}", format!("Swarm cancelled after {}ms", elapsed_ms).yellow());
            } else {
                eprintln!("Swarm finished in {}ms", elapsed_ms);
            }
        }
    }
}

fn print_summary(result: &AggregatedResult) {
    let verdict = match result.verdict() {
        Verdict::Success => "success".green(),
        Verdict::Partial => "partial".yellow(),
        Verdict::Failure => "failure".red(),
    };
    println!("Swarm run {}", result.run_id.0);
    println!("  Verdict: {}", verdict);
    println!("  Agents: {}", result.total_agents);
    println!("  Succeeded: {}", result.successful_agents);
    println!("  Failed: {}", result.failed_agents);
    if !result.errors.is_empty() {
        println!("{}", "Errors:".bold());
        for outcome in result.outcomes.iter().filter(|o| !o.success) {
            println!(
                "  {} (sub-task {}): {}",
                outcome.agent_id,
                outcome.sub_task_index,
                outcome.error.as_deref().unwrap_or("unknown error").red()
            );
        }
    }
}
