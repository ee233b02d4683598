// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Roster inspection commands
//!
//! Commands: stats, distribution

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

pub async fn stats(config_path: Option<PathBuf>, agents: Option<usize>, json: bool) -> Result<()> {
    let config = super::load_config(config_path)?;
    let mut engine = super::init_engine(config, agents)?;
    let stats = engine.swarm_stats();
    engine.shutdown();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&stats).context("Failed to serialize stats")?
        );
        return Ok(());
    }

    println!("{}", "Swarm statistics:".bold());
    println!("  Total agents: {}", stats.total_agents);
    println!("  Active agents: {}", stats.active_agents);
    println!("  Idle agents: {}", stats.idle_agents);
    println!("  Completed tasks: {}", stats.completed_tasks);
    println!("  CPU cores: {}", stats.cpu_cores);
    println!("  Worker pool size: {}", stats.worker_pool_size);
    println!("  Memory per agent: {} MB", stats.memory_per_agent_mb);
    println!("  Total memory: {:.2} GB", stats.total_memory_gb);

    Ok(())
}

pub async fn distribution(
    config_path: Option<PathBuf>,
    agents: Option<usize>,
    json: bool,
) -> Result<()> {
    let config = super::load_config(config_path)?;
    let mut engine = super::init_engine(config, agents)?;
    let distribution = engine.agent_distribution();
    engine.shutdown();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&distribution).context("Failed to serialize distribution")?
        );
        return Ok(());
    }

    println!("{}", "Agent distribution:".bold());
    for (template, count) in &distribution {
        println!("  {:<12} {}", template, count);
    }

    Ok(())
}
