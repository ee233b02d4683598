// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Swarm CLI
//!
//! The `swarm` binary runs the task-distribution engine over a source file.
//!
//! ## Commands
//!
//! - `swarm run <FILE>` - Split, dispatch and aggregate one work item
//! - `swarm stats` - Roster and worker-pool statistics after init
//! - `swarm distribution` - Agents per specialization template
//! - `swarm config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use swarm_cli::commands::{self, ConfigCommand, RunArgs};

/// Swarm - parallel task distribution across specialized agents
#[derive(Parser)]
#[command(name = "swarm")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "SWARM_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "SWARM_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the swarm over a source file
    #[command(name = "run")]
    Run(RunArgs),

    /// Show swarm statistics after initialization
    #[command(name = "stats")]
    Stats {
        /// Roster size (default: from config)
        #[arg(long)]
        agents: Option<usize>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show agents per template
    #[command(name = "distribution")]
    Distribution {
        /// Roster size (default: from config)
        #[arg(long)]
        agents: Option<usize>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    match cli.command {
        Some(Commands::Run(args)) => commands::run::handle_command(args, cli.config).await,
        Some(Commands::Stats { agents, json }) => {
            commands::stats::stats(cli.config, agents, json).await
        }
        Some(Commands::Distribution { agents, json }) => {
            commands::stats::distribution(cli.config, agents, json).await
        }
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}
