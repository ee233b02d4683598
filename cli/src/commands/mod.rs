// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the swarm CLI

pub mod config;
pub mod run;
pub mod stats;

pub use self::config::ConfigCommand;
pub use self::run::RunArgs;

use anyhow::{Context, Result};
use std::path::PathBuf;
use swarm_engine::{EngineConfig, SwarmEngine};

/// Load and validate configuration, honouring `--config` and `SWARM_*` overrides.
pub fn load_config(config_path: Option<PathBuf>) -> Result<EngineConfig> {
    let config = EngineConfig::load_or_default(config_path).context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

/// Build an engine and initialize its roster (`agents` overrides the configured size).
pub fn init_engine(config: EngineConfig, agents: Option<usize>) -> Result<SwarmEngine> {
    let agent_count = agents.unwrap_or(config.agent_count);
    let mut engine = SwarmEngine::new(config);
    engine
        .init_swarm(agent_count)
        .with_context(|| format!("Failed to initialize swarm with {} agents", agent_count))?;
    Ok(engine)
}
