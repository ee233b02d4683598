// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Engine Configuration
//
// YAML-backed defaults for the swarm engine:
// - Roster size and per-agent nominal footprint
// - Execution-context pool size and capacity fallback
// - Default execute options (parallelism, timeout, minimum agents)
// - Event channel capacity

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::capacity::{CapacityProfile, DEFAULT_FALLBACK_CORES};

pub const CONFIG_PATH_ENV: &str = "SWARM_CONFIG_PATH";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Roster size used by `init_swarm` when the caller does not pass one
    #[serde(default = "default_agent_count")]
    pub agent_count: usize,

    /// Execution contexts to spawn (default: logical cores)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_pool_size: Option<usize>,

    /// Cores assumed when the host does not report parallelism
    #[serde(default = "default_fallback_cores")]
    pub fallback_cores: usize,

    /// Default batch width (default: logical cores)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallelism: Option<usize>,

    /// Default per-sub-task timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Default minimum number of participating agents
    #[serde(default = "default_min_agents")]
    pub min_agents: usize,

    /// Nominal memory per agent, reported by stats
    #[serde(default = "default_agent_footprint_mb")]
    pub agent_footprint_mb: u32,

    /// Broadcast buffer for async event subscribers
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Rosters above `cores * max_agents_per_core` log a warning
    #[serde(default = "default_max_agents_per_core")]
    pub max_agents_per_core: usize,
}

/// Per-call options for `execute_swarm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExecuteOptions {
    /// Batch width; `None` uses the engine default
    pub parallelism: Option<usize>,
    pub timeout_ms: u64,
    pub min_agents: usize,
}

impl ExecuteOptions {
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = Some(parallelism);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_min_agents(mut self, min_agents: usize) -> Self {
        self.min_agents = min_agents;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            parallelism: None,
            timeout_ms: default_timeout_ms(),
            min_agents: default_min_agents(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            agent_count: default_agent_count(),
            worker_pool_size: None,
            fallback_cores: default_fallback_cores(),
            parallelism: None,
            timeout_ms: default_timeout_ms(),
            min_agents: default_min_agents(),
            agent_footprint_mb: default_agent_footprint_mb(),
            event_capacity: default_event_capacity(),
            max_agents_per_core: default_max_agents_per_core(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. SWARM_CONFIG_PATH environment variable
    /// 2. ./swarm-config.yaml (working directory)
    /// 3. ~/.swarm/config.yaml (user home)
    /// 4. /etc/swarm/config.yaml (system, Unix) or C:\ProgramData\Swarm\config.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./swarm-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".swarm").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/swarm/config.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\Swarm\\config.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        let mut config = match Self::discover_config() {
            Some(config_path) => {
                tracing::info!("Loading configuration from discovered path: {:?}", config_path);
                Self::from_yaml_file(config_path)?
            }
            None => {
                tracing::debug!("No configuration file found in standard locations, using defaults");
                Self::default()
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides. Unparseable values are ignored with a warning.
    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = env_usize("SWARM_AGENT_COUNT") {
            self.agent_count = v;
        }
        if let Some(v) = env_usize("SWARM_PARALLELISM") {
            self.parallelism = Some(v);
        }
        if let Some(v) = env_usize("SWARM_MIN_AGENTS") {
            self.min_agents = v;
        }
        if let Some(v) = env_usize("SWARM_WORKER_POOL_SIZE") {
            self.worker_pool_size = Some(v);
        }
        if let Ok(val) = std::env::var("SWARM_TIMEOUT_MS") {
            match val.parse::<u64>() {
                Ok(v) => {
                    tracing::info!("Environment override: SWARM_TIMEOUT_MS={}", v);
                    self.timeout_ms = v;
                }
                Err(_) => tracing::warn!("Invalid value for SWARM_TIMEOUT_MS: '{}'. Ignoring.", val),
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.agent_count == 0 {
            anyhow::bail!("agent_count must be at least 1");
        }
        if self.worker_pool_size == Some(0) {
            anyhow::bail!("worker_pool_size must be at least 1 when set");
        }
        if self.parallelism == Some(0) {
            anyhow::bail!("parallelism must be at least 1 when set");
        }
        if self.timeout_ms == 0 {
            anyhow::bail!("timeout_ms must be at least 1");
        }
        if self.event_capacity == 0 {
            anyhow::bail!("event_capacity must be at least 1");
        }
        if self.max_agents_per_core == 0 {
            anyhow::bail!("max_agents_per_core must be at least 1");
        }
        Ok(())
    }

    pub fn capacity(&self) -> CapacityProfile {
        CapacityProfile::detect(self.fallback_cores)
    }

    /// Default options for `execute_swarm` derived from this config.
    pub fn execute_options(&self) -> ExecuteOptions {
        ExecuteOptions {
            parallelism: self.parallelism,
            timeout_ms: self.timeout_ms,
            min_agents: self.min_agents,
        }
    }
}

fn env_usize(name: &str) -> Option<usize> {
    let val = std::env::var(name).ok()?;
    match val.parse::<usize>() {
        Ok(v) => {
            tracing::info!("Environment override: {}={}", name, v);
            Some(v)
        }
        Err(_) => {
            tracing::warn!("Invalid value for {}: '{}'. Expected an integer. Ignoring.", name, val);
            None
        }
    }
}

fn default_agent_count() -> usize {
    200
}

fn default_fallback_cores() -> usize {
    DEFAULT_FALLBACK_CORES
}

fn default_timeout_ms() -> u64 {
    60_000
}

fn default_min_agents() -> usize {
    10
}

fn default_agent_footprint_mb() -> u32 {
    200
}

fn default_event_capacity() -> usize {
    1000
}

fn default_max_agents_per_core() -> usize {
    64
}
