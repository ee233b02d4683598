// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Swarm Lifecycle Events
//!
//! Serialized as `{ "event": "<name>", "data": {...}, "timestamp": ... }`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::outcome::SwarmRunId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum SwarmEvent {
    #[serde(rename_all = "camelCase")]
    SwarmReady {
        agent_count: usize,
        cpu_cores: usize,
        elapsed_ms: u64,
    },
    #[serde(rename_all = "camelCase")]
    BatchStart {
        run_id: SwarmRunId,
        batch: usize,
        total_batches: usize,
        agents: usize,
    },
    #[serde(rename_all = "camelCase")]
    BatchComplete {
        run_id: SwarmRunId,
        batch: usize,
        completed: usize,
        total: usize,
        succeeded: usize,
        failed: usize,
    },
    #[serde(rename_all = "camelCase")]
    SwarmComplete {
        run_id: SwarmRunId,
        elapsed_ms: u64,
        agents_used: usize,
        parallelism: usize,
        cancelled: bool,
    },
}

impl SwarmEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SwarmReady { .. } => "swarm-ready",
            Self::BatchStart { .. } => "batch-start",
            Self::BatchComplete { .. } => "batch-complete",
            Self::SwarmComplete { .. } => "swarm-complete",
        }
    }
}

/// Event plus the time it was emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwarmEventEnvelope {
    #[serde(flatten)]
    pub event: SwarmEvent,
    pub timestamp: DateTime<Utc>,
}

impl SwarmEventEnvelope {
    pub fn now(event: SwarmEvent) -> Self {
        Self {
            event,
            timestamp: Utc::now(),
        }
    }
}
