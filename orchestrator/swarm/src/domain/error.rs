// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use thiserror::Error;

use crate::domain::context::ContextId;

/// Errors raised by the swarm engine.
///
/// Only `InvalidConfiguration` and `NotInitialized` abort a call. Everything
/// else is captured per sub-task and folded into a failed `Outcome`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SwarmError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("No available execution context")]
    NoAvailableContext,

    #[error("Task timed out after {0}ms")]
    TaskTimeout(u64),

    #[error("Worker execution error: {0}")]
    WorkerExecutionError(String),

    #[error("Execution context {0} crashed")]
    ContextCrashed(ContextId),

    #[error("Swarm execution cancelled")]
    Cancelled,

    #[error("Swarm is not initialized")]
    NotInitialized,
}

impl SwarmError {
    /// Message recorded in a failed `Outcome`.
    pub fn outcome_message(&self) -> String {
        match self {
            Self::TaskTimeout(_) => "timeout".to_string(),
            Self::WorkerExecutionError(msg) => msg.clone(),
            Self::Cancelled => "cancelled".to_string(),
            other => other.to_string(),
        }
    }

    /// Whether the context that produced this error must be replaced.
    pub fn poisons_context(&self) -> bool {
        matches!(self, Self::TaskTimeout(_) | Self::ContextCrashed(_) | Self::Cancelled)
    }
}
