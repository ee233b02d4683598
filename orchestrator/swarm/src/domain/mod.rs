// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Swarm Domain Layer
//!
//! Pure types and pure functions. No threads, no I/O except config loading.
//!
//! | Module | Key Types |
//! |--------|-----------|
//! | [`capacity`] | `CapacityProfile` |
//! | [`template`] | `AgentTemplate`, `CATALOG` |
//! | [`agent`] | `AgentPool`, `AgentDescriptor`, `AgentId` |
//! | [`task`] | `WorkItem`, `SubTask`, `split` |
//! | [`selector`] | `select` |
//! | [`analysis`] | `analyze`, `AnalysisReport` |
//! | [`context`] | `ExecutionContextPool`, `TaskHandler`, wire messages |
//! | [`outcome`] | `Outcome`, `AggregatedResult`, `aggregate` |
//! | [`events`] | `SwarmEvent`, `SwarmEventEnvelope` |
//! | [`config`] | `EngineConfig`, `ExecuteOptions` |
//! | [`error`] | `SwarmError` |

pub mod agent;
pub mod analysis;
pub mod capacity;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod outcome;
pub mod selector;
pub mod task;
pub mod template;

pub use agent::{AgentDescriptor, AgentId, AgentPool, AgentStatus};
pub use analysis::AnalysisReport;
pub use capacity::CapacityProfile;
pub use config::{EngineConfig, ExecuteOptions};
pub use context::{
    ContextId, ContextInfo, ContextLease, ContextMailbox, ExecutionContextPool, TaskHandler,
    TemplateHandler, WorkerRequest, WorkerResponse,
};
pub use error::SwarmError;
pub use events::{SwarmEvent, SwarmEventEnvelope};
pub use outcome::{aggregate, AggregatedResult, Outcome, SwarmRunId, Verdict};
pub use task::{split, SubTask, WorkItem};
pub use template::AgentTemplate;
