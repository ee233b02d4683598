// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `swarm-engine` — Parallel Task-Distribution Engine
//!
//! Partitions a unit of work (source code to analyze) into line-range
//! sub-tasks, routes them through a fixed pool of isolated execution contexts
//! in bounded batches, enforces a per-sub-task timeout, and folds every
//! outcome into one majority-vote result.
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | Templates, agent roster, splitter, selector, analyses, outcomes, events, config |
//! | [`application`] | Application | `BatchScheduler`, `EventBus`, `SwarmEngine` facade |
//! | [`infrastructure`] | Infrastructure | `ThreadContextPool` (one OS thread per context) |
//!
//! ## Key Concepts
//!
//! - **Agent**: a logical descriptor bound to one specialization template. Not a thread.
//! - **Execution context**: a worker thread that runs one sub-task at a time and
//!   talks to the coordinator only through request/response messages.
//! - **Batch**: at most `parallelism` sub-tasks dispatched concurrently and joined
//!   without short-circuiting on failure.
//!
//! ## Example
//!
//! ```no_run
//! use swarm_engine::{EngineConfig, ExecuteOptions, SwarmEngine, WorkItem};
//!
//! # async fn run() -> Result<(), swarm_engine::SwarmError> {
//! let mut engine = SwarmEngine::new(EngineConfig::default());
//! engine.init_swarm(200)?;
//! let result = engine
//!     .execute_swarm(&WorkItem::new("let a = 1;\nlet b = 2;"), ExecuteOptions::default())
//!     .await?;
//! println!("{}", result.summary());
//! # Ok(())
//! # }
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::*;
pub use domain::*;
pub use infrastructure::ThreadContextPool;
