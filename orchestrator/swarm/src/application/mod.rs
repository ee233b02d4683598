// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Application layer: use cases coordinating the domain.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Batch scheduling, event delivery and the `SwarmEngine` facade

pub mod engine;
pub mod event_bus;
pub mod scheduler;

pub use engine::{SwarmEngine, SwarmStats};
pub use event_bus::{EventBus, EventBusError, EventReceiver, RunEventReceiver, SubscriptionId};
pub use scheduler::{Assignment, BatchScheduler};
