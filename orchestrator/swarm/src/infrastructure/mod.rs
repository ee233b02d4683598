// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Swarm Infrastructure Layer
//!
//! Concrete execution-context pools.
//!
//! - [`thread_pool`]: one OS thread per context, channel message passing.

pub mod thread_pool;

pub use thread_pool::ThreadContextPool;
