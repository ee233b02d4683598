// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Capacity Profile
//!
//! Host parallelism as seen by the engine. Queried once at engine construction
//! and used as the default fan-out width and execution-context count.

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use tracing::warn;

/// Core count used when the host does not report its parallelism.
pub const DEFAULT_FALLBACK_CORES: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityProfile {
    logical_cores: NonZeroUsize,
}

impl CapacityProfile {
    /// Detect host parallelism, falling back to `fallback` (or 16 when that is zero).
    pub fn detect(fallback: usize) -> Self {
        match std::thread::available_parallelism() {
            Ok(cores) => Self { logical_cores: cores },
            Err(e) => {
                let cores = NonZeroUsize::new(fallback)
                    .or_else(|| NonZeroUsize::new(DEFAULT_FALLBACK_CORES))
                    .unwrap_or(NonZeroUsize::MIN);
                warn!(
                    error = %e,
                    fallback = cores.get(),
                    "Host did not report available parallelism, using fallback"
                );
                Self { logical_cores: cores }
            }
        }
    }

    /// Fixed profile, for tests and for hosts with a configured pool size.
    pub fn fixed(cores: usize) -> Self {
        Self {
            logical_cores: NonZeroUsize::new(cores).unwrap_or(NonZeroUsize::MIN),
        }
    }

    pub fn logical_cores(&self) -> usize {
        self.logical_cores.get()
    }
}

impl Default for CapacityProfile {
    fn default() -> Self {
        Self::detect(DEFAULT_FALLBACK_CORES)
    }
}
