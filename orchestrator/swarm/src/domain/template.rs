// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Template Catalog
//!
//! The fixed set of mini-agent specializations. Each template routes a sub-task
//! to exactly one pure analysis function (see [`crate::domain::analysis`]).
//!
//! | Template | Wire id | Memory budget |
//! |----------|---------|---------------|
//! | Parser | `parser` | 150 MB |
//! | Validator | `validator` | 120 MB |
//! | Optimizer | `optimizer` | 180 MB |
//! | Tester | `tester` | 160 MB |
//! | Documenter | `documenter` | 140 MB |
//! | Refactorer | `refactor` | 170 MB |
//! | Security analyzer | `security` | 190 MB |
//! | Performance analyzer | `performance` | 165 MB |
//! | Style checker | `style` | 110 MB |
//! | Dependency analyzer | `dependency` | 155 MB |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::SwarmError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentTemplate {
    Parser,
    Validator,
    Optimizer,
    Tester,
    Documenter,
    #[serde(rename = "refactor")]
    Refactorer,
    #[serde(rename = "security")]
    SecurityAnalyzer,
    #[serde(rename = "performance")]
    PerformanceAnalyzer,
    #[serde(rename = "style")]
    StyleChecker,
    #[serde(rename = "dependency")]
    DependencyAnalyzer,
}

/// Catalog order. Agents are assigned round-robin in this order.
pub const CATALOG: [AgentTemplate; 10] = [
    AgentTemplate::Parser,
    AgentTemplate::Validator,
    AgentTemplate::Optimizer,
    AgentTemplate::Tester,
    AgentTemplate::Documenter,
    AgentTemplate::Refactorer,
    AgentTemplate::SecurityAnalyzer,
    AgentTemplate::PerformanceAnalyzer,
    AgentTemplate::StyleChecker,
    AgentTemplate::DependencyAnalyzer,
];

impl AgentTemplate {
    /// Template for the `index`-th agent of a roster.
    pub fn round_robin(index: usize) -> Self {
        CATALOG[index % CATALOG.len()]
    }

    /// Identifier used on the worker wire protocol.
    pub fn wire_id(&self) -> &'static str {
        match self {
            Self::Parser => "parser",
            Self::Validator => "validator",
            Self::Optimizer => "optimizer",
            Self::Tester => "tester",
            Self::Documenter => "documenter",
            Self::Refactorer => "refactor",
            Self::SecurityAnalyzer => "security",
            Self::PerformanceAnalyzer => "performance",
            Self::StyleChecker => "style",
            Self::DependencyAnalyzer => "dependency",
        }
    }

    pub fn specialization(&self) -> &'static str {
        match self {
            Self::Parser => "Code parsing",
            Self::Validator => "Syntax validation",
            Self::Optimizer => "Code optimization",
            Self::Tester => "Unit testing",
            Self::Documenter => "Documentation generation",
            Self::Refactorer => "Code refactoring",
            Self::SecurityAnalyzer => "Security analysis",
            Self::PerformanceAnalyzer => "Performance analysis",
            Self::StyleChecker => "Code style checking",
            Self::DependencyAnalyzer => "Dependency analysis",
        }
    }

    pub fn memory_budget_mb(&self) -> u32 {
        match self {
            Self::Parser => 150,
            Self::Validator => 120,
            Self::Optimizer => 180,
            Self::Tester => 160,
            Self::Documenter => 140,
            Self::Refactorer => 170,
            Self::SecurityAnalyzer => 190,
            Self::PerformanceAnalyzer => 165,
            Self::StyleChecker => 110,
            Self::DependencyAnalyzer => 155,
        }
    }

    /// Templates every swarm run includes regardless of the task text.
    pub fn is_baseline(&self) -> bool {
        matches!(self, Self::Parser | Self::Validator)
    }
}

impl fmt::Display for AgentTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_id())
    }
}

impl FromStr for AgentTemplate {
    type Err = SwarmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CATALOG
            .iter()
            .copied()
            .find(|t| t.wire_id() == s)
            .ok_or_else(|| SwarmError::InvalidConfiguration(format!("unknown agent template '{}'", s)))
    }
}
