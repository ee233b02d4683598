// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Work Items and the Task Splitter
//!
//! A [`WorkItem`] is the caller's immutable input. [`split`] divides its code
//! into contiguous line ranges ([`SubTask`]s), one per participating agent.
//!
//! ## Invariants
//!
//! - Sub-task ranges partition `[0, total_lines)`: no gap, no overlap.
//! - Every chunk holds `ceil(total_lines / agent_count)` lines except possibly the last.

use serde::{Deserialize, Serialize};

use crate::domain::error::SwarmError;

/// Caller-supplied unit of work.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub code: String,
}

impl WorkItem {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            description: None,
            code: code.into(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Lower-cased text the agent selector scans for keywords.
    ///
    /// The description wins when present and non-empty; otherwise the code.
    pub fn scan_text(&self) -> String {
        match self.description.as_deref() {
            Some(desc) if !desc.trim().is_empty() => desc.to_lowercase(),
            _ => self.code.to_lowercase(),
        }
    }

    pub fn line_count(&self) -> usize {
        self.code.split('\n').count()
    }
}

/// Contiguous slice of a work item's lines. `end_line` is exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubTask {
    pub code: String,
    pub start_line: usize,
    pub end_line: usize,
}

impl SubTask {
    pub fn line_count(&self) -> usize {
        self.end_line - self.start_line
    }
}

/// Split `item` into contiguous sub-tasks sized for `agent_count` agents.
pub fn split(item: &WorkItem, agent_count: usize) -> Result<Vec<SubTask>, SwarmError> {
    if agent_count == 0 {
        return Err(SwarmError::InvalidConfiguration(
            "cannot split a task across zero agents".to_string(),
        ));
    }

    let lines: Vec<&str> = item.code.split('\n').collect();
    let total = lines.len();
    let chunk_size = total.div_ceil(agent_count).max(1);

    let sub_tasks = lines
        .chunks(chunk_size)
        .enumerate()
        .map(|(i, chunk)| {
            let start_line = i * chunk_size;
            SubTask {
                code: chunk.join("\n"),
                start_line,
                end_line: start_line + chunk.len(),
            }
        })
        .collect();

    Ok(sub_tasks)
}
