// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Outcomes and the Result Aggregator
//!
//! Every dispatched sub-task yields exactly one [`Outcome`]. [`aggregate`]
//! folds the outcome list into an [`AggregatedResult`].
//!
//! ## Majority rule
//!
//! `success` is true iff `successful_agents > failed_agents`. A tie is a
//! failure; [`AggregatedResult::verdict`] distinguishes it as `Partial`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::agent::AgentId;
use crate::domain::task::WorkItem;

/// Identifier of one `execute_swarm` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SwarmRunId(pub Uuid);

impl SwarmRunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SwarmRunId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    pub agent_id: AgentId,
    pub sub_task_index: usize,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl Outcome {
    pub fn success(agent_id: AgentId, sub_task_index: usize, result: serde_json::Value, elapsed_ms: u64) -> Self {
        Self {
            agent_id,
            sub_task_index,
            success: true,
            result: Some(result),
            error: None,
            elapsed_ms,
        }
    }

    pub fn failure(agent_id: AgentId, sub_task_index: usize, error: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            agent_id,
            sub_task_index,
            success: false,
            result: None,
            error: Some(error.into()),
            elapsed_ms,
        }
    }

    pub fn is_timeout(&self) -> bool {
        !self.success && self.error.as_deref() == Some("timeout")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Success,
    Partial,
    Failure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedResult {
    pub run_id: SwarmRunId,
    pub success: bool,
    pub total_agents: usize,
    pub successful_agents: usize,
    pub failed_agents: usize,
    pub results: Vec<serde_json::Value>,
    pub errors: Vec<String>,
    pub original_task: WorkItem,
    /// Per-sub-task outcomes, ordered by sub-task index.
    pub outcomes: Vec<Outcome>,
}

impl AggregatedResult {
    pub fn verdict(&self) -> Verdict {
        if self.success {
            Verdict::Success
        } else if self.successful_agents > 0 {
            Verdict::Partial
        } else {
            Verdict::Failure
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Swarm {:?}: {}/{} agents succeeded, {} failed",
            self.verdict(),
            self.successful_agents,
            self.total_agents,
            self.failed_agents
        )
    }
}

/// Reduce outcomes to one summary. Pure; order-insensitive apart from the
/// final sort by sub-task index.
pub fn aggregate(run_id: SwarmRunId, mut outcomes: Vec<Outcome>, original_task: &WorkItem) -> AggregatedResult {
    outcomes.sort_by_key(|o| o.sub_task_index);

    let (successful, failed): (Vec<&Outcome>, Vec<&Outcome>) = outcomes.iter().partition(|o| o.success);

    let results = successful
        .iter()
        .map(|o| o.result.clone().unwrap_or(serde_json::Value::Null))
        .collect();
    let errors = failed
        .iter()
        .map(|o| o.error.clone().unwrap_or_else(|| "unknown error".to_string()))
        .collect();

    AggregatedResult {
        run_id,
        success: successful.len() > failed.len(),
        total_agents: outcomes.len(),
        successful_agents: successful.len(),
        failed_agents: failed.len(),
        results,
        errors,
        original_task: original_task.clone(),
        outcomes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ok(i: usize) -> Outcome {
        Outcome::success(AgentId::from_index(i), i, json!({ "i": i }), 1)
    }

    fn err(i: usize) -> Outcome {
        Outcome::failure(AgentId::from_index(i), i, "boom", 1)
    }

    #[test]
    fn test_counts_add_up() {
        let item = WorkItem::new("x");
        let agg = aggregate(SwarmRunId::new(), vec![ok(0), err(1), ok(2), ok(3), ok(4)], &item);
        assert_eq!(agg.total_agents, agg.successful_agents + agg.failed_agents);
        assert_eq!(agg.successful_agents, 4);
        assert_eq!(agg.failed_agents, 1);
        assert!(agg.success);
        assert_eq!(agg.verdict(), Verdict::Success);
        assert_eq!(agg.errors, vec!["boom".to_string()]);
    }

    #[test]
    fn test_tie_is_partial_failure() {
        let agg = aggregate(SwarmRunId::new(), vec![ok(0), err(1)], &WorkItem::default());
        assert!(!agg.success);
        assert_eq!(agg.verdict(), Verdict::Partial);
    }

    #[test]
    fn test_all_failed_and_empty() {
        let agg = aggregate(SwarmRunId::new(), vec![err(0), err(1)], &WorkItem::default());
        assert_eq!(agg.verdict(), Verdict::Failure);

        let empty = aggregate(SwarmRunId::new(), vec![], &WorkItem::default());
        assert!(!empty.success);
        assert_eq!(empty.total_agents, 0);
    }

    #[test]
    fn test_order_insensitive() {
        let item = WorkItem::new("x");
        let a = aggregate(SwarmRunId::new(), vec![ok(2), err(1), ok(0)], &item);
        let b = aggregate(SwarmRunId::new(), vec![ok(0), ok(2), err(1)], &item);
        assert_eq!(a.outcomes, b.outcomes);
        assert_eq!(a.results, b.results);
        assert_eq!(a.outcomes[0].sub_task_index, 0);
    }

    #[test]
    fn test_wire_field_names() {
        let json = serde_json::to_value(err(3)).unwrap();
        assert_eq!(json["agentId"], "mini_3");
        assert_eq!(json["elapsedMs"], 1);
        assert!(json.get("result").is_none());
    }
}
