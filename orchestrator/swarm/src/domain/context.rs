// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Execution Context Pool Contract
//!
//! An execution context is an isolated, reusable worker that runs one
//! sub-task at a time and talks to the coordinator only through
//! [`WorkerRequest`] / [`WorkerResponse`] messages.
//!
//! The pool is owned and mutated by the coordinator alone. The scheduler
//! borrows a context with [`ExecutionContextPool::acquire`], posts one request
//! through the returned [`ContextLease`], and hands the context back with
//! `release` (clean completion) or `recycle` (timeout, crash, cancel).
//!
//! ## Invariants
//!
//! - A context is never leased twice without an intervening release/recycle.
//! - A recycled context is replaced by a fresh worker under the same id.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::domain::agent::AgentId;
use crate::domain::analysis::{self, AnalysisReport};
use crate::domain::error::SwarmError;
use crate::domain::task::SubTask;
use crate::domain::template::AgentTemplate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContextId(pub usize);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker_{}", self.0)
    }
}

/// Message sent to a context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerRequest {
    pub agent_id: AgentId,
    pub task: SubTask,
    #[serde(rename = "type")]
    pub template: AgentTemplate,
}

/// Message returned by a context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerResponse {
    pub agent_id: AgentId,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl WorkerResponse {
    pub fn completed(agent_id: AgentId, result: serde_json::Value, elapsed_ms: u64) -> Self {
        Self {
            agent_id,
            success: true,
            result: Some(result),
            error: None,
            elapsed_ms,
        }
    }

    pub fn failed(agent_id: AgentId, error: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            agent_id,
            success: false,
            result: None,
            error: Some(error.into()),
            elapsed_ms,
        }
    }
}

/// The function a context runs for each request.
///
/// Implementations must be pure with respect to the request: no state is
/// carried between calls. An `Err` (or a panic) becomes a failed response;
/// the context stays usable.
pub trait TaskHandler: Send + Sync + 'static {
    fn handle(&self, template: AgentTemplate, task: &SubTask) -> Result<serde_json::Value, String>;
}

/// Default handler: route to the template's analysis.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateHandler;

impl TaskHandler for TemplateHandler {
    fn handle(&self, template: AgentTemplate, task: &SubTask) -> Result<serde_json::Value, String> {
        let report: AnalysisReport = analysis::analyze(template, &task.code);
        serde_json::to_value(report).map_err(|e| e.to_string())
    }
}

/// One-shot channel into a leased context.
#[async_trait]
pub trait ContextMailbox: Send + Sync {
    /// Post a request and wait for the context's reply. Errors only when the
    /// context itself is gone (`ContextCrashed`).
    async fn post(&self, request: WorkerRequest) -> Result<WorkerResponse, SwarmError>;
}

/// A borrowed context. Hand the id back to the pool when the dispatch settles.
#[derive(Clone)]
pub struct ContextLease {
    pub id: ContextId,
    pub mailbox: Arc<dyn ContextMailbox>,
}

impl fmt::Debug for ContextLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextLease").field("id", &self.id).finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextInfo {
    pub id: ContextId,
    pub available: bool,
}

pub trait ExecutionContextPool: Send {
    /// Start exactly `n` contexts, replacing any existing ones.
    fn spawn(&mut self, n: usize) -> Result<(), SwarmError>;

    /// Borrow an available context.
    fn acquire(&mut self) -> Result<ContextLease, SwarmError>;

    /// Return a context that finished cleanly.
    fn release(&mut self, id: ContextId);

    /// Replace a context whose worker may still be busy or dead, and mark it available.
    fn recycle(&mut self, id: ContextId);

    fn terminate(&mut self, id: ContextId);

    fn terminate_all(&mut self);

    fn contexts(&self) -> Vec<ContextInfo>;

    fn size(&self) -> usize {
        self.contexts().len()
    }

    fn busy_count(&self) -> usize {
        self.contexts().iter().filter(|c| !c.available).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let request = WorkerRequest {
            agent_id: AgentId::from_index(7),
            task: SubTask { code: "a".into(), start_line: 2, end_line: 3 },
            template: AgentTemplate::SecurityAnalyzer,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["agentId"], "mini_7");
        assert_eq!(json["type"], "security");
        assert_eq!(json["task"]["startLine"], 2);

        let back: WorkerRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back, request);
    }

    #[test]
    fn test_template_handler_routes_by_type() {
        let task = SubTask { code: "function f() {}".into(), start_line: 0, end_line: 1 };
        let value = TemplateHandler.handle(AgentTemplate::Tester, &task).unwrap();
        assert_eq!(value["count"], 1);
        let value = TemplateHandler.handle(AgentTemplate::Parser, &task).unwrap();
        assert_eq!(value["lines"], 1);
    }
}
