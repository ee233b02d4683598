// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Pool
//!
//! Logical roster of lightweight agent descriptors. Agents are bookkeeping
//! only; they are not threads. Work runs on execution contexts.
//!
//! The roster is built in bulk by [`AgentPool::populate`] and is replaced as a
//! whole on re-init. Only the batch scheduler mutates descriptor status.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::error::SwarmError;
use crate::domain::task::SubTask;
use crate::domain::template::{AgentTemplate, CATALOG};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn from_index(index: usize) -> Self {
        Self(format!("mini_{}", index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Idle,
    Working,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDescriptor {
    pub id: AgentId,
    #[serde(rename = "type")]
    pub template: AgentTemplate,
    pub specialization: String,
    #[serde(rename = "memoryBudgetMB")]
    pub memory_budget_mb: u32,
    pub status: AgentStatus,
    pub tasks_completed: u64,
    pub current_sub_task: Option<SubTask>,
}

impl AgentDescriptor {
    fn new(index: usize) -> Self {
        let template = AgentTemplate::round_robin(index);
        Self {
            id: AgentId::from_index(index),
            template,
            specialization: template.specialization().to_string(),
            memory_budget_mb: template.memory_budget_mb(),
            status: AgentStatus::Idle,
            tasks_completed: 0,
            current_sub_task: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.status == AgentStatus::Idle
    }

    pub(crate) fn begin(&mut self, sub_task: SubTask) {
        self.status = AgentStatus::Working;
        self.current_sub_task = Some(sub_task);
    }

    pub(crate) fn finish(&mut self, success: bool) {
        self.status = AgentStatus::Idle;
        self.current_sub_task = None;
        if success {
            self.tasks_completed += 1;
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AgentPool {
    agents: Vec<AgentDescriptor>,
}

impl AgentPool {
    /// Build a roster of `agent_count` descriptors, templates assigned round-robin.
    pub fn populate(agent_count: usize) -> Result<Self, SwarmError> {
        if agent_count == 0 {
            return Err(SwarmError::InvalidConfiguration(
                "agent count must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            agents: (0..agent_count).map(AgentDescriptor::new).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn agents(&self) -> &[AgentDescriptor] {
        &self.agents
    }

    pub fn get(&self, index: usize) -> Option<&AgentDescriptor> {
        self.agents.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut AgentDescriptor> {
        self.agents.get_mut(index)
    }

    /// Indices of idle agents with the given template, in pool order.
    pub fn idle_of(&self, template: AgentTemplate) -> impl Iterator<Item = usize> + '_ {
        self.agents
            .iter()
            .enumerate()
            .filter(move |(_, a)| a.template == template && a.is_idle())
            .map(|(i, _)| i)
    }

    pub fn active_count(&self) -> usize {
        self.agents.iter().filter(|a| !a.is_idle()).count()
    }

    pub fn idle_count(&self) -> usize {
        self.agents.iter().filter(|a| a.is_idle()).count()
    }

    pub fn completed_tasks(&self) -> u64 {
        self.agents.iter().map(|a| a.tasks_completed).sum()
    }

    /// Template wire id → number of agents bound to it. Every catalog entry
    /// is present, possibly with zero.
    pub fn distribution(&self) -> BTreeMap<String, usize> {
        let mut dist: BTreeMap<String, usize> =
            CATALOG.iter().map(|t| (t.wire_id().to_string(), 0)).collect();
        for agent in &self.agents {
            *dist.entry(agent.template.wire_id().to_string()).or_default() += 1;
        }
        dist
    }

    /// Force every agent back to idle. Used after a cancelled run.
    pub(crate) fn reset_all(&mut self) {
        for agent in &mut self.agents {
            agent.status = AgentStatus::Idle;
            agent.current_sub_task = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_populate_exact_count() {
        for n in [1, 2, 10, 199, 200] {
            let pool = AgentPool::populate(n).unwrap();
            assert_eq!(pool.len(), n);
            assert_eq!(pool.idle_count(), n);
            assert_eq!(pool.active_count(), 0);
        }
    }

    #[test]
    fn test_populate_zero_is_invalid() {
        assert!(matches!(
            AgentPool::populate(0),
            Err(SwarmError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_distribution_is_even() {
        let pool = AgentPool::populate(200).unwrap();
        let dist = pool.distribution();
        assert_eq!(dist.len(), 10);
        assert!(dist.values().all(|&c| c == 20));

        let pool = AgentPool::populate(13).unwrap();
        let dist = pool.distribution();
        assert_eq!(dist["parser"], 2);
        assert_eq!(dist["validator"], 2);
        assert_eq!(dist["optimizer"], 2);
        assert_eq!(dist["tester"], 1);
        assert_eq!(dist.values().sum::<usize>(), 13);
    }

    #[test]
    fn test_descriptor_lifecycle() {
        let mut pool = AgentPool::populate(3).unwrap();
        let sub_task = SubTask { code: "x".into(), start_line: 0, end_line: 1 };

        pool.get_mut(1).unwrap().begin(sub_task.clone());
        assert_eq!(pool.active_count(), 1);
        assert_eq!(pool.get(1).unwrap().current_sub_task, Some(sub_task));

        pool.get_mut(1).unwrap().finish(true);
        let agent = pool.get(1).unwrap();
        assert!(agent.is_idle());
        assert_eq!(agent.tasks_completed, 1);
        assert!(agent.current_sub_task.is_none());

        pool.get_mut(1).unwrap().begin(SubTask { code: String::new(), start_line: 0, end_line: 1 });
        pool.get_mut(1).unwrap().finish(false);
        assert_eq!(pool.completed_tasks(), 1);
    }

    #[test]
    fn test_agent_ids_and_templates() {
        let pool = AgentPool::populate(12).unwrap();
        assert_eq!(pool.get(0).unwrap().id.as_str(), "mini_0");
        assert_eq!(pool.get(11).unwrap().template, AgentTemplate::Validator);
        assert_eq!(pool.idle_of(AgentTemplate::Parser).collect::<Vec<_>>(), vec![0, 10]);
    }
}
