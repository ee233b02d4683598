// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Swarm Engine
//!
//! Caller-owned facade over the agent roster, the execution context pool and
//! the event bus. One engine per caller; there is no global instance.
//!
//! ```text
//! init_swarm(n)          populate roster, spawn contexts, emit swarm-ready
//! execute_swarm(task)    select -> split -> batch schedule -> aggregate
//! swarm_stats()          read-only snapshot
//! shutdown()             terminate contexts, clear roster
//! ```
//!
//! `execute_swarm` takes `&mut self`: a second coordinating call cannot start
//! while one is in flight.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::application::event_bus::{EventBus, EventReceiver, RunEventReceiver, SubscriptionId};
use crate::application::scheduler::{Assignment, BatchScheduler};
use crate::domain::agent::{AgentDescriptor, AgentPool};
use crate::domain::capacity::CapacityProfile;
use crate::domain::config::{EngineConfig, ExecuteOptions};
use crate::domain::context::{ContextInfo, ExecutionContextPool, TaskHandler, TemplateHandler};
use crate::domain::error::SwarmError;
use crate::domain::events::{SwarmEvent, SwarmEventEnvelope};
use crate::domain::outcome::{aggregate, AggregatedResult, SwarmRunId};
use crate::domain::selector;
use crate::domain::task::{self, WorkItem};
use crate::infrastructure::thread_pool::ThreadContextPool;

/// Snapshot returned by [`SwarmEngine::swarm_stats`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwarmStats {
    pub total_agents: usize,
    pub active_agents: usize,
    pub idle_agents: usize,
    pub completed_tasks: u64,
    pub cpu_cores: usize,
    pub worker_pool_size: usize,
    #[serde(rename = "memoryPerAgentMB")]
    pub memory_per_agent_mb: u32,
    #[serde(rename = "totalMemoryGB")]
    pub total_memory_gb: f64,
}

pub struct SwarmEngine {
    config: EngineConfig,
    capacity: CapacityProfile,
    agents: AgentPool,
    contexts: Box<dyn ExecutionContextPool>,
    events: EventBus,
}

impl SwarmEngine {
    /// Engine with the built-in template handlers and a detected capacity profile.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_handler(config, Arc::new(TemplateHandler))
    }

    /// Engine whose contexts run `handler` instead of the template analyses.
    pub fn with_handler(config: EngineConfig, handler: Arc<dyn TaskHandler>) -> Self {
        let capacity = config.capacity();
        let events = EventBus::new(config.event_capacity);
        Self {
            config,
            capacity,
            agents: AgentPool::default(),
            contexts: Box::new(ThreadContextPool::new(handler)),
            events,
        }
    }

    /// Override the detected capacity profile.
    pub fn with_capacity(mut self, capacity: CapacityProfile) -> Self {
        self.capacity = capacity;
        self
    }

    /// Replace the execution context backend.
    pub fn with_context_pool(mut self, contexts: Box<dyn ExecutionContextPool>) -> Self {
        self.contexts.terminate_all();
        self.contexts = contexts;
        self
    }

    /// Populate the roster and spawn the execution contexts. Re-initializing a
    /// live engine replaces both.
    pub fn init_swarm(&mut self, agent_count: usize) -> Result<&[AgentDescriptor], SwarmError> {
        let started = Instant::now();
        if agent_count == 0 {
            return Err(SwarmError::InvalidConfiguration(
                "agent count must be at least 1".to_string(),
            ));
        }

        let cores = self.capacity.logical_cores();
        let soft_limit = cores.saturating_mul(self.config.max_agents_per_core);
        if agent_count > soft_limit {
            warn!(
                agent_count,
                cores,
                soft_limit,
                "Agent roster is disproportionate to host capacity"
            );
        }

        let pool_size = self.config.worker_pool_size.unwrap_or(cores);
        let agents = AgentPool::populate(agent_count)?;
        self.contexts.spawn(pool_size)?;
        self.agents = agents;

        metrics::gauge!("swarm_agents_total").set(agent_count as f64);
        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(agents = agent_count, cores, workers = pool_size, elapsed_ms, "Swarm initialized");

        self.events.publish(SwarmEvent::SwarmReady {
            agent_count,
            cpu_cores: cores,
            elapsed_ms,
        });

        Ok(self.agents.agents())
    }

    /// Initialize with the configured roster size.
    pub fn init_from_config(&mut self) -> Result<&[AgentDescriptor], SwarmError> {
        self.init_swarm(self.config.agent_count)
    }

    pub async fn execute_swarm(
        &mut self,
        task: &WorkItem,
        options: ExecuteOptions,
    ) -> Result<AggregatedResult, SwarmError> {
        self.execute_swarm_with_cancel(task, options, CancellationToken::new())
            .await
    }

    /// Like [`execute_swarm`](Self::execute_swarm), abandoning in-flight and
    /// pending sub-tasks once `cancel` fires. Cancelled sub-tasks are reported
    /// as failed outcomes.
    pub async fn execute_swarm_with_cancel(
        &mut self,
        task: &WorkItem,
        options: ExecuteOptions,
        cancel: CancellationToken,
    ) -> Result<AggregatedResult, SwarmError> {
        if !self.is_initialized() {
            return Err(SwarmError::NotInitialized);
        }
        self.reconcile_abandoned_run();
        let parallelism = self.effective_parallelism(&options)?;
        if options.timeout_ms == 0 {
            return Err(SwarmError::InvalidConfiguration(
                "timeout must be at least 1ms".to_string(),
            ));
        }

        let started = Instant::now();
        let run_id = SwarmRunId::new();

        let selected = selector::select(&self.agents, task, options.min_agents);
        let sub_tasks = task::split(task, selected.len())?;
        let assignments: Vec<Assignment> = selected
            .into_iter()
            .zip(sub_tasks)
            .map(|(agent_index, sub_task)| Assignment { agent_index, sub_task })
            .collect();

        info!(
            run_id = %run_id.0,
            sub_tasks = assignments.len(),
            parallelism,
            timeout_ms = options.timeout_ms,
            "Executing swarm"
        );

        let outcomes = BatchScheduler::new(&mut self.agents, self.contexts.as_mut(), &self.events, run_id)
            .run(assignments, parallelism, options.timeout(), &cancel)
            .await;
        self.agents.reset_all();

        let result = aggregate(run_id, outcomes, task);
        let elapsed_ms = started.elapsed().as_millis() as u64;

        self.events.publish(SwarmEvent::SwarmComplete {
            run_id,
            elapsed_ms,
            agents_used: result.total_agents,
            parallelism,
            cancelled: cancel.is_cancelled(),
        });
        info!(run_id = %run_id.0, elapsed_ms, "{}", result.summary());

        Ok(result)
    }

    /// Undo leftovers of a run whose future was dropped mid-batch.
    ///
    /// Contexts still leased may hold a worker busy with stale work, so they
    /// are recycled rather than released.
    fn reconcile_abandoned_run(&mut self) {
        let leased: Vec<_> = self
            .contexts
            .contexts()
            .into_iter()
            .filter(|c| !c.available)
            .map(|c| c.id)
            .collect();
        if leased.is_empty() && self.agents.active_count() == 0 {
            return;
        }

        warn!(
            leased_contexts = leased.len(),
            active_agents = self.agents.active_count(),
            "Previous swarm run was abandoned; recycling its contexts"
        );
        for id in leased {
            self.contexts.recycle(id);
        }
        self.agents.reset_all();
    }

    fn effective_parallelism(&self, options: &ExecuteOptions) -> Result<usize, SwarmError> {
        let requested = options
            .parallelism
            .or(self.config.parallelism)
            .unwrap_or_else(|| self.capacity.logical_cores());
        if requested == 0 {
            return Err(SwarmError::InvalidConfiguration(
                "parallelism must be at least 1".to_string(),
            ));
        }

        let pool_size = self.contexts.size();
        if requested > pool_size {
            warn!(requested, pool_size, "Parallelism exceeds worker pool, clamping");
            return Ok(pool_size);
        }
        Ok(requested)
    }

    pub fn swarm_stats(&self) -> SwarmStats {
        let footprint = self.config.agent_footprint_mb;
        SwarmStats {
            total_agents: self.agents.len(),
            active_agents: self.agents.active_count(),
            idle_agents: self.agents.idle_count(),
            completed_tasks: self.agents.completed_tasks(),
            cpu_cores: self.capacity.logical_cores(),
            worker_pool_size: self.contexts.size(),
            memory_per_agent_mb: footprint,
            total_memory_gb: self.agents.len() as f64 * footprint as f64 / 1024.0,
        }
    }

    /// Template wire id → agents bound to it.
    pub fn agent_distribution(&self) -> BTreeMap<String, usize> {
        self.agents.distribution()
    }

    pub fn on_event<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&SwarmEventEnvelope) + Send + Sync + 'static,
    {
        self.events.on_event(observer)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    pub fn subscribe_run(&self, run_id: SwarmRunId) -> RunEventReceiver {
        self.events.subscribe_run(run_id)
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn agents(&self) -> &[AgentDescriptor] {
        self.agents.agents()
    }

    pub fn contexts(&self) -> Vec<ContextInfo> {
        self.contexts.contexts()
    }

    pub fn capacity(&self) -> CapacityProfile {
        self.capacity
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        !self.agents.is_empty() && self.contexts.size() > 0
    }

    /// Terminate every context and clear the roster. In-flight work is abandoned.
    pub fn shutdown(&mut self) {
        self.contexts.terminate_all();
        self.agents = AgentPool::default();
        metrics::gauge!("swarm_agents_total").set(0.0);
        info!("Swarm shut down");
    }
}

impl Drop for SwarmEngine {
    fn drop(&mut self) {
        self.contexts.terminate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::SubTask;
    use crate::domain::template::AgentTemplate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn engine(cores: usize) -> SwarmEngine {
        SwarmEngine::new(EngineConfig::default()).with_capacity(CapacityProfile::fixed(cores))
    }

    #[tokio::test]
    async fn test_init_swarm_counts() {
        let mut engine = engine(4);
        let agents = engine.init_swarm(25).unwrap();
        assert_eq!(agents.len(), 25);

        let stats = engine.swarm_stats();
        assert_eq!(stats.total_agents, 25);
        assert_eq!(stats.idle_agents, 25);
        assert_eq!(stats.worker_pool_size, 4);
        assert_eq!(stats.memory_per_agent_mb, 200);
        assert!((stats.total_memory_gb - 25.0 * 200.0 / 1024.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_init_rejects_zero() {
        let mut engine = engine(2);
        assert!(matches!(engine.init_swarm(0), Err(SwarmError::InvalidConfiguration(_))));
        assert!(!engine.is_initialized());
    }

    #[tokio::test]
    async fn test_worker_pool_size_override() {
        let config = EngineConfig {
            worker_pool_size: Some(3),
            ..EngineConfig::default()
        };
        let mut engine = SwarmEngine::new(config).with_capacity(CapacityProfile::fixed(8));
        engine.init_swarm(10).unwrap();
        assert_eq!(engine.swarm_stats().worker_pool_size, 3);
        assert_eq!(engine.swarm_stats().cpu_cores, 8);
    }

    #[tokio::test]
    async fn test_execute_before_init() {
        let mut engine = engine(2);
        let err = engine
            .execute_swarm(&WorkItem::new("a"), ExecuteOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err, SwarmError::NotInitialized);
    }

    #[tokio::test]
    async fn test_zero_parallelism_rejected() {
        let mut engine = engine(2);
        engine.init_swarm(10).unwrap();
        let err = engine
            .execute_swarm(&WorkItem::new("a"), ExecuteOptions::default().with_parallelism(0))
            .await
            .unwrap_err();
        assert!(matches!(err, SwarmError::InvalidConfiguration(_)));
    }

    #[tokio::test]
    async fn test_parallelism_clamped_to_pool() {
        let mut engine = engine(2);
        engine.init_swarm(20).unwrap();

        let code = (0..6).map(|i| format!("let x{} = {};", i, i)).collect::<Vec<_>>().join("\n");
        let result = engine
            .execute_swarm(
                &WorkItem::new(code),
                ExecuteOptions::default().with_parallelism(16).with_min_agents(6),
            )
            .await
            .unwrap();

        assert_eq!(result.total_agents, 6);
        assert_eq!(result.failed_agents, 0);
        assert_eq!(engine.swarm_stats().active_agents, 0);
    }

    #[tokio::test]
    async fn test_template_results_flow_through() {
        let mut engine = engine(2);
        engine.init_swarm(10).unwrap();

        let result = engine
            .execute_swarm(
                &WorkItem::new("function a() {}\nfunction b() {}"),
                ExecuteOptions::default().with_min_agents(1),
            )
            .await
            .unwrap();

        // Baseline: agents 0 (parser) and 1 (validator) take one line each.
        assert_eq!(result.total_agents, 2);
        assert!(result.success);
        assert_eq!(result.results[0]["lines"], 1);
        assert_eq!(result.results[1]["valid"], true);
        assert_eq!(engine.swarm_stats().completed_tasks, 2);
    }

    #[tokio::test]
    async fn test_custom_handler_sees_wire_template() {
        struct Recording(Arc<AtomicUsize>);
        impl TaskHandler for Recording {
            fn handle(&self, template: AgentTemplate, _task: &SubTask) -> Result<serde_json::Value, String> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(serde_json::json!(template.wire_id()))
            }
        }

        let calls = Arc::new(AtomicUsize::new(0));
        let mut engine = SwarmEngine::with_handler(EngineConfig::default(), Arc::new(Recording(calls.clone())))
            .with_capacity(CapacityProfile::fixed(2));
        engine.init_swarm(2).unwrap();

        let result = engine
            .execute_swarm(&WorkItem::new("a\nb"), ExecuteOptions::default().with_min_agents(2))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(result.results, vec![serde_json::json!("parser"), serde_json::json!("validator")]);
    }

    #[tokio::test]
    async fn test_reinit_replaces_roster() {
        let mut engine = engine(2);
        engine.init_swarm(30).unwrap();
        engine.init_swarm(12).unwrap();
        assert_eq!(engine.swarm_stats().total_agents, 12);
        assert_eq!(engine.contexts().len(), 2);
    }

    #[tokio::test]
    async fn test_shutdown() {
        let mut engine = engine(2);
        engine.init_swarm(10).unwrap();
        engine.shutdown();

        let stats = engine.swarm_stats();
        assert_eq!(stats.total_agents, 0);
        assert_eq!(stats.worker_pool_size, 0);
        let err = engine
            .execute_swarm(&WorkItem::new("a"), ExecuteOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err, SwarmError::NotInitialized);
    }

    #[test]
    fn test_stats_wire_names() {
        let stats = SwarmStats {
            total_agents: 1,
            active_agents: 0,
            idle_agents: 1,
            completed_tasks: 0,
            cpu_cores: 1,
            worker_pool_size: 1,
            memory_per_agent_mb: 200,
            total_memory_gb: 0.5,
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["memoryPerAgentMB"], 200);
        assert_eq!(json["totalMemoryGB"], 0.5);
        assert_eq!(json["workerPoolSize"], 1);
    }
}
