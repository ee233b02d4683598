// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Batch Scheduler
//
// Drives (agent, sub-task) assignments through the execution context pool in
// sequential batches of at most `parallelism`:
//
//   for each batch:
//     mark agents working, lease one context per sub-task
//     race every dispatch against its timeout and the cancel token
//     join_all (never short-circuits), then release or recycle each context
//
// Every assignment yields exactly one Outcome. Pool bookkeeping is mutated
// only between awaits, on the coordinating task.

use futures::future::join_all;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::event_bus::EventBus;
use crate::domain::agent::{AgentId, AgentPool};
use crate::domain::context::{ContextId, ContextLease, ExecutionContextPool, WorkerRequest, WorkerResponse};
use crate::domain::error::SwarmError;
use crate::domain::events::SwarmEvent;
use crate::domain::outcome::{Outcome, SwarmRunId};
use crate::domain::task::SubTask;

/// One sub-task bound to the pool index of the agent that runs it.
#[derive(Debug, Clone)]
pub struct Assignment {
    pub agent_index: usize,
    pub sub_task: SubTask,
}

pub struct BatchScheduler<'a> {
    agents: &'a mut AgentPool,
    contexts: &'a mut dyn ExecutionContextPool,
    events: &'a EventBus,
    run_id: SwarmRunId,
}

struct Dispatch {
    index: usize,
    agent_index: usize,
    agent_id: AgentId,
    lease: ContextLease,
    request: WorkerRequest,
}

struct Settled {
    index: usize,
    agent_index: usize,
    agent_id: AgentId,
    context: ContextId,
    response: Result<WorkerResponse, SwarmError>,
    wall_ms: u64,
}

impl<'a> BatchScheduler<'a> {
    pub fn new(
        agents: &'a mut AgentPool,
        contexts: &'a mut dyn ExecutionContextPool,
        events: &'a EventBus,
        run_id: SwarmRunId,
    ) -> Self {
        Self {
            agents,
            contexts,
            events,
            run_id,
        }
    }

    /// Run all assignments. Outcomes come back in completion order; the
    /// aggregator sorts them by sub-task index.
    pub async fn run(
        &mut self,
        assignments: Vec<Assignment>,
        parallelism: usize,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Vec<Outcome> {
        let total = assignments.len();
        let width = parallelism.max(1);
        let total_batches = total.div_ceil(width);
        let mut outcomes = Vec::with_capacity(total);

        let indexed: Vec<(usize, Assignment)> = assignments.into_iter().enumerate().collect();

        for (batch_no, batch) in indexed.chunks(width).enumerate() {
            let batch_no = batch_no + 1;

            if cancel.is_cancelled() {
                for (index, assignment) in batch {
                    outcomes.push(self.cancelled_outcome(*index, assignment.agent_index));
                }
                continue;
            }

            self.events.publish(SwarmEvent::BatchStart {
                run_id: self.run_id,
                batch: batch_no,
                total_batches,
                agents: batch.len(),
            });
            debug!(run_id = %self.run_id.0, batch = batch_no, size = batch.len(), "Batch started");

            let mut batch_outcomes = Vec::with_capacity(batch.len());
            let mut dispatches = Vec::with_capacity(batch.len());

            for (index, assignment) in batch {
                match self.lease(*index, assignment) {
                    Ok(dispatch) => dispatches.push(dispatch),
                    Err(e) => {
                        let agent_id = self.agent_id(assignment.agent_index);
                        warn!(agent = %agent_id, error = %e, "Dispatch rejected");
                        self.finish_agent(assignment.agent_index, false);
                        batch_outcomes.push(Outcome::failure(agent_id, *index, e.outcome_message(), 0));
                    }
                }
            }

            let settled = join_all(dispatches.into_iter().map(|d| dispatch(d, timeout, cancel))).await;

            for s in settled {
                let outcome = self.settle(s);
                record_metrics(&outcome);
                batch_outcomes.push(outcome);
            }

            let succeeded = batch_outcomes.iter().filter(|o| o.success).count();
            let failed = batch_outcomes.len() - succeeded;
            outcomes.extend(batch_outcomes);

            metrics::counter!("swarm_batches_total").increment(1);
            self.events.publish(SwarmEvent::BatchComplete {
                run_id: self.run_id,
                batch: batch_no,
                completed: outcomes.len(),
                total,
                succeeded,
                failed,
            });
            info!(
                run_id = %self.run_id.0,
                batch = batch_no,
                total_batches,
                succeeded,
                failed,
                "Batch complete"
            );
        }

        outcomes
    }

    fn lease(&mut self, index: usize, assignment: &Assignment) -> Result<Dispatch, SwarmError> {
        let agent = self
            .agents
            .get_mut(assignment.agent_index)
            .ok_or_else(|| SwarmError::InvalidConfiguration(format!("no agent at index {}", assignment.agent_index)))?;

        let lease = self.contexts.acquire()?;
        agent.begin(assignment.sub_task.clone());

        Ok(Dispatch {
            index,
            agent_index: assignment.agent_index,
            agent_id: agent.id.clone(),
            request: WorkerRequest {
                agent_id: agent.id.clone(),
                task: assignment.sub_task.clone(),
                template: agent.template,
            },
            lease,
        })
    }

    fn settle(&mut self, settled: Settled) -> Outcome {
        let Settled {
            index,
            agent_index,
            agent_id,
            context,
            response,
            wall_ms,
        } = settled;

        let outcome = match response {
            Ok(response) => {
                self.contexts.release(context);
                if response.success {
                    Outcome::success(
                        agent_id,
                        index,
                        response.result.unwrap_or(serde_json::Value::Null),
                        response.elapsed_ms,
                    )
                } else {
                    let err = SwarmError::WorkerExecutionError(
                        response.error.unwrap_or_else(|| "unknown error".to_string()),
                    );
                    warn!(agent = %agent_id, context = %context, error = %err, "Sub-task failed");
                    Outcome::failure(agent_id, index, err.outcome_message(), response.elapsed_ms)
                }
            }
            Err(err) => {
                if err.poisons_context() {
                    self.contexts.recycle(context);
                } else {
                    self.contexts.release(context);
                }
                warn!(agent = %agent_id, context = %context, error = %err, "Sub-task did not complete");
                Outcome::failure(agent_id, index, err.outcome_message(), wall_ms)
            }
        };

        self.finish_agent(agent_index, outcome.success);
        outcome
    }

    fn cancelled_outcome(&self, index: usize, agent_index: usize) -> Outcome {
        let outcome = Outcome::failure(self.agent_id(agent_index), index, SwarmError::Cancelled.outcome_message(), 0);
        record_metrics(&outcome);
        outcome
    }

    fn agent_id(&self, agent_index: usize) -> AgentId {
        self.agents
            .get(agent_index)
            .map(|a| a.id.clone())
            .unwrap_or_else(|| AgentId::from_index(agent_index))
    }

    fn finish_agent(&mut self, agent_index: usize, success: bool) {
        if let Some(agent) = self.agents.get_mut(agent_index) {
            agent.finish(success);
        }
    }
}

async fn dispatch(d: Dispatch, timeout: Duration, cancel: &CancellationToken) -> Settled {
    let started = Instant::now();
    let timeout_ms = timeout.as_millis() as u64;

    let response = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SwarmError::Cancelled),
        posted = tokio::time::timeout(timeout, d.lease.mailbox.post(d.request)) => match posted {
            Ok(result) => result,
            Err(_) => Err(SwarmError::TaskTimeout(timeout_ms)),
        },
    };

    Settled {
        index: d.index,
        agent_index: d.agent_index,
        agent_id: d.agent_id,
        context: d.lease.id,
        response,
        wall_ms: started.elapsed().as_millis() as u64,
    }
}

fn record_metrics(outcome: &Outcome) {
    let label = match (outcome.success, outcome.error.as_deref()) {
        (true, _) => "success",
        (false, Some("timeout")) => "timeout",
        (false, Some("cancelled")) => "cancelled",
        (false, _) => "failure",
    };
    metrics::counter!("swarm_subtasks_total", "outcome" => label).increment(1);
    metrics::histogram!("swarm_subtask_duration_ms").record(outcome.elapsed_ms as f64);
}
