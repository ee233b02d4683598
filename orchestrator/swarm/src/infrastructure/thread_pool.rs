// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Thread-backed Execution Context Pool
//
// One dedicated OS thread per context. Each thread owns the receiving end of
// an unbounded channel and runs a blocking receive loop:
//   Job { request, reply } -> handler -> reply.send(response)
//
// Nothing is shared between coordinator and worker except the immutable
// handler; requests and responses are moved across the channel.
//
// Threads cannot be killed. Recycling a context swaps in a fresh thread and
// drops the old sender, so the abandoned thread exits once its current
// handler returns.

use async_trait::async_trait;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::domain::context::{
    ContextId, ContextInfo, ContextLease, ContextMailbox, ExecutionContextPool, TaskHandler,
    WorkerRequest, WorkerResponse,
};
use crate::domain::error::SwarmError;

struct Job {
    request: WorkerRequest,
    reply: oneshot::Sender<WorkerResponse>,
}

struct ThreadMailbox {
    id: ContextId,
    jobs: mpsc::UnboundedSender<Job>,
}

#[async_trait]
impl ContextMailbox for ThreadMailbox {
    async fn post(&self, request: WorkerRequest) -> Result<WorkerResponse, SwarmError> {
        let (reply, response) = oneshot::channel();
        self.jobs
            .send(Job { request, reply })
            .map_err(|_| SwarmError::ContextCrashed(self.id))?;
        response.await.map_err(|_| SwarmError::ContextCrashed(self.id))
    }
}

struct ContextSlot {
    id: ContextId,
    available: bool,
    mailbox: Arc<ThreadMailbox>,
    _thread: JoinHandle<()>,
}

/// Execution context pool backed by OS threads.
pub struct ThreadContextPool {
    handler: Arc<dyn TaskHandler>,
    slots: Vec<ContextSlot>,
}

impl ThreadContextPool {
    pub fn new(handler: Arc<dyn TaskHandler>) -> Self {
        Self {
            handler,
            slots: Vec::new(),
        }
    }

    fn start_context(&self, id: ContextId) -> Result<ContextSlot, SwarmError> {
        let (jobs, inbox) = mpsc::unbounded_channel();
        let handler = Arc::clone(&self.handler);

        let thread = std::thread::Builder::new()
            .name(format!("swarm-{}", id))
            .spawn(move || run_context(id, inbox, handler))
            .map_err(|e| {
                error!(context = %id, error = %e, "Failed to spawn execution context thread");
                SwarmError::ContextCrashed(id)
            })?;

        Ok(ContextSlot {
            id,
            available: true,
            mailbox: Arc::new(ThreadMailbox { id, jobs }),
            _thread: thread,
        })
    }

    fn slot_mut(&mut self, id: ContextId) -> Option<&mut ContextSlot> {
        self.slots.iter_mut().find(|s| s.id == id)
    }
}

impl ExecutionContextPool for ThreadContextPool {
    fn spawn(&mut self, n: usize) -> Result<(), SwarmError> {
        if n == 0 {
            return Err(SwarmError::InvalidConfiguration(
                "execution context pool needs at least one context".to_string(),
            ));
        }
        self.terminate_all();

        let mut slots = Vec::with_capacity(n);
        for i in 0..n {
            slots.push(self.start_context(ContextId(i))?);
        }
        self.slots = slots;

        info!(contexts = n, "Worker pool initialized");
        Ok(())
    }

    fn acquire(&mut self) -> Result<ContextLease, SwarmError> {
        let slot = self
            .slots
            .iter_mut()
            .find(|s| s.available)
            .ok_or(SwarmError::NoAvailableContext)?;
        slot.available = false;
        Ok(ContextLease {
            id: slot.id,
            mailbox: slot.mailbox.clone(),
        })
    }

    fn release(&mut self, id: ContextId) {
        match self.slot_mut(id) {
            Some(slot) => slot.available = true,
            None => debug!(context = %id, "Release for unknown context ignored"),
        }
    }

    fn recycle(&mut self, id: ContextId) {
        let Some(pos) = self.slots.iter().position(|s| s.id == id) else {
            debug!(context = %id, "Recycle for unknown context ignored");
            return;
        };

        match self.start_context(id) {
            Ok(fresh) => {
                // Dropping the old slot closes its channel; the old thread exits after its job.
                self.slots[pos] = fresh;
                metrics::counter!("swarm_context_recycled_total").increment(1);
                warn!(context = %id, "Execution context recycled");
            }
            Err(e) => {
                // Keep the slot; the next dispatch reports a crash and retries the recycle.
                self.slots[pos].available = true;
                error!(context = %id, error = %e, "Execution context could not be replaced");
            }
        }
    }

    fn terminate(&mut self, id: ContextId) {
        let before = self.slots.len();
        self.slots.retain(|s| s.id != id);
        if self.slots.len() < before {
            debug!(context = %id, "Execution context terminated");
        }
    }

    fn terminate_all(&mut self) {
        if !self.slots.is_empty() {
            info!(contexts = self.slots.len(), "Terminating all execution contexts");
        }
        self.slots.clear();
    }

    fn contexts(&self) -> Vec<ContextInfo> {
        self.slots
            .iter()
            .map(|s| ContextInfo {
                id: s.id,
                available: s.available,
            })
            .collect()
    }

    fn size(&self) -> usize {
        self.slots.len()
    }

    fn busy_count(&self) -> usize {
        self.slots.iter().filter(|s| !s.available).count()
    }
}

impl Drop for ThreadContextPool {
    fn drop(&mut self) {
        self.terminate_all();
    }
}

fn run_context(id: ContextId, mut inbox: mpsc::UnboundedReceiver<Job>, handler: Arc<dyn TaskHandler>) {
    debug!(context = %id, "Execution context started");
    while let Some(Job { request, reply }) = inbox.blocking_recv() {
        let response = execute(handler.as_ref(), request);
        if reply.send(response).is_err() {
            debug!(context = %id, "Coordinator stopped waiting for this response");
        }
    }
    debug!(context = %id, "Execution context stopped");
}

fn execute(handler: &dyn TaskHandler, request: WorkerRequest) -> WorkerResponse {
    let started = Instant::now();
    let WorkerRequest {
        agent_id,
        task,
        template,
    } = request;

    let result = panic::catch_unwind(AssertUnwindSafe(|| handler.handle(template, &task)));
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match result {
        Ok(Ok(value)) => WorkerResponse::completed(agent_id, value, elapsed_ms),
        Ok(Err(message)) => WorkerResponse::failed(agent_id, message, elapsed_ms),
        Err(payload) => WorkerResponse::failed(agent_id, panic_message(payload.as_ref()), elapsed_ms),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("handler panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("handler panicked: {}", s)
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::AgentId;
    use crate::domain::context::TemplateHandler;
    use crate::domain::task::SubTask;
    use crate::domain::template::AgentTemplate;
    use std::time::Duration;

    /// "fail" → Err, "panic" → panic, "slow" → sleeps 300ms, anything else → echo.
    struct ScriptedHandler;

    impl TaskHandler for ScriptedHandler {
        fn handle(&self, _template: AgentTemplate, task: &SubTask) -> Result<serde_json::Value, String> {
            match task.code.as_str() {
                "fail" => Err("scripted failure".to_string()),
                "panic" => panic!("scripted panic"),
                "slow" => {
                    std::thread::sleep(Duration::from_millis(300));
                    Ok(serde_json::json!("slow"))
                }
                other => Ok(serde_json::json!(other)),
            }
        }
    }

    fn request(code: &str) -> WorkerRequest {
        WorkerRequest {
            agent_id: AgentId::from_index(0),
            task: SubTask { code: code.to_string(), start_line: 0, end_line: 1 },
            template: AgentTemplate::Parser,
        }
    }

    fn scripted_pool(n: usize) -> ThreadContextPool {
        let mut pool = ThreadContextPool::new(Arc::new(ScriptedHandler));
        pool.spawn(n).unwrap();
        pool
    }

    #[tokio::test]
    async fn test_spawn_exact_count() {
        let mut pool = ThreadContextPool::new(Arc::new(TemplateHandler));
        pool.spawn(4).unwrap();
        assert_eq!(pool.size(), 4);
        assert_eq!(pool.busy_count(), 0);
        assert!(pool.spawn(0).is_err());
    }

    #[tokio::test]
    async fn test_acquire_exhaustion_and_release() {
        let mut pool = scripted_pool(2);
        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(pool.busy_count(), 2);
        assert!(matches!(pool.acquire(), Err(SwarmError::NoAvailableContext)));

        pool.release(a.id);
        assert_eq!(pool.acquire().unwrap().id, a.id);
    }

    #[tokio::test]
    async fn test_round_trip_and_handler_errors() {
        let mut pool = scripted_pool(1);
        let lease = pool.acquire().unwrap();

        let ok = lease.mailbox.post(request("hello")).await.unwrap();
        assert!(ok.success);
        assert_eq!(ok.result, Some(serde_json::json!("hello")));

        let failed = lease.mailbox.post(request("fail")).await.unwrap();
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("scripted failure"));

        let panicked = lease.mailbox.post(request("panic")).await.unwrap();
        assert!(!panicked.success);
        assert!(panicked.error.unwrap().contains("scripted panic"));

        // Same context keeps serving after a panic.
        let again = lease.mailbox.post(request("still alive")).await.unwrap();
        assert!(again.success);
    }

    #[tokio::test]
    async fn test_recycle_replaces_stuck_context() {
        let mut pool = scripted_pool(1);
        let lease = pool.acquire().unwrap();

        let timed_out = tokio::time::timeout(Duration::from_millis(20), lease.mailbox.post(request("slow"))).await;
        assert!(timed_out.is_err());

        pool.recycle(lease.id);
        assert_eq!(pool.busy_count(), 0);

        let fresh = pool.acquire().unwrap();
        assert_eq!(fresh.id, lease.id);
        let started = Instant::now();
        let response = fresh.mailbox.post(request("quick")).await.unwrap();
        assert!(response.success);
        // The fresh thread does not queue behind the abandoned slow job.
        assert!(started.elapsed() < Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_terminate() {
        let mut pool = scripted_pool(3);
        pool.terminate(ContextId(1));
        assert_eq!(pool.size(), 2);
        assert!(pool.contexts().iter().all(|c| c.id != ContextId(1)));

        pool.terminate_all();
        assert_eq!(pool.size(), 0);
        assert!(matches!(pool.acquire(), Err(SwarmError::NoAvailableContext)));
    }
}
