// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Event Bus - Pub/Sub for Swarm Lifecycle Events
//
// Two delivery paths share one publish call:
// - Synchronous observers registered with `on_event`, invoked in
//   registration order on the publishing task.
// - Async subscribers on a tokio broadcast channel (CLI, log streamers).
//
// A panicking observer is logged and skipped; the remaining observers and
// the broadcast still receive the event.
//
// In-memory only: events published with no listener are dropped.

use parking_lot::RwLock;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

use crate::domain::events::{SwarmEvent, SwarmEventEnvelope};
use crate::domain::outcome::SwarmRunId;

/// Handle returned by [`EventBus::on_event`]; pass to `unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Arc<dyn Fn(&SwarmEventEnvelope) + Send + Sync>;

#[derive(Clone)]
pub struct EventBus {
    observers: Arc<RwLock<Vec<(SubscriptionId, Observer)>>>,
    next_id: Arc<AtomicU64>,
    sender: Arc<broadcast::Sender<SwarmEventEnvelope>>,
}

impl EventBus {
    /// Create a new event bus; `capacity` bounds the broadcast buffer.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            observers: Arc::new(RwLock::new(Vec::new())),
            next_id: Arc::new(AtomicU64::new(0)),
            sender: Arc::new(sender),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    /// Register a synchronous observer.
    pub fn on_event<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&SwarmEventEnvelope) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let observer: Observer = Arc::new(observer);
        self.observers.write().push((id, observer));
        id
    }

    /// Remove an observer. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(sid, _)| *sid != id);
        observers.len() < before
    }

    /// Stamp and deliver an event to every observer, then to async subscribers.
    pub fn publish(&self, event: SwarmEvent) {
        let envelope = SwarmEventEnvelope::now(event);
        debug!(event = envelope.event.name(), "Publishing swarm event");

        // Snapshot so observers may (un)subscribe from inside a callback.
        let observers: Vec<(SubscriptionId, Observer)> = self.observers.read().clone();
        for (id, observer) in observers {
            if panic::catch_unwind(AssertUnwindSafe(|| observer(&envelope))).is_err() {
                error!(
                    subscription = ?id,
                    event = envelope.event.name(),
                    "Event observer panicked; continuing with remaining observers"
                );
            }
        }

        if self.sender.send(envelope).is_err() {
            debug!("No async subscribers listening to event");
        }
    }

    /// Subscribe to all swarm events.
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Subscribe to batch and completion events of a single run.
    pub fn subscribe_run(&self, run_id: SwarmRunId) -> RunEventReceiver {
        RunEventReceiver {
            receiver: self.sender.subscribe(),
            run_id,
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("observers", &self.observer_count())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

pub struct EventReceiver {
    receiver: broadcast::Receiver<SwarmEventEnvelope>,
}

impl EventReceiver {
    pub async fn recv(&mut self) -> Result<SwarmEventEnvelope, EventBusError> {
        self.receiver.recv().await.map_err(map_recv_error)
    }

    pub fn try_recv(&mut self) -> Result<SwarmEventEnvelope, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("Event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }
}

/// Receiver filtered to one run id.
pub struct RunEventReceiver {
    receiver: broadcast::Receiver<SwarmEventEnvelope>,
    run_id: SwarmRunId,
}

impl RunEventReceiver {
    pub async fn recv(&mut self) -> Result<SwarmEventEnvelope, EventBusError> {
        loop {
            let envelope = self.receiver.recv().await.map_err(map_recv_error)?;
            if self.matches_run(&envelope.event) {
                return Ok(envelope);
            }
        }
    }

    fn matches_run(&self, event: &SwarmEvent) -> bool {
        match event {
            SwarmEvent::SwarmReady { .. } => false,
            SwarmEvent::BatchStart { run_id, .. } => *run_id == self.run_id,
            SwarmEvent::BatchComplete { run_id, .. } => *run_id == self.run_id,
            SwarmEvent::SwarmComplete { run_id, .. } => *run_id == self.run_id,
        }
    }
}

fn map_recv_error(e: broadcast::error::RecvError) -> EventBusError {
    match e {
        broadcast::error::RecvError::Closed => EventBusError::Closed,
        broadcast::error::RecvError::Lagged(n) => {
            warn!("Event receiver lagged by {} events", n);
            EventBusError::Lagged(n)
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn ready() -> SwarmEvent {
        SwarmEvent::SwarmReady {
            agent_count: 10,
            cpu_cores: 2,
            elapsed_ms: 1,
        }
    }

    #[tokio::test]
    async fn test_observers_in_registration_order() {
        let bus = EventBus::new(10);
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let seen = seen.clone();
            bus.on_event(move |_| seen.lock().push(tag));
        }
        bus.publish(ready());

        assert_eq!(*seen.lock(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_panicking_observer_is_isolated() {
        let bus = EventBus::new(10);
        let hits = Arc::new(AtomicU64::new(0));

        bus.on_event(|_| panic!("observer failure"));
        let counter = hits.clone();
        bus.on_event(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let mut receiver = bus.subscribe();

        bus.publish(ready());

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        let envelope = receiver.recv().await.unwrap();
        assert_eq!(envelope.event.name(), "swarm-ready");
    }

    #[tokio::test]
    async fn test_unsubscribe() {
        let bus = EventBus::new(10);
        let hits = Arc::new(AtomicU64::new(0));
        let counter = hits.clone();
        let id = bus.on_event(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(ready());
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(ready());

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(bus.observer_count(), 0);
    }

    #[tokio::test]
    async fn test_run_filtering() {
        let bus = EventBus::new(10);
        let ours = SwarmRunId::new();
        let theirs = SwarmRunId::new();
        let mut receiver = bus.subscribe_run(ours);

        bus.publish(ready());
        bus.publish(SwarmEvent::BatchStart { run_id: theirs, batch: 1, total_batches: 1, agents: 2 });
        bus.publish(SwarmEvent::BatchStart { run_id: ours, batch: 1, total_batches: 3, agents: 4 });

        let envelope = receiver.recv().await.unwrap();
        match envelope.event {
            SwarmEvent::BatchStart { run_id, total_batches, .. } => {
                assert_eq!(run_id, ours);
                assert_eq!(total_batches, 3);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_try_recv_empty() {
        let bus = EventBus::new(10);
        let mut receiver = bus.subscribe();
        assert!(matches!(receiver.try_recv(), Err(EventBusError::Empty)));
        assert_eq!(bus.subscriber_count(), 1);
    }
}
