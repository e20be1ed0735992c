//! Asynchronous event publication.
//!
//! Events are queued on a bounded channel and delivered by background
//! workers, so the request path never waits on the bus. Delivery goes through
//! a consecutive-failures circuit breaker; while it is open, events are
//! dropped with a warning instead of piling up behind a dead bus.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{
    Config, Error as FailsafeError, Instrument, StateMachine, backoff, failure_policy,
};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use paygate_types::{EventBus, TransactionEvent};

type Breaker = StateMachine<failure_policy::ConsecutiveFailures<backoff::Constant>, BreakerState>;

/// Publisher tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublisherConfig {
    /// Events buffered before new ones are dropped
    pub queue_capacity: usize,
    /// Number of delivery tasks
    pub workers: usize,
    /// Consecutive bus failures that open the breaker
    pub failure_threshold: u32,
    /// How long the breaker stays open before letting a trial delivery through
    pub cooldown: Duration,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            workers: 1,
            failure_threshold: 5,
            cooldown: Duration::from_secs(30),
        }
    }
}

/// Breaker state as of its last transition.
///
/// An open breaker whose cooldown has elapsed stays `Open` until the next
/// delivery is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

const CLOSED: u8 = 0;
const OPEN: u8 = 1;
const HALF_OPEN: u8 = 2;

/// Records breaker transitions so the state can be read without touching the breaker.
#[derive(Debug, Clone, Default)]
struct BreakerState(Arc<AtomicU8>);

impl BreakerState {
    fn get(&self) -> CircuitState {
        match self.0.load(Ordering::Acquire) {
            OPEN => CircuitState::Open,
            HALF_OPEN => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }
}

impl Instrument for BreakerState {
    fn on_call_rejected(&self) {}

    fn on_open(&self) {
        self.0.store(OPEN, Ordering::Release);
        tracing::warn!("Event bus circuit opened");
    }

    fn on_half_open(&self) {
        self.0.store(HALF_OPEN, Ordering::Release);
        tracing::info!("Event bus circuit half-open, trying a delivery");
    }

    fn on_closed(&self) {
        if self.0.swap(CLOSED, Ordering::AcqRel) != CLOSED {
            tracing::info!("Event bus circuit closed");
        }
    }
}

/// Handle used by the payment service to enqueue events. Cheap to clone.
#[derive(Clone)]
pub struct EventPublisher {
    tx: mpsc::Sender<TransactionEvent>,
    state: BreakerState,
}

/// Background delivery tasks. They exit once every [`EventPublisher`] is dropped
/// and the queue is drained.
pub struct PublisherWorkers {
    handles: Vec<JoinHandle<()>>,
    state: BreakerState,
}

impl EventPublisher {
    /// Spawns the workers and returns the enqueue handle.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(bus: Arc<dyn EventBus>, config: PublisherConfig) -> (Self, PublisherWorkers) {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));

        let policy = failure_policy::consecutive_failures(
            config.failure_threshold.max(1),
            backoff::constant(config.cooldown),
        );
        let state = BreakerState::default();
        let breaker: Breaker = Config::new()
            .failure_policy(policy)
            .instrument(state.clone())
            .build();

        let handles = (0..config.workers.max(1))
            .map(|worker| {
                tokio::spawn(run_worker(
                    worker,
                    rx.clone(),
                    bus.clone(),
                    breaker.clone(),
                ))
            })
            .collect();

        let publisher = Self {
            tx,
            state: state.clone(),
        };
        (publisher, PublisherWorkers { handles, state })
    }

    /// Queues an event without waiting. A full or closed queue drops it.
    pub fn publish(&self, event: TransactionEvent) {
        if let Err(e) = self.tx.try_send(event) {
            let (reason, event) = match e {
                mpsc::error::TrySendError::Full(ev) => ("queue full", ev),
                mpsc::error::TrySendError::Closed(ev) => ("queue closed", ev),
            };
            tracing::warn!(key = %event.key, reason, "Dropping transaction event");
        }
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.state.get()
    }
}

impl PublisherWorkers {
    pub fn circuit_state(&self) -> CircuitState {
        self.state.get()
    }

    /// Waits for the workers to drain the queue, aborting any still running after `grace`.
    pub async fn join(&mut self, grace: Duration) {
        let mut handles = std::mem::take(&mut self.handles);
        let drained = tokio::time::timeout(grace, async {
            for handle in handles.iter_mut() {
                let _ = handle.await;
            }
        })
        .await;

        if drained.is_err() {
            tracing::warn!("Event workers did not drain in time, aborting");
            for handle in &handles {
                handle.abort();
            }
        }
    }
}

async fn run_worker(
    worker: usize,
    rx: Arc<Mutex<mpsc::Receiver<TransactionEvent>>>,
    bus: Arc<dyn EventBus>,
    breaker: Breaker,
) {
    tracing::debug!(worker, "Event worker started");
    loop {
        let next = { rx.lock().await.recv().await };
        let Some(event) = next else { break };

        let payload = event.payload();
        match breaker.call(bus.publish(&event.key, &payload)).await {
            Ok(()) => tracing::debug!(worker, key = %event.key, "Event published"),
            Err(FailsafeError::Rejected) => {
                tracing::warn!(key = %event.key, "Event bus circuit open, dropping event")
            }
            Err(FailsafeError::Inner(e)) => {
                tracing::error!(key = %event.key, error = %e, "Failed to publish event")
            }
        }
    }
    tracing::debug!(worker, "Event worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use paygate_types::ports::PublishError;
    use paygate_types::{TransactionKind, TransactionStatus};

    fn event(key: &str) -> TransactionEvent {
        TransactionEvent {
            key: key.into(),
            status: Some(TransactionStatus::Pending),
            user_id: "***22".into(),
            amount: "****50".into(),
            kind: TransactionKind::Deposit,
        }
    }

    #[derive(Default)]
    struct Recording {
        seen: std::sync::Mutex<Vec<(String, serde_json::Value)>>,
    }

    #[async_trait]
    impl EventBus for Recording {
        async fn publish(&self, key: &str, payload: &serde_json::Value) -> Result<(), PublishError> {
            self.seen
                .lock()
                .unwrap()
                .push((key.to_string(), payload.clone()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct Down {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl EventBus for Down {
        async fn publish(&self, _key: &str, _payload: &serde_json::Value) -> Result<(), PublishError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(PublishError::Unavailable("broker offline".into()))
        }
    }

    #[tokio::test]
    async fn test_events_are_delivered_in_order() {
        let bus = Arc::new(Recording::default());
        let (publisher, mut workers) = EventPublisher::start(bus.clone(), PublisherConfig::default());

        publisher.publish(event("1"));
        publisher.publish(event("2"));
        drop(publisher);
        workers.join(Duration::from_secs(5)).await;

        let seen = bus.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, "1");
        assert_eq!(seen[1].0, "2");
        assert_eq!(seen[0].1["userId"], "***22");
        assert_eq!(seen[0].1["status"], "pending");
    }

    #[tokio::test]
    async fn test_breaker_opens_after_consecutive_failures() {
        let bus = Arc::new(Down::default());
        let (publisher, mut workers) = EventPublisher::start(
            bus.clone(),
            PublisherConfig {
                failure_threshold: 2,
                cooldown: Duration::from_secs(60),
                ..PublisherConfig::default()
            },
        );
        assert_eq!(publisher.circuit_state(), CircuitState::Closed);

        for key in ["1", "2", "3", "4"] {
            publisher.publish(event(key));
        }
        drop(publisher);
        workers.join(Duration::from_secs(5)).await;

        // Only the first two reach the bus; the rest are rejected by the open breaker.
        assert_eq!(bus.attempts.load(Ordering::SeqCst), 2);
        assert_eq!(workers.circuit_state(), CircuitState::Open);
    }

    /// Fails the first `failures` deliveries, then accepts.
    struct Recovering {
        failures: usize,
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl EventBus for Recovering {
        async fn publish(&self, _key: &str, _payload: &serde_json::Value) -> Result<(), PublishError> {
            let n = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= self.failures {
                return Err(PublishError::Unavailable("broker restarting".into()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_breaker_half_opens_after_cooldown_and_recovers() {
        let bus = Arc::new(Recovering {
            failures: 1,
            attempts: AtomicUsize::new(0),
        });
        let (publisher, mut workers) = EventPublisher::start(
            bus.clone(),
            PublisherConfig {
                failure_threshold: 1,
                cooldown: Duration::from_millis(100),
                ..PublisherConfig::default()
            },
        );

        publisher.publish(event("1"));
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(publisher.circuit_state(), CircuitState::Open);

        // Still cooling down: rejected without reaching the bus.
        publisher.publish(event("2"));
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(bus.attempts.load(Ordering::SeqCst), 1);
        assert_eq!(publisher.circuit_state(), CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(150)).await;
        publisher.publish(event("3"));
        drop(publisher);
        workers.join(Duration::from_secs(5)).await;

        assert_eq!(bus.attempts.load(Ordering::SeqCst), 2);
        assert_eq!(workers.circuit_state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_reading_state_does_not_advance_breaker() {
        let bus = Arc::new(Down::default());
        let (publisher, mut workers) = EventPublisher::start(
            bus.clone(),
            PublisherConfig {
                failure_threshold: 1,
                cooldown: Duration::from_millis(20),
                ..PublisherConfig::default()
            },
        );

        publisher.publish(event("1"));
        tokio::time::sleep(Duration::from_millis(60)).await;

        // Cooldown elapsed, but only a delivery may move the breaker to half-open.
        for _ in 0..3 {
            assert_eq!(publisher.circuit_state(), CircuitState::Open);
        }

        publisher.publish(event("2"));
        drop(publisher);
        workers.join(Duration::from_secs(5)).await;

        // The trial delivery failed, so the breaker is open again.
        assert_eq!(bus.attempts.load(Ordering::SeqCst), 2);
        assert_eq!(workers.circuit_state(), CircuitState::Open);
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking() {
        let bus = Arc::new(Recording::default());
        let (publisher, mut workers) = EventPublisher::start(
            bus.clone(),
            PublisherConfig {
                queue_capacity: 1,
                ..PublisherConfig::default()
            },
        );

        // Current-thread runtime: the worker cannot run until this task yields.
        publisher.publish(event("1"));
        publisher.publish(event("2"));
        publisher.publish(event("3"));
        drop(publisher);
        workers.join(Duration::from_secs(5)).await;

        let seen = bus.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "1");
    }
}
