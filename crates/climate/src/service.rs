//! Controller Service
//!
//! The ingress worker: a long-running task that listens on the message bus,
//! decodes sensor and set-point payloads and drives the shared climate state.
//! Malformed payloads are logged and dropped here; they never reach the state.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;

use climate_engine::{Decision, SharedClimate, TopicConfig};

use crate::bus::{Message, MessageBus};

// ─────────────────────────────────────────────────────────────────────────────
// Service Error
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur during the worker lifecycle
#[derive(Debug, Clone, thiserror::Error)]
pub enum ServiceError {
    #[error("Message bus closed")]
    ChannelClosed,

    #[error("Shutdown timeout")]
    ShutdownTimeout,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

// ─────────────────────────────────────────────────────────────────────────────
// Worker State
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle of the ingress worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    /// Subscribed to the bus; the task has not been polled yet
    Starting = 0,
    /// Consuming readings and set-points
    Listening = 1,
    /// Shutdown requested, waiting for the loop to exit
    Stopping = 2,
    /// Loop exited after a shutdown request
    Stopped = 3,
    /// Every bus sender is gone, nothing more can arrive
    BusClosed = 4,
    /// The task panicked
    Crashed = 5,
}

impl WorkerState {
    fn load(cell: &AtomicU8) -> Self {
        match cell.load(Ordering::SeqCst) {
            0 => Self::Starting,
            1 => Self::Listening,
            2 => Self::Stopping,
            3 => Self::Stopped,
            4 => Self::BusClosed,
            _ => Self::Crashed,
        }
    }

    fn store(self, cell: &AtomicU8) {
        cell.store(self as u8, Ordering::SeqCst);
    }

    /// Whether the worker has exited for good
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkerState::Stopped | WorkerState::BusClosed | WorkerState::Crashed
        )
    }

    pub fn is_listening(&self) -> bool {
        *self == WorkerState::Listening
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WorkerState::Starting => "starting",
            WorkerState::Listening => "listening",
            WorkerState::Stopping => "stopping",
            WorkerState::Stopped => "stopped",
            WorkerState::BusClosed => "bus closed",
            WorkerState::Crashed => "crashed",
        };
        f.write_str(name)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Ingress Statistics
// ─────────────────────────────────────────────────────────────────────────────

/// Counters for what the ingress boundary did with each message
#[derive(Debug, Default)]
pub struct IngressStats {
    accepted: AtomicU64,
    rejected: AtomicU64,
    lagged: AtomicU64,
}

impl IngressStats {
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Messages lost because the worker fell behind the bus
    pub fn lagged(&self) -> u64 {
        self.lagged.load(Ordering::Relaxed)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Controller Service
// ─────────────────────────────────────────────────────────────────────────────

/// Ingress worker feeding bus messages into the [`SharedClimate`]
pub struct ControllerService {
    shared: SharedClimate,
    bus: MessageBus,
    topics: TopicConfig,
    reevaluate_interval: Option<Duration>,
    stats: Arc<IngressStats>,
}

impl ControllerService {
    pub fn new(shared: SharedClimate, bus: MessageBus, topics: TopicConfig) -> Self {
        Self {
            shared,
            bus,
            topics,
            reevaluate_interval: None,
            stats: Arc::new(IngressStats::default()),
        }
    }

    /// Re-run the decision cycle periodically so expired dwell holds are
    /// released even when no new readings arrive
    pub fn with_reevaluate_interval(mut self, interval: Duration) -> Self {
        self.reevaluate_interval = Some(interval);
        self
    }

    pub fn stats(&self) -> Arc<IngressStats> {
        Arc::clone(&self.stats)
    }

    /// Decode one bus message and, if valid, run a decision cycle.
    ///
    /// Messages the controller published itself and non-input topics are
    /// ignored. Invalid payloads are logged and dropped.
    pub fn handle_message(&self, message: &Message) -> Option<Decision> {
        if message.is_own() || !self.topics.is_input(&message.topic) {
            return None;
        }

        match self.topics.decode(&message.topic, &message.payload) {
            Ok(input) => {
                self.stats.accepted.fetch_add(1, Ordering::Relaxed);
                tracing::info!(topic = %message.topic, source = %message.source, "Updated {}", input);
                self.shared.submit(input)
            }
            Err(e) => {
                self.stats.rejected.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    topic = %message.topic,
                    source = %message.source,
                    payload = %String::from_utf8_lossy(&message.payload),
                    error = %e,
                    "Invalid payload received, dropping"
                );
                None
            }
        }
    }

    /// Subscribe to the bus and run the worker on the tokio runtime
    pub fn spawn(self) -> ControllerHandle {
        let state = Arc::new(AtomicU8::new(WorkerState::Starting as u8));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        // subscribe before spawning so nothing published after this call is missed
        let rx = self.bus.subscribe();
        let stats = self.stats();

        let join_handle = tokio::spawn(run_ingress_loop(self, rx, shutdown_rx, Arc::clone(&state)));

        ControllerHandle {
            state,
            stats,
            shutdown_tx,
            join_handle,
        }
    }
}

/// Main worker loop
async fn run_ingress_loop(
    service: ControllerService,
    mut rx: broadcast::Receiver<Message>,
    mut shutdown_rx: oneshot::Receiver<()>,
    state: Arc<AtomicU8>,
) -> ServiceResult<()> {
    WorkerState::Listening.store(&state);
    tracing::info!(
        topics = ?service.topics.inputs(),
        "Controller service started"
    );

    let mut tick_timer = service.reevaluate_interval.map(tokio::time::interval);

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                tracing::debug!("Received shutdown signal");
                break;
            }

            received = rx.recv() => match received {
                Ok(message) => {
                    service.handle_message(&message);
                }
                Err(RecvError::Lagged(skipped)) => {
                    service.stats.lagged.fetch_add(skipped, Ordering::Relaxed);
                    tracing::warn!(skipped, "Ingress fell behind the bus, messages dropped");
                }
                Err(RecvError::Closed) => {
                    tracing::warn!("Message bus closed");
                    WorkerState::BusClosed.store(&state);
                    return Err(ServiceError::ChannelClosed);
                }
            },

            _ = async {
                if let Some(ref mut timer) = tick_timer {
                    timer.tick().await
                } else {
                    std::future::pending::<tokio::time::Instant>().await
                }
            } => {
                service.shared.reevaluate();
            }
        }
    }

    WorkerState::Stopped.store(&state);
    tracing::info!("Controller service stopped");
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Controller Handle
// ─────────────────────────────────────────────────────────────────────────────

/// Handle to the running ingress worker
pub struct ControllerHandle {
    state: Arc<AtomicU8>,
    stats: Arc<IngressStats>,
    shutdown_tx: oneshot::Sender<()>,
    join_handle: JoinHandle<ServiceResult<()>>,
}

impl ControllerHandle {
    pub fn state(&self) -> WorkerState {
        WorkerState::load(&self.state)
    }

    pub fn is_listening(&self) -> bool {
        self.state().is_listening()
    }

    pub fn stats(&self) -> Arc<IngressStats> {
        Arc::clone(&self.stats)
    }

    /// Stop the worker and wait for it to finish
    pub async fn shutdown(self, timeout: Duration) -> ServiceResult<()> {
        if !self.state().is_terminal() {
            WorkerState::Stopping.store(&self.state);
        }
        // the worker may already have exited on its own
        let _ = self.shutdown_tx.send(());

        match tokio::time::timeout(timeout, self.join_handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                WorkerState::Crashed.store(&self.state);
                tracing::error!(error = ?e, "Controller task panicked");
                Err(ServiceError::Internal(format!("Task panicked: {:?}", e)))
            }
            Err(_) => {
                tracing::warn!(state = %WorkerState::load(&self.state), "Controller shutdown timed out");
                Err(ServiceError::ShutdownTimeout)
            }
        }
    }
}

impl std::fmt::Debug for ControllerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerHandle")
            .field("state", &self.state())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
