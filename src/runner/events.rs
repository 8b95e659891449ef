//! Signals emitted to the orchestrator.
//!
//! The worker process is not reachable from here; the orchestrator picks
//! these signals up and relays them.
//!
//! | Signal | Channel | Delivery |
//! |--------|---------|----------|
//! | Worker hook execution | unbounded `mpsc`, one receiver | every request, in order |
//! | [`RunnerEvent`] | `broadcast`, any subscribers | latest `capacity` per subscriber |
//!
//! Hook requests must reach the worker or the hook times out, so they never
//! share the bounded broadcast ring.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tracing::{trace, warn};

use crate::protocol::HookTriggerEvent;

// ============================================================================
// RunnerEvent
// ============================================================================

/// Outbound notification for external listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum RunnerEvent {
    /// Debug state of the worker toggled.
    DebugState(bool),
}

// ============================================================================
// WorkerHooks
// ============================================================================

/// Receiving side of worker hook execution requests.
///
/// Run each hook in the worker, then call `resolve_hook` with the event.
pub type WorkerHooks = mpsc::UnboundedReceiver<HookTriggerEvent>;

// ============================================================================
// EventEmitter
// ============================================================================

/// Emits worker hook requests and [`RunnerEvent`]s.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    tx: broadcast::Sender<RunnerEvent>,
    worker_tx: mpsc::UnboundedSender<HookTriggerEvent>,
    worker_rx: Arc<Mutex<Option<WorkerHooks>>>,
}

impl EventEmitter {
    /// Creates an emitter buffering `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        let (worker_tx, worker_rx) = mpsc::unbounded_channel();
        Self {
            tx,
            worker_tx,
            worker_rx: Arc::new(Mutex::new(Some(worker_rx))),
        }
    }

    /// Subscribes to events emitted from now on.
    #[inline]
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RunnerEvent> {
        self.tx.subscribe()
    }

    /// Emits an event. Having no subscriber is not an error.
    pub fn emit(&self, event: RunnerEvent) {
        if self.tx.send(event).is_err() {
            trace!("Runner event dropped, no subscribers");
        }
    }

    /// Takes the worker hook receiver.
    ///
    /// There is exactly one receiver; later calls return `None`. Requests
    /// made before it is taken are buffered.
    #[must_use]
    pub fn take_worker_hooks(&self) -> Option<WorkerHooks> {
        self.worker_rx.lock().take()
    }

    /// Asks the worker to run the hook described by `event`.
    pub fn request_worker_hook(&self, event: HookTriggerEvent) {
        if self.worker_tx.send(event).is_err() {
            warn!("Worker hook receiver dropped, hook will time out");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
