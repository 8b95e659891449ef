//! Hook coordinator.
//!
//! A hook trigger runs the session's host-side hook functions and, in
//! parallel, asks the worker process to run its part. The worker branch only
//! gates the reply: the browser gets one combined result after both settle.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::identifiers::{ConnectionId, HookKey};
use crate::protocol::{HookResultEvent, HookTriggerEvent};
use crate::session::SessionDirectory;

use super::events::{EventEmitter, WorkerHooks};
use super::pending::PendingHookRegistry;

// ============================================================================
// HookCoordinator
// ============================================================================

/// Runs hooks locally and in the worker, and correlates worker resolutions.
#[derive(Clone)]
pub struct HookCoordinator {
    sessions: Arc<dyn SessionDirectory>,
    pending: Arc<PendingHookRegistry>,
    events: EventEmitter,
    hook_timeout: Duration,
}

impl HookCoordinator {
    /// Creates a coordinator.
    #[must_use]
    pub fn new(
        sessions: Arc<dyn SessionDirectory>,
        pending: Arc<PendingHookRegistry>,
        events: EventEmitter,
        hook_timeout: Duration,
    ) -> Self {
        Self {
            sessions,
            pending,
            events,
            hook_timeout,
        }
    }

    /// Handles a hook trigger and returns the result to send back.
    ///
    /// Missing sessions and hook failures are reported inside the result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HookAlreadyRunning`] if the same `(cid, id)` is still
    /// waiting for the worker. Nothing is executed in that case.
    pub async fn handle_hook(
        &self,
        owner: Option<ConnectionId>,
        event: HookTriggerEvent,
    ) -> Result<HookResultEvent> {
        let Some(session) = self.sessions.lookup(&event.cid).await else {
            let error = Error::session_not_found(&event.cid);
            warn!(cid = %event.cid, hook = %event.name, "No session for hook trigger");
            return Ok(HookResultEvent::failure(event, &error));
        };

        let pending = self.pending.register(event.key(), owner)?;

        let local = session.run_hook(&event.name, &event.args);
        let worker = async {
            self.events.request_worker_hook(event.clone());
            pending.wait(self.hook_timeout).await
        };

        let (local_result, worker_result) = tokio::join!(local, worker);

        if let Err(ref e) = worker_result {
            warn!(
                hook = %event.key(),
                name = %event.name,
                error = %e,
                "Worker hook did not complete"
            );
        }

        // Local failure wins; worker payloads are never forwarded.
        let result = match (local_result, worker_result) {
            (Err(e), _) | (Ok(()), Err(e)) => HookResultEvent::failure(event, &e),
            (Ok(()), Ok(())) => HookResultEvent::success(event),
        };

        debug!(hook = %result.event.key(), failed = result.is_error(), "Hook handled");
        Ok(result)
    }

    /// Marks the worker side of a hook as done.
    ///
    /// Unknown or already settled hooks are logged and ignored.
    pub fn resolve_hook(&self, result: &HookTriggerEvent) {
        self.pending.resolve(&result.key());
    }

    /// Takes the receiver of worker hook execution requests.
    ///
    /// Returns `None` once taken. See [`EventEmitter::take_worker_hooks`].
    #[must_use]
    pub fn take_worker_hooks(&self) -> Option<WorkerHooks> {
        self.events.take_worker_hooks()
    }

    /// Returns `true` if the worker side of `key` is still outstanding.
    #[inline]
    #[must_use]
    pub fn is_pending(&self, key: &HookKey) -> bool {
        self.pending.is_pending(key)
    }

    /// Number of hooks waiting for the worker.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Fails the pending hooks triggered over `connection`.
    pub fn cancel_owned_by(&self, connection: ConnectionId) -> usize {
        self.pending.cancel_owned_by(connection)
    }

    /// Fails every pending hook.
    pub fn cancel_all(&self) -> usize {
        self.pending.cancel_all()
    }
}

// ============================================================================
// Tests
// ============================================================================
