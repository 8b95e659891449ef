//! Registry of hook executions waiting for the worker.
//!
//! Each entry is keyed by [`HookKey`] and owns the sender half of a oneshot
//! channel. The waiting side holds a [`PendingHook`] guard and races the
//! receiver against the hook timeout.
//!
//! # Lifecycle
//!
//! ```text
//! register ──► PendingHook::wait ──┬─► resolve()       → Ok(())
//!                                  ├─► timeout         → Err(HookTimeout)
//!                                  └─► cancel_owned_by → Err(ConnectionClosed)
//! ```
//!
//! Entries carry a token so that removing an expired entry can never remove a
//! newer registration for the same key.

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{ConnectionId, HookKey};

// ============================================================================
// Types
// ============================================================================

/// One in-flight hook.
struct PendingHookEntry {
    /// Registration token.
    token: u64,
    /// Connection that triggered the hook.
    owner: Option<ConnectionId>,
    /// Wakes the waiter.
    resolver: oneshot::Sender<Result<()>>,
}

/// Map of hook keys to pending entries.
type PendingMap = FxHashMap<HookKey, PendingHookEntry>;

// ============================================================================
// PendingHookRegistry
// ============================================================================

/// Tracks hook executions until the worker resolves them or they time out.
#[derive(Default)]
pub struct PendingHookRegistry {
    entries: Mutex<PendingMap>,
    next_token: AtomicU64,
}

impl PendingHookRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pending hook for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HookAlreadyRunning`] if `key` is still pending.
    pub fn register(&self, key: HookKey, owner: Option<ConnectionId>) -> Result<PendingHook<'_>> {
        let (resolver, rx) = oneshot::channel();
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);

        {
            let mut entries = self.entries.lock();
            if entries.contains_key(&key) {
                return Err(Error::hook_already_running(key));
            }
            entries.insert(
                key.clone(),
                PendingHookEntry {
                    token,
                    owner,
                    resolver,
                },
            );
        }

        trace!(hook = %key, token, "Pending hook registered");

        Ok(PendingHook {
            registry: self,
            key,
            token,
            rx,
        })
    }

    /// Resolves the pending hook for `key`.
    ///
    /// Unknown keys (never registered, timed out, already resolved) are
    /// logged and ignored. Returns `true` if a waiter was signalled.
    pub fn resolve(&self, key: &HookKey) -> bool {
        let Some(entry) = self.entries.lock().remove(key) else {
            warn!(hook = %key, "Tried to resolve hook that didn't exist");
            return false;
        };

        if entry.resolver.send(Ok(())).is_err() {
            debug!(hook = %key, "Hook waiter already gone");
            return false;
        }

        debug!(hook = %key, "Hook resolved");
        true
    }

    /// Fails every hook registered by `owner` with [`Error::ConnectionClosed`].
    ///
    /// Returns the number of hooks failed.
    pub fn cancel_owned_by(&self, owner: ConnectionId) -> usize {
        let cancelled: Vec<_> = {
            let mut entries = self.entries.lock();
            let keys: Vec<_> = entries
                .iter()
                .filter(|(_, entry)| entry.owner == Some(owner))
                .map(|(key, _)| key.clone())
                .collect();
            keys.into_iter()
                .filter_map(|key| entries.remove(&key))
                .collect()
        };

        let count = cancelled.len();
        for entry in cancelled {
            let _ = entry.resolver.send(Err(Error::ConnectionClosed));
        }

        if count > 0 {
            debug!(connection = %owner, count, "Cancelled pending hooks of closed connection");
        }
        count
    }

    /// Fails every pending hook with [`Error::ConnectionClosed`].
    pub fn cancel_all(&self) -> usize {
        let pending: Vec<_> = self.entries.lock().drain().collect();
        let count = pending.len();

        for (_, entry) in pending {
            let _ = entry.resolver.send(Err(Error::ConnectionClosed));
        }

        if count > 0 {
            debug!(count, "Failed pending hooks on shutdown");
        }
        count
    }

    /// Returns `true` if `key` is pending.
    #[inline]
    #[must_use]
    pub fn is_pending(&self, key: &HookKey) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Number of pending hooks.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if nothing is pending.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Removes the entry for `key` only if it still carries `token`.
    fn remove_if(&self, key: &HookKey, token: u64) -> bool {
        let mut entries = self.entries.lock();
        if entries.get(key).is_some_and(|entry| entry.token == token) {
            entries.remove(key);
            return true;
        }
        false
    }
}

// ============================================================================
// PendingHook
// ============================================================================

/// Waiting side of a registered hook.
///
/// Dropping the guard without waiting removes the registration.
pub struct PendingHook<'a> {
    registry: &'a PendingHookRegistry,
    key: HookKey,
    token: u64,
    rx: oneshot::Receiver<Result<()>>,
}

impl PendingHook<'_> {
    /// Key of the pending hook.
    #[inline]
    #[must_use]
    pub fn key(&self) -> &HookKey {
        &self.key
    }

    /// Waits for resolution, failing after `hook_timeout`.
    ///
    /// # Errors
    ///
    /// - [`Error::HookTimeout`] if nothing resolved the hook in time
    /// - [`Error::ConnectionClosed`] if the hook was cancelled
    pub async fn wait(mut self, hook_timeout: Duration) -> Result<()> {
        match timeout(hook_timeout, &mut self.rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::ConnectionClosed),
            Err(_) => {
                if self.registry.remove_if(&self.key, self.token) {
                    warn!(
                        hook = %self.key,
                        timeout_ms = hook_timeout.as_millis() as u64,
                        "Hook execution timed out"
                    );
                    return Err(Error::hook_timeout(
                        self.key.clone(),
                        hook_timeout.as_millis() as u64,
                    ));
                }

                // Resolved between the timer firing and the removal.
                match self.rx.try_recv() {
                    Ok(result) => result,
                    Err(_) => Err(Error::hook_timeout(
                        self.key.clone(),
                        hook_timeout.as_millis() as u64,
                    )),
                }
            }
        }
    }
}

impl Drop for PendingHook<'_> {
    fn drop(&mut self) {
        if self.registry.remove_if(&self.key, self.token) {
            trace!(hook = %self.key, "Abandoned pending hook removed");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
