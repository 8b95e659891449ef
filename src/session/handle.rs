//! Automation handles and the pool resolving them by cid.
//!
//! Commands arrive by name from the browser. Instead of reflecting on the
//! handle, every handle exposes an explicit capability table; names without
//! an entry fail with [`Error::UnsupportedCommand`].
//!
//! # Pending handles
//!
//! Handles are created asynchronously by session bootstrapping. A cid can be
//! [`reserve`](HandlePool::reserve)d before its handle exists so lookups wait
//! for [`insert`](HandlePool::insert) instead of failing.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::debug;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default wait for a reserved cid to receive its handle.
pub const DEFAULT_HANDLE_WAIT: Duration = Duration::from_secs(30);

// ============================================================================
// Traits
// ============================================================================

/// A server-held automation session able to run named operations.
#[async_trait]
pub trait AutomationHandle: Send + Sync {
    /// Invokes `command` with `args`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedCommand`] for unknown names, or whatever
    /// the operation itself fails with.
    async fn invoke(&self, command: &str, args: Vec<Value>) -> Result<Value>;
}

/// Resolves the [`AutomationHandle`] for a cid.
#[async_trait]
pub trait HandleRegistry: Send + Sync {
    /// Returns the handle for `cid`. May wait while the handle is created.
    async fn get(&self, cid: &str) -> Option<Arc<dyn AutomationHandle>>;
}

// ============================================================================
// CommandTable
// ============================================================================

/// A single async command implementation.
pub type CommandFn = Arc<dyn Fn(Vec<Value>) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

/// [`AutomationHandle`] backed by a name → implementation table.
#[derive(Default, Clone)]
pub struct CommandTable {
    commands: FxHashMap<String, CommandFn>,
}

impl CommandTable {
    /// Creates an empty table.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `command`, replacing any previous implementation.
    #[must_use]
    pub fn with_command<F>(mut self, command: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> BoxFuture<'static, Result<Value>> + Send + Sync + 'static,
    {
        self.commands.insert(command.into(), Arc::new(f));
        self
    }

    /// Returns `true` if `command` is supported.
    #[inline]
    #[must_use]
    pub fn supports(&self, command: &str) -> bool {
        self.commands.contains_key(command)
    }
}

impl fmt::Debug for CommandTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandTable")
            .field("commands", &self.commands.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[async_trait]
impl AutomationHandle for CommandTable {
    async fn invoke(&self, command: &str, args: Vec<Value>) -> Result<Value> {
        let f = self
            .commands
            .get(command)
            .cloned()
            .ok_or_else(|| Error::unsupported_command(command))?;
        f(args).await
    }
}

// ============================================================================
// HandlePool
// ============================================================================

/// Waiters for cids whose handle is still being created.
type WaiterMap = FxHashMap<String, Vec<oneshot::Sender<Arc<dyn AutomationHandle>>>>;

/// In-memory [`HandleRegistry`] with support for pending handles.
pub struct HandlePool {
    /// Ready handles by cid.
    handles: RwLock<FxHashMap<String, Arc<dyn AutomationHandle>>>,
    /// Reserved cids and the lookups waiting on them.
    waiters: Mutex<WaiterMap>,
    /// Upper bound for waiting on a reserved cid.
    wait_timeout: Duration,
}

impl Default for HandlePool {
    fn default() -> Self {
        Self::with_wait_timeout(DEFAULT_HANDLE_WAIT)
    }
}

impl HandlePool {
    /// Creates an empty pool with the default wait timeout.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty pool with a custom wait timeout.
    #[must_use]
    pub fn with_wait_timeout(wait_timeout: Duration) -> Self {
        Self {
            handles: RwLock::new(FxHashMap::default()),
            waiters: Mutex::new(FxHashMap::default()),
            wait_timeout,
        }
    }

    /// Marks `cid` as pending so lookups wait for its handle.
    pub fn reserve(&self, cid: impl Into<String>) {
        self.waiters.lock().entry(cid.into()).or_default();
    }

    /// Stores the handle for `cid` and wakes pending lookups.
    pub fn insert(&self, cid: impl Into<String>, handle: Arc<dyn AutomationHandle>) {
        let cid = cid.into();

        // Lock order: waiters, then handles.
        let waiting = {
            let mut waiters = self.waiters.lock();
            self.handles.write().insert(cid.clone(), Arc::clone(&handle));
            waiters.remove(&cid).unwrap_or_default()
        };

        if !waiting.is_empty() {
            debug!(cid = %cid, count = waiting.len(), "Waking handle lookups");
        }
        for tx in waiting {
            let _ = tx.send(Arc::clone(&handle));
        }
    }

    /// Removes the handle and any reservation for `cid`.
    pub fn remove(&self, cid: &str) -> Option<Arc<dyn AutomationHandle>> {
        let mut waiters = self.waiters.lock();
        waiters.remove(cid);
        self.handles.write().remove(cid)
    }

    /// Number of ready handles.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.read().len()
    }

    /// Returns `true` if no handle is ready.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.read().is_empty()
    }
}

#[async_trait]
impl HandleRegistry for HandlePool {
    async fn get(&self, cid: &str) -> Option<Arc<dyn AutomationHandle>> {
        let rx = {
            let mut waiters = self.waiters.lock();
            if let Some(handle) = self.handles.read().get(cid) {
                return Some(Arc::clone(handle));
            }

            let pending = waiters.get_mut(cid)?;
            let (tx, rx) = oneshot::channel();
            pending.push(tx);
            rx
        };

        match timeout(self.wait_timeout, rx).await {
            Ok(Ok(handle)) => Some(handle),
            Ok(Err(_)) => {
                debug!(cid, "Handle reservation dropped");
                None
            }
            Err(_) => {
                // The receiver is gone, so its sender reports closed.
                self.prune_waiters(cid);
                debug!(
                    cid,
                    timeout_ms = self.wait_timeout.as_millis() as u64,
                    "Handle wait timed out"
                );
                None
            }
        }
    }
}

impl HandlePool {
    /// Drops senders whose lookup has given up.
    fn prune_waiters(&self, cid: &str) {
        if let Some(pending) = self.waiters.lock().get_mut(cid) {
            pending.retain(|tx| !tx.is_closed());
        }
    }

    /// Number of lookups waiting on `cid`.
    #[cfg(test)]
    fn waiting(&self, cid: &str) -> usize {
        self.waiters.lock().get(cid).map_or(0, Vec::len)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    fn echo_table() -> CommandTable {
        CommandTable::new().with_command("echo", |args| {
            Box::pin(async move { Ok(Value::Array(args)) })
        })
    }

    #[tokio::test]
    async fn test_command_table_invoke() {
        let table = echo_table();
        assert!(table.supports("echo"));

        let result = table.invoke("echo", vec![json!(1)]).await.expect("echo");
        assert_eq!(result, json!([1]));
    }

    #[tokio::test]
    async fn test_command_table_unsupported() {
        let err = echo_table().invoke("hover", vec![]).await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedCommand { .. }));
    }

    #[tokio::test]
    async fn test_pool_unknown_cid_is_none() {
        let pool = HandlePool::new();
        assert!(pool.get("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_pool_ready_handle() {
        let pool = HandlePool::new();
        pool.insert("0-0", Arc::new(echo_table()));
        assert_eq!(pool.len(), 1);
        assert!(pool.get("0-0").await.is_some());
    }

    #[tokio::test]
    async fn test_pool_waits_for_reserved_handle() {
        let pool = Arc::new(HandlePool::new());
        pool.reserve("0-0");

        let lookup = {
            let pool = Arc::clone(&pool);
            tokio::spawn(async move { pool.get("0-0").await.is_some() })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        pool.insert("0-0", Arc::new(echo_table()));

        assert!(lookup.await.expect("join"));
    }

    #[tokio::test]
    async fn test_pool_reserved_handle_times_out() {
        let pool = HandlePool::with_wait_timeout(Duration::from_millis(20));
        pool.reserve("0-0");
        assert!(pool.get("0-0").await.is_none());
    }

    #[tokio::test]
    async fn test_pool_timed_out_lookups_are_released() {
        let pool = HandlePool::with_wait_timeout(Duration::from_millis(20));
        pool.reserve("0-0");

        for _ in 0..3 {
            assert!(pool.get("0-0").await.is_none());
        }
        assert_eq!(pool.waiting("0-0"), 0);

        // The reservation itself survives.
        pool.insert("0-0", Arc::new(echo_table()));
        assert!(pool.get("0-0").await.is_some());
    }

    #[tokio::test]
    async fn test_pool_remove_cancels_reservation() {
        let pool = Arc::new(HandlePool::new());
        pool.reserve("0-0");

        let lookup = {
            let pool = Arc::clone(&pool);
            tokio::spawn(async move { pool.get("0-0").await.is_none() })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(pool.remove("0-0").is_none());

        assert!(lookup.await.expect("join"));
        assert!(pool.is_empty());
    }
}
