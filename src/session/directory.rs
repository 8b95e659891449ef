//! Hook sessions and the directory resolving them by cid.
//!
//! A [`Session`] bundles the host-side hook functions configured for one
//! browser session. The runner only looks sessions up; it never mutates them.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};

// ============================================================================
// Traits
// ============================================================================

/// Host-side hook configuration of one browser session.
#[async_trait]
pub trait Session: Send + Sync {
    /// Runs every hook function registered under `name` with `args`.
    ///
    /// # Errors
    ///
    /// Returns the first hook failure.
    async fn run_hook(&self, name: &str, args: &[Value]) -> Result<()>;
}

/// Resolves the [`Session`] that owns a cid.
#[async_trait]
pub trait SessionDirectory: Send + Sync {
    /// Returns the session for `cid`, if one is registered.
    async fn lookup(&self, cid: &str) -> Option<Arc<dyn Session>>;
}

// ============================================================================
// HookFn
// ============================================================================

/// A single async hook function.
pub type HookFn = Arc<dyn Fn(Vec<Value>) -> BoxFuture<'static, Result<()>> + Send + Sync>;

// ============================================================================
// HookSession
// ============================================================================

/// In-memory [`Session`] holding named lists of hook functions.
///
/// # Example
///
/// ```ignore
/// let session = HookSession::new().with_hook("beforeTest", |args| {
///     Box::pin(async move { Ok(()) })
/// });
/// ```
#[derive(Default, Clone)]
pub struct HookSession {
    hooks: FxHashMap<String, Vec<HookFn>>,
}

impl HookSession {
    /// Creates a session with no hooks.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a hook function under `name`.
    #[must_use]
    pub fn with_hook<F>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        F: Fn(Vec<Value>) -> BoxFuture<'static, Result<()>> + Send + Sync + 'static,
    {
        self.hooks.entry(name.into()).or_default().push(Arc::new(hook));
        self
    }

    /// Number of hook functions registered under `name`.
    #[inline]
    #[must_use]
    pub fn hook_count(&self, name: &str) -> usize {
        self.hooks.get(name).map_or(0, Vec::len)
    }
}

impl fmt::Debug for HookSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookSession")
            .field("hooks", &self.hooks.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[async_trait]
impl Session for HookSession {
    async fn run_hook(&self, name: &str, args: &[Value]) -> Result<()> {
        let Some(hooks) = self.hooks.get(name) else {
            return Ok(());
        };

        // Every hook runs; the first failure is the one reported.
        let mut first_error: Option<Error> = None;
        for (index, hook) in hooks.iter().enumerate() {
            if let Err(e) = hook(args.to_vec()).await {
                warn!(hook = name, index, error = %e, "Hook function failed");
                first_error.get_or_insert(e);
            }
        }

        debug!(hook = name, count = hooks.len(), "Hook functions executed");

        first_error.map_or(Ok(()), Err)
    }
}

// ============================================================================
// SessionMap
// ============================================================================

/// In-memory [`SessionDirectory`] keyed by cid.
#[derive(Default)]
pub struct SessionMap {
    sessions: RwLock<FxHashMap<String, Arc<dyn Session>>>,
}

impl SessionMap {
    /// Creates an empty directory.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the session for `cid`.
    pub fn insert(&self, cid: impl Into<String>, session: Arc<dyn Session>) {
        self.sessions.write().insert(cid.into(), session);
    }

    /// Removes the session for `cid`.
    pub fn remove(&self, cid: &str) -> Option<Arc<dyn Session>> {
        self.sessions.write().remove(cid)
    }

    /// Number of registered sessions.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Returns `true` if no sessions are registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

#[async_trait]
impl SessionDirectory for SessionMap {
    async fn lookup(&self, cid: &str) -> Option<Arc<dyn Session>> {
        self.sessions.read().get(cid).cloned()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    #[tokio::test]
    async fn test_run_hook_without_functions_succeeds() {
        let session = HookSession::new();
        session.run_hook("beforeTest", &[]).await.expect("no hooks");
    }

    #[tokio::test]
    async fn test_run_hook_passes_args() {
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = Arc::clone(&seen);

        let session = HookSession::new().with_hook("afterTest", move |args| {
            let seen = Arc::clone(&seen_clone);
            Box::pin(async move {
                seen.store(args.len(), Ordering::SeqCst);
                Ok(())
            })
        });

        session
            .run_hook("afterTest", &[json!(1), json!("two")])
            .await
            .expect("hook ok");
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_run_hook_runs_all_and_reports_first_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (a, b, c) = (Arc::clone(&calls), Arc::clone(&calls), Arc::clone(&calls));

        let session = HookSession::new()
            .with_hook("beforeTest", move |_| {
                a.fetch_add(1, Ordering::SeqCst);
                Box::pin(async { Err(Error::hook_failed("first")) })
            })
            .with_hook("beforeTest", move |_| {
                b.fetch_add(1, Ordering::SeqCst);
                Box::pin(async { Err(Error::hook_failed("second")) })
            })
            .with_hook("beforeTest", move |_| {
                c.fetch_add(1, Ordering::SeqCst);
                Box::pin(async { Ok(()) })
            });

        assert_eq!(session.hook_count("beforeTest"), 3);

        let err = session.run_hook("beforeTest", &[]).await.unwrap_err();
        assert_eq!(err.to_string(), "first");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_session_map_lookup() {
        let map = SessionMap::new();
        assert!(map.is_empty());

        map.insert("0-0", Arc::new(HookSession::new()));
        assert_eq!(map.len(), 1);
        assert!(map.lookup("0-0").await.is_some());
        assert!(map.lookup("0-1").await.is_none());

        assert!(map.remove("0-0").is_some());
        assert!(map.lookup("0-0").await.is_none());
    }
}
