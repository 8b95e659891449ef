//! Builder pattern for runner configuration.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use browser_runner_socket::{HandlePool, RunnerBuilder, SessionMap};
//!
//! # async fn example() -> browser_runner_socket::Result<()> {
//! let server = RunnerBuilder::new()
//!     .sessions(Arc::new(SessionMap::new()))
//!     .handles(Arc::new(HandlePool::new()))
//!     .bind()
//!     .await?;
//!
//! println!("browser socket at {}", server.ws_url());
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::session::{HandleRegistry, SessionDirectory};
use crate::transport::SocketServer;

use super::command::CommandProxy;
use super::console::{ConsoleRelay, ConsoleSink, TracingSink};
use super::events::EventEmitter;
use super::hooks::HookCoordinator;
use super::options::RunnerOptions;
use super::pending::PendingHookRegistry;
use super::router::MessageRouter;

// ============================================================================
// RunnerBuilder
// ============================================================================

/// Builder wiring collaborators and options into a [`MessageRouter`].
#[derive(Default)]
pub struct RunnerBuilder {
    options: RunnerOptions,
    sessions: Option<Arc<dyn SessionDirectory>>,
    handles: Option<Arc<dyn HandleRegistry>>,
    console_sink: Option<Arc<dyn ConsoleSink>>,
}

impl RunnerBuilder {
    /// Creates a builder with default options and no collaborators.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the runner options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: RunnerOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the directory resolving hook sessions.
    #[inline]
    #[must_use]
    pub fn sessions(mut self, sessions: Arc<dyn SessionDirectory>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    /// Sets the registry resolving automation handles.
    #[inline]
    #[must_use]
    pub fn handles(mut self, handles: Arc<dyn HandleRegistry>) -> Self {
        self.handles = Some(handles);
        self
    }

    /// Sets where console output goes. Defaults to [`TracingSink`].
    #[inline]
    #[must_use]
    pub fn console_sink(mut self, sink: Arc<dyn ConsoleSink>) -> Self {
        self.console_sink = Some(sink);
        self
    }

    /// Builds the router with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if sessions or handles are not set
    /// - [`Error::Config`] if the options are invalid
    pub fn build(self) -> Result<Arc<MessageRouter>> {
        self.options.validate()?;

        let sessions = self.sessions.ok_or_else(|| {
            Error::config("A session directory is required. Use .sessions() to set it.")
        })?;
        let handles = self.handles.ok_or_else(|| {
            Error::config("A handle registry is required. Use .handles() to set it.")
        })?;
        let sink = self.console_sink.unwrap_or_else(|| Arc::new(TracingSink));

        let events = EventEmitter::new(self.options.event_capacity);
        let console = ConsoleRelay::new(sink, self.options.internal_log_marker.clone());
        let hooks = HookCoordinator::new(
            sessions,
            Arc::new(PendingHookRegistry::new()),
            events.clone(),
            self.options.hook_timeout,
        );
        let commands =
            CommandProxy::new(handles, events.clone(), self.options.debug_command.clone());

        Ok(Arc::new(MessageRouter::new(
            console,
            hooks,
            commands,
            events,
            self.options.cancel_hooks_on_disconnect,
        )))
    }

    /// Builds the router and binds the socket server.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] as for [`build`](Self::build)
    /// - [`Error::Io`] if binding fails
    pub async fn bind(self) -> Result<Arc<SocketServer>> {
        let ip = self.options.bind_ip;
        let port = self.options.port;
        let router = self.build()?;
        SocketServer::bind(router, ip, port).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use crate::session::{HandlePool, SessionMap};

    #[test]
    fn test_build_requires_sessions() {
        let err = RunnerBuilder::new()
            .handles(Arc::new(HandlePool::new()))
            .build()
            .err()
            .expect("missing sessions");
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains(".sessions()"));
    }

    #[test]
    fn test_build_requires_handles() {
        let err = RunnerBuilder::new()
            .sessions(Arc::new(SessionMap::new()))
            .build()
            .err()
            .expect("missing handles");
        assert!(err.to_string().contains(".handles()"));
    }

    #[test]
    fn test_build_rejects_invalid_options() {
        let result = RunnerBuilder::new()
            .options(RunnerOptions::new().with_hook_timeout(Duration::ZERO))
            .sessions(Arc::new(SessionMap::new()))
            .handles(Arc::new(HandlePool::new()))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_build_ok() {
        let router = RunnerBuilder::new()
            .sessions(Arc::new(SessionMap::new()))
            .handles(Arc::new(HandlePool::new()))
            .build()
            .expect("router");
        assert_eq!(router.hooks().pending_count(), 0);
    }
}
