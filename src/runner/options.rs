//! Runner configuration.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use browser_runner_socket::RunnerOptions;
//!
//! let options = RunnerOptions::new()
//!     .with_port(0)
//!     .with_hook_timeout(Duration::from_secs(5))
//!     .with_cancel_hooks_on_disconnect();
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// How long a worker has to resolve a hook.
pub const DEFAULT_HOOK_TIMEOUT: Duration = Duration::from_secs(15);

/// Prefix marking the framework's own console output.
pub const DEFAULT_INTERNAL_LOG_MARKER: &str = "[WDIO]";

/// Command that toggles the worker's debug state.
pub const DEFAULT_DEBUG_COMMAND: &str = "debug";

/// Capacity of the runner event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

// ============================================================================
// RunnerOptions
// ============================================================================

/// Options controlling the socket server and the message handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerOptions {
    /// Address the socket server binds to.
    pub bind_ip: IpAddr,

    /// Port to bind (0 = random).
    pub port: u16,

    /// Bound on waiting for a worker to resolve a hook.
    pub hook_timeout: Duration,

    /// Console lines starting with this marker are not forwarded.
    pub internal_log_marker: String,

    /// Command name that toggles debug state around its execution.
    pub debug_command: String,

    /// Fail a connection's pending hooks as soon as it closes.
    pub cancel_hooks_on_disconnect: bool,

    /// Buffered runner events per subscriber.
    pub event_capacity: usize,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl RunnerOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            bind_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            hook_timeout: DEFAULT_HOOK_TIMEOUT,
            internal_log_marker: DEFAULT_INTERNAL_LOG_MARKER.to_string(),
            debug_command: DEFAULT_DEBUG_COMMAND.to_string(),
            cancel_hooks_on_disconnect: false,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl RunnerOptions {
    /// Sets the bind address.
    #[inline]
    #[must_use]
    pub fn with_bind_ip(mut self, ip: IpAddr) -> Self {
        self.bind_ip = ip;
        self
    }

    /// Sets the port.
    #[inline]
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the hook timeout.
    #[inline]
    #[must_use]
    pub fn with_hook_timeout(mut self, timeout: Duration) -> Self {
        self.hook_timeout = timeout;
        self
    }

    /// Sets the internal log marker.
    #[inline]
    #[must_use]
    pub fn with_internal_log_marker(mut self, marker: impl Into<String>) -> Self {
        self.internal_log_marker = marker.into();
        self
    }

    /// Sets the debug command name.
    #[inline]
    #[must_use]
    pub fn with_debug_command(mut self, command: impl Into<String>) -> Self {
        self.debug_command = command.into();
        self
    }

    /// Fails pending hooks of a connection when it closes.
    #[inline]
    #[must_use]
    pub fn with_cancel_hooks_on_disconnect(mut self) -> Self {
        self.cancel_hooks_on_disconnect = true;
        self
    }

    /// Sets the event channel capacity.
    #[inline]
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl RunnerOptions {
    /// Checks the options for values the runner cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first invalid option.
    pub fn validate(&self) -> Result<()> {
        if self.hook_timeout.is_zero() {
            return Err(Error::config("hook_timeout must be greater than zero"));
        }
        if self.internal_log_marker.is_empty() {
            return Err(Error::config("internal_log_marker must not be empty"));
        }
        if self.debug_command.is_empty() {
            return Err(Error::config("debug_command must not be empty"));
        }
        if self.event_capacity == 0 {
            return Err(Error::config("event_capacity must be greater than zero"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = RunnerOptions::default();
        assert_eq!(options.hook_timeout.as_secs(), 15);
        assert_eq!(options.port, 0);
        assert_eq!(options.internal_log_marker, "[WDIO]");
        assert_eq!(options.debug_command, "debug");
        assert!(!options.cancel_hooks_on_disconnect);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_builder_chain() {
        let options = RunnerOptions::new()
            .with_port(4444)
            .with_hook_timeout(Duration::from_millis(250))
            .with_debug_command("pause")
            .with_cancel_hooks_on_disconnect();

        assert_eq!(options.port, 4444);
        assert_eq!(options.hook_timeout, Duration::from_millis(250));
        assert_eq!(options.debug_command, "pause");
        assert!(options.cancel_hooks_on_disconnect);
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let err = RunnerOptions::new()
            .with_hook_timeout(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("hook_timeout"));
    }

    #[test]
    fn test_validate_rejects_empty_marker() {
        assert!(
            RunnerOptions::new()
                .with_internal_log_marker("")
                .validate()
                .is_err()
        );
        assert!(RunnerOptions::new().with_event_capacity(0).validate().is_err());
    }
}
