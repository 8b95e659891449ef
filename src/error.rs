//! Error types for the browser runner socket.
//!
//! This module defines all error types used throughout the crate, plus the
//! [`SerializedError`] form that travels inside envelopes.
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Message | [`Error::InvalidMessage`], [`Error::UnknownMessage`] |
//! | Correlation | [`Error::SessionNotFound`], [`Error::BrowserNotFound`], [`Error::MissingCid`] |
//! | Hooks | [`Error::HookFailed`], [`Error::HookTimeout`], [`Error::HookAlreadyRunning`] |
//! | Commands | [`Error::CommandFailed`], [`Error::UnsupportedCommand`] |
//! | Remote | [`Error::Remote`] |
//! | Transport | [`Error::Connection`], [`Error::ConnectionClosed`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::io::Error as IoError;
use std::result::Result as StdResult;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::HookKey;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when runner options or builder input is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Message Errors
    // ========================================================================
    /// Inbound frame could not be decoded into an envelope.
    #[error("Invalid socket message: {message}")]
    InvalidMessage {
        /// Decoder failure description.
        message: String,
    },

    /// Envelope decoded but its type is not accepted inbound.
    #[error("Unknown socket message {payload}")]
    UnknownMessage {
        /// The offending message, re-serialized.
        payload: String,
    },

    // ========================================================================
    // Correlation Errors
    // ========================================================================
    /// No hook session registered for the cid.
    #[error("No session for cid {cid} found!")]
    SessionNotFound {
        /// The unknown cid.
        cid: String,
    },

    /// No automation handle registered for the cid.
    #[error("Couldn't find browser with cid \"{cid}\"")]
    BrowserNotFound {
        /// The unknown cid.
        cid: String,
    },

    /// Command request arrived without a usable cid.
    #[error("No \"cid\" property passed into command message with id \"{id}\"")]
    MissingCid {
        /// Id of the command request.
        id: String,
    },

    // ========================================================================
    // Hook Errors
    // ========================================================================
    /// A host-side hook function failed.
    #[error("{message}")]
    HookFailed {
        /// Failure reported by the hook.
        message: String,
    },

    /// The worker did not resolve the hook in time.
    #[error("hook execution for runner with id {key} timed out")]
    HookTimeout {
        /// Composite hook key.
        key: HookKey,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// A hook with the same key is still waiting for the worker.
    #[error("There is still a hook running for runner with id {key}")]
    HookAlreadyRunning {
        /// Composite hook key.
        key: HookKey,
    },

    // ========================================================================
    // Command Errors
    // ========================================================================
    /// Automation command failed on the handle.
    #[error("Failed to execute command \"{command}\": {message}")]
    CommandFailed {
        /// Command name.
        command: String,
        /// Underlying cause.
        message: String,
    },

    /// The handle has no operation with this name.
    #[error("Unsupported command \"{command}\"")]
    UnsupportedCommand {
        /// Command name.
        command: String,
    },

    // ========================================================================
    // Remote Errors
    // ========================================================================
    /// Error reconstructed from a [`SerializedError`].
    #[error("{name}: {message}")]
    Remote {
        /// Error name as sent by the peer.
        name: String,
        /// Error message as sent by the peer.
        message: String,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Connection-level failure.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Connection closed before the operation completed.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid message error.
    #[inline]
    pub fn invalid_message(message: impl Into<String>) -> Self {
        Self::InvalidMessage {
            message: message.into(),
        }
    }

    /// Creates an unknown message error.
    #[inline]
    pub fn unknown_message(payload: impl Into<String>) -> Self {
        Self::UnknownMessage {
            payload: payload.into(),
        }
    }

    /// Creates a session not found error.
    #[inline]
    pub fn session_not_found(cid: impl Into<String>) -> Self {
        Self::SessionNotFound { cid: cid.into() }
    }

    /// Creates a browser not found error.
    #[inline]
    pub fn browser_not_found(cid: impl Into<String>) -> Self {
        Self::BrowserNotFound { cid: cid.into() }
    }

    /// Creates a missing cid error.
    #[inline]
    pub fn missing_cid(id: impl Into<String>) -> Self {
        Self::MissingCid { id: id.into() }
    }

    /// Creates a hook failure.
    #[inline]
    pub fn hook_failed(message: impl Into<String>) -> Self {
        Self::HookFailed {
            message: message.into(),
        }
    }

    /// Creates a hook timeout error.
    #[inline]
    pub fn hook_timeout(key: HookKey, timeout_ms: u64) -> Self {
        Self::HookTimeout { key, timeout_ms }
    }

    /// Creates a duplicate hook registration error.
    #[inline]
    pub fn hook_already_running(key: HookKey) -> Self {
        Self::HookAlreadyRunning { key }
    }

    /// Wraps a command failure with the failing command name.
    #[inline]
    pub fn command_failed(command: impl Into<String>, cause: &Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            message: cause.to_string(),
        }
    }

    /// Creates an unsupported command error.
    #[inline]
    pub fn unsupported_command(command: impl Into<String>) -> Self {
        Self::UnsupportedCommand {
            command: command.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::HookTimeout { .. })
    }

    /// Returns `true` if the error names a missing correlation target.
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::SessionNotFound { .. } | Self::BrowserNotFound { .. } | Self::MissingCid { .. }
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::ConnectionClosed | Self::WebSocket(_)
        )
    }

    /// Error name used on the wire.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::HookTimeout { .. } => "TimeoutError",
            Self::Json(_) | Self::InvalidMessage { .. } => "SyntaxError",
            Self::Remote { name, .. } => name,
            _ => "Error",
        }
    }
}

// ============================================================================
// SerializedError
// ============================================================================

/// Structured error as carried in `error` fields of envelopes.
///
/// # Format
///
/// ```json
/// { "name": "Error", "message": "No session for cid 0-0 found!" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedError {
    /// Error class name.
    pub name: String,

    /// Human readable message.
    pub message: String,

    /// Optional stack trace (browser side only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl SerializedError {
    /// Creates a serialized error from parts.
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            stack: None,
        }
    }

    /// Reconstructs a crate error from the wire form.
    #[must_use]
    pub fn into_error(self) -> Error {
        Error::Remote {
            name: self.name,
            message: self.message,
        }
    }
}

impl From<&Error> for SerializedError {
    fn from(err: &Error) -> Self {
        Self::new(err.name(), err.to_string())
    }
}

impl From<Error> for SerializedError {
    fn from(err: Error) -> Self {
        Self::from(&err)
    }
}

impl fmt::Display for SerializedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

impl std::error::Error for SerializedError {}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::browser_not_found("missing");
        assert_eq!(err.to_string(), "Couldn't find browser with cid \"missing\"");
    }

    #[test]
    fn test_missing_cid_display() {
        let err = Error::missing_cid("7");
        assert_eq!(
            err.to_string(),
            "No \"cid\" property passed into command message with id \"7\""
        );
    }

    #[test]
    fn test_command_failed_wraps_cause() {
        let cause = Error::unsupported_command("hover");
        let err = Error::command_failed("hover", &cause);
        assert_eq!(
            err.to_string(),
            "Failed to execute command \"hover\": Unsupported command \"hover\""
        );
    }

    #[test]
    fn test_is_timeout() {
        let key = HookKey::new("0-0", "1");
        assert!(Error::hook_timeout(key.clone(), 15_000).is_timeout());
        assert!(!Error::hook_already_running(key).is_timeout());
    }

    #[test]
    fn test_is_not_found() {
        assert!(Error::session_not_found("0-0").is_not_found());
        assert!(Error::missing_cid("1").is_not_found());
        assert!(!Error::config("test").is_not_found());
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(Error::connection("reset").is_connection_error());
        assert!(!Error::hook_failed("boom").is_connection_error());
    }

    #[test]
    fn test_serialized_error_keeps_name_and_message() {
        let err = Error::hook_timeout(HookKey::new("0-0", "3"), 100);
        let serialized = SerializedError::from(&err);
        assert_eq!(serialized.name, "TimeoutError");
        assert_eq!(
            serialized.message,
            "hook execution for runner with id 0-0-3 timed out"
        );

        let json = serde_json::to_value(&serialized).expect("serialize");
        assert!(json.get("stack").is_none());
    }

    #[test]
    fn test_serialized_error_into_error() {
        let json = r#"{"name":"TypeError","message":"x is undefined","stack":"at foo"}"#;
        let serialized: SerializedError = serde_json::from_str(json).expect("parse");
        assert_eq!(serialized.stack.as_deref(), Some("at foo"));

        let err = serialized.into_error();
        assert_eq!(err.name(), "TypeError");
        assert_eq!(err.to_string(), "TypeError: x is undefined");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::AddrInUse, "port taken");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
        assert_eq!(err.name(), "SyntaxError");
    }
}
