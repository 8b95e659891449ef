//! Command request and response payloads.
//!
//! The browser issues automation commands by name; the host answers with the
//! command result or a serialized error, correlated by `id`.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, SerializedError};
use crate::identifiers::{lenient_cid, valid_cid};

// ============================================================================
// CommandRequestEvent
// ============================================================================

/// An automation command issued from inside the browser page.
///
/// # Format
///
/// ```json
/// { "id": "9", "cid": "0-0", "commandName": "click", "args": ["#submit"] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRequestEvent {
    /// Correlates request and response.
    pub id: String,

    /// Session whose automation handle runs the command.
    #[serde(default, deserialize_with = "lenient_cid", skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,

    /// Operation to invoke on the handle.
    #[serde(rename = "commandName")]
    pub command_name: String,

    /// Operation arguments.
    #[serde(default)]
    pub args: Vec<Value>,
}

impl CommandRequestEvent {
    /// Creates a command request.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        cid: impl Into<String>,
        command_name: impl Into<String>,
        args: Vec<Value>,
    ) -> Self {
        Self {
            id: id.into(),
            cid: Some(cid.into()),
            command_name: command_name.into(),
            args,
        }
    }

    /// Returns the cid if present and well formed.
    #[inline]
    #[must_use]
    pub fn cid(&self) -> Option<&str> {
        valid_cid(self.cid.as_deref())
    }
}

// ============================================================================
// CommandResponseEvent
// ============================================================================

/// Response to a [`CommandRequestEvent`].
///
/// # Format
///
/// Success:
/// ```json
/// { "id": "9", "result": "https://example.com" }
/// ```
///
/// Error:
/// ```json
/// { "id": "9", "error": { "name": "Error", "message": "..." } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResponseEvent {
    /// Matches the request `id`.
    pub id: String,

    /// Command result (if success).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Failure (if error).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SerializedError>,
}

impl CommandResponseEvent {
    /// Creates a success response.
    #[inline]
    #[must_use]
    pub fn success(id: impl Into<String>, result: Value) -> Self {
        Self {
            id: id.into(),
            result: Some(result),
            error: None,
        }
    }

    /// Creates an error response.
    #[inline]
    #[must_use]
    pub fn failure(id: impl Into<String>, error: &Error) -> Self {
        Self {
            id: id.into(),
            result: None,
            error: Some(SerializedError::from(error)),
        }
    }

    /// Returns `true` if this is an error response.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Extracts the result value, returning the reconstructed error on failure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Remote`] if the response carried an error.
    pub fn into_result(self) -> Result<Value, Error> {
        match self.error {
            Some(error) => Err(error.into_error()),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
