//! Console and hook payloads.
//!
//! These are the payloads of `consoleMessage`, `hookTriggerMessage` and
//! `hookResultMessage` envelopes.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, SerializedError};
use crate::identifiers::HookKey;

// ============================================================================
// Constants
// ============================================================================

/// `name` carried by console events the browser shim forwards.
pub const CONSOLE_EVENT_NAME: &str = "consoleEvent";

// ============================================================================
// ConsoleEvent
// ============================================================================

/// Console output captured in the browser.
///
/// # Format
///
/// ```json
/// { "cid": "0-0", "name": "consoleEvent", "type": "warn", "args": ["slow"] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleEvent {
    /// Session that produced the output.
    pub cid: String,

    /// Event name, `consoleEvent` for forwarded console calls.
    pub name: String,

    /// Console method that was called.
    #[serde(rename = "type")]
    pub level: ConsoleLevel,

    /// Console call arguments.
    #[serde(default)]
    pub args: Vec<Value>,
}

impl ConsoleEvent {
    /// Returns `true` if the first argument is a string starting with `marker`.
    #[must_use]
    pub fn starts_with_marker(&self, marker: &str) -> bool {
        self.args
            .first()
            .and_then(Value::as_str)
            .is_some_and(|first| first.starts_with(marker))
    }

    /// Renders the arguments the way a console would print them.
    #[must_use]
    pub fn render_args(&self) -> String {
        self.args
            .iter()
            .map(|arg| match arg {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ============================================================================
// ConsoleLevel
// ============================================================================

/// Console severity. Unknown methods fall back to [`ConsoleLevel::Log`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ConsoleLevel {
    /// `console.log` and anything unrecognised.
    Log,
    /// `console.info`.
    Info,
    /// `console.warn`.
    Warn,
    /// `console.error`.
    Error,
    /// `console.debug`.
    Debug,
    /// `console.trace`.
    Trace,
}

impl From<String> for ConsoleLevel {
    fn from(level: String) -> Self {
        match level.as_str() {
            "info" => Self::Info,
            "warn" => Self::Warn,
            "error" => Self::Error,
            "debug" => Self::Debug,
            "trace" => Self::Trace,
            _ => Self::Log,
        }
    }
}

// ============================================================================
// HookTriggerEvent
// ============================================================================

/// Request from the browser to run a lifecycle hook.
///
/// # Format
///
/// ```json
/// { "cid": "0-0", "id": "1", "name": "beforeTest", "args": [] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookTriggerEvent {
    /// Session the hook belongs to.
    pub cid: String,

    /// Call id, unique among pending hooks of the session.
    pub id: String,

    /// Lifecycle hook name.
    pub name: String,

    /// Hook arguments.
    #[serde(default)]
    pub args: Vec<Value>,
}

impl HookTriggerEvent {
    /// Creates a trigger event.
    #[must_use]
    pub fn new(
        cid: impl Into<String>,
        id: impl Into<String>,
        name: impl Into<String>,
        args: Vec<Value>,
    ) -> Self {
        Self {
            cid: cid.into(),
            id: id.into(),
            name: name.into(),
            args,
        }
    }

    /// Returns the pending-hook key for this event.
    #[inline]
    #[must_use]
    pub fn key(&self) -> HookKey {
        HookKey::new(&self.cid, &self.id)
    }
}

// ============================================================================
// HookResultEvent
// ============================================================================

/// Outcome of a hook trigger sent back to the browser.
///
/// Same shape as the trigger, with `error` set when the hook failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookResultEvent {
    /// The trigger being answered.
    #[serde(flatten)]
    pub event: HookTriggerEvent,

    /// Failure, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SerializedError>,
}

impl HookResultEvent {
    /// Successful result echoing the trigger.
    #[inline]
    #[must_use]
    pub fn success(event: HookTriggerEvent) -> Self {
        Self { event, error: None }
    }

    /// Failed result carrying the serialized error.
    #[inline]
    #[must_use]
    pub fn failure(event: HookTriggerEvent, error: &Error) -> Self {
        Self {
            event,
            error: Some(SerializedError::from(error)),
        }
    }

    /// Returns `true` if the hook failed.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_console_event_parse() {
        let json_str = r#"{"cid":"0-0","name":"consoleEvent","type":"warn","args":["slow", 3]}"#;
        let event: ConsoleEvent = serde_json::from_str(json_str).expect("parse");

        assert_eq!(event.level, ConsoleLevel::Warn);
        assert_eq!(event.render_args(), "slow 3");
    }

    #[test]
    fn test_unknown_console_level_is_log() {
        let json_str = r#"{"cid":"0-0","name":"consoleEvent","type":"table","args":[]}"#;
        let event: ConsoleEvent = serde_json::from_str(json_str).expect("parse");
        assert_eq!(event.level, ConsoleLevel::Log);
    }

    #[test]
    fn test_starts_with_marker() {
        let event = ConsoleEvent {
            cid: "0-0".into(),
            name: CONSOLE_EVENT_NAME.into(),
            level: ConsoleLevel::Log,
            args: vec![json!("[WDIO] internal")],
        };
        assert!(event.starts_with_marker("[WDIO]"));
        assert!(!event.starts_with_marker("[APP]"));

        let numeric = ConsoleEvent {
            args: vec![json!(1)],
            ..event
        };
        assert!(!numeric.starts_with_marker("[WDIO]"));
    }

    #[test]
    fn test_hook_result_success_has_no_error_field() {
        let event = HookTriggerEvent::new("0-0", "1", "beforeTest", vec![]);
        let json = serde_json::to_value(HookResultEvent::success(event)).expect("serialize");

        assert_eq!(
            json,
            json!({ "cid": "0-0", "id": "1", "name": "beforeTest", "args": [] })
        );
    }

    #[test]
    fn test_hook_result_failure_carries_error() {
        let event = HookTriggerEvent::new("0-0", "2", "afterTest", vec![json!({"passed": true})]);
        let result = HookResultEvent::failure(event, &Error::session_not_found("0-0"));
        let json = serde_json::to_value(&result).expect("serialize");

        assert!(result.is_error());
        assert_eq!(json["error"]["message"], "No session for cid 0-0 found!");
        assert_eq!(json["args"][0]["passed"], true);
    }
}
