//! The tagged envelope wrapping every socket frame.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::{
    CommandRequestEvent, CommandResponseEvent, ConsoleEvent, HookResultEvent, HookTriggerEvent,
};

// ============================================================================
// Envelope
// ============================================================================

/// One socket message.
///
/// # Format
///
/// ```json
/// { "type": "hookTriggerMessage", "value": { "cid": "0-0", "id": "1", ... } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Envelope {
    /// Browser console output. Browser → host.
    ConsoleMessage(ConsoleEvent),
    /// Hook execution request. Browser → host.
    HookTriggerMessage(HookTriggerEvent),
    /// Hook execution outcome. Host → browser.
    HookResultMessage(HookResultEvent),
    /// Automation command request. Browser → host.
    CommandRequestMessage(CommandRequestEvent),
    /// Automation command outcome. Host → browser.
    CommandResponseMessage(CommandResponseEvent),
}

impl Envelope {
    /// Decodes a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMessage`] if the frame is not a valid envelope.
    pub fn decode(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::invalid_message(e.to_string()))
    }

    /// Encodes the envelope as a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if a payload value fails to serialize.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Wire name of the envelope type.
    #[must_use]
    pub const fn message_type(&self) -> &'static str {
        match self {
            Self::ConsoleMessage(_) => "consoleMessage",
            Self::HookTriggerMessage(_) => "hookTriggerMessage",
            Self::HookResultMessage(_) => "hookResultMessage",
            Self::CommandRequestMessage(_) => "commandRequestMessage",
            Self::CommandResponseMessage(_) => "commandResponseMessage",
        }
    }
}

impl From<HookResultEvent> for Envelope {
    fn from(value: HookResultEvent) -> Self {
        Self::HookResultMessage(value)
    }
}

impl From<CommandResponseEvent> for Envelope {
    fn from(value: CommandResponseEvent) -> Self {
        Self::CommandResponseMessage(value)
    }
}

// ============================================================================
// Tests
// ============================================================================
