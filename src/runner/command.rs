//! Command proxy.
//!
//! Runs automation commands issued inside the browser page on the host-held
//! handle of the same session.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::Error;
use crate::protocol::{CommandRequestEvent, CommandResponseEvent};
use crate::session::HandleRegistry;

use super::events::{EventEmitter, RunnerEvent};

// ============================================================================
// CommandProxy
// ============================================================================

/// Forwards command requests to automation handles.
#[derive(Clone)]
pub struct CommandProxy {
    handles: Arc<dyn HandleRegistry>,
    events: EventEmitter,
    debug_command: String,
}

impl CommandProxy {
    /// Creates a proxy.
    #[must_use]
    pub fn new(
        handles: Arc<dyn HandleRegistry>,
        events: EventEmitter,
        debug_command: impl Into<String>,
    ) -> Self {
        Self {
            handles,
            events,
            debug_command: debug_command.into(),
        }
    }

    /// Executes `request` and returns the response to send back.
    ///
    /// Never fails: every error is reported inside the response.
    pub async fn handle_command(&self, request: CommandRequestEvent) -> CommandResponseEvent {
        debug!(id = %request.id, command = %request.command_name, "Received command request");

        let Some(cid) = request.cid() else {
            let error = Error::missing_cid(&request.id);
            return CommandResponseEvent::failure(request.id.clone(), &error);
        };

        let Some(handle) = self.handles.get(cid).await else {
            warn!(cid, command = %request.command_name, "No browser for command");
            let error = Error::browser_not_found(cid);
            return CommandResponseEvent::failure(request.id.clone(), &error);
        };

        let toggles_debug = request.command_name == self.debug_command;
        if toggles_debug {
            self.events.emit(RunnerEvent::DebugState(true));
        }

        let outcome = handle
            .invoke(&request.command_name, request.args.clone())
            .await;

        // Emitted on failure too, so the worker never stays in debug state.
        if toggles_debug {
            self.events.emit(RunnerEvent::DebugState(false));
        }

        match outcome {
            Ok(result) => {
                info!(id = %request.id, command = %request.command_name, "Return command result");
                CommandResponseEvent::success(request.id, result)
            }
            Err(e) => {
                let error = Error::command_failed(&request.command_name, &e);
                warn!(id = %request.id, error = %error, "Command failed");
                CommandResponseEvent::failure(request.id, &error)
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
