//! WebSocket protocol message types.
//!
//! This module defines the envelope format exchanged between the browser
//! runtime and the host-side runner.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `consoleMessage` | Browser → Host | Console output |
//! | `hookTriggerMessage` | Browser → Host | Run a lifecycle hook |
//! | `hookResultMessage` | Host → Browser | Hook outcome |
//! | `commandRequestMessage` | Browser → Host | Automation command |
//! | `commandResponseMessage` | Host → Browser | Command outcome |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `envelope` | Tagged [`Envelope`] wrapper |
//! | `event` | Console and hook payloads |
//! | `request` | Command request and response payloads |

// ============================================================================
// Submodules
// ============================================================================

/// Tagged envelope.
pub mod envelope;

/// Console and hook payloads.
pub mod event;

/// Command request and response payloads.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use envelope::Envelope;
pub use event::{CONSOLE_EVENT_NAME, ConsoleEvent, ConsoleLevel, HookResultEvent, HookTriggerEvent};
pub use request::{CommandRequestEvent, CommandResponseEvent};
