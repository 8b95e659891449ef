//! Browser runner socket - host-side coordination for in-browser tests.
//!
//! Test code running inside a browser tab cannot reach the host runner
//! directly. This library provides the socket endpoint the tab connects to
//! and the handlers that act on what it sends.
//!
//! # Architecture
//!
//! Every tab opens a WebSocket to the [`SocketServer`] and exchanges JSON
//! envelopes of the form `{"type": ..., "value": ...}`:
//!
//! - **Console relay**: browser console output is written to the host log
//! - **Hook coordination**: lifecycle hooks run in the host session and in
//!   the worker process, and the tab gets one combined result
//! - **Command proxy**: automation commands are executed on the session's
//!   automation handle and the result is sent back
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use browser_runner_socket::{
//!     CommandTable, HandlePool, HookSession, Result, RunnerBuilder, SessionMap,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let sessions = Arc::new(SessionMap::new());
//!     sessions.insert("0-0", Arc::new(HookSession::new()));
//!
//!     let handles = Arc::new(HandlePool::new());
//!     handles.insert("0-0", Arc::new(CommandTable::new()));
//!
//!     let server = RunnerBuilder::new()
//!         .sessions(sessions)
//!         .handles(handles)
//!         .bind()
//!         .await?;
//!
//!     // Answer the worker side of each hook
//!     if let Some(mut hooks) = server.take_worker_hooks() {
//!         while let Some(trigger) = hooks.recv().await {
//!             server.resolve_hook(&trigger);
//!         }
//!     }
//!
//!     server.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Connection ids and hook keys |
//! | [`protocol`] | Socket envelope and payload types |
//! | [`runner`] | Router, hook coordinator, command proxy, console relay |
//! | [`session`] | Session and automation handle collaborators |
//! | [`transport`] | WebSocket server and connections |

// ============================================================================
// Modules
// ============================================================================

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Socket protocol message types.
pub mod protocol;

/// Message handling for browser connections.
///
/// Use [`RunnerBuilder`] to wire collaborators into a router or server.
pub mod runner;

/// Collaborators resolved by cid.
pub mod session;

/// WebSocket transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Error types
pub use error::{Error, Result, SerializedError};

// Identifier types
pub use identifiers::{ConnectionId, HookKey};

// Protocol types
pub use protocol::{
    CommandRequestEvent, CommandResponseEvent, ConsoleEvent, ConsoleLevel, Envelope,
    HookResultEvent, HookTriggerEvent,
};

// Runner types
pub use runner::{
    ConsoleSink, HookCoordinator, MessageRouter, RunnerBuilder, RunnerEvent, RunnerOptions,
    TracingSink, WorkerHooks,
};

// Session types
pub use session::{
    AutomationHandle, CommandTable, HandlePool, HandleRegistry, HookSession, Session,
    SessionDirectory, SessionMap,
};

// Transport types
pub use transport::{ConnectionHandle, SocketServer};
