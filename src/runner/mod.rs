//! Message handling for browser connections.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`MessageRouter`] | Decodes frames, dispatches by envelope type |
//! | [`ConsoleRelay`] | Forwards console output to a [`ConsoleSink`] |
//! | [`HookCoordinator`] | Runs hooks locally and in the worker |
//! | [`PendingHookRegistry`] | Hooks waiting for the worker, with timeout |
//! | [`CommandProxy`] | Runs automation commands on session handles |
//! | [`RunnerBuilder`] | Wires collaborators and [`RunnerOptions`] |
//!
//! # Hook Flow
//!
//! ```text
//! browser ── hookTriggerMessage ──► HookCoordinator
//!                                    ├─ Session::run_hook (local)
//!                                    └─ WorkerHooks (take_worker_hooks) ──► orchestrator
//!                                                                              │
//!            resolve_hook ◄──────────────────────────────────────────────────┘
//! browser ◄─ hookResultMessage ─────┘
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Runner builder.
pub mod builder;

/// Command proxy.
pub mod command;

/// Console relay.
pub mod console;

/// Outbound runner events.
pub mod events;

/// Hook coordinator.
pub mod hooks;

/// Runner options.
pub mod options;

/// Pending hook registry.
pub mod pending;

/// Message router.
pub mod router;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::RunnerBuilder;
pub use command::CommandProxy;
pub use console::{ConsoleRelay, ConsoleSink, TracingSink};
pub use events::{EventEmitter, RunnerEvent, WorkerHooks};
pub use hooks::HookCoordinator;
pub use options::{DEFAULT_HOOK_TIMEOUT, RunnerOptions};
pub use pending::{PendingHook, PendingHookRegistry};
pub use router::MessageRouter;
