//! Collaborators resolved by cid.
//!
//! The runner never creates sessions or automation handles; it resolves them
//! through the traits defined here. In-memory implementations are provided
//! for embedding applications and tests.
//!
//! | Trait | In-memory implementation |
//! |-------|--------------------------|
//! | [`SessionDirectory`] | [`SessionMap`] of [`HookSession`] |
//! | [`HandleRegistry`] | [`HandlePool`] of [`CommandTable`] |

// ============================================================================
// Submodules
// ============================================================================

/// Hook sessions and their directory.
pub mod directory;

/// Automation handles and their pool.
pub mod handle;

// ============================================================================
// Re-exports
// ============================================================================

pub use directory::{HookFn, HookSession, Session, SessionDirectory, SessionMap};
pub use handle::{
    AutomationHandle, CommandFn, CommandTable, DEFAULT_HANDLE_WAIT, HandlePool, HandleRegistry,
};
