//! WebSocket transport layer.
//!
//! This module carries frames between in-browser test runtimes and the
//! host-side runner.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Browser tab    │                              │  Host (Rust)    │
//! │                 │         WebSocket            │                 │
//! │  test runtime   │◄────────────────────────────►│  SocketServer   │
//! │                 │      localhost:PORT          │  → Connection   │
//! │                 │                              │  → MessageRouter│
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `SocketServer::bind` - Bind and start accepting
//! 2. Browser tab connects, `Connection` event loop starts
//! 3. Each text frame is routed on its own task
//! 4. Socket closes, connection leaves the live set
//! 5. `SocketServer::shutdown` - Close every remaining connection
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | WebSocket connection and event loop |
//! | `server` | WebSocket server and live connection set |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection and event loop.
pub mod connection;

/// WebSocket server for browser connections.
pub mod server;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Connection, ConnectionHandle, Outbound};
pub use server::SocketServer;
