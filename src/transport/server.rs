//! WebSocket server for browser connections.
//!
//! Owns the listener and the set of live connections. Every browser tab
//! opens its own socket; all of them share one [`MessageRouter`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           SocketServer                  │
//! │           (single port)                 │
//! │  ┌─────────────────────────────────┐    │
//! │  │ ConnectionId A → tab 1          │    │
//! │  │ ConnectionId B → tab 2          │──► MessageRouter
//! │  │ ConnectionId C → tab 3          │    │
//! │  └─────────────────────────────────┘    │
//! └─────────────────────────────────────────┘
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;
use crate::protocol::HookTriggerEvent;
use crate::runner::{MessageRouter, RunnerEvent, WorkerHooks};

use super::connection::{Connection, ConnectionHandle};

// ============================================================================
// Constants
// ============================================================================

/// How often the accept loop checks the shutdown flag.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

// ============================================================================
// SocketServer
// ============================================================================

/// Accepts browser sockets and tracks the live ones.
///
/// # Example
///
/// ```ignore
/// let server = SocketServer::bind(router, IpAddr::V4(Ipv4Addr::LOCALHOST), 0).await?;
/// println!("WebSocket URL: {}", server.ws_url());
///
/// // ...
///
/// server.shutdown().await;
/// ```
pub struct SocketServer {
    /// Bound address.
    local_addr: SocketAddr,

    /// Shared message router.
    router: Arc<MessageRouter>,

    /// Live connections.
    connections: RwLock<FxHashMap<ConnectionId, ConnectionHandle>>,

    /// Accept loop task, taken on shutdown.
    accept_task: Mutex<Option<JoinHandle<()>>>,

    /// Shutdown flag.
    shutdown: AtomicBool,
}

// ============================================================================
// SocketServer - Constructor
// ============================================================================

impl SocketServer {
    /// Binds the server and starts the accept loop.
    ///
    /// Use port 0 to let the OS assign a random available port.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if binding fails.
    pub async fn bind(router: Arc<MessageRouter>, ip: IpAddr, port: u16) -> Result<Arc<Self>> {
        let listener = TcpListener::bind(SocketAddr::new(ip, port)).await?;
        let local_addr = listener.local_addr()?;

        debug!(port = local_addr.port(), "WebSocket server bound");

        let server = Arc::new(Self {
            local_addr,
            router,
            connections: RwLock::new(FxHashMap::default()),
            accept_task: Mutex::new(None),
            shutdown: AtomicBool::new(false),
        });

        let server_clone = Arc::clone(&server);
        let task = tokio::spawn(async move {
            server_clone.accept_loop(listener).await;
        });
        *server.accept_task.lock() = Some(task);

        info!(port = local_addr.port(), "Browser socket server started");

        Ok(server)
    }
}

// ============================================================================
// SocketServer - Public API
// ============================================================================

impl SocketServer {
    /// Returns the WebSocket URL of this server.
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.local_addr)
    }

    /// Returns the port the server is bound to.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Returns the bound socket address.
    #[inline]
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the number of live connections.
    #[inline]
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.read().len()
    }

    /// The shared message router.
    #[inline]
    #[must_use]
    pub fn router(&self) -> &Arc<MessageRouter> {
        &self.router
    }

    /// Subscribes to debug state events.
    #[inline]
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<RunnerEvent> {
        self.router.subscribe()
    }

    /// Takes the receiver of worker hook execution requests.
    ///
    /// Returns `None` once taken.
    #[must_use]
    pub fn take_worker_hooks(&self) -> Option<WorkerHooks> {
        self.router.take_worker_hooks()
    }

    /// Resolves the worker side of a hook.
    pub fn resolve_hook(&self, result: &HookTriggerEvent) {
        self.router.resolve_hook(result);
    }
}

// ============================================================================
// SocketServer - Lifecycle
// ============================================================================

impl SocketServer {
    /// Shuts down the server.
    ///
    /// Closes every live connection, then waits for the accept loop to
    /// release the listener. A connection that fails to close does not stop
    /// the others from being closed.
    pub async fn shutdown(&self) {
        info!("Browser socket server shutting down");

        // Signal accept loop to stop
        self.shutdown.store(true, Ordering::SeqCst);

        // Close all connections
        let connections: Vec<_> = {
            let mut map = self.connections.write();
            map.drain().collect()
        };

        for (id, connection) in connections {
            match connection.close() {
                Ok(()) => debug!(connection = %id, "Connection closed during shutdown"),
                Err(e) => warn!(connection = %id, error = %e, "Failed to close connection"),
            }
        }

        self.router.shutdown();

        let task = self.accept_task.lock().take();
        if let Some(task) = task
            && let Err(e) = task.await
        {
            error!(error = %e, "Accept loop panicked");
        }

        info!("Browser socket server shutdown complete");
    }
}

// ============================================================================
// SocketServer - Accept Loop
// ============================================================================

impl SocketServer {
    /// Background task that accepts new connections.
    async fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        debug!("Accept loop started");

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                debug!("Accept loop shutting down");
                break;
            }

            // Accept with timeout to allow checking shutdown flag
            match timeout(ACCEPT_POLL_INTERVAL, listener.accept()).await {
                Ok(Ok((stream, addr))) => {
                    let server = Arc::clone(&self);
                    tokio::spawn(async move {
                        if let Err(e) = server.handle_connection(stream, addr).await {
                            warn!(error = %e, ?addr, "Connection handling failed");
                        }
                    });
                }
                Ok(Err(e)) => {
                    error!(error = %e, "Accept failed");
                }
                Err(_) => continue,
            }
        }

        drop(listener);
        debug!("Accept loop terminated");
    }

    /// Upgrades a TCP stream and registers the connection.
    async fn handle_connection(self: Arc<Self>, stream: TcpStream, addr: SocketAddr) -> Result<()> {
        debug!(?addr, "New TCP connection");

        let ws_stream = tokio_tungstenite::accept_async(stream)
            .await
            .map_err(|e| Error::connection(format!("WebSocket upgrade failed: {e}")))?;

        let connection = Connection::new(ws_stream, Arc::clone(&self.router));
        let handle = connection.handle();
        let id = handle.id();

        // Checked and inserted under the lock `shutdown` drains with, before
        // the loop runs, so `on_close` always finds the entry.
        let registered = {
            let mut connections = self.connections.write();
            if self.shutdown.load(Ordering::SeqCst) {
                false
            } else {
                connections.insert(id, handle.clone());
                true
            }
        };

        if !registered {
            debug!(connection = %id, "Refusing connection during shutdown");
            let _ = handle.close();
            connection.spawn(|_| {});
            return Ok(());
        }

        let server = Arc::downgrade(&self);
        connection.spawn(move |id| {
            if let Some(server) = server.upgrade()
                && server.connections.write().remove(&id).is_some()
            {
                debug!(connection = %id, "Connection removed from live set");
            }
        });
        info!(connection = %id, ?addr, "Browser connected");

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
