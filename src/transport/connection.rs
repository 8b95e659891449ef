//! WebSocket connection and event loop.
//!
//! Each accepted browser socket gets one event loop task that handles:
//!
//! - Incoming text frames, each routed on its own task
//! - Outgoing frames queued through a [`ConnectionHandle`]
//! - Close requests from the server
//!
//! Frames are never serialized behind each other: a slow hook on one frame
//! does not hold up console output or commands on the same socket.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;
use crate::protocol::Envelope;
use crate::runner::MessageRouter;

// ============================================================================
// Outbound
// ============================================================================

/// Commands for the event loop.
#[derive(Debug)]
pub enum Outbound {
    /// Send a text frame.
    Text(String),
    /// Close the socket.
    Close,
}

// ============================================================================
// ConnectionHandle
// ============================================================================

/// Cloneable sending side of a browser connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ConnectionHandle {
    /// Id of the connection.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Serializes and queues an envelope.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the envelope fails to serialize
    /// - [`Error::ConnectionClosed`] if the event loop has stopped
    pub fn send(&self, envelope: &Envelope) -> Result<()> {
        self.send_text(envelope.encode()?)
    }

    /// Queues a raw text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the event loop has stopped.
    pub fn send_text(&self, text: String) -> Result<()> {
        self.tx
            .send(Outbound::Text(text))
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Asks the event loop to close the socket.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the event loop has stopped.
    pub fn close(&self) -> Result<()> {
        self.tx
            .send(Outbound::Close)
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Returns `true` once the event loop has stopped.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Creates a handle not backed by a socket, returning the queue it feeds.
    #[cfg(test)]
    pub(crate) fn detached() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                id: ConnectionId::generate(),
                tx,
            },
            rx,
        )
    }
}

// ============================================================================
// Connection
// ============================================================================

/// An accepted browser socket whose event loop has not started yet.
///
/// Splitting construction from [`spawn`](Self::spawn) lets the server
/// register the [`ConnectionHandle`] before the loop can observe a close.
pub struct Connection {
    ws_stream: WebSocketStream<TcpStream>,
    outbound_rx: mpsc::UnboundedReceiver<Outbound>,
    handle: ConnectionHandle,
    router: Arc<MessageRouter>,
}

impl Connection {
    /// Wraps `ws_stream` with a fresh id and outbound queue.
    pub(crate) fn new(ws_stream: WebSocketStream<TcpStream>, router: Arc<MessageRouter>) -> Self {
        let (tx, outbound_rx) = mpsc::unbounded_channel();
        Self {
            ws_stream,
            outbound_rx,
            handle: ConnectionHandle {
                id: ConnectionId::generate(),
                tx,
            },
            router,
        }
    }

    /// Sending side of this connection.
    ///
    /// Frames queued before [`spawn`](Self::spawn) are sent once the loop
    /// starts.
    #[inline]
    #[must_use]
    pub fn handle(&self) -> ConnectionHandle {
        self.handle.clone()
    }

    /// Starts the event loop.
    ///
    /// `on_close` runs once the loop has ended, whichever side closed.
    pub(crate) fn spawn<F>(self, on_close: F)
    where
        F: FnOnce(ConnectionId) + Send + 'static,
    {
        let Self {
            ws_stream,
            outbound_rx,
            handle,
            router,
        } = self;

        tokio::spawn(async move {
            let id = handle.id();
            Self::run_event_loop(ws_stream, outbound_rx, handle, router).await;
            on_close(id);
        });
    }

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop(
        ws_stream: WebSocketStream<TcpStream>,
        mut outbound_rx: mpsc::UnboundedReceiver<Outbound>,
        handle: ConnectionHandle,
        router: Arc<MessageRouter>,
    ) {
        let (mut ws_write, mut ws_read) = ws_stream.split();
        let id = handle.id();

        loop {
            tokio::select! {
                // Incoming frames from the browser
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            let router = Arc::clone(&router);
                            let connection = handle.clone();
                            tokio::spawn(async move {
                                router.route(&connection, text.as_str()).await;
                            });
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!(connection = %id, "WebSocket closed by remote");
                            break;
                        }

                        Some(Err(e)) => {
                            error!(connection = %id, error = %e, "WebSocket error");
                            break;
                        }

                        None => {
                            debug!(connection = %id, "WebSocket stream ended");
                            break;
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                // Frames queued by handlers
                outbound = outbound_rx.recv() => {
                    match outbound {
                        Some(Outbound::Text(text)) => {
                            if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                                warn!(connection = %id, error = %e, "Failed to send frame");
                                break;
                            }
                            trace!(connection = %id, "Frame sent");
                        }

                        Some(Outbound::Close) => {
                            debug!(connection = %id, "Close requested");
                            if let Err(e) = ws_write.close().await {
                                debug!(connection = %id, error = %e, "Close handshake failed");
                            }
                            break;
                        }

                        None => {
                            debug!(connection = %id, "Outbound channel closed");
                            break;
                        }
                    }
                }
            }
        }

        // Stop accepting frames so handlers still running see a closed connection.
        outbound_rx.close();

        router.connection_closed(id);
        debug!(connection = %id, "Event loop terminated");
    }
}

// ============================================================================
// Tests
// ============================================================================
