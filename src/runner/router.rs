//! Message router.
//!
//! Decodes inbound frames and dispatches each envelope to exactly one
//! handler. Every handler boundary converts failures into a reply on the
//! same connection; nothing a frame does can take the connection down.

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::broadcast;
use tracing::{debug, error, trace};

use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;
use crate::protocol::{Envelope, HookTriggerEvent};
use crate::transport::ConnectionHandle;

use super::command::CommandProxy;
use super::console::ConsoleRelay;
use super::events::{EventEmitter, RunnerEvent, WorkerHooks};
use super::hooks::HookCoordinator;

// ============================================================================
// MessageRouter
// ============================================================================

/// Dispatches inbound envelopes to the console, hook and command handlers.
///
/// Built with [`RunnerBuilder`](super::RunnerBuilder). Shared by every
/// connection of a server.
pub struct MessageRouter {
    console: ConsoleRelay,
    hooks: HookCoordinator,
    commands: CommandProxy,
    events: EventEmitter,
    cancel_hooks_on_disconnect: bool,
}

impl MessageRouter {
    /// Assembles a router from its handlers.
    pub(crate) fn new(
        console: ConsoleRelay,
        hooks: HookCoordinator,
        commands: CommandProxy,
        events: EventEmitter,
        cancel_hooks_on_disconnect: bool,
    ) -> Self {
        Self {
            console,
            hooks,
            commands,
            events,
            cancel_hooks_on_disconnect,
        }
    }

    /// Handles one inbound text frame from `connection`.
    ///
    /// Failures are logged and reported back as a JSON string.
    pub async fn route(&self, connection: &ConnectionHandle, text: &str) {
        let Err(e) = self.dispatch(connection, text).await else {
            return;
        };

        if e.is_connection_error() {
            debug!(connection = %connection.id(), error = %e, "Reply dropped, connection gone");
            return;
        }

        let message = format!("Failed handling socket message: {e}");
        error!(connection = %connection.id(), error = %e, "Failed handling socket message");

        match serde_json::to_string(&message) {
            Ok(json) => {
                if connection.send_text(json).is_err() {
                    debug!(
                        connection = %connection.id(),
                        "Failure report dropped, connection gone"
                    );
                }
            }
            Err(e) => error!(error = %e, "Failed to serialize failure report"),
        }
    }

    /// Decodes `text` and runs the matching handler.
    async fn dispatch(&self, connection: &ConnectionHandle, text: &str) -> Result<()> {
        let envelope = Envelope::decode(text)?;
        trace!(
            connection = %connection.id(),
            message_type = envelope.message_type(),
            "Routing message"
        );

        match envelope {
            Envelope::ConsoleMessage(event) => {
                self.console.handle(&event);
                Ok(())
            }
            Envelope::HookTriggerMessage(event) => {
                let result = self.hooks.handle_hook(Some(connection.id()), event).await?;
                connection.send(&result.into())
            }
            Envelope::CommandRequestMessage(request) => {
                let response = self.commands.handle_command(request).await;
                connection.send(&response.into())
            }
            other @ (Envelope::HookResultMessage(_) | Envelope::CommandResponseMessage(_)) => {
                let payload = other
                    .encode()
                    .unwrap_or_else(|_| other.message_type().to_string());
                Err(Error::unknown_message(payload))
            }
        }
    }

    /// Resolves the worker side of a hook. See [`HookCoordinator::resolve_hook`].
    pub fn resolve_hook(&self, result: &HookTriggerEvent) {
        self.hooks.resolve_hook(result);
    }

    /// Takes the receiver of worker hook execution requests.
    ///
    /// There is one receiver per router; later calls return `None`.
    #[must_use]
    pub fn take_worker_hooks(&self) -> Option<WorkerHooks> {
        self.hooks.take_worker_hooks()
    }

    /// Subscribes to debug state events.
    #[inline]
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RunnerEvent> {
        self.events.subscribe()
    }

    /// The hook coordinator.
    #[inline]
    #[must_use]
    pub fn hooks(&self) -> &HookCoordinator {
        &self.hooks
    }

    /// Called by the transport once a connection has closed.
    pub fn connection_closed(&self, connection: ConnectionId) {
        if self.cancel_hooks_on_disconnect {
            self.hooks.cancel_owned_by(connection);
        }
    }

    /// Called by the transport on server shutdown.
    pub(crate) fn shutdown(&self) {
        if self.cancel_hooks_on_disconnect {
            self.hooks.cancel_all();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::{Value, json};
    use tokio::sync::mpsc;

    use crate::runner::RunnerBuilder;
    use crate::runner::RunnerOptions;
    use crate::runner::console::tests::RecordingSink;
    use crate::session::{CommandTable, HandlePool, HookSession, SessionMap};
    use crate::transport::connection::Outbound;

    struct Fixture {
        router: Arc<MessageRouter>,
        connection: ConnectionHandle,
        outbound: mpsc::UnboundedReceiver<Outbound>,
        sink: Arc<RecordingSink>,
    }

    fn fixture(options: RunnerOptions) -> Fixture {
        let sessions = Arc::new(SessionMap::new());
        sessions.insert("0-0", Arc::new(HookSession::new()));

        let handles = Arc::new(HandlePool::new());
        handles.insert(
            "0-0",
            Arc::new(CommandTable::new().with_command("getTitle", |_| {
                Box::pin(async { Ok(json!("Example")) })
            })),
        );

        let sink = Arc::new(RecordingSink::default());
        let router = RunnerBuilder::new()
            .options(options)
            .sessions(sessions)
            .handles(handles)
            .console_sink(sink.clone())
            .build()
            .expect("router");

        let (connection, outbound) = ConnectionHandle::detached();
        Fixture {
            router,
            connection,
            outbound,
            sink,
        }
    }

    async fn next_json(outbound: &mut mpsc::UnboundedReceiver<Outbound>) -> Value {
        match outbound.recv().await {
            Some(Outbound::Text(text)) => serde_json::from_str(&text).expect("json"),
            other => panic!("unexpected outbound: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_frame_reported() {
        let mut f = fixture(RunnerOptions::new());

        f.router.route(&f.connection, "{not json").await;

        let reply = next_json(&mut f.outbound).await;
        let text = reply.as_str().expect("string reply");
        assert!(text.starts_with("Failed handling socket message:"));
    }

    #[tokio::test]
    async fn test_host_bound_type_rejected() {
        let mut f = fixture(RunnerOptions::new());

        let frame = json!({ "type": "commandResponseMessage", "value": { "id": "1" } });
        f.router.route(&f.connection, &frame.to_string()).await;

        let reply = next_json(&mut f.outbound).await;
        assert!(reply.as_str().expect("string").contains("Unknown socket message"));
    }

    #[tokio::test]
    async fn test_console_message_has_no_reply() {
        let mut f = fixture(RunnerOptions::new());

        let frame = json!({
            "type": "consoleMessage",
            "value": { "cid": "0-0", "name": "consoleEvent", "type": "info", "args": ["hi"] }
        });
        f.router.route(&f.connection, &frame.to_string()).await;

        assert_eq!(f.sink.lines.lock().len(), 1);
        assert!(f.outbound.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_hook_trigger_scenario() {
        let mut f = fixture(RunnerOptions::new());
        let mut hooks = f.router.take_worker_hooks().expect("worker hooks");

        let router = Arc::clone(&f.router);
        tokio::spawn(async move {
            if let Some(trigger) = hooks.recv().await {
                router.resolve_hook(&trigger);
            }
        });

        let frame = json!({
            "type": "hookTriggerMessage",
            "value": { "cid": "0-0", "id": "1", "name": "beforeTest", "args": [] }
        });
        f.router.route(&f.connection, &frame.to_string()).await;

        let reply = next_json(&mut f.outbound).await;
        assert_eq!(
            reply,
            json!({
                "type": "hookResultMessage",
                "value": { "cid": "0-0", "id": "1", "name": "beforeTest", "args": [] }
            })
        );
    }

    #[tokio::test]
    async fn test_command_request_scenario() {
        let mut f = fixture(RunnerOptions::new());

        let frame = json!({
            "type": "commandRequestMessage",
            "value": { "id": "9", "cid": "missing", "commandName": "click", "args": [] }
        });
        f.router.route(&f.connection, &frame.to_string()).await;

        let reply = next_json(&mut f.outbound).await;
        assert_eq!(reply["type"], "commandResponseMessage");
        assert_eq!(reply["value"]["id"], "9");
        let message = reply["value"]["error"]["message"].as_str().expect("message");
        assert!(message.contains("Couldn't find browser"));
    }

    #[tokio::test]
    async fn test_command_request_success() {
        let mut f = fixture(RunnerOptions::new());

        let frame = json!({
            "type": "commandRequestMessage",
            "value": { "id": "2", "cid": "0-0", "commandName": "getTitle", "args": [] }
        });
        f.router.route(&f.connection, &frame.to_string()).await;

        let reply = next_json(&mut f.outbound).await;
        assert_eq!(
            reply,
            json!({ "type": "commandResponseMessage", "value": { "id": "2", "result": "Example" } })
        );
    }

    #[tokio::test]
    async fn test_duplicate_hook_reported_as_failure() {
        let mut f = fixture(RunnerOptions::new().with_hook_timeout(Duration::from_secs(5)));
        let mut hooks = f.router.take_worker_hooks().expect("worker hooks");

        let frame = json!({
            "type": "hookTriggerMessage",
            "value": { "cid": "0-0", "id": "7", "name": "beforeTest", "args": [] }
        })
        .to_string();

        let first = {
            let router = Arc::clone(&f.router);
            let connection = f.connection.clone();
            let frame = frame.clone();
            tokio::spawn(async move { router.route(&connection, &frame).await })
        };
        hooks.recv().await.expect("worker request");

        f.router.route(&f.connection, &frame).await;
        let reply = next_json(&mut f.outbound).await;
        assert!(reply.as_str().expect("string").contains("still a hook running"));

        f.router.resolve_hook(&HookTriggerEvent::new("0-0", "7", "beforeTest", vec![]));
        first.await.expect("join");

        let reply = next_json(&mut f.outbound).await;
        assert_eq!(reply["type"], "hookResultMessage");
        assert!(reply["value"].get("error").is_none());
    }

    #[tokio::test]
    async fn test_connection_closed_cancels_when_enabled() {
        let mut f = fixture(
            RunnerOptions::new()
                .with_hook_timeout(Duration::from_secs(30))
                .with_cancel_hooks_on_disconnect(),
        );
        let mut hooks = f.router.take_worker_hooks().expect("worker hooks");

        let frame = json!({
            "type": "hookTriggerMessage",
            "value": { "cid": "0-0", "id": "1", "name": "afterTest", "args": [] }
        })
        .to_string();

        let hook = {
            let router = Arc::clone(&f.router);
            let connection = f.connection.clone();
            tokio::spawn(async move { router.route(&connection, &frame).await })
        };
        hooks.recv().await.expect("worker request");

        f.router.connection_closed(f.connection.id());
        hook.await.expect("join");

        let reply = next_json(&mut f.outbound).await;
        assert_eq!(reply["value"]["error"]["message"], "Connection closed");
        assert_eq!(f.router.hooks().pending_count(), 0);
    }
}
