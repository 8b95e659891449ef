//! Socket runner answering browser hooks and commands.
//!
//! Demonstrates:
//! - Registering a hook session and an automation handle for cid `0-0`
//! - Binding the socket server
//! - Resolving worker hook executions from the worker hook channel
//! - Graceful shutdown on Ctrl+C
//!
//! Usage:
//!   cargo run --example echo_runner
//!   cargo run --example echo_runner -- --debug
//!   cargo run --example echo_runner -- --port 9222

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use anyhow::Context;
use browser_runner_socket::{
    CommandTable, HandlePool, HookSession, RunnerBuilder, RunnerEvent, RunnerOptions, SessionMap,
};
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Args
// ============================================================================

/// Command-line arguments.
#[derive(Debug, Clone)]
struct Args {
    debug: bool,
    port: u16,
}

impl Args {
    fn parse() -> anyhow::Result<Self> {
        let args: Vec<String> = std::env::args().collect();
        let port = match args.iter().position(|a| a == "--port") {
            Some(index) => args
                .get(index + 1)
                .context("--port needs a value")?
                .parse()
                .context("--port must be a number")?,
            None => 0,
        };

        Ok(Self {
            debug: args.iter().any(|a| a == "--debug"),
            port,
        })
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        "browser_runner_socket=debug,browser_console=debug"
    } else {
        "browser_runner_socket=info,browser_console=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse()?;
    init_logging(args.debug);

    // ========================================================================
    // Collaborators
    // ========================================================================

    let sessions = Arc::new(SessionMap::new());
    sessions.insert(
        "0-0",
        Arc::new(HookSession::new().with_hook("beforeTest", |args| {
            Box::pin(async move {
                info!(?args, "beforeTest ran on the host");
                Ok(())
            })
        })),
    );

    let handles = Arc::new(HandlePool::new());
    handles.insert(
        "0-0",
        Arc::new(
            CommandTable::new()
                .with_command("getTitle", |_| Box::pin(async { Ok(json!("Echo Runner")) }))
                .with_command("debug", |_| Box::pin(async { Ok(serde_json::Value::Null) })),
        ),
    );

    // ========================================================================
    // Server
    // ========================================================================

    let server = RunnerBuilder::new()
        .options(RunnerOptions::new().with_port(args.port))
        .sessions(sessions)
        .handles(handles)
        .bind()
        .await
        .context("failed to start socket server")?;

    println!("Browser socket listening at {}", server.ws_url());

    let mut hooks = server
        .take_worker_hooks()
        .context("worker hooks already taken")?;
    let worker = {
        let server = Arc::clone(&server);
        tokio::spawn(async move {
            while let Some(trigger) = hooks.recv().await {
                info!(cid = %trigger.cid, hook = %trigger.name, "Worker hook done");
                server.resolve_hook(&trigger);
            }
        })
    };

    let mut events = server.events();
    let debug_log = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(RunnerEvent::DebugState(on)) => info!(on, "Debug state changed"),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Debug events skipped"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;

    server.shutdown().await;
    worker.abort();
    debug_log.abort();

    Ok(())
}
