//! Console relay.
//!
//! Forwards browser console output to a host-side sink, dropping the
//! framework's own log lines.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tracing::{debug, error, info, trace, warn};

use crate::protocol::{CONSOLE_EVENT_NAME, ConsoleEvent, ConsoleLevel};

// ============================================================================
// ConsoleSink
// ============================================================================

/// Destination for forwarded console output.
pub trait ConsoleSink: Send + Sync {
    /// Writes one console line attributed to `cid`.
    fn write(&self, cid: &str, level: ConsoleLevel, message: &str);
}

/// Sink emitting `tracing` events on the `browser_console` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ConsoleSink for TracingSink {
    fn write(&self, cid: &str, level: ConsoleLevel, message: &str) {
        match level {
            ConsoleLevel::Log | ConsoleLevel::Info => {
                info!(target: "browser_console", cid, "{message}");
            }
            ConsoleLevel::Warn => warn!(target: "browser_console", cid, "{message}"),
            ConsoleLevel::Error => error!(target: "browser_console", cid, "{message}"),
            ConsoleLevel::Debug => debug!(target: "browser_console", cid, "{message}"),
            ConsoleLevel::Trace => trace!(target: "browser_console", cid, "{message}"),
        }
    }
}

// ============================================================================
// ConsoleRelay
// ============================================================================

/// Filters console events and hands the rest to a [`ConsoleSink`].
#[derive(Clone)]
pub struct ConsoleRelay {
    sink: Arc<dyn ConsoleSink>,
    internal_marker: String,
}

impl ConsoleRelay {
    /// Creates a relay writing to `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn ConsoleSink>, internal_marker: impl Into<String>) -> Self {
        Self {
            sink,
            internal_marker: internal_marker.into(),
        }
    }

    /// Forwards `event` unless it is internal. Returns `true` if forwarded.
    pub fn handle(&self, event: &ConsoleEvent) -> bool {
        if event.name != CONSOLE_EVENT_NAME || event.starts_with_marker(&self.internal_marker) {
            return false;
        }

        let line = format!("[{}] {}", event.cid, event.render_args());
        self.sink.write(&event.cid, event.level, &line);
        true
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use parking_lot::Mutex;
    use proptest::prelude::*;
    use serde_json::{Value, json};

    /// Sink remembering every line it receives.
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub(crate) lines: Mutex<Vec<(String, ConsoleLevel, String)>>,
    }

    impl ConsoleSink for RecordingSink {
        fn write(&self, cid: &str, level: ConsoleLevel, message: &str) {
            self.lines
                .lock()
                .push((cid.to_string(), level, message.to_string()));
        }
    }

    fn event(level: ConsoleLevel, args: Vec<Value>) -> ConsoleEvent {
        ConsoleEvent {
            cid: "0-0".into(),
            name: CONSOLE_EVENT_NAME.into(),
            level,
            args,
        }
    }

    #[test]
    fn test_forwards_with_level() {
        let sink = Arc::new(RecordingSink::default());
        let relay = ConsoleRelay::new(sink.clone(), "[WDIO]");

        assert!(relay.handle(&event(ConsoleLevel::Error, vec![json!("boom"), json!(42)])));

        let lines = sink.lines.lock();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].0, "0-0");
        assert_eq!(lines[0].1, ConsoleLevel::Error);
        assert_eq!(lines[0].2, "[0-0] boom 42");
    }

    #[test]
    fn test_drops_internal_lines() {
        let sink = Arc::new(RecordingSink::default());
        let relay = ConsoleRelay::new(sink.clone(), "[WDIO]");

        assert!(!relay.handle(&event(ConsoleLevel::Log, vec![json!("[WDIO] connected")])));
        assert!(sink.lines.lock().is_empty());
    }

    #[test]
    fn test_drops_other_event_names() {
        let sink = Arc::new(RecordingSink::default());
        let relay = ConsoleRelay::new(sink.clone(), "[WDIO]");

        let mut other = event(ConsoleLevel::Log, vec![json!("hello")]);
        other.name = "errorEvent".into();

        assert!(!relay.handle(&other));
        assert!(sink.lines.lock().is_empty());
    }

    #[test]
    fn test_tracing_sink_accepts_every_level() {
        let sink = TracingSink;
        for level in [
            ConsoleLevel::Log,
            ConsoleLevel::Info,
            ConsoleLevel::Warn,
            ConsoleLevel::Error,
            ConsoleLevel::Debug,
            ConsoleLevel::Trace,
        ] {
            sink.write("0-0", level, "line");
        }
    }

    proptest! {
        #[test]
        fn marked_lines_are_never_forwarded(rest in ".*") {
            let sink = Arc::new(RecordingSink::default());
            let relay = ConsoleRelay::new(sink.clone(), "[WDIO]");

            let line = format!("[WDIO]{rest}");
            prop_assert!(!relay.handle(&event(ConsoleLevel::Info, vec![json!(line)])));
            prop_assert!(sink.lines.lock().is_empty());
        }

        #[test]
        fn unmarked_lines_are_forwarded(first in "[a-zA-Z0-9 ]*") {
            let sink = Arc::new(RecordingSink::default());
            let relay = ConsoleRelay::new(sink.clone(), "[WDIO]");

            prop_assert!(relay.handle(&event(ConsoleLevel::Warn, vec![json!(first)])));
            prop_assert_eq!(sink.lines.lock()[0].1, ConsoleLevel::Warn);
        }
    }
}
