//! `tracing` integration.
//!
//! [`HubLayer`] forwards every `tracing` event of the host into an
//! [`EventHub`], from whatever thread emitted it. The span scope of the event
//! becomes the stack trace, so the log view shows the innermost span as the
//! line's origin.
//!
//! ```no_run
//! use claw_overlay::{EventHub, HubLayer};
//! use tracing_subscriber::prelude::*;
//!
//! let hub = EventHub::new();
//! tracing_subscriber::registry()
//!     .with(tracing_subscriber::fmt::layer())
//!     .with(HubLayer::new(hub.clone()))
//!     .init();
//! ```

use std::fmt::{self, Write as _};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Metadata, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use crate::hub::EventHub;
use crate::types::Severity;

/// Target prefix of this crate's own events, which are never forwarded.
const OWN_TARGET: &str = "claw_overlay";

/// Layer that reports `tracing` events to an [`EventHub`].
#[derive(Debug, Clone)]
pub struct HubLayer {
    hub: EventHub,
}

impl HubLayer {
    /// Creates a layer feeding `hub`.
    #[must_use]
    pub const fn new(hub: EventHub) -> Self {
        Self { hub }
    }

    /// The hub events are reported to.
    #[must_use]
    pub const fn hub(&self) -> &EventHub {
        &self.hub
    }
}

impl<S> Layer<S> for HubLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if is_own_target(metadata.target()) {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let stacktrace = ctx.event_scope(event).map(|scope| {
            scope
                .map(|span| frame_line(span.metadata()))
                .collect::<Vec<_>>()
                .join("\n")
        });

        self.hub.report_log(
            visitor.finish(),
            stacktrace.filter(|trace| !trace.is_empty()),
            severity_for(*metadata.level()),
        );
    }
}

/// Maps a `tracing` level onto a log severity.
#[must_use]
pub fn severity_for(level: Level) -> Severity {
    if level == Level::ERROR {
        Severity::Error
    } else if level == Level::WARN {
        Severity::Warning
    } else {
        Severity::Info
    }
}

fn is_own_target(target: &str) -> bool {
    target
        .strip_prefix(OWN_TARGET)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

/// `module.path:span_name`, the frame shape the stack trace parser reads.
fn frame_line(metadata: &Metadata<'_>) -> String {
    format!("{}:{}", metadata.target().replace("::", "."), metadata.name())
}

/// Collects the `message` field and renders the rest as ` key=value`.
#[derive(Debug, Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(mut self) -> String {
        self.message.push_str(&self.fields);
        self.message
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={value}", field.name());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={value:?}", field.name());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::parser::parse_origin;
    use crate::traits::HubSubscriber;
    use crate::types::LogEvent;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use test_case::test_case;
    use tracing_subscriber::prelude::*;

    struct Capture(Arc<Mutex<Vec<LogEvent>>>);

    impl HubSubscriber for Capture {
        fn on_log(&mut self, event: &LogEvent) -> Result<()> {
            self.0.lock().push(event.clone());
            Ok(())
        }
    }

    fn capture(emit: impl FnOnce()) -> Vec<LogEvent> {
        let hub = EventHub::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let _sub = hub.subscribe(Capture(Arc::clone(&events)));

        let subscriber = tracing_subscriber::registry().with(HubLayer::new(hub.clone()));
        tracing::subscriber::with_default(subscriber, emit);

        hub.drain_and_dispatch();
        let captured = events.lock().clone();
        captured
    }

    #[test_case(Level::ERROR, Severity::Error ; "error")]
    #[test_case(Level::WARN, Severity::Warning ; "warn")]
    #[test_case(Level::INFO, Severity::Info ; "info")]
    #[test_case(Level::DEBUG, Severity::Info ; "debug")]
    #[test_case(Level::TRACE, Severity::Info ; "trace")]
    fn level_mapping(level: Level, expected: Severity) {
        assert_eq!(severity_for(level), expected);
    }

    #[test_case("claw_overlay", true ; "crate root")]
    #[test_case("claw_overlay::hub", true ; "crate module")]
    #[test_case("claw_overlay_ext", false ; "similar prefix")]
    #[test_case("game::net", false ; "host target")]
    fn own_target(target: &str, expected: bool) {
        assert_eq!(is_own_target(target), expected);
    }

    #[test]
    fn message_and_fields_are_rendered() {
        let events = capture(|| {
            tracing::warn!(target: "game", player = 3, zone = "north", "player idle");
        });

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message, "player idle player=3 zone=north");
        assert_eq!(events[0].severity, Severity::Warning);
        assert_eq!(events[0].stacktrace, None);
    }

    #[test]
    fn span_scope_becomes_stacktrace() {
        let events = capture(|| {
            let outer = tracing::info_span!(target: "game::world", "tick");
            let _outer = outer.enter();
            let inner = tracing::info_span!(target: "game::net", "connect");
            let _inner = inner.enter();
            tracing::error!(target: "game::net", "refused");
        });

        assert_eq!(events.len(), 1);
        let trace = events[0].stacktrace.as_deref().expect("span scope");
        assert_eq!(trace, "game.net:connect\ngame.world:tick");

        let origin = parse_origin(trace);
        assert_eq!(origin.qualified().as_deref(), Some("game.net.connect"));
    }

    #[test]
    fn own_events_are_not_forwarded() {
        let events = capture(|| {
            tracing::warn!(target: "claw_overlay::hub", "internal");
            tracing::info!(target: "game", "external");
        });

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message, "external");
    }
}
