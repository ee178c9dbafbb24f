//! Capturing tracing layer.
//!
//! Hand `LogRecorder::dispatch()` to the code under test instead of
//! installing a global subscriber; every event emitted through that
//! dispatcher is recorded with its message, level, innermost span, and
//! `event` field.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::field::{Field, Visit};
use tracing::{Dispatch, Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Registry;

/// One captured tracing event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: Level,
    pub message: String,
    /// Value of the `event` field, if present.
    pub event: Option<String>,
    /// Name of the innermost span the event was emitted in.
    pub span: Option<String>,
}

/// Tracing layer that stores every event it sees.
#[derive(Debug, Clone, Default)]
pub struct LogRecorder {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl LogRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A dispatcher that records into this recorder.
    pub fn dispatch(&self) -> Dispatch {
        Dispatch::new(Registry::default().with(self.clone()))
    }

    fn lock(&self) -> MutexGuard<'_, Vec<LogRecord>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// All records captured so far.
    pub fn records(&self) -> Vec<LogRecord> {
        self.lock().clone()
    }

    /// Records carrying `event = name`.
    pub fn events_named(&self, name: &str) -> Vec<LogRecord> {
        self.lock()
            .iter()
            .filter(|r| r.event.as_deref() == Some(name))
            .cloned()
            .collect()
    }

    /// Returns true if any record carries `event = name`.
    pub fn has_event(&self, name: &str) -> bool {
        self.lock().iter().any(|r| r.event.as_deref() == Some(name))
    }
}

impl<S> Layer<S> for LogRecorder
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut visitor = RecordVisitor::default();
        event.record(&mut visitor);

        let record = LogRecord {
            level: *event.metadata().level(),
            message: visitor.message,
            event: visitor.event,
            span: ctx.event_span(event).map(|span| span.name().to_string()),
        };

        self.lock().push(record);
    }
}

#[derive(Default)]
struct RecordVisitor {
    message: String,
    event: Option<String>,
}

impl Visit for RecordVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "event" => self.event = Some(value.to_string()),
            "message" => self.message = value.to_string(),
            _ => {}
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            "event" => self.event = Some(format!("{value:?}").trim_matches('"').to_string()),
            "message" => self.message = format!("{value:?}"),
            _ => {}
        }
    }
}
