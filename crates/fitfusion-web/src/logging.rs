#![forbid(unsafe_code)]

//! Tracing layer that formats events as single lines for a console sink.
//!
//! The layer never writes anywhere by itself: every formatted line goes to a
//! [`LineSink`]. On wasm the sink is the browser console; tests use
//! [`CaptureSink`].
//!
//! ```no_run
//! use fitfusion_web::logging::{CaptureSink, ConsoleLayer};
//! use tracing_subscriber::prelude::*;
//!
//! let sink = CaptureSink::default();
//! let subscriber = tracing_subscriber::registry().with(ConsoleLayer::new(sink.clone()));
//! tracing::subscriber::with_default(subscriber, || tracing::info!(answer = 42, "hello"));
//! assert_eq!(sink.lines()[0].1, "INFO  hello answer=42");
//! ```

use std::fmt::{self, Write as _};
use std::sync::{Arc, Mutex};

use fitfusion_core::LogLevel;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::Context;
use tracing_subscriber::prelude::*;

/// Destination for formatted log lines.
pub trait LineSink: Send + Sync + 'static {
    fn write_line(&self, level: Level, line: &str);
}

/// Sink that keeps every line in memory.
#[derive(Debug, Default, Clone)]
pub struct CaptureSink {
    lines: Arc<Mutex<Vec<(Level, String)>>>,
}

impl CaptureSink {
    #[must_use]
    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }
}

impl LineSink for CaptureSink {
    fn write_line(&self, level: Level, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((level, line.to_owned()));
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConsoleFormat {
    /// Prefix each line with the event target (module path). Default: false.
    pub show_target: bool,
    /// Append structured fields beyond `message`. Default: true.
    pub show_fields: bool,
}

impl Default for ConsoleFormat {
    fn default() -> Self {
        Self {
            show_target: false,
            show_fields: true,
        }
    }
}

#[must_use]
pub const fn level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    }
}

/// Parse a level name as accepted by the page configuration.
#[must_use]
pub fn parse_level(name: &str) -> Option<LevelFilter> {
    LogLevel::parse(name).map(level_filter)
}

fn level_str(level: Level) -> &'static str {
    match level {
        Level::ERROR => "ERROR",
        Level::WARN => "WARN ",
        Level::INFO => "INFO ",
        Level::DEBUG => "DEBUG",
        Level::TRACE => "TRACE",
    }
}

#[derive(Default)]
struct EventVisitor {
    message: Option<String>,
    fields: Vec<(String, String)>,
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let rendered = format!("{value:?}");
        if field.name() == "message" {
            self.message = Some(rendered);
        } else {
            self.fields.push((field.name().to_owned(), rendered));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_owned());
        } else {
            self.fields.push((field.name().to_owned(), value.to_owned()));
        }
    }
}

pub struct ConsoleLayer<K> {
    sink: K,
    format: ConsoleFormat,
}

impl<K: LineSink> ConsoleLayer<K> {
    #[must_use]
    pub fn new(sink: K) -> Self {
        Self {
            sink,
            format: ConsoleFormat::default(),
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: ConsoleFormat) -> Self {
        self.format = format;
        self
    }

    fn format_line(&self, level: Level, target: &str, visitor: EventVisitor) -> String {
        let mut line = String::with_capacity(64);
        line.push_str(level_str(level));
        line.push(' ');
        if self.format.show_target {
            line.push_str(target);
            line.push_str(": ");
        }
        if let Some(message) = visitor.message {
            line.push_str(&message);
        }
        if self.format.show_fields {
            for (name, value) in visitor.fields {
                let _ = write!(line, " {name}={value}");
            }
        }
        line
    }
}

impl<K> fmt::Debug for ConsoleLayer<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleLayer")
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

/// Run `f` with events routed to `sink` at the default level.
///
/// For failures that happen before the page configuration (and with it the
/// global subscriber) exists.
pub fn with_fallback_logging<K: LineSink, R>(sink: K, f: impl FnOnce() -> R) -> R {
    let subscriber = tracing_subscriber::registry()
        .with(level_filter(LogLevel::Info))
        .with(ConsoleLayer::new(sink));
    tracing::subscriber::with_default(subscriber, f)
}

impl<S: Subscriber, K: LineSink> Layer<S> for ConsoleLayer<K> {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);
        let line = self.format_line(*metadata.level(), metadata.target(), visitor);
        self.sink.write_line(*metadata.level(), &line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture(format: ConsoleFormat, f: impl FnOnce()) -> Vec<(Level, String)> {
        let sink = CaptureSink::default();
        let subscriber = tracing_subscriber::registry()
            .with(LevelFilter::DEBUG)
            .with(ConsoleLayer::new(sink.clone()).with_format(format));
        tracing::subscriber::with_default(subscriber, f);
        sink.lines()
    }

    #[test]
    fn formats_message_and_fields() {
        let lines = capture(ConsoleFormat::default(), || {
            tracing::warn!(selector = ".toggle", count = 3, "lookup failed");
        });
        assert_eq!(
            lines,
            vec![(Level::WARN, "WARN  lookup failed selector=.toggle count=3".to_owned())]
        );
    }

    #[test]
    fn target_prefix_and_level_filter() {
        let format = ConsoleFormat {
            show_target: true,
            show_fields: false,
        };
        let lines = capture(format, || {
            tracing::debug!(target: "page", id = 1, "kept");
            tracing::trace!("dropped");
        });
        assert_eq!(lines, vec![(Level::DEBUG, "DEBUG page: kept".to_owned())]);
    }

    #[test]
    fn level_names() {
        assert_eq!(parse_level("INFO"), Some(LevelFilter::INFO));
        assert_eq!(parse_level("trace"), Some(LevelFilter::TRACE));
        assert_eq!(parse_level("verbose"), None);
    }

    #[test]
    fn fallback_logging_reaches_the_sink() {
        let sink = CaptureSink::default();
        let booted = with_fallback_logging(sink.clone(), || {
            tracing::debug!("below the default level");
            tracing::error!(reason = "no document", "page not booted");
            false
        });
        assert!(!booted);
        assert_eq!(
            sink.lines(),
            vec![(
                Level::ERROR,
                "ERROR page not booted reason=no document".to_owned()
            )]
        );
    }

    #[test]
    fn every_config_level_has_a_filter() {
        for level in LogLevel::ALL {
            assert_eq!(parse_level(level.as_str()), Some(level_filter(level)));
        }
        let filters: Vec<_> = LogLevel::ALL.into_iter().map(level_filter).collect();
        assert!(filters.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
