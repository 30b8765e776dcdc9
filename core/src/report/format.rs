use std::fmt::{self, Write as _};

use chrono::Local;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

use crate::util::time::log_stamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogScope {
    Run,
    Phase,
    Task,
    Warn,
    Error,
    Debug,
}

impl LogScope {
    pub fn as_str(self) -> &'static str {
        match self {
            LogScope::Run => "RUN",
            LogScope::Phase => "PHASE",
            LogScope::Task => "TASK",
            LogScope::Warn => "WARN",
            LogScope::Error => "ERROR",
            LogScope::Debug => "DEBUG",
        }
    }

    /// Scope for events that did not set one (third-party crates, plugins).
    pub fn for_level(level: &Level) -> Self {
        match *level {
            Level::ERROR => LogScope::Error,
            Level::WARN => LogScope::Warn,
            Level::INFO => LogScope::Run,
            _ => LogScope::Debug,
        }
    }
}

pub fn level_name(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "ERROR",
        Level::WARN => "WARN",
        Level::INFO => "INFO",
        Level::DEBUG => "DEBUG",
        Level::TRACE => "TRACE",
    }
}

/// `<timestamp> [<LEVEL>] [<SCOPE>] <message>`
pub fn render_line(timestamp: &str, level: &str, scope: &str, message: &str) -> String {
    format!("{timestamp} [{level}] [{scope}] {message}")
}

/// Formats every event as one [`render_line`] line.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScopedLineFormat;

impl<S, N> FormatEvent<S, N> for ScopedLineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut fields = LineFields::default();
        event.record(&mut fields);

        let level = event.metadata().level();
        let scope = fields
            .scope
            .unwrap_or_else(|| LogScope::for_level(level).as_str().to_string());
        let mut level_text = level_name(level).to_string();
        if writer.has_ansi_escapes() {
            level_text = paint(level, &level_text);
        }

        fields.message.push_str(&fields.extra);
        let line = render_line(
            &log_stamp(Local::now()),
            &level_text,
            &scope,
            &fields.message,
        );
        writeln!(writer, "{line}")
    }
}

fn paint(level: &Level, text: &str) -> String {
    let code = match *level {
        Level::ERROR => "31",
        Level::WARN => "33",
        Level::INFO => "32",
        Level::DEBUG => "34",
        Level::TRACE => "35",
    };
    format!("\x1b[{code}m{text}\x1b[0m")
}

#[derive(Default)]
struct LineFields {
    scope: Option<String>,
    message: String,
    extra: String,
}

impl LineFields {
    fn push_extra(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let _ = write!(self.extra, " {}={:?}", field.name(), value);
    }
}

impl Visit for LineFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "scope" => self.scope = Some(value.to_string()),
            "message" => self.message = value.to_string(),
            _ => self.push_extra(field, &value),
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            "message" => self.message = format!("{value:?}"),
            "scope" => self.scope = Some(format!("{value:?}").trim_matches('"').to_string()),
            _ => self.push_extra(field, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use tracing_subscriber::fmt::MakeWriter;

    use super::*;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Capture {
        type Writer = Capture;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn renders_uniform_line() {
        assert_eq!(
            render_line("2026-10-16T09:00:00.000+02:00", "INFO", "RUN", "start"),
            "2026-10-16T09:00:00.000+02:00 [INFO] [RUN] start"
        );
    }

    #[test]
    fn formatter_uses_scope_field_and_level_fallback() {
        let capture = Capture::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(capture.clone())
            .with_ansi(false)
            .with_max_level(Level::DEBUG)
            .event_format(ScopedLineFormat)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            crate::report::log::phase("scrape start");
            tracing::warn!(attempt = 2, "no scope here");
            crate::report::log::debug("hidden detail");
        });

        let out = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with(" [INFO] [PHASE] scrape start"), "{}", lines[0]);
        assert!(lines[1].ends_with(" [WARN] [WARN] no scope here attempt=2"), "{}", lines[1]);
        assert!(lines[2].ends_with(" [DEBUG] [DEBUG] hidden detail"), "{}", lines[2]);
    }

    #[test]
    fn level_filter_suppresses_lower_lines() {
        let capture = Capture::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(capture.clone())
            .with_ansi(false)
            .with_max_level(Level::INFO)
            .event_format(ScopedLineFormat)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            crate::report::log::debug("dropped");
            crate::report::log::task("kept");
        });

        let out = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        assert_eq!(out.lines().count(), 1);
        assert!(out.contains("[TASK] kept"));
    }
}
