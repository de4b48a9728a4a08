use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use crossterm::style::Stylize;

/// Whether log lines carry level, time and origin.
///
/// Toggled by the logger initialization as verbosity becomes known.
pub(crate) static DETAILED_LOGS: AtomicBool = AtomicBool::new(false);

#[derive(Default, Debug)]
struct LogFields {
    message: Option<String>,
    file: Option<String>,
    line: Option<String>,
    /// Structured fields other than the message, as `name=value`.
    extra: Vec<String>,
}

struct LoggerVisitor<'a>(&'a mut LogFields);

impl tracing::field::Visit for LoggerVisitor<'_> {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        match field.name() {
            "message" => self.0.message = Some(value.to_string()),
            "log.file" => self.0.file = Some(value.to_string()),
            "log.line" => self.0.line = Some(value.to_string()),
            "log.target" | "log.module_path" => {},
            name => self.0.extra.push(format!("{name}={value}")),
        }
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.record_str(field, &value.to_string());
    }

    fn record_error(
        &mut self,
        field: &tracing::field::Field,
        value: &(dyn std::error::Error + 'static),
    ) {
        self.record_str(field, &value.to_string());
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.record_str(field, &format!("{value:?}"));
    }
}

/// Formats events from both `tracing` and the `log` bridge.
pub struct LogFormatter;

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for LogFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut f: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();

        let mut fields = LogFields::default();
        let mut visitor = LoggerVisitor(&mut fields);
        event.record(&mut visitor);

        // If for any reason the message is not present,
        // we don't have anything to log
        let Some(mut message) = fields.message else {
            return Ok(());
        };
        if !fields.extra.is_empty() {
            message = format!("{message} {}", fields.extra.join(" "));
        }

        if !DETAILED_LOGS.load(Ordering::Relaxed) {
            writeln!(f, "{message}")?;
            return Ok(());
        }

        // The output will look like this:
        //
        // ERROR 2021-08-25T14:00:00.000000000+02:00 path/to/file.rs:42: <message>

        let level_prefix = {
            let level = metadata.level();
            let level_prefix = level.as_str();

            match *level {
                tracing::Level::ERROR => level_prefix.red(),
                tracing::Level::WARN => level_prefix.yellow(),
                _ => level_prefix.dark_grey(),
            }
        };

        let time_prefix: chrono::DateTime<chrono::Local> = chrono::Local::now();

        let origin_prefix = {
            let file = fields
                .file
                .as_deref()
                .or(metadata.file())
                .unwrap_or("<unknown file>");
            let line = fields
                .line
                .or(metadata.line().map(|line| line.to_string()))
                .unwrap_or_else(|| "??".to_string());

            format!("{file}:{line}")
        };

        let head = format!("{level_prefix} {time_prefix} {origin_prefix}").bold();

        writeln!(f, "{head}: {message}")
    }
}
