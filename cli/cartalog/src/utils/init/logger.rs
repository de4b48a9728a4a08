use std::sync::OnceLock;
use std::sync::atomic::Ordering;

use log::{debug, error};
use tracing_subscriber::prelude::*;
use tracing_subscriber::reload::Handle;
use tracing_subscriber::{EnvFilter, Registry};

use crate::commands::Verbosity;
use crate::utils::TERMINAL_STDERR;
use crate::utils::logger::{DETAILED_LOGS, LogFormatter};

struct LockingTerminalStderr;
impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LockingTerminalStderr {
    type Writer = LockingTerminalStderr;

    fn make_writer(&'a self) -> Self::Writer {
        LockingTerminalStderr
    }
}

impl std::io::Write for LockingTerminalStderr {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Ok(mut guard) = TERMINAL_STDERR.lock() {
            guard.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if let Ok(mut guard) = TERMINAL_STDERR.lock() {
            guard.flush()?
        }
        Ok(())
    }
}

static LOGGER_HANDLE: OnceLock<Handle<EnvFilter, Registry>> = OnceLock::new();

/// The `EnvFilter` directives for a verbosity level.
///
/// `RUST_LOG` takes precedence over these.
pub(crate) fn log_filter(verbosity: Verbosity) -> &'static str {
    match verbosity {
        // Show only errors
        Verbosity::Quiet => "off,cartalog=error",
        // Only show warnings
        Verbosity::Verbose(0) => "off,cartalog=warn",
        // Show our own info logs
        Verbosity::Verbose(1) => "off,cartalog=info",
        // Also show debug from our libraries
        Verbosity::Verbose(2) => "off,cartalog=debug,cartalog_sdk=debug,cartalog_client=debug",
        Verbosity::Verbose(3) => "off,cartalog=trace,cartalog_sdk=trace,cartalog_client=trace",
        // Also show debug from the HTTP stack
        Verbosity::Verbose(4) => "debug,cartalog=trace,cartalog_sdk=trace,cartalog_client=trace",
        Verbosity::Verbose(_) => "trace",
    }
}

/// Install the global subscriber, or update its filter if already installed.
///
/// Reinitializing is cheap, so this is called again whenever more is known
/// about the requested verbosity.
pub(crate) fn init_logger(verbosity: Option<Verbosity>, debug: bool) {
    let verbosity = verbosity.unwrap_or_default();

    let detailed = debug || matches!(verbosity, Verbosity::Verbose(2..));
    DETAILED_LOGS.store(detailed, Ordering::Relaxed);

    let filter_handle = LOGGER_HANDLE.get_or_init(|| {
        let (subscriber, reload_handle) = create_registry_and_filter_reload_handle();
        if let Err(err) = subscriber.try_init() {
            eprintln!("Could not install logger: {err}");
        }
        reload_handle
    });

    update_filters(filter_handle, log_filter(verbosity));
}

pub fn update_filters(filter_handle: &Handle<EnvFilter, Registry>, log_filter: &str) {
    let result = filter_handle.modify(|layer| {
        match EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(log_filter)) {
            Ok(new_filter) => *layer = new_filter,
            Err(err) => {
                error!("Updating logger filter failed: {}", err);
            },
        };
    });
    if let Err(err) = result {
        error!("Updating logger filter failed: {}", err);
    }
}

fn create_registry_and_filter_reload_handle() -> (
    impl tracing_subscriber::util::SubscriberInitExt,
    Handle<EnvFilter, Registry>,
) {
    debug!("Initializing logger (how are you seeing this?)");
    // The first filter establishes an upper bound for `log` verbosity,
    // so start at `trace` and narrow it down through the reload handle.
    let filter = EnvFilter::new("trace");
    let (filter, filter_reload_handle) = tracing_subscriber::reload::Layer::new(filter);
    let log_layer = tracing_subscriber::fmt::layer()
        .with_writer(LockingTerminalStderr)
        .event_format(LogFormatter);
    let registry = tracing_subscriber::registry().with(filter).with(log_layer);

    (registry, filter_reload_handle)
}
