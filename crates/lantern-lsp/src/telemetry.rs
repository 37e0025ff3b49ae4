//! Structured telemetry initialisation for the server.
//!
//! Standard output carries the protocol stream, so the subscriber writes to
//! standard error or to the `--log` file and nowhere else.

use std::fs::File;
use std::io::{self, IsTerminal};
use std::sync::Mutex;

use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::{self, writer::BoxMakeWriter};

use lantern_config::{Config, LogFormat};

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Destination for log lines.
#[derive(Debug)]
pub enum LogSink {
    /// The process's standard error.
    Stderr,
    /// An opened log file.
    File(File),
}

impl LogSink {
    fn is_terminal(&self) -> bool {
        match self {
            Self::Stderr => io::stderr().is_terminal(),
            Self::File(_) => false,
        }
    }

    fn into_writer(self) -> BoxMakeWriter {
        match self {
            Self::Stderr => BoxMakeWriter::new(io::stderr),
            Self::File(file) => BoxMakeWriter::new(Mutex::new(file)),
        }
    }
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Configures the global tracing subscriber when invoked for the first time.
///
/// Repeated calls are idempotent: only the first installs a subscriber, and
/// later sinks are dropped unused.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] when the filter directive does not
/// parse, or [`TelemetryError::Subscriber`] when another subscriber was
/// installed outside this module.
pub fn initialise(config: &Config, sink: LogSink) -> Result<(), TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(config, sink))
        .map(|_| ())
}

/// Parses the configured filter directive.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] when the directive is malformed.
pub fn parse_filter(directive: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(directive).map_err(|error| TelemetryError::Filter(error.to_string()))
}

fn install_subscriber(config: &Config, sink: LogSink) -> Result<(), TelemetryError> {
    let filter = parse_filter(config.log_filter())?;
    let ansi = sink.is_terminal();
    let writer = sink.into_writer();

    let builder = |filter: EnvFilter, writer: BoxMakeWriter| {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(writer)
            .with_ansi(ansi)
            .with_timer(fmt::time::UtcTime::rfc_3339())
    };

    let subscriber: Box<dyn Subscriber + Send + Sync> = match config.log_format() {
        LogFormat::Json => Box::new(builder(filter, writer).json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder(filter, writer).compact().finish()),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}
