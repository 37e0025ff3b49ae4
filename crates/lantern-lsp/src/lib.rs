//! A minimal Language Server that speaks LSP over standard input and output.
//!
//! The binary bootstraps in three steps. It loads [`lantern_config::Config`]
//! from flags and environment, installs a `tracing` subscriber writing to
//! standard error or the `--log` file, and registers the lifecycle handlers
//! with a [`lantern_rpc::HandlerRegistry`]. A single session then runs until
//! the client disconnects, sends `exit`, or breaks the framing.
//!
//! Each stage reports through a [`HealthReporter`] so the bootstrap can be
//! observed in tests without a global subscriber. [`run`] ties the stages
//! together and returns the [`ExitStatus`] the process should end with.

mod bootstrap;
mod exit;
mod health;
pub mod lifecycle;
mod telemetry;

use std::fmt::Display;
use std::io::{BufRead, Write};
use std::sync::Arc;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Server, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use exit::ExitStatus;
pub use health::{HealthReporter, StructuredHealthReporter};
pub use lifecycle::Lifecycle;
pub use telemetry::{LogSink, TelemetryError};

/// Bootstraps the server and serves one session.
///
/// Help and version requests print their text and end cleanly. Any other
/// bootstrap failure is written to `stderr` and yields
/// [`ExitStatus::BootstrapFailed`].
pub fn run<R: BufRead, W: Write>(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    input: R,
    output: W,
    stderr: &mut dyn Write,
) -> ExitStatus {
    let status = match bootstrap_with(loader, Arc::clone(&reporter)) {
        Ok(server) => server.serve(input, output),
        Err(error) => bootstrap_failure(&error, stderr),
    };
    reporter.stopped(status);
    status
}

fn bootstrap_failure(error: &BootstrapError, stderr: &mut dyn Write) -> ExitStatus {
    match error {
        BootstrapError::Configuration { source } if source.is_informational() => {
            if let Err(print_error) = source.print() {
                write_diagnostic(stderr, &print_error);
            }
            ExitStatus::Clean
        }
        BootstrapError::Configuration { source } => {
            write_diagnostic(stderr, source);
            ExitStatus::BootstrapFailed
        }
        BootstrapError::LogFile { .. }
        | BootstrapError::Telemetry { .. }
        | BootstrapError::Handlers { .. } => {
            write_diagnostic(stderr, &format_args!("lantern-lsp: {error}"));
            ExitStatus::BootstrapFailed
        }
    }
}

fn write_diagnostic(stderr: &mut dyn Write, message: &dyn Display) {
    // Nowhere left to report to if stderr itself is gone.
    if writeln!(stderr, "{message}").is_err() {
        tracing::debug!(target: "lantern_lsp::health", "stderr unavailable for diagnostics");
    }
}

#[cfg(test)]
mod tests;
