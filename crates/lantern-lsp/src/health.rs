//! Structured health reporting for server lifecycle events.

use std::sync::Arc;

use lantern_config::Config;

use crate::bootstrap::BootstrapError;
use crate::exit::ExitStatus;

/// Tracing target for health events.
pub(crate) const HEALTH_TARGET: &str = "lantern_lsp::health";

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked when the session loop starts serving.
    fn serving(&self);

    /// Invoked once the process exit status is known.
    fn stopped(&self, status: ExitStatus);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn serving(&self) {
        (**self).serving();
    }

    fn stopped(&self, status: ExitStatus) {
        (**self).stopped(status);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting server bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            log_file = config.log_file().map(|path| tracing::field::display(path.display())),
            log_filter = %config.log_filter(),
            log_format = %config.log_format(),
            max_content_length = config.max_content_length(),
            "server bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "server bootstrap failed"
        );
    }

    fn serving(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "serving",
            version = env!("CARGO_PKG_VERSION"),
            "serving on stdio"
        );
    }

    fn stopped(&self, status: ExitStatus) {
        match status {
            ExitStatus::Clean => tracing::info!(
                target: HEALTH_TARGET,
                event = "stopped",
                %status,
                "server stopped"
            ),
            ExitStatus::ExitWithoutShutdown
            | ExitStatus::BootstrapFailed
            | ExitStatus::SessionFailed => tracing::warn!(
                target: HEALTH_TARGET,
                event = "stopped",
                %status,
                "server stopped abnormally"
            ),
        }
    }
}
