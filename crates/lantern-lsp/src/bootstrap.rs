//! Server bootstrap orchestration.

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use lantern_config::{Config, ConfigError};
use lantern_rpc::{HandlerRegistry, RegistryError, Session, SessionOptions, TracingObserver};
use thiserror::Error;

use crate::exit::ExitStatus;
use crate::health::HealthReporter;
use crate::lifecycle::{self, Lifecycle};
use crate::telemetry::{self, LogSink, TelemetryError};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the server configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when arguments or environment values are
    /// invalid, or when help or version output was requested.
    fn load(&self) -> Result<Config, ConfigError>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        Config::load()
    }
}

/// Loader that always yields the same configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps an already resolved configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: ConfigError,
    },
    /// The `--log` file could not be opened.
    #[error("failed to open log file '{}': {source}", path.display())]
    LogFile {
        /// Path given on the command line.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The method table could not be assembled.
    #[error("failed to register handlers: {source}")]
    Handlers {
        /// Underlying registry error.
        #[source]
        source: RegistryError,
    },
}

/// A bootstrapped server, ready to serve one session.
pub struct Server {
    config: Config,
    reporter: Arc<dyn HealthReporter>,
    lifecycle: Arc<Lifecycle>,
    registry: HandlerRegistry,
}

impl Server {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Lifecycle state shared with the registered handlers.
    #[must_use]
    pub fn lifecycle(&self) -> Arc<Lifecycle> {
        Arc::clone(&self.lifecycle)
    }

    /// Serves a single session over `input` and `output` and maps its end
    /// to an exit status.
    #[must_use]
    pub fn serve<R: BufRead, W: Write>(self, input: R, output: W) -> ExitStatus {
        let Self {
            config,
            reporter,
            lifecycle,
            registry,
        } = self;
        let options = SessionOptions {
            observer: TracingObserver::shared(),
            exit_signal: lifecycle.exit_signal(),
            max_content_length: config.max_content_length(),
        };

        reporter.serving();
        let result = Session::with_options(input, output, registry, options).run();
        ExitStatus::from_session(&result, &lifecycle)
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Server")
            .field("config", &self.config)
            .field("lifecycle", &self.lifecycle)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// Bootstraps the server using the supplied collaborators.
///
/// # Errors
///
/// Returns [`BootstrapError`] when configuration, the log file, telemetry
/// or handler registration fails. The reporter sees every failure before it
/// is returned.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
) -> Result<Server, BootstrapError> {
    reporter.bootstrap_starting();

    let config = match loader.load() {
        Ok(config) => config,
        Err(source) => {
            let error = BootstrapError::Configuration { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let sink = match open_sink(&config) {
        Ok(sink) => sink,
        Err(error) => {
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    if let Err(source) = telemetry::initialise(&config, sink) {
        let error = BootstrapError::Telemetry { source };
        reporter.bootstrap_failed(&error);
        return Err(error);
    }

    let lifecycle = Arc::new(Lifecycle::new());
    let mut registry = HandlerRegistry::new();
    if let Err(source) = lifecycle::register(&mut registry, &lifecycle) {
        let error = BootstrapError::Handlers { source };
        reporter.bootstrap_failed(&error);
        return Err(error);
    }

    reporter.bootstrap_succeeded(&config);

    Ok(Server {
        config,
        reporter,
        lifecycle,
        registry,
    })
}

fn open_sink(config: &Config) -> Result<LogSink, BootstrapError> {
    let Some(path) = config.log_file() else {
        return Ok(LogSink::Stderr);
    };
    File::create(path)
        .map(LogSink::File)
        .map_err(|source| BootstrapError::LogFile {
            path: path.to_path_buf(),
            source,
        })
}
