//! Configuration for the Lantern language server.
//!
//! Settings come from command-line flags, falling back to `LANTERN_*`
//! environment variables and then to the values in [`defaults`]. Standard
//! output carries the protocol stream, so every logging destination here
//! resolves to standard error or a file.

pub mod defaults;
mod logging;

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use clap::Parser;
use clap::error::ErrorKind;
use thiserror::Error;

pub use logging::LogFormat;

use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_MAX_CONTENT_LENGTH, LOG_FILTER_ENV, LOG_FORMAT_ENV,
    MAX_CONTENT_LENGTH_ENV,
};

/// Runtime configuration for `lantern-lsp`.
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(
    name = "lantern-lsp",
    version,
    about = "A minimal Language Server speaking JSON-RPC over stdio"
)]
pub struct Config {
    /// Write logs to PATH (created or truncated) instead of standard error.
    #[arg(long = "log", value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Tracing filter directive, e.g. `info` or `lantern_rpc=debug`.
    #[arg(long, value_name = "EXPR", env = LOG_FILTER_ENV, default_value = DEFAULT_LOG_FILTER)]
    pub log_filter: String,

    /// Log line format.
    #[arg(
        long,
        value_name = "FORMAT",
        env = LOG_FORMAT_ENV,
        default_value_t = defaults::default_log_format()
    )]
    pub log_format: LogFormat,

    /// Largest accepted Content-Length in bytes.
    #[arg(
        long,
        value_name = "BYTES",
        env = MAX_CONTENT_LENGTH_ENV,
        default_value_t = DEFAULT_MAX_CONTENT_LENGTH,
        value_parser = parse_content_limit
    )]
    pub max_content_length: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_file: None,
            log_filter: defaults::default_log_filter().to_owned(),
            log_format: defaults::default_log_format(),
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
        }
    }
}

impl Config {
    /// Loads configuration from the process arguments and environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an argument or environment value is
    /// invalid, or when `--help` or `--version` was requested.
    pub fn load() -> Result<Self, ConfigError> {
        Self::try_parse().map_err(ConfigError::from)
    }

    /// Loads configuration from an explicit argument list.
    ///
    /// The first item is the program name. Environment fallbacks still
    /// apply.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] under the same conditions as
    /// [`Config::load`].
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::try_parse_from(args).map_err(ConfigError::from)
    }

    /// Log file path, when logs should not go to standard error.
    #[must_use]
    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    /// Tracing filter directive.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log line format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Largest accepted `Content-Length`.
    #[must_use]
    pub const fn max_content_length(&self) -> usize {
        self.max_content_length
    }
}

/// Errors raised while loading [`Config`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Arguments or environment values could not be parsed.
    #[error(transparent)]
    Arguments(#[from] clap::Error),
}

impl ConfigError {
    /// Returns `true` when the "error" is a requested help or version text.
    #[must_use]
    pub fn is_informational(&self) -> bool {
        let Self::Arguments(error) = self;
        matches!(
            error.kind(),
            ErrorKind::DisplayHelp
                | ErrorKind::DisplayVersion
                | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
        )
    }

    /// Prints the formatted message, to stdout for help and version text
    /// and to stderr otherwise.
    ///
    /// # Errors
    ///
    /// Returns any I/O error raised while writing.
    pub fn print(&self) -> io::Result<()> {
        let Self::Arguments(error) = self;
        error.print()
    }
}

fn parse_content_limit(value: &str) -> Result<usize, String> {
    let limit: usize = value
        .trim()
        .parse()
        .map_err(|error| format!("expected a byte count: {error}"))?;
    if limit == 0 {
        return Err("the limit must be at least one byte".to_owned());
    }
    Ok(limit)
}
