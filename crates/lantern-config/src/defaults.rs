//! Default values for configuration fields.

use crate::logging::LogFormat;

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default upper bound on a declared message body length (64 MiB).
pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 64 * 1024 * 1024;

/// Environment variable overriding the log filter.
pub const LOG_FILTER_ENV: &str = "LANTERN_LOG_FILTER";

/// Environment variable overriding the log format.
pub const LOG_FORMAT_ENV: &str = "LANTERN_LOG_FORMAT";

/// Environment variable overriding the body length limit.
pub const MAX_CONTENT_LENGTH_ENV: &str = "LANTERN_MAX_CONTENT_LENGTH";

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the binaries; JSON is opt-in.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}
