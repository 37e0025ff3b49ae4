//! Process exit statuses.

use std::fmt;
use std::process::ExitCode;

use lantern_rpc::{CloseReason, SessionError, SessionOutcome};

use crate::lifecycle::Lifecycle;

/// How the server process ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// The client disconnected, or sent `exit` after `shutdown`.
    Clean,
    /// The client sent `exit` without a preceding `shutdown`.
    ExitWithoutShutdown,
    /// Configuration, log file or telemetry setup failed.
    BootstrapFailed,
    /// The session ended on a framing or I/O error.
    SessionFailed,
}

impl ExitStatus {
    /// Numeric process exit code.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Clean => 0,
            Self::ExitWithoutShutdown | Self::BootstrapFailed => 1,
            Self::SessionFailed => 2,
        }
    }

    /// Maps a finished session to a status.
    #[must_use]
    pub fn from_session(
        result: &Result<SessionOutcome, SessionError>,
        lifecycle: &Lifecycle,
    ) -> Self {
        match result {
            Err(_) => Self::SessionFailed,
            Ok(outcome) => match outcome.reason {
                CloseReason::EndOfStream => Self::Clean,
                CloseReason::ExitRequested if lifecycle.shutdown_requested() => Self::Clean,
                CloseReason::ExitRequested => Self::ExitWithoutShutdown,
            },
        }
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Clean => "clean",
            Self::ExitWithoutShutdown => "exit without shutdown",
            Self::BootstrapFailed => "bootstrap failed",
            Self::SessionFailed => "session failed",
        };
        write!(formatter, "{label} ({})", self.code())
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        Self::from(status.code())
    }
}
