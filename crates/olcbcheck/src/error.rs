//! Top-level run errors and exit codes.

use std::io;

use olcbcheck_core::CheckError;
use thiserror::Error;

/// Exit code for a passed check.
pub const EXIT_PASS: u8 = 0;

/// Exit code for a link or setup problem.
pub const EXIT_SETUP: u8 = 2;

/// Exit code for a node that failed the check.
pub const EXIT_FAIL: u8 = 3;

/// Why a run did not pass.
#[derive(Debug, Error)]
pub enum RunError {
    /// The hub could not be reached.
    #[error("could not connect to {host}:{port}: {source}")]
    Connect {
        /// Hub host name
        host: String,
        /// Hub TCP port
        port: u16,
        /// Underlying socket error
        #[source]
        source: io::Error,
    },

    /// The check ran and did not pass, or the link failed during it.
    #[error(transparent)]
    Check(#[from] CheckError),
}

impl RunError {
    /// Process exit code for this error.
    ///
    /// The node is only blamed for check failures; everything else is a
    /// setup problem.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Check(err) if err.is_check_failure() => EXIT_FAIL,
            Self::Connect { .. } | Self::Check(_) => EXIT_SETUP,
        }
    }
}
