//! Error types for fleetcheck-diag

use thiserror::Error;

/// Failure attributed to a single host during a run
///
/// These never abort a run. They are rendered into the run's `errors` list
/// and the remaining hosts are still processed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticsError {
    /// Command output contained no recognisable payload
    #[error("{host}: no diagnostic payload found in command output")]
    NoPayload {
        /// Host the output came from
        host: String,
    },

    /// Diagnostic command exited non-zero
    #[error("{host}: execution failed (exit {status}): {message}")]
    ExecutionFailed {
        /// Host the command ran against
        host: String,
        /// Exit status code
        status: i32,
        /// Trimmed stderr, or stdout when stderr was empty
        message: String,
    },

    /// Command could not be executed at all
    #[error("{host}: {message}")]
    Execution {
        /// Host the command targeted
        host: String,
        /// Executor error description
        message: String,
    },
}

impl DiagnosticsError {
    /// Host this failure belongs to
    #[must_use]
    pub fn host(&self) -> &str {
        match self {
            DiagnosticsError::NoPayload { host }
            | DiagnosticsError::ExecutionFailed { host, .. }
            | DiagnosticsError::Execution { host, .. } => host,
        }
    }
}
