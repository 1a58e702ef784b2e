//! Error types for fleetcheck-exec

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while running a command
#[derive(Error, Debug, Clone)]
pub enum ExecError {
    /// SSH could not reach or authenticate to the host
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Command timed out
    #[error("command timed out after {timeout:?}")]
    Timeout {
        /// Timeout duration that was exceeded
        timeout: Duration,
    },

    /// Process spawn error
    #[error("failed to spawn process: {0}")]
    SpawnError(String),

    /// I/O error during execution
    #[error("I/O error: {0}")]
    IoError(String),

    /// Invalid connection variables
    #[error("invalid configuration: {0}")]
    ConfigError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            ExecError::Timeout {
                timeout: Duration::from_secs(600)
            }
            .to_string(),
            "command timed out after 600s"
        );
        assert_eq!(
            ExecError::ConfigError("invalid ansible_port 'x' for h".into()).to_string(),
            "invalid configuration: invalid ansible_port 'x' for h"
        );
    }
}
