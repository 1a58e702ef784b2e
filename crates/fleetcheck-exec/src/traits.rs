//! Remote executor trait

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ExecError;
use crate::result::CommandResult;

/// Runs shell commands against a single host
///
/// A non-zero exit is not an error: it comes back as a [`CommandResult`]
/// so callers can inspect the output. Errors are reserved for commands that
/// could not run to completion.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Run a command to completion
    async fn run(&self, cmd: &str) -> Result<CommandResult, ExecError>;

    /// Run a command, giving up after `timeout`
    async fn run_with_timeout(
        &self,
        cmd: &str,
        timeout: Duration,
    ) -> Result<CommandResult, ExecError>;

    /// Short name of the transport, recorded in result metadata
    fn executor_type(&self) -> &'static str;
}
