//! SSH command execution through the system `ssh` client

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::command::shell_quote;
use crate::error::ExecError;
use crate::local::LocalExecutor;
use crate::result::{CommandResult, ConnectionInfo};
use crate::traits::RemoteExecutor;

/// Exit status `ssh` uses for its own failures
const SSH_ERROR_STATUS: i32 = 255;

/// SSH command executor
///
/// Wraps each command in a non-interactive `ssh` invocation run by a
/// [`LocalExecutor`]. Host key checking is disabled and password prompts are
/// refused, so an unreachable host fails fast instead of hanging.
#[derive(Debug, Clone)]
pub struct SshExecutor {
    /// Connection configuration
    conn_info: ConnectionInfo,
    transport: LocalExecutor,
}

impl SshExecutor {
    /// Create a new SSH executor
    #[must_use]
    pub fn new(conn_info: ConnectionInfo) -> Self {
        Self {
            conn_info,
            transport: LocalExecutor::new(),
        }
    }

    /// Local command line that runs `cmd` on the remote host
    ///
    /// `ssh_common_args` is inserted unquoted so the local shell splits it.
    #[must_use]
    pub fn command_line(&self, cmd: &str) -> String {
        let mut parts: Vec<String> = [
            "ssh",
            "-o",
            "BatchMode=yes",
            "-o",
            "StrictHostKeyChecking=no",
        ]
        .into_iter()
        .map(str::to_string)
        .collect();

        if let Some(port) = self.conn_info.port {
            parts.push("-p".to_string());
            parts.push(port.to_string());
        }
        if let Some(key) = &self.conn_info.ssh_key {
            parts.push("-i".to_string());
            parts.push(shell_quote(key));
        }
        if let Some(args) = &self.conn_info.ssh_common_args {
            parts.push(args.clone());
        }

        parts.push(shell_quote(&self.conn_info.target()));
        parts.push(shell_quote(cmd));
        parts.join(" ")
    }

    /// Map `ssh`'s own failure status to a connection error
    fn check_transport(&self, result: CommandResult) -> Result<CommandResult, ExecError> {
        if result.status == SSH_ERROR_STATUS {
            warn!(host = %self.conn_info.host, stderr = %result.stderr.trim(), "ssh connection failed");
            return Err(ExecError::ConnectionFailed(format!(
                "{}: {}",
                self.conn_info.host,
                result.failure_output()
            )));
        }
        Ok(result)
    }
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
    #[instrument(skip(self, cmd), fields(host = %self.conn_info.host))]
    async fn run(&self, cmd: &str) -> Result<CommandResult, ExecError> {
        debug!("executing remote command");
        let result = self.transport.run(&self.command_line(cmd)).await?;
        self.check_transport(result)
    }

    #[instrument(skip(self, cmd), fields(host = %self.conn_info.host))]
    async fn run_with_timeout(
        &self,
        cmd: &str,
        timeout: Duration,
    ) -> Result<CommandResult, ExecError> {
        debug!(timeout = ?timeout, "executing remote command with timeout");
        let result = self
            .transport
            .run_with_timeout(&self.command_line(cmd), timeout)
            .await?;
        self.check_transport(result)
    }

    fn executor_type(&self) -> &'static str {
        "ssh"
    }
}
