//! fleetcheck-exec: command execution boundary
//!
//! Runs the RISU diagnostic command on a host, either locally or through the
//! system `ssh` client, and derives connection details from inventory vars.

pub mod command;
pub mod error;
pub mod local;
pub mod result;
pub mod ssh;
pub mod traits;

pub use command::{DiagnosticCommand, shell_quote};
pub use error::ExecError;
pub use local::LocalExecutor;
pub use result::{CommandResult, ConnectionInfo};
pub use ssh::SshExecutor;
pub use traits::RemoteExecutor;
