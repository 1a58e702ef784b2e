//! Result and connection types for command execution

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ExecError;

/// Result of a command execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    /// Exit status code (0 for success)
    pub status: i32,
    /// stdout output
    pub stdout: String,
    /// stderr output
    pub stderr: String,
    /// Time taken to execute
    pub duration: Duration,
}

impl CommandResult {
    /// Check if command succeeded (exit code 0)
    #[must_use]
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Trimmed stderr, or stdout when stderr is empty
    #[must_use]
    pub fn failure_output(&self) -> &str {
        match self.stderr.trim() {
            "" => self.stdout.trim(),
            stderr => stderr,
        }
    }
}

/// Hosts that are always executed locally
const LOCAL_HOSTS: &[&str] = &["localhost", "127.0.0.1"];

/// Connection details derived from a host's inventory variables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Inventory host name, used as the SSH destination
    pub host: String,
    /// Run on the control node instead of over SSH
    pub local: bool,
    /// Remote user (`ansible_user` / `ansible_ssh_user`)
    pub user: Option<String>,
    /// SSH port (`ansible_port`)
    pub port: Option<u16>,
    /// Private key path (`ansible_ssh_private_key_file`)
    pub ssh_key: Option<String>,
    /// Extra SSH arguments, passed to the shell unsplit
    pub ssh_common_args: Option<String>,
    /// Privilege escalation command when `ansible_become` is set
    pub become_method: Option<String>,
}

impl ConnectionInfo {
    /// Create connection info for a host with no extra variables
    pub fn new(host: impl Into<String>) -> Self {
        let host = host.into();
        Self {
            local: LOCAL_HOSTS.contains(&host.as_str()),
            host,
            user: None,
            port: None,
            ssh_key: None,
            ssh_common_args: None,
            become_method: None,
        }
    }

    /// Derive connection info from effective host variables
    ///
    /// # Errors
    /// Returns `ExecError::ConfigError` if `ansible_port` is not a valid port.
    pub fn from_host_vars(host: &str, vars: &BTreeMap<String, String>) -> Result<Self, ExecError> {
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let mut info = Self::new(host);
        if get("ansible_connection").as_deref() == Some("local") {
            info.local = true;
        }

        info.user = get("ansible_user").or_else(|| get("ansible_ssh_user"));
        info.port = get("ansible_port")
            .map(|port| {
                port.parse::<u16>().map_err(|_| {
                    ExecError::ConfigError(format!("invalid ansible_port '{port}' for {host}"))
                })
            })
            .transpose()?;
        info.ssh_key = get("ansible_ssh_private_key_file");
        info.ssh_common_args = get("ansible_ssh_common_args");

        let become_enabled = get("ansible_become")
            .is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "yes" | "1"));
        if become_enabled {
            info.become_method =
                Some(get("ansible_become_method").unwrap_or_else(|| "sudo".to_string()));
        }

        Ok(info)
    }

    /// SSH destination, `user@host` when a user is set
    #[must_use]
    pub fn target(&self) -> String {
        match &self.user {
            Some(user) => format!("{user}@{}", self.host),
            None => self.host.clone(),
        }
    }
}
