//! Request types

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use fleetcheck_core::RunRequest;

use crate::loose::LooseValue;

/// Default target for diagnostics requests
pub const DEFAULT_HOSTS: &str = "localhost";

fn default_hosts() -> String {
    DEFAULT_HOSTS.to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShowInventoryRequest {
    #[serde(default)]
    pub inventory: LooseValue,
}

impl ShowInventoryRequest {
    #[must_use]
    pub fn inventory_path(&self) -> Option<PathBuf> {
        self.inventory.normalize().map(PathBuf::from)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolveHostsRequest {
    #[serde(default)]
    pub selector: LooseValue,
    #[serde(default)]
    pub inventory: LooseValue,
}

impl ResolveHostsRequest {
    /// Selector to resolve; absent means every host
    #[must_use]
    pub fn selector(&self) -> String {
        self.selector.normalize().unwrap_or_default()
    }

    #[must_use]
    pub fn inventory_path(&self) -> Option<PathBuf> {
        self.inventory.normalize().map(PathBuf::from)
    }
}

/// Request to run diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsRequest {
    #[serde(default = "default_hosts")]
    pub hosts: String,
    #[serde(default)]
    pub plugin_filter: LooseValue,
    #[serde(default)]
    pub inventory: LooseValue,
}

impl Default for DiagnosticsRequest {
    fn default() -> Self {
        Self {
            hosts: default_hosts(),
            plugin_filter: LooseValue::Null,
            inventory: LooseValue::Null,
        }
    }
}

impl DiagnosticsRequest {
    /// Normalized runner request
    #[must_use]
    pub fn to_run_request(&self) -> RunRequest {
        RunRequest {
            selector: self.hosts.trim().to_string(),
            plugin_filter: self.plugin_filter.normalize(),
            inventory: self.inventory.normalize().map(PathBuf::from),
        }
    }
}
