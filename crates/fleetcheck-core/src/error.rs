//! Core error types for fleetcheck-core

use fleetcheck_inventory::InventoryError;
use thiserror::Error;

/// Errors that stop a run before any host is contacted
///
/// Per-host failures are not errors at this level; they are collected into
/// the run report.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Inventory could not be loaded
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// Selector matched no hosts
    #[error("{0}")]
    Selector(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// A host task ended without producing an outcome
    #[error("task failed: {0}")]
    TaskFailed(String),
}
