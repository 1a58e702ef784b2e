//! Error types for fleetcheck-inventory

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading an inventory
///
/// Malformed variable assignments never produce an error; only a missing or
/// unreadable file does.
#[derive(Error, Debug)]
pub enum InventoryError {
    /// Inventory file does not exist
    #[error("Inventory not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Inventory file exists but could not be read as UTF-8 text
    #[error("failed to read inventory {}: {source}", path.display())]
    Io {
        /// Path that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl InventoryError {
    /// Check if the inventory file was missing
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, InventoryError::NotFound(_))
    }
}
