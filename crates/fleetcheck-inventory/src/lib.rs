//! fleetcheck-inventory: inventory model and selector resolution
//!
//! Parses INI-style inventories, computes effective host variables and
//! expands selector expressions (groups, hosts, wildcards, exclusions) into
//! concrete host lists.

pub mod error;
pub mod parser;
pub mod pattern;
pub mod selector;
pub mod types;
pub mod vars;

pub use error::InventoryError;
pub use pattern::wildcard_match;
pub use selector::Selector;
pub use types::{ALL_GROUP, GroupHosts, InventoryModel, ResolvedHosts, UNGROUPED_GROUP, Vars};
