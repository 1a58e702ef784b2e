//! fleetcheck-api: caller-facing request and response types
//!
//! Request types accept the loosely-typed values that tool-calling clients
//! send and normalize them once at the boundary. Response types shape the
//! inventory and run reports for output.

pub mod loose;
pub mod requests;
pub mod responses;

pub use loose::LooseValue;
pub use requests::{DiagnosticsRequest, ResolveHostsRequest, ShowInventoryRequest};
pub use responses::{
    DiagnosticsResponse, HostVarsView, InventoryView, ResolvedHostsView, sanitize_vars,
};
