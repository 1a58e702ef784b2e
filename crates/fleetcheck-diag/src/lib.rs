//! fleetcheck-diag: diagnostic payload pipeline
//!
//! Recovers RISU payloads from raw command output or runner events,
//! normalizes them into per-host results and aggregates a run report.

pub mod aggregate;
pub mod error;
pub mod events;
pub mod extract;
pub mod format;
pub mod normalize;
pub mod types;

pub use aggregate::RunAggregator;
pub use error::DiagnosticsError;
pub use events::{EventCollector, RunnerEvent};
pub use extract::{extract_from_candidates, extract_payload, output_candidates};
pub use format::format_report;
pub use normalize::{normalize, normalize_message};
pub use types::{
    DiagnosticIssue, DiagnosticsRun, ExecutionSummary, HostDiagnosticResult, Payload, RunStatus,
    Severity,
};
