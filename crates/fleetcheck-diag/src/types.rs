//! Diagnostic report types

use std::collections::BTreeMap;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Structured payload recovered from raw tool output
pub type Payload = Map<String, Value>;

/// Return codes at or above this are critical
pub const CRITICAL_RC: i64 = 20;
/// Return codes at or above this are major
pub const MAJOR_RC: i64 = 10;
/// Return codes at or above this are warnings
pub const WARNING_RC: i64 = 5;

// ============================================================================
// Severity
// ============================================================================

/// Coarse classification of a failing check
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Minor,
    Warning,
    Major,
    Critical,
}

impl Severity {
    /// Derive severity from a check's return code
    ///
    /// A missing or zero code is a pass and maps to `Info`.
    #[must_use]
    pub fn from_rc(rc: Option<i64>) -> Self {
        match rc {
            None | Some(0) => Severity::Info,
            Some(rc) if rc >= CRITICAL_RC => Severity::Critical,
            Some(rc) if rc >= MAJOR_RC => Severity::Major,
            Some(rc) if rc >= WARNING_RC => Severity::Warning,
            Some(_) => Severity::Minor,
        }
    }

    /// Lowercase name as used in serialized reports
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Minor => "minor",
            Severity::Warning => "warning",
            Severity::Major => "major",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Per-host Results
// ============================================================================

/// Single failing check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticIssue {
    /// Plugin path or identifier
    pub plugin_id: String,
    /// Display name
    pub name: String,
    pub severity: Severity,
    /// Raw return code reported by the check
    #[serde(default)]
    pub return_code: Option<i64>,
    /// Trimmed check output, at most 400 characters
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    /// Backend and hash of the check, when reported
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

/// Normalized diagnostics for one host
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HostDiagnosticResult {
    pub host: String,
    /// Entries in the payload's `results` map
    pub total_checks: usize,
    pub passed: usize,
    pub failed: usize,
    /// `max(total - passed - failed, 0)`
    pub skipped: usize,
    /// Failing checks ordered by check id
    #[serde(default)]
    pub issues: Vec<DiagnosticIssue>,
    /// Payload metadata plus execution tags
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl HostDiagnosticResult {
    /// Number of failing checks reported as issues
    #[must_use]
    pub fn issues_found(&self) -> usize {
        self.issues.len()
    }

    /// Capture time reported by the tool, if any
    #[must_use]
    pub fn captured_at(&self) -> Option<&str> {
        self.metadata.get("when").and_then(Value::as_str)
    }
}

impl Serialize for HostDiagnosticResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("HostDiagnosticResult", 8)?;
        state.serialize_field("host", &self.host)?;
        state.serialize_field("total_checks", &self.total_checks)?;
        state.serialize_field("passed", &self.passed)?;
        state.serialize_field("failed", &self.failed)?;
        state.serialize_field("skipped", &self.skipped)?;
        state.serialize_field("issues_found", &self.issues_found())?;
        state.serialize_field("issues", &self.issues)?;
        state.serialize_field("metadata", &self.metadata)?;
        state.end()
    }
}

// ============================================================================
// Runs
// ============================================================================

/// Overall outcome of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Results and no errors
    Completed,
    /// Results and errors
    Partial,
    /// No results at all
    Failed,
}

impl RunStatus {
    /// Classify a run from whether it produced results and errors
    #[must_use]
    pub fn classify(has_results: bool, has_errors: bool) -> Self {
        match (has_results, has_errors) {
            (true, false) => RunStatus::Completed,
            (true, true) => RunStatus::Partial,
            (false, _) => RunStatus::Failed,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Completed => "completed",
            RunStatus::Partial => "partial",
            RunStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status reported by the execution collaborator, passed through untouched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub status: String,
    #[serde(default)]
    pub code: Option<i32>,
}

impl ExecutionSummary {
    pub fn new(status: impl Into<String>, code: Option<i32>) -> Self {
        Self {
            status: status.into(),
            code,
        }
    }
}

/// Aggregated report for one run across one or more hosts
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DiagnosticsRun {
    pub status: RunStatus,
    /// Selector the run was started with
    pub hosts_targeted: String,
    /// Per-host results sorted by host name
    pub results: Vec<HostDiagnosticResult>,
    /// Unique errors in order of first occurrence
    pub errors: Vec<String>,
    pub execution: ExecutionSummary,
}

impl DiagnosticsRun {
    /// Hosts that produced results, in result order
    #[must_use]
    pub fn hosts(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.host.as_str()).collect()
    }

    /// Total failing checks across every host
    #[must_use]
    pub fn issues_found(&self) -> usize {
        self.results.iter().map(HostDiagnosticResult::issues_found).sum()
    }
}

impl Serialize for DiagnosticsRun {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("DiagnosticsRun", 6)?;
        state.serialize_field("status", &self.status)?;
        state.serialize_field("hosts_targeted", &self.hosts_targeted)?;
        state.serialize_field("hosts", &self.hosts())?;
        state.serialize_field("results", &self.results)?;
        state.serialize_field("errors", &self.errors)?;
        state.serialize_field("execution", &self.execution)?;
        state.end()
    }
}
