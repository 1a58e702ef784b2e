//! Run aggregation

use std::collections::HashSet;

use tracing::info;

use crate::error::DiagnosticsError;
use crate::types::{DiagnosticsRun, ExecutionSummary, HostDiagnosticResult, RunStatus};

/// Collects per-host outcomes into a [`DiagnosticsRun`]
#[derive(Debug, Default)]
pub struct RunAggregator {
    results: Vec<HostDiagnosticResult>,
    errors: Vec<String>,
}

impl RunAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_result(&mut self, result: HostDiagnosticResult) {
        self.results.push(result);
    }

    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    /// Record either outcome of a single host
    pub fn record(&mut self, outcome: Result<HostDiagnosticResult, DiagnosticsError>) {
        match outcome {
            Ok(result) => self.add_result(result),
            Err(err) => self.add_error(err.to_string()),
        }
    }

    #[must_use]
    pub fn has_results(&self) -> bool {
        !self.results.is_empty()
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Produce the final report
    ///
    /// Results are sorted by host, errors deduplicated keeping first
    /// occurrence. An empty selector is reported as `all`.
    #[must_use]
    pub fn finish(self, hosts_targeted: &str, execution: ExecutionSummary) -> DiagnosticsRun {
        let mut results = self.results;
        results.sort_by(|a, b| a.host.cmp(&b.host));

        let mut seen = HashSet::new();
        let errors: Vec<String> = self
            .errors
            .into_iter()
            .filter(|err| seen.insert(err.clone()))
            .collect();

        let status = RunStatus::classify(!results.is_empty(), !errors.is_empty());
        let hosts_targeted = match hosts_targeted.trim() {
            "" => "all".to_string(),
            selector => selector.to_string(),
        };

        info!(
            status = %status,
            results = results.len(),
            errors = errors.len(),
            "diagnostics run aggregated"
        );

        DiagnosticsRun {
            status,
            hosts_targeted,
            results,
            errors,
            execution,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn result(host: &str) -> HostDiagnosticResult {
        HostDiagnosticResult {
            host: host.to_string(),
            total_checks: 0,
            passed: 0,
            failed: 0,
            skipped: 0,
            issues: Vec::new(),
            metadata: Map::new(),
        }
    }

    fn ok() -> ExecutionSummary {
        ExecutionSummary::new("ok", Some(0))
    }

    #[test]
    fn test_completed_sorted_by_host() {
        let mut agg = RunAggregator::new();
        agg.add_result(result("web2"));
        agg.add_result(result("db1"));
        agg.add_result(result("web1"));

        let run = agg.finish("web,db", ok());
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.hosts(), vec!["db1", "web1", "web2"]);
        assert_eq!(run.hosts_targeted, "web,db");
    }

    #[test]
    fn test_partial_with_deduplicated_errors() {
        let mut agg = RunAggregator::new();
        agg.add_result(result("a"));
        agg.record(Err(DiagnosticsError::NoPayload {
            host: "b".to_string(),
        }));
        agg.add_error("c: timed out");
        agg.record(Err(DiagnosticsError::NoPayload {
            host: "b".to_string(),
        }));

        let run = agg.finish("all", ok());
        assert_eq!(run.status, RunStatus::Partial);
        assert_eq!(
            run.errors,
            vec![
                "b: no diagnostic payload found in command output",
                "c: timed out"
            ]
        );
    }

    #[test]
    fn test_failed_without_results() {
        let mut agg = RunAggregator::new();
        agg.add_error("a: unreachable");
        let run = agg.finish("", ExecutionSummary::new("failed", Some(255)));
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.hosts_targeted, "all");
        assert_eq!(run.execution.code, Some(255));

        let empty = RunAggregator::new().finish("web", ok());
        assert_eq!(empty.status, RunStatus::Failed);
        assert!(empty.errors.is_empty());
    }
}
