//! Runner event collection
//!
//! When diagnostics run through a playbook runner, output arrives as a stream
//! of discrete events instead of a single stdout blob. The collector keeps one
//! log and payload slot per host, attributing events to hosts by the first
//! identity field present, then a `[hostname]` token in the event's stdout,
//! else the `unknown` bucket.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::aggregate::RunAggregator;
use crate::extract::{
    extract_from_candidates, extract_payload, from_sentinel, is_diagnostics_payload,
};
use crate::normalize::{normalize, normalize_message};
use crate::types::{DiagnosticsRun, ExecutionSummary, Payload};

/// Bucket for events whose host cannot be determined
pub const UNKNOWN_HOST: &str = "unknown";

/// Event type emitted when a task fails on a host
pub const FAILED_EVENT: &str = "runner_on_failed";

/// Error added when a run captured nothing at all
pub const NO_PAYLOADS_MESSAGE: &str =
    "No diagnostic payloads were captured. Check RISU availability.";

const DEFAULT_FAILURE: &str = "Task failed";

/// Fact a playbook task may set with the payload
const PAYLOAD_FACT: &str = "risu_data_json";

// ============================================================================
// Event Shapes
// ============================================================================

/// Single event emitted by a playbook runner
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunnerEvent {
    /// Event type, e.g. `runner_on_ok`
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub event_data: Option<EventData>,
}

/// Host identity and task result carried by an event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub host_name: Option<String>,
    #[serde(default)]
    pub inventory_hostname: Option<String>,
    #[serde(default)]
    pub inventory_hostname_short: Option<String>,
    #[serde(default)]
    pub res: Option<EventResult>,
}

/// Task result fields the collector looks at
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventResult {
    #[serde(default)]
    pub msg: Option<Value>,
    #[serde(default)]
    pub stderr: Option<Value>,
    #[serde(default)]
    pub ansible_facts: Option<Map<String, Value>>,
}

impl RunnerEvent {
    /// Host this event belongs to
    #[must_use]
    pub fn host_key(&self) -> String {
        let data = self.event_data.as_ref();
        [
            data.and_then(|d| d.host.as_deref()),
            data.and_then(|d| d.host_name.as_deref()),
            data.and_then(|d| d.inventory_hostname.as_deref()),
            data.and_then(|d| d.inventory_hostname_short.as_deref()),
        ]
        .into_iter()
        .flatten()
        .find(|host| !host.is_empty())
        .or_else(|| self.stdout.as_deref().and_then(host_from_stdout))
        .unwrap_or(UNKNOWN_HOST)
        .to_string()
    }

    fn result(&self) -> Option<&EventResult> {
        self.event_data.as_ref().and_then(|d| d.res.as_ref())
    }

    fn is_failure(&self) -> bool {
        self.event == FAILED_EVENT
    }
}

static HOST_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(?P<host>[^\]]+)\]").expect("valid host pattern"));

/// First `[hostname]` token in a line of runner output
fn host_from_stdout(stdout: &str) -> Option<&str> {
    HOST_PATTERN
        .captures(stdout)?
        .name("host")
        .map(|m| m.as_str())
}

/// Text of a loosely typed `msg` or `stderr` field
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => (!s.is_empty()).then(|| s.clone()),
        Value::Array(items) if items.is_empty() => None,
        Value::Object(map) if map.is_empty() => None,
        other => Some(other.to_string()),
    }
}

// ============================================================================
// Collector
// ============================================================================

/// Accumulates runner events into per-host logs, payloads and errors
#[derive(Debug, Default)]
pub struct EventCollector {
    logs: BTreeMap<String, Vec<String>>,
    payloads: BTreeMap<String, Payload>,
    errors: Vec<String>,
}

impl EventCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a single event
    pub fn ingest(&mut self, event: &RunnerEvent) {
        let host = event.host_key();
        let stdout = event
            .stdout
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        if let Some(line) = stdout {
            self.logs.entry(host.clone()).or_default().push(line.to_string());
        }

        let res = event.result();

        if event.is_failure() {
            let message = res
                .and_then(|r| r.msg.as_ref())
                .and_then(value_text)
                .or_else(|| res.and_then(|r| r.stderr.as_ref()).and_then(value_text))
                .or_else(|| stdout.map(str::to_string))
                .unwrap_or_else(|| DEFAULT_FAILURE.to_string());
            warn!(host = %host, "runner reported task failure");
            self.errors
                .push(format!("{host}: {}", normalize_message(&message)));
        }

        if let Some(msg) = res.and_then(|r| r.msg.as_ref()).and_then(Value::as_str)
            && let Some(payload) = extract_payload(msg).filter(is_diagnostics_payload)
        {
            self.capture(&host, payload, "msg");
        }

        match res
            .and_then(|r| r.ansible_facts.as_ref())
            .and_then(|facts| facts.get(PAYLOAD_FACT))
        {
            Some(Value::String(text)) => {
                if let Some(payload) = extract_payload(text) {
                    self.capture(&host, payload, "fact");
                }
            }
            Some(Value::Object(payload)) => self.capture(&host, payload.clone(), "fact"),
            _ => {}
        }

        // Only sentinel output is trusted mid-stream; finish() scrapes the rest
        if let Some(line) = stdout
            && let Some(payload) = from_sentinel(line).filter(is_diagnostics_payload)
        {
            self.capture(&host, payload, "stdout");
        }
    }

    fn capture(&mut self, host: &str, payload: Payload, source: &str) {
        debug!(host = %host, source, "captured diagnostic payload");
        self.payloads.insert(host.to_string(), payload);
    }

    /// Stdout lines seen per host
    #[must_use]
    pub fn host_logs(&self) -> &BTreeMap<String, Vec<String>> {
        &self.logs
    }

    /// Hosts with a captured payload
    pub fn captured_hosts(&self) -> impl Iterator<Item = &str> {
        self.payloads.keys().map(String::as_str)
    }

    /// Failures recorded so far
    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Close the stream and build the run report
    ///
    /// Hosts that logged output but never produced a payload get one more
    /// chance: each log line is fed through the extractor.
    #[must_use]
    pub fn finish(mut self, selector: &str, execution: ExecutionSummary) -> DiagnosticsRun {
        for (host, lines) in &self.logs {
            if self.payloads.contains_key(host) {
                continue;
            }
            if let Some(payload) = extract_from_candidates(lines.iter().map(String::as_str)) {
                debug!(host = %host, "recovered payload from host log");
                self.payloads.insert(host.clone(), payload);
            }
        }

        let mut aggregator = RunAggregator::new();

        let exit_failed = execution.code.is_some_and(|code| code != 0);
        if exit_failed || execution.status == "failed" {
            let code = execution
                .code
                .map_or_else(|| "unknown".to_string(), |code| code.to_string());
            aggregator.add_error(format!(
                "Diagnostics run exited with code {code} (status={})",
                execution.status
            ));
        }
        for error in self.errors {
            aggregator.add_error(error);
        }

        for (host, payload) in &self.payloads {
            aggregator.add_result(normalize(host, payload));
        }

        if !aggregator.has_results() && !aggregator.has_errors() {
            aggregator.add_error(NO_PAYLOADS_MESSAGE);
        }

        aggregator.finish(selector, execution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RunStatus;
    use serde_json::json;

    fn event(value: Value) -> RunnerEvent {
        serde_json::from_value(value).unwrap()
    }

    fn ok() -> ExecutionSummary {
        ExecutionSummary::new("successful", Some(0))
    }

    #[test]
    fn test_host_key_resolution_order() {
        let e = event(json!({
            "event": "runner_on_ok",
            "event_data": {"host_name": "b", "inventory_hostname": "c"}
        }));
        assert_eq!(e.host_key(), "b");

        let e = event(json!({
            "event_data": {"host": "", "inventory_hostname_short": "short"}
        }));
        assert_eq!(e.host_key(), "short");

        let e = event(json!({"stdout": "ok: [web1.example.com] => {}"}));
        assert_eq!(e.host_key(), "web1.example.com");

        let e = event(json!({"event": "playbook_on_stats", "event_data": null}));
        assert_eq!(e.host_key(), UNKNOWN_HOST);
    }

    #[test]
    fn test_payload_from_debug_message() {
        let mut collector = EventCollector::new();
        collector.ingest(&event(json!({
            "event": "runner_on_ok",
            "event_data": {
                "host": "web1",
                "res": {"msg": "RISU_RESULTS_JSON_START:{\"results\":{\"p\":{\"result\":{\"rc\":12,\"err\":\"disk full\"}}}}:RISU_RESULTS_JSON_END"}
            }
        })));

        let run = collector.finish("web", ok());
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.hosts(), vec!["web1"]);
        assert_eq!(run.results[0].failed, 1);
        assert_eq!(run.results[0].issues[0].message, "disk full");
    }

    #[test]
    fn test_payload_from_fact() {
        let mut collector = EventCollector::new();
        collector.ingest(&event(json!({
            "event": "runner_on_ok",
            "event_data": {
                "host": "db1",
                "res": {"ansible_facts": {"risu_data_json": {"results": {"a": {"result": {"rc": 0}}}}}}
            }
        })));
        collector.ingest(&event(json!({
            "event": "runner_on_ok",
            "event_data": {
                "host": "db2",
                "res": {"ansible_facts": {"risu_data_json": "{\"results\": {}}"}}
            }
        })));

        assert_eq!(collector.captured_hosts().collect::<Vec<_>>(), vec!["db1", "db2"]);
        let run = collector.finish("db", ok());
        assert_eq!(run.results[0].passed, 1);
        assert_eq!(run.results[1].total_checks, 0);
    }

    #[test]
    fn test_failure_events_recorded() {
        let mut collector = EventCollector::new();
        collector.ingest(&event(json!({
            "event": "runner_on_failed",
            "stdout": "fatal: [web2]: UNREACHABLE!",
            "event_data": {"host": "web2", "res": {"msg": "  Failed to connect  "}}
        })));
        collector.ingest(&event(json!({
            "event": "runner_on_failed",
            "event_data": {"host": "web3", "res": {"stderr": "risu: not found"}}
        })));
        collector.ingest(&event(json!({
            "event": "runner_on_failed",
            "event_data": {"host": "web4"}
        })));

        assert_eq!(
            collector.errors(),
            &[
                "web2: Failed to connect",
                "web3: risu: not found",
                "web4: Task failed"
            ]
        );
        assert_eq!(collector.host_logs()["web2"], vec!["fatal: [web2]: UNREACHABLE!"]);

        let run = collector.finish("web", ExecutionSummary::new("failed", Some(2)));
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.errors[0], "Diagnostics run exited with code 2 (status=failed)");
        assert_eq!(run.errors.len(), 4);
    }

    #[test]
    fn test_non_string_stderr() {
        let failed = serde_json::from_str::<RunnerEvent>(
            r#"{"event":"runner_on_failed","event_data":{"host":"web1","res":{"stderr":["boom"],"msg":"failed"}}}"#,
        )
        .unwrap();

        let mut collector = EventCollector::new();
        collector.ingest(&failed);
        collector.ingest(&event(json!({
            "event": "runner_on_failed",
            "event_data": {"host": "web2", "res": {"stderr": ["boom"]}}
        })));
        collector.ingest(&event(json!({
            "event": "runner_on_failed",
            "event_data": {"host": "web3", "res": {"stderr": null, "msg": {}}}
        })));

        assert_eq!(
            collector.errors(),
            &["web1: failed", "web2: [\"boom\"]", "web3: Task failed"]
        );
    }

    #[test]
    fn test_payload_recovered_from_logs_on_finish() {
        let mut collector = EventCollector::new();
        collector.ingest(&event(json!({
            "event": "runner_on_ok",
            "stdout": "ok: [web1] => {\"changed\": false}",
            "event_data": {"host": "web1"}
        })));
        collector.ingest(&event(json!({
            "event": "verbose",
            "stdout": "[web1] {\"results\": {\"x\": {\"result\": {\"rc\": 5}}}}",
        })));
        assert_eq!(collector.captured_hosts().count(), 0);

        let run = collector.finish("web1", ok());
        assert_eq!(run.hosts(), vec!["web1"]);
        assert_eq!(run.results[0].failed, 1);
    }

    #[test]
    fn test_nothing_captured() {
        let mut collector = EventCollector::new();
        collector.ingest(&event(json!({
            "event": "runner_on_ok",
            "stdout": "ok: [web1]",
            "event_data": {"host": "web1", "res": {"msg": "hello"}}
        })));

        let run = collector.finish("", ok());
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.errors, vec![NO_PAYLOADS_MESSAGE]);
        assert_eq!(run.hosts_targeted, "all");
    }
}
