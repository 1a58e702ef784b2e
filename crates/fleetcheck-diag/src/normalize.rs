//! Payload normalization into per-host results

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::types::{DiagnosticIssue, HostDiagnosticResult, Payload, Severity};

/// Maximum length of an issue message, ellipsis included
pub const MESSAGE_LIMIT: usize = 400;

const ELLIPSIS: &str = "...";

/// Trim a message and cap it at [`MESSAGE_LIMIT`] characters
#[must_use]
pub fn normalize_message(message: &str) -> String {
    let cleaned = message.trim();
    if cleaned.chars().count() <= MESSAGE_LIMIT {
        return cleaned.to_string();
    }
    let mut truncated: String = cleaned
        .chars()
        .take(MESSAGE_LIMIT - ELLIPSIS.len())
        .collect();
    truncated.push_str(ELLIPSIS);
    truncated
}

/// Outcome of a single check entry
enum CheckOutcome {
    Passed,
    Failed(DiagnosticIssue),
    Malformed,
}

/// Convert an extracted payload into a host result
///
/// Entries whose shape is unexpected are logged and counted as skipped; they
/// never abort the rest of the payload.
#[must_use]
pub fn normalize(host: &str, payload: &Payload) -> HostDiagnosticResult {
    let empty = Map::new();
    let results = match payload.get("results") {
        Some(Value::Object(results)) => results,
        None | Some(Value::Null) => &empty,
        Some(other) => {
            warn!(host = %host, kind = %json_kind(other), "payload results is not a map");
            &empty
        }
    };

    let mut passed = 0;
    let mut failed = 0;
    let mut issues = Vec::new();

    for (check_id, entry) in results {
        match classify(check_id, entry) {
            CheckOutcome::Passed => passed += 1,
            CheckOutcome::Failed(issue) => {
                failed += 1;
                issues.push(issue);
            }
            CheckOutcome::Malformed => {
                warn!(host = %host, check = %check_id, "skipping malformed check entry");
            }
        }
    }

    let total_checks = results.len();
    let metadata = payload
        .get("metadata")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    debug!(host = %host, total_checks, passed, failed, "payload normalized");

    HostDiagnosticResult {
        host: host.to_string(),
        total_checks,
        passed,
        failed,
        skipped: total_checks.saturating_sub(passed + failed),
        issues,
        metadata,
    }
}

fn classify(check_id: &str, entry: &Value) -> CheckOutcome {
    let Some(entry) = entry.as_object() else {
        return CheckOutcome::Malformed;
    };

    let result = match entry.get("result") {
        Some(Value::Object(result)) => Some(result),
        None | Some(Value::Null) => None,
        Some(_) => return CheckOutcome::Malformed,
    };

    let rc = match result.and_then(|r| r.get("rc")) {
        None | Some(Value::Null) => None,
        Some(value) => match return_code(value) {
            Some(rc) => Some(rc),
            None => return CheckOutcome::Malformed,
        },
    };

    let Some(rc) = rc.filter(|rc| *rc != 0) else {
        return CheckOutcome::Passed;
    };

    let message = [
        result.and_then(|r| text(r.get("err"))),
        result.and_then(|r| text(r.get("out"))),
        text(entry.get("description")),
    ]
    .into_iter()
    .flatten()
    .next()
    .unwrap_or_default();

    let plugin_id = text(entry.get("plugin"))
        .or_else(|| text(entry.get("id")))
        .unwrap_or(check_id)
        .to_string();
    let name = text(entry.get("name"))
        .map(str::to_string)
        .unwrap_or_else(|| plugin_stem(&plugin_id));

    let metadata: BTreeMap<String, String> = ["backend", "hash"]
        .into_iter()
        .filter_map(|key| scalar(entry.get(key)).map(|value| (key.to_string(), value)))
        .collect();

    CheckOutcome::Failed(DiagnosticIssue {
        plugin_id,
        name,
        severity: Severity::from_rc(Some(rc)),
        return_code: Some(rc),
        message: normalize_message(message),
        category: text(entry.get("category")).map(str::to_string),
        subcategory: text(entry.get("subcategory")).map(str::to_string),
        metadata,
    })
}

/// Integer return code from a number or numeric string
fn return_code(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Non-empty string field
fn text(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// String or scalar field rendered as text
fn scalar(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn plugin_stem(plugin: &str) -> String {
    Path::new(plugin)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| plugin.to_string())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
