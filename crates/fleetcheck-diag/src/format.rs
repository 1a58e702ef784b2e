//! Human-readable report rendering

use crate::types::DiagnosticsRun;

/// Issues listed per host before the rest are elided
pub const TOP_ISSUES: usize = 20;

const RULE_WIDTH: usize = 80;

/// Render a run as plain text
#[must_use]
pub fn format_report(run: &DiagnosticsRun) -> String {
    if run.results.is_empty() && run.errors.is_empty() {
        return format!("Status: {}\nNo diagnostics data available.", run.status);
    }

    let rule = "=".repeat(RULE_WIDTH);
    let mut lines = vec![
        format!("Status: {}  Targeted: {}", run.status, run.hosts_targeted),
        String::new(),
    ];

    for result in &run.results {
        lines.push(rule.clone());
        lines.push(format!("HOST: {}", result.host));
        lines.push(rule.clone());
        lines.push(format!(
            "Issues: {}  Passed: {}  Failed: {}  Skipped: {}",
            result.issues_found(),
            result.passed,
            result.failed,
            result.skipped
        ));

        if let Some(when) = result.captured_at() {
            lines.push(format!("Captured at: {when}"));
        }

        lines.push(String::new());
        if result.issues.is_empty() {
            lines.push("No failing plugins reported.".to_string());
        } else {
            lines.push("Top issues:".to_string());
            for (idx, issue) in result.issues.iter().take(TOP_ISSUES).enumerate() {
                let category = issue.category.as_deref().unwrap_or("unknown");
                lines.push(format!(
                    "  {}. [{}] {category} :: {}",
                    idx + 1,
                    issue.severity.as_str().to_uppercase(),
                    issue.name
                ));
                lines.push(format!("     {}", issue.message));
            }
            let hidden = result.issues.len().saturating_sub(TOP_ISSUES);
            if hidden > 0 {
                lines.push(format!("  ... and {hidden} more"));
            }
        }
        lines.push(String::new());
    }

    if !run.errors.is_empty() {
        lines.push(rule.clone());
        lines.push("Errors".to_string());
        lines.push(rule);
        lines.extend(run.errors.iter().map(|err| format!("- {err}")));
    }

    lines.join("\n").trim().to_string()
}
