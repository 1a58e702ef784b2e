use fleetcheck_diag::{
    DiagnosticsError, ExecutionSummary, RunAggregator, RunStatus, Severity, extract_from_candidates,
    extract_payload, format_report, normalize, output_candidates,
};
use serde_json::json;

const SCENARIO_D: &str = r#"{"results":{"p1":{"result":{"rc":0}},"p2":{"result":{"rc":12,"err":"disk full"}}}}"#;

#[test]
fn test_sentinel_and_direct_agree() {
    let sentinel = r#"RISU_RESULTS_JSON_START:{"results":{}}:RISU_RESULTS_JSON_END"#;
    let bare = r#"{"results":{}}"#;
    let expected = json!({"results": {}});

    assert_eq!(serde_json::Value::Object(extract_payload(sentinel).unwrap()), expected);
    assert_eq!(serde_json::Value::Object(extract_payload(bare).unwrap()), expected);
}

#[test]
fn test_scenario_d_counts() {
    let payload = extract_payload(SCENARIO_D).unwrap();
    let result = normalize("web1", &payload);

    assert_eq!(result.total_checks, 2);
    assert_eq!(result.passed, 1);
    assert_eq!(result.failed, 1);
    assert_eq!(result.skipped, 0);
    assert_eq!(result.issues.len(), 1);
    assert_eq!(result.issues[0].severity, Severity::Major);
}

#[test]
fn test_skipped_never_negative() {
    let payloads = [
        json!({}),
        json!({"results": {}}),
        json!({"results": {"a": 1, "b": "x", "c": null}}),
        json!({"results": {"a": {"result": {"rc": 3}}, "b": {"result": {"rc": 0}}, "c": []}}),
        json!({"results": "not a map"}),
    ];
    for payload in payloads {
        let serde_json::Value::Object(payload) = payload else {
            unreachable!()
        };
        let r = normalize("h", &payload);
        assert_eq!(
            r.skipped,
            r.total_checks.saturating_sub(r.passed + r.failed),
            "payload {payload:?}"
        );
        assert!(r.passed + r.failed + r.skipped == r.total_checks);
    }
}

#[test]
fn test_command_output_to_report() {
    // One-line summary from an ad-hoc shell run
    let web1 = format!("web1 | CHANGED | rc=0 | stdout='{SCENARIO_D}'");
    // Noisy stdout where only one line carries the payload
    let web2 = "Running plugins...\nRISU_RESULTS_JSON_START:{\"results\":{\"p\":{\"result\":{\"rc\":30,\"out\":\"kernel taint\"}}}}:RISU_RESULTS_JSON_END\ndone";

    let mut aggregator = RunAggregator::new();
    for (host, stdout) in [("web2", web2), ("web1", web1.as_str()), ("web3", "risu: not found")] {
        let outcome = extract_from_candidates(output_candidates(stdout, ""))
            .map(|payload| normalize(host, &payload))
            .ok_or(DiagnosticsError::NoPayload {
                host: host.to_string(),
            });
        aggregator.record(outcome);
    }

    let run = aggregator.finish("web", ExecutionSummary::new("ok", Some(0)));
    assert_eq!(run.status, RunStatus::Partial);
    assert_eq!(run.hosts(), vec!["web1", "web2"]);
    assert_eq!(run.results[1].issues[0].severity, Severity::Critical);
    assert_eq!(
        run.errors,
        vec!["web3: no diagnostic payload found in command output"]
    );
    assert_eq!(run.issues_found(), 2);

    let json = serde_json::to_value(&run).unwrap();
    assert_eq!(json["hosts"], json!(["web1", "web2"]));
    assert_eq!(json["results"][0]["issues_found"], 1);

    let text = format_report(&run);
    assert!(text.contains("[CRITICAL] unknown :: p"));
}
