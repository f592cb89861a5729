use ns_contract::{normalize, ConfidenceGate, ContractPipeline, EvidenceGate, Gate, ParseError, PipelineStep};
use ns_core::{AuditStatus, RiskLevel};
use serde_json::json;

fn samples() -> Vec<serde_json::Value> {
    vec![
        json!(null),
        json!([]),
        json!("RISK_DETECTED"),
        json!({}),
        json!({"status": "OK", "confidence": 0.40}),
        json!({"status": "OK", "confidence": 0.99}),
        json!({"status": "RISK_DETECTED", "confidence": 0.95, "findings": []}),
        json!({
            "status": "RISK_DETECTED",
            "riskLevel": "HIGH",
            "confidence": 0.88,
            "findings": [
                {"type": "BALANCE_MISMATCH", "description": "d", "evidence": {"document": "r.pdf", "page": 3, "field": "balance"}},
                {"type": "GHOST", "description": "d", "evidence": {"document": "r.pdf", "page": "UNKNOWN", "field": "balance"}}
            ]
        }),
        json!({
            "status": "RISK_DETECTED",
            "riskLevel": "LOW",
            "confidence": 0.6,
            "findings": [
                {"type": "BALANCE_MISMATCH", "description": "d", "evidence": {"document": "r.pdf", "page": 3, "field": "balance"}}
            ]
        }),
        json!({"status": "SCOPE_LIMITED", "confidence": "high", "findings": 7}),
    ]
}

#[test]
fn test_gates_are_idempotent_over_normalized_samples() {
    let ev = EvidenceGate::default();
    let conf = ConfidenceGate::default();
    for raw in samples() {
        let n = normalize(&raw);
        let e1 = ev.apply(n.clone());
        assert_eq!(ev.apply(e1.clone()), e1, "evidence gate on {raw}");
        let c1 = conf.apply(n);
        assert_eq!(conf.apply(c1.clone()), c1, "confidence gate on {raw}");
    }
}

#[test]
fn test_pipeline_output_invariants() {
    let pipeline = ContractPipeline::new(0.70);
    let ev = EvidenceGate::default();
    for raw in samples() {
        let out = match raw.as_object() {
            Some(obj) => pipeline.check_object(obj),
            None => continue,
        };
        for f in &out.findings {
            assert!(ev.is_evidenced(&f.evidence), "unevidenced finding leaked for {raw}");
        }
        if out.status == AuditStatus::RiskDetected {
            assert!(!out.findings.is_empty(), "risk without findings for {raw}");
        }
        if out.confidence < 0.70 {
            assert_eq!(out.status, AuditStatus::Unresolved);
            assert!(out.findings.is_empty());
            assert_eq!(out.risk_level, RiskLevel::None);
        }
    }
}

#[test]
fn test_unsupported_risk_scenario() {
    let out = ContractPipeline::default()
        .check_text(r#"{"status":"RISK_DETECTED","confidence":0.95,"findings":[]}"#)
        .unwrap();
    assert_eq!(out.status, AuditStatus::Unresolved);
    assert_eq!(out.risk_level, RiskLevel::None);
    assert!(out.confidence <= 0.5);
    assert!(out.findings.is_empty());
}

#[test]
fn test_low_confidence_ok_scenario() {
    let out = ContractPipeline::default().check_text(r#"{"status":"OK","confidence":0.40}"#).unwrap();
    assert_eq!(out.status, AuditStatus::Unresolved);
    assert_eq!(out.confidence, 0.40);
    assert!(out.findings.is_empty());
    assert_eq!(out.diagnostic(), Some("CONFIDENCE_GATE"));
}

#[test]
fn test_bare_string_scenario() {
    let p = ContractPipeline::default();
    assert_eq!(p.check_text("\"looks fine\""), Err(ParseError::NotAnObject("string")));
    let out = p.check_text_or_unresolved("\"looks fine\"");
    assert_eq!(out.status, AuditStatus::Unresolved);
    assert!(out.findings.is_empty());
    assert_eq!(out.confidence, 0.0);
    assert_eq!(out.diagnostic(), Some("MALFORMED_OUTPUT"));
}

#[test]
fn test_evidenced_risk_survives() {
    let out = ContractPipeline::default()
        .check_text(
            r#"{"status":"RISK_DETECTED","riskLevel":"MEDIUM","confidence":0.9,
                "findings":[{"type":"DATE_CONFLICT","description":"d",
                             "evidence":{"document":"r.pdf","page":"2","field":"date_opened"}}]}"#,
        )
        .unwrap();
    assert_eq!(out.status, AuditStatus::RiskDetected);
    assert_eq!(out.risk_level, RiskLevel::Medium);
    assert_eq!(out.findings.len(), 1);
    assert_eq!(out.diagnostic(), None);
}

#[test]
fn test_gate_order() {
    assert_eq!(ContractPipeline::default().gate_ids(), vec!["evidence_gate", "confidence_gate"]);
}

#[test]
fn test_steps_are_reported_in_gate_order() {
    let raw = json!({"status": "RISK_DETECTED", "riskLevel": "HIGH", "confidence": 0.95, "findings": []});
    let mut steps = Vec::new();
    let out = ContractPipeline::new(0.7).check_object_with(raw.as_object().unwrap(), |step, r| {
        steps.push((format!("{step:?}"), r.status));
    });

    assert_eq!(
        steps,
        vec![
            (format!("{:?}", PipelineStep::Normalized), AuditStatus::RiskDetected),
            (format!("{:?}", PipelineStep::Gated(EvidenceGate::ID)), AuditStatus::Unresolved),
            (format!("{:?}", PipelineStep::Gated(ConfidenceGate::ID)), AuditStatus::Unresolved),
        ]
    );
    assert_eq!(out, ContractPipeline::new(0.7).check_object(raw.as_object().unwrap()));
}
