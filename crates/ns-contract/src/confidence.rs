use ns_core::{AuditResult, Diagnostic};

use crate::gate::Gate;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.70;

/// Final stage: below the threshold nothing may be asserted, not even "no risk".
#[derive(Clone, Debug)]
pub struct ConfidenceGate {
    threshold: f64,
}

impl ConfidenceGate {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl Default for ConfidenceGate {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIDENCE_THRESHOLD)
    }
}

impl ConfidenceGate {
    pub const ID: &'static str = "confidence_gate";
}

impl Gate for ConfidenceGate {
    fn id(&self) -> &str {
        Self::ID
    }

    fn apply(&self, result: AuditResult) -> AuditResult {
        // NaN fails the comparison and collapses as well
        if result.confidence >= self.threshold {
            return result;
        }
        tracing::info!(
            confidence = result.confidence,
            threshold = self.threshold,
            "confidence below floor; result collapsed"
        );
        let mut collapsed = AuditResult::unresolved(result.confidence, Diagnostic::ConfidenceGate);
        collapsed.timestamp = result.timestamp;
        collapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ns_core::{AuditStatus, Evidence, Finding, PageRef, RiskLevel};

    fn evidenced_risk(confidence: f64) -> AuditResult {
        let mut r = AuditResult::canonical(AuditStatus::RiskDetected, confidence, None);
        r.risk_level = RiskLevel::Medium;
        r.findings.push(Finding {
            kind: "DATE_CONFLICT".into(),
            description: "d".into(),
            evidence: Evidence::new("r.pdf", PageRef::Number(4), "date_opened"),
        });
        r
    }

    #[test]
    fn passes_at_or_above_threshold() {
        let r = evidenced_risk(0.70);
        assert_eq!(ConfidenceGate::default().apply(r.clone()), r);
    }

    #[test]
    fn overrides_well_evidenced_risk_below_threshold() {
        let out = ConfidenceGate::default().apply(evidenced_risk(0.69));
        assert_eq!(out.status, AuditStatus::Unresolved);
        assert_eq!(out.risk_level, RiskLevel::None);
        assert!(out.findings.is_empty());
        assert_eq!(out.confidence, 0.69);
        assert_eq!(out.diagnostic(), Some("CONFIDENCE_GATE"));
    }

    #[test]
    fn ok_below_threshold_is_unresolved() {
        let r = AuditResult::canonical(AuditStatus::Ok, 0.40, None);
        let out = ConfidenceGate::default().apply(r);
        assert_eq!(out.status, AuditStatus::Unresolved);
        assert_eq!(out.confidence, 0.40);
    }

    #[test]
    fn nan_collapses() {
        let mut r = evidenced_risk(0.9);
        r.confidence = f64::NAN;
        let out = ConfidenceGate::default().apply(r);
        assert_eq!(out.status, AuditStatus::Unresolved);
        assert_eq!(out.confidence, 0.0);
    }

    #[test]
    fn idempotent() {
        let gate = ConfidenceGate::new(0.8);
        for c in [0.0, 0.5, 0.79, 0.8, 0.99] {
            let once = gate.apply(evidenced_risk(c));
            assert_eq!(gate.apply(once.clone()), once);
        }
    }
}
