use ns_core::{AuditResult, AuditStatus, Diagnostic, Evidence, RiskLevel};

use crate::gate::Gate;

/// Tokens models emit when they do not actually know the location.
pub const DEFAULT_PLACEHOLDERS: [&str; 3] = ["UNKNOWN", "N/A", "NULL"];

/// Confidence ceiling applied when a risk claim loses all of its evidence.
pub const UNSUPPORTED_RISK_CONFIDENCE_CAP: f64 = 0.5;

/// Drops findings without a complete document/page/field triple and demotes a
/// risk claim that is left with nothing to stand on.
#[derive(Clone, Debug)]
pub struct EvidenceGate {
    placeholders: Vec<String>,
}

impl Default for EvidenceGate {
    fn default() -> Self {
        Self::with_placeholders(DEFAULT_PLACEHOLDERS)
    }
}

impl EvidenceGate {
    pub fn with_placeholders<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            placeholders: tokens.into_iter().map(|t| t.as_ref().trim().to_uppercase()).collect(),
        }
    }

    fn is_real(&self, text: &str) -> bool {
        let t = text.trim();
        !t.is_empty() && !self.placeholders.iter().any(|p| p.eq_ignore_ascii_case(t))
    }

    pub const ID: &'static str = "evidence_gate";

    pub fn is_evidenced(&self, evidence: &Evidence) -> bool {
        let document = evidence.document.as_deref().is_some_and(|d| self.is_real(d));
        let page = evidence.page.as_ref().is_some_and(|p| self.is_real(&p.render()));
        let field = evidence.field.as_deref().is_some_and(|f| self.is_real(f));
        document && page && field
    }
}

impl Gate for EvidenceGate {
    fn id(&self) -> &str {
        Self::ID
    }

    fn apply(&self, mut result: AuditResult) -> AuditResult {
        let claimed_risk = result.status == AuditStatus::RiskDetected;
        let before = result.findings.len();
        result.findings.retain(|f| self.is_evidenced(&f.evidence));

        let dropped = before - result.findings.len();
        if dropped > 0 {
            tracing::debug!(dropped, kept = result.findings.len(), "evidence gate dropped findings");
        }

        if claimed_risk && result.findings.is_empty() {
            tracing::info!("risk claim without evidence demoted to UNRESOLVED");
            result.status = AuditStatus::Unresolved;
            result.risk_level = RiskLevel::None;
            result.confidence = result.confidence.min(UNSUPPORTED_RISK_CONFIDENCE_CAP);
            result.set_diagnostic(Diagnostic::EvidenceGate);
        }
        result
    }
}
