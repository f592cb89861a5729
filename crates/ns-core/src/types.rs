use serde::{Deserialize, Serialize};

use crate::{time::utc_timestamp, AuditStatus, Diagnostic, RiskLevel};

/// Wire schema identifier. Never taken from model output.
pub const SCHEMA_VERSION: &str = "NS-DK-1.0";

/// Fixed scope statement carried in every result's `notes`.
pub const SCOPE_NOTE: &str = "TECHNICAL_DATA_CONSISTENCY_CHECK_ONLY";

/// Separator between the scope note and a diagnostic token.
pub const NOTE_SEPARATOR: &str = " | ";

pub fn scope_note(diagnostic: Option<Diagnostic>) -> String {
    match diagnostic {
        Some(d) => format!("{SCOPE_NOTE}{NOTE_SEPARATOR}{d}"),
        None => SCOPE_NOTE.to_string(),
    }
}

/// Page locator as reported by the model: either a page number or a label.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum PageRef {
    Number(i64),
    Text(String),
}

impl PageRef {
    pub fn render(&self) -> String {
        match self {
            PageRef::Number(n) => n.to_string(),
            PageRef::Text(s) => s.clone(),
        }
    }
}

/// Location a finding is drawn from. Fields stay optional until the evidence gate
/// has run; a returned result only carries findings with all three present.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Evidence {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<PageRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl Evidence {
    pub fn new(document: impl Into<String>, page: PageRef, field: impl Into<String>) -> Self {
        Self {
            document: Some(document.into()),
            page: Some(page),
            field: Some(field.into()),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Finding {
    /// Open vocabulary category, e.g. `BALANCE_MISMATCH`.
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub evidence: Evidence,
}

/// Canonical output contract.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuditResult {
    pub schema_version: String,
    pub timestamp: String,
    pub status: AuditStatus,
    pub risk_level: RiskLevel,
    pub findings: Vec<Finding>,
    pub confidence: f64,
    pub notes: String,
}

impl AuditResult {
    /// Evidence-free result with a fresh timestamp.
    pub fn canonical(status: AuditStatus, confidence: f64, diagnostic: Option<Diagnostic>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            timestamp: utc_timestamp(),
            status,
            risk_level: RiskLevel::None,
            findings: vec![],
            confidence: clamp_confidence(confidence),
            notes: scope_note(diagnostic),
        }
    }

    pub fn unresolved(confidence: f64, diagnostic: Diagnostic) -> Self {
        Self::canonical(AuditStatus::Unresolved, confidence, Some(diagnostic))
    }

    pub fn incomplete(diagnostic: Diagnostic) -> Self {
        Self::canonical(AuditStatus::Incomplete, 0.0, Some(diagnostic))
    }

    /// Replace the diagnostic suffix, keeping the fixed scope prefix.
    pub fn set_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.notes = scope_note(Some(diagnostic));
    }

    pub fn diagnostic(&self) -> Option<&str> {
        self.notes.split_once(NOTE_SEPARATOR).map(|(_, d)| d)
    }

    pub fn to_json_pretty(&self) -> String {
        // Every field is a plain string, number or derived enum.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Clamp into [0,1]; NaN and infinities become 0.0.
pub fn clamp_confidence(c: f64) -> f64 {
    if c.is_finite() {
        c.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CallFailure;

    #[test]
    fn canonical_result_shape() {
        let r = AuditResult::unresolved(0.4, Diagnostic::ConfidenceGate);
        assert_eq!(r.schema_version, SCHEMA_VERSION);
        assert_eq!(r.status, AuditStatus::Unresolved);
        assert_eq!(r.risk_level, RiskLevel::None);
        assert!(r.findings.is_empty());
        assert_eq!(r.confidence, 0.4);
        assert_eq!(r.notes, "TECHNICAL_DATA_CONSISTENCY_CHECK_ONLY | CONFIDENCE_GATE");
        assert_eq!(r.diagnostic(), Some("CONFIDENCE_GATE"));
    }

    #[test]
    fn plain_scope_note_has_no_diagnostic() {
        let r = AuditResult::canonical(AuditStatus::Ok, 0.9, None);
        assert_eq!(r.notes, SCOPE_NOTE);
        assert_eq!(r.diagnostic(), None);
    }

    #[test]
    fn wire_field_names() {
        let mut r = AuditResult::incomplete(Diagnostic::ModelCallFailed(CallFailure::Terminal));
        r.findings.push(Finding {
            kind: "BALANCE_MISMATCH".into(),
            description: "balance differs between sections".into(),
            evidence: Evidence::new("report.pdf", PageRef::Number(3), "balance"),
        });
        let v = serde_json::to_value(&r).unwrap();
        for key in ["schemaVersion", "timestamp", "status", "riskLevel", "findings", "confidence", "notes"] {
            assert!(v.get(key).is_some(), "missing {key}");
        }
        assert_eq!(v["status"], "INCOMPLETE");
        assert_eq!(v["riskLevel"], "NONE");
        assert_eq!(v["findings"][0]["type"], "BALANCE_MISMATCH");
        assert_eq!(v["findings"][0]["evidence"]["page"], 3);
    }

    #[test]
    fn clamp_handles_non_finite() {
        assert_eq!(clamp_confidence(f64::NAN), 0.0);
        assert_eq!(clamp_confidence(f64::INFINITY), 0.0);
        assert_eq!(clamp_confidence(1.7), 1.0);
        assert_eq!(clamp_confidence(-0.2), 0.0);
    }
}
