use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    Ok,
    RiskDetected,
    Incomplete,
    Unresolved,
    ScopeLimited,
}

impl AuditStatus {
    pub const ALL: [AuditStatus; 5] = [
        AuditStatus::Ok,
        AuditStatus::RiskDetected,
        AuditStatus::Incomplete,
        AuditStatus::Unresolved,
        AuditStatus::ScopeLimited,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Ok => "OK",
            AuditStatus::RiskDetected => "RISK_DETECTED",
            AuditStatus::Incomplete => "INCOMPLETE",
            AuditStatus::Unresolved => "UNRESOLVED",
            AuditStatus::ScopeLimited => "SCOPE_LIMITED",
        }
    }

    /// Exact wire spelling only; anything else is not a status.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|st| st.as_str() == s)
    }

    /// Statuses a caller must read as "no actionable conclusion".
    pub fn is_inconclusive(&self) -> bool {
        matches!(self, AuditStatus::Incomplete | AuditStatus::Unresolved | AuditStatus::ScopeLimited)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    None,
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 4] = [RiskLevel::None, RiskLevel::Low, RiskLevel::Medium, RiskLevel::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::None => "NONE",
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == s)
    }
}
