use std::fmt;

/// Why a remote call ended without a usable response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallFailure {
    /// Retryable failures (rate limiting, intermittent errors) that outlived the retry budget.
    Transient,
    /// Client-side or configuration errors; never retried.
    Terminal,
    /// The caller's deadline expired.
    Deadline,
}

impl CallFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallFailure::Transient => "TRANSIENT",
            CallFailure::Terminal => "TERMINAL",
            CallFailure::Deadline => "DEADLINE",
        }
    }
}

/// Short machine-readable token appended to the scope note.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Diagnostic {
    InputRejected,
    ReferencesUnavailable,
    ModelCallFailed(CallFailure),
    MalformedOutput,
    EvidenceGate,
    ConfidenceGate,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::InputRejected => f.write_str("INPUT_REJECTED"),
            Diagnostic::ReferencesUnavailable => f.write_str("REFERENCES_UNAVAILABLE"),
            Diagnostic::ModelCallFailed(kind) => write!(f, "MODEL_CALL_FAILED:{}", kind.as_str()),
            Diagnostic::MalformedOutput => f.write_str("MALFORMED_OUTPUT"),
            Diagnostic::EvidenceGate => f.write_str("EVIDENCE_GATE"),
            Diagnostic::ConfidenceGate => f.write_str("CONFIDENCE_GATE"),
        }
    }
}
