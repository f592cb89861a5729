use ns_core::{AuditResult, Diagnostic};
use serde_json::{Map, Value};

use crate::{
    confidence::ConfidenceGate,
    evidence::EvidenceGate,
    gate::Gate,
    normalize::normalize_object,
    parse::{parse_response, ParseError},
};

/// Reported after each stage of `check_object_with`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStep<'a> {
    Normalized,
    /// Carries the gate's id.
    Gated(&'a str),
}

/// Normalizer plus the ordered gate chain.
pub struct ContractPipeline {
    gates: Vec<Box<dyn Gate>>,
}

impl ContractPipeline {
    pub fn new(threshold: f64) -> Self {
        Self::with_gates(EvidenceGate::default(), ConfidenceGate::new(threshold))
    }

    pub fn with_gates(evidence: EvidenceGate, confidence: ConfidenceGate) -> Self {
        Self {
            gates: vec![Box::new(evidence), Box::new(confidence)],
        }
    }

    pub fn gate_ids(&self) -> Vec<&str> {
        self.gates.iter().map(|g| g.id()).collect()
    }

    pub fn check_object(&self, raw: &Map<String, Value>) -> AuditResult {
        self.check_object_with(raw, |_, _| {})
    }

    /// `check_object`, calling `on_step` with the intermediate result after
    /// normalization and after each gate.
    pub fn check_object_with(
        &self,
        raw: &Map<String, Value>,
        mut on_step: impl FnMut(PipelineStep<'_>, &AuditResult),
    ) -> AuditResult {
        let mut result = normalize_object(raw);
        on_step(PipelineStep::Normalized, &result);
        for gate in &self.gates {
            result = gate.apply(result);
            on_step(PipelineStep::Gated(gate.id()), &result);
        }
        result
    }

    /// Parse, normalize and gate raw model text. Unparseable text never reaches
    /// the normalizer.
    pub fn check_text(&self, text: &str) -> Result<AuditResult, ParseError> {
        let obj = parse_response(text)?;
        Ok(self.check_object(&obj))
    }

    /// Like `check_text`, but a parse failure becomes the canonical malformed result.
    pub fn check_text_or_unresolved(&self, text: &str) -> AuditResult {
        match self.check_text(text) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "malformed model output");
                AuditResult::unresolved(0.0, Diagnostic::MalformedOutput)
            }
        }
    }
}

impl Default for ContractPipeline {
    fn default() -> Self {
        Self::with_gates(EvidenceGate::default(), ConfidenceGate::default())
    }
}
