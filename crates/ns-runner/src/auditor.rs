use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use ns_contract::{parse_response, ConfidenceGate, ContractPipeline, EvidenceGate, ParseError, PipelineStep};
use ns_core::{AuditId, AuditResult, Deadline, Diagnostic, Sleeper, ThreadSleeper};
use ns_manifest::ManifestCache;
use ns_remote::{Category, DocumentClassifier, ModelClient, ModelRequest, ReferenceStore, RemoteRef};
use ns_retry::{CallError, RetryOrchestrator};
use thiserror::Error;

use crate::config::AuditConfig;
use crate::hints::{HintsLibrary, TranslationHints};

/// Produces the natural-language instruction for one model call.
pub trait InstructionBuilder: Send + Sync {
    fn build(&self, category: &Category, hints: &TranslationHints) -> String;
}

/// Same instruction for every document.
pub struct StaticInstruction(pub String);

impl InstructionBuilder for StaticInstruction {
    fn build(&self, _category: &Category, _hints: &TranslationHints) -> String {
        self.0.clone()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuditStage {
    AwaitingInput,
    ReferencesResolved,
    ModelInvoked,
    Normalized,
    EvidenceGated,
    ConfidenceGated,
}

/// Early exits of an audit. Each one maps to a canonical result.
#[derive(Debug, Error)]
pub enum AuditFailure {
    #[error("input rejected: {0}")]
    InputRejected(String),
    #[error("references unavailable: {0}")]
    ReferencesUnavailable(String),
    #[error("model call failed: {0}")]
    ModelCallFailed(#[from] CallError),
    #[error("malformed model output: {0}")]
    MalformedOutput(#[from] ParseError),
}

impl AuditFailure {
    pub fn diagnostic(&self) -> Diagnostic {
        match self {
            AuditFailure::InputRejected(_) => Diagnostic::InputRejected,
            AuditFailure::ReferencesUnavailable(_) => Diagnostic::ReferencesUnavailable,
            AuditFailure::ModelCallFailed(e) => Diagnostic::ModelCallFailed(e.class),
            AuditFailure::MalformedOutput(_) => Diagnostic::MalformedOutput,
        }
    }

    /// INCOMPLETE when the audit never got to ask; UNRESOLVED when it asked and
    /// got nothing usable back.
    pub fn into_result(self) -> AuditResult {
        match self {
            AuditFailure::InputRejected(_) | AuditFailure::ReferencesUnavailable(_) => {
                AuditResult::incomplete(self.diagnostic())
            }
            AuditFailure::ModelCallFailed(_) | AuditFailure::MalformedOutput(_) => {
                AuditResult::unresolved(0.0, self.diagnostic())
            }
        }
    }
}

/// External services an `Auditor` talks to.
pub struct Collaborators {
    pub store: Arc<dyn ReferenceStore>,
    pub model: Arc<dyn ModelClient>,
    pub classifier: Arc<dyn DocumentClassifier>,
    pub instructions: Arc<dyn InstructionBuilder>,
    /// Used for both upload polling and retry backoff.
    pub sleeper: Arc<dyn Sleeper>,
}

impl Collaborators {
    pub fn new(
        store: Arc<dyn ReferenceStore>,
        model: Arc<dyn ModelClient>,
        classifier: Arc<dyn DocumentClassifier>,
        instructions: Arc<dyn InstructionBuilder>,
    ) -> Self {
        Self {
            store,
            model,
            classifier,
            instructions,
            sleeper: Arc::new(ThreadSleeper),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }
}

pub struct Auditor {
    references_dir: PathBuf,
    document_extension: String,
    model_deadline: Duration,
    cache: ManifestCache,
    model: Arc<dyn ModelClient>,
    classifier: Arc<dyn DocumentClassifier>,
    instructions: Arc<dyn InstructionBuilder>,
    hints: HintsLibrary,
    retry: RetryOrchestrator<Arc<dyn Sleeper>>,
    pipeline: ContractPipeline,
}

impl Auditor {
    /// Relative paths in `config` resolve against `root`.
    pub fn new(root: &Path, config: &AuditConfig, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;
        let cache = ManifestCache::with_sleeper(
            config.manifest_path(root),
            collaborators.store,
            config.scan_options(),
            collaborators.sleeper.clone(),
        );
        Ok(Self {
            references_dir: config.references_dir(root),
            document_extension: config.document_extension(),
            model_deadline: config.model_deadline(),
            cache,
            model: collaborators.model,
            classifier: collaborators.classifier,
            instructions: collaborators.instructions,
            hints: HintsLibrary::new(config.hints_dir(root), config.hints.categories.clone()),
            retry: RetryOrchestrator::with_sleeper(config.retry_policy(), collaborators.sleeper),
            pipeline: ContractPipeline::with_gates(
                EvidenceGate::default(),
                ConfidenceGate::new(config.pipeline.confidence_threshold),
            ),
        })
    }

    pub fn cache(&self) -> &ManifestCache {
        &self.cache
    }

    /// Run one audit. Always returns a structurally valid result.
    pub fn audit_document(&self, path: &Path) -> AuditResult {
        let audit_id = AuditId::new();
        let span = tracing::info_span!("audit", audit_id = %audit_id);
        let _enter = span.enter();
        tracing::info!(document = %path.display(), "audit started");

        let result = match self.run(path) {
            Ok(result) => result,
            Err(failure) => {
                tracing::warn!(error = %failure, diagnostic = %failure.diagnostic(), "audit ended early");
                failure.into_result()
            }
        };
        tracing::info!(
            status = result.status.as_str(),
            risk_level = result.risk_level.as_str(),
            findings = result.findings.len(),
            confidence = result.confidence,
            "audit finished"
        );
        result
    }

    fn run(&self, path: &Path) -> Result<AuditResult, AuditFailure> {
        enter(AuditStage::AwaitingInput);
        self.check_input(path)?;

        // no overall scan deadline; the cache bounds every remote call per file
        let references = self
            .cache
            .ensure_active(&self.references_dir, Deadline::none())
            .map_err(|e| AuditFailure::ReferencesUnavailable(format!("{e:#}")))?;
        if references.is_empty() {
            return Err(AuditFailure::ReferencesUnavailable(format!(
                "no usable references in {}",
                self.references_dir.display()
            )));
        }
        enter(AuditStage::ReferencesResolved);

        let category = self.classifier.classify(path);
        let selected = select_references(&references, &category);
        let hints = self.hints.load(&category);
        let instruction = self.instructions.build(&category, &hints);
        tracing::debug!(
            category = category.as_str(),
            references = selected.len(),
            hints = hints.entries.len(),
            "model request prepared"
        );

        let request = ModelRequest {
            document: path,
            references: &selected,
            instruction: &instruction,
        };
        let deadline = Deadline::after(self.model_deadline);
        let text = self.retry.invoke(deadline, |d| self.model.generate(&request, d))?;
        enter(AuditStage::ModelInvoked);

        let raw = parse_response(&text)?;
        let gated = self.pipeline.check_object_with(&raw, |step, result| match step {
            PipelineStep::Normalized => enter(AuditStage::Normalized),
            PipelineStep::Gated(EvidenceGate::ID) => enter(AuditStage::EvidenceGated),
            PipelineStep::Gated(ConfidenceGate::ID) => enter(AuditStage::ConfidenceGated),
            PipelineStep::Gated(gate) => tracing::debug!(gate, status = result.status.as_str(), "gate applied"),
        });
        Ok(gated)
    }

    fn check_input(&self, path: &Path) -> Result<(), AuditFailure> {
        if !path.is_file() {
            return Err(AuditFailure::InputRejected(format!("not a file: {}", path.display())));
        }
        let matches = path
            .extension()
            .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case(&self.document_extension));
        if !matches {
            return Err(AuditFailure::InputRejected(format!(
                "expected a .{} document: {}",
                self.document_extension,
                path.display()
            )));
        }
        File::open(path).map_err(|e| AuditFailure::InputRejected(format!("unreadable {}: {e}", path.display())))?;
        Ok(())
    }

    /// Contract stages only, for output that was captured elsewhere. The same
    /// instance `audit_document` runs.
    pub fn pipeline(&self) -> &ContractPipeline {
        &self.pipeline
    }
}

fn enter(stage: AuditStage) {
    tracing::debug!(?stage, "audit stage");
}

/// References whose local name mentions the category, or all of them when the
/// category is unknown or nothing matches.
pub fn select_references(references: &[RemoteRef], category: &Category) -> Vec<RemoteRef> {
    if let Category::Known(token) = category {
        let token = token.to_lowercase();
        let matching: Vec<RemoteRef> = references
            .iter()
            .filter(|r| r.local_name.to_lowercase().contains(&token))
            .cloned()
            .collect();
        if !matching.is_empty() {
            return matching;
        }
    }
    references.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(name: &str) -> RemoteRef {
        RemoteRef {
            handle: format!("files/{name}"),
            locator: format!("fake://{name}"),
            local_name: name.to_string(),
        }
    }

    #[test]
    fn category_selects_matching_subset() {
        let refs = vec![r("equifax_layout.pdf"), r("Experian_Layout.pdf"), r("common.pdf")];
        let picked = select_references(&refs, &Category::known("experian"));
        assert_eq!(picked, vec![r("Experian_Layout.pdf")]);
    }

    #[test]
    fn unknown_or_unmatched_category_keeps_everything() {
        let refs = vec![r("a.pdf"), r("b.pdf")];
        assert_eq!(select_references(&refs, &Category::Unknown), refs);
        assert_eq!(select_references(&refs, &Category::known("TRANSUNION")), refs);
    }

    #[test]
    fn failures_map_to_canonical_results() {
        use ns_core::{AuditStatus, CallFailure};
        use ns_remote::RemoteError;

        let r = AuditFailure::InputRejected("x".into()).into_result();
        assert_eq!(r.status, AuditStatus::Incomplete);
        assert_eq!(r.diagnostic(), Some("INPUT_REJECTED"));

        let r = AuditFailure::ReferencesUnavailable("x".into()).into_result();
        assert_eq!(r.status, AuditStatus::Incomplete);
        assert_eq!(r.diagnostic(), Some("REFERENCES_UNAVAILABLE"));

        let r = AuditFailure::ModelCallFailed(CallError {
            class: CallFailure::Transient,
            attempts: 4,
            source: RemoteError::RateLimited("429".into()),
        })
        .into_result();
        assert_eq!(r.status, AuditStatus::Unresolved);
        assert_eq!(r.diagnostic(), Some("MODEL_CALL_FAILED:TRANSIENT"));

        let r = AuditFailure::MalformedOutput(ParseError::Empty).into_result();
        assert_eq!(r.status, AuditStatus::Unresolved);
        assert_eq!(r.diagnostic(), Some("MALFORMED_OUTPUT"));
        assert!(r.findings.is_empty());
    }
}
