use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use ns_core::{AuditResult, RecordingSleeper};
use ns_remote::fakes::{FakeReferenceStore, FixedClassifier, ScriptedModel};
use ns_remote::{Category, RemoteError};
use serde::Deserialize;

use crate::auditor::{Auditor, Collaborators, StaticInstruction};
use crate::config::AuditConfig;

#[derive(Debug, Deserialize)]
pub struct ScenarioExpected {
    pub scenario_id: String,
    #[serde(default = "default_document")]
    pub document: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub threshold: Option<f64>,
    /// Failures the model returns before the recorded response, in order.
    #[serde(default)]
    pub model_failures: Vec<String>,
    pub expect: ScenarioExpectation,
}

#[derive(Debug, Deserialize)]
pub struct ScenarioExpectation {
    pub status: String,
    pub risk_level: String,
    #[serde(default)]
    pub diagnostic: Option<String>,
    pub findings: usize,
    #[serde(default)]
    pub confidence: Option<f64>,
    pub model_calls: usize,
    #[serde(default)]
    pub references_attached: Option<usize>,
}

fn default_document() -> String {
    "report.pdf".to_string()
}

#[derive(Debug)]
pub struct ScenarioResult {
    pub result: AuditResult,
    pub model_calls: usize,
    /// References attached to the last model call.
    pub references_attached: usize,
    pub uploads: usize,
    pub backoff_sleeps: usize,
}

pub fn load_expected(dir: &Path) -> Result<ScenarioExpected> {
    let p = dir.join("expected.yaml");
    let s = std::fs::read_to_string(&p).with_context(|| format!("read expected.yaml: {}", p.display()))?;
    let exp: ScenarioExpected = serde_yaml::from_str(&s).with_context(|| "parse expected.yaml")?;
    Ok(exp)
}

/// Fixture-mode audit run:
/// - references come from `references/` in the scenario dir (none when absent)
/// - the model replays `model_failures`, then `model_response.txt` if present
/// - the subject document is written under `work` unless it is named `missing.pdf`
///
/// Only the manifest and the document are written, both under `work`.
pub fn simulate(dir: &Path, work: &Path) -> Result<ScenarioResult> {
    let exp = load_expected(dir)?;

    let references = dir.join("references");
    let references = if references.is_dir() {
        references
    } else {
        let empty = work.join("references");
        std::fs::create_dir_all(&empty).with_context(|| format!("create {}", empty.display()))?;
        empty
    };

    let document = work.join(&exp.document);
    if exp.document != "missing.pdf" {
        std::fs::write(&document, b"%PDF-1.4 scenario subject").with_context(|| format!("write {}", document.display()))?;
    }

    let mut script: Vec<Result<String, RemoteError>> = exp
        .model_failures
        .iter()
        .map(|f| parse_failure(f).map(Err))
        .collect::<Result<_>>()?;
    let response = dir.join("model_response.txt");
    if response.exists() {
        let text = std::fs::read_to_string(&response).with_context(|| format!("read {}", response.display()))?;
        script.push(Ok(text));
    }

    let mut cfg = AuditConfig::default();
    cfg.references.directory = references.display().to_string();
    cfg.retry.jitter = false;
    if let Some(t) = exp.threshold {
        cfg.pipeline.confidence_threshold = t;
    }

    let store = Arc::new(FakeReferenceStore::new());
    let model = Arc::new(ScriptedModel::new(script));
    let sleeper = Arc::new(RecordingSleeper::default());
    let category = exp.category.as_deref().map(Category::known).unwrap_or(Category::Unknown);
    let collaborators = Collaborators::new(
        store.clone(),
        model.clone(),
        Arc::new(FixedClassifier(category)),
        Arc::new(StaticInstruction("Return the audit as JSON.".to_string())),
    )
    .with_sleeper(sleeper.clone());

    let auditor = Auditor::new(work, &cfg, collaborators)?;
    let result = auditor.audit_document(&document);

    let calls = model.calls();
    Ok(ScenarioResult {
        result,
        model_calls: calls.len(),
        references_attached: calls.last().map(|c| c.references.len()).unwrap_or(0),
        uploads: store.upload_count(),
        backoff_sleeps: sleeper.slept().len(),
    })
}

pub fn scenario_dir(id: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/scenarios").join(id)
}

fn parse_failure(s: &str) -> Result<RemoteError> {
    let msg = format!("scripted {s}");
    match s.trim() {
        "rate_limited" => Ok(RemoteError::RateLimited(msg)),
        "transient" => Ok(RemoteError::Transient(msg)),
        "terminal" => Ok(RemoteError::Terminal(msg)),
        "deadline" => Ok(RemoteError::DeadlineExceeded(msg)),
        other => Err(anyhow!("unknown model failure in fixture: {other}")),
    }
}
