use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use ns_contract::DEFAULT_CONFIDENCE_THRESHOLD;
use ns_manifest::{FingerprintStrategy, ScanOptions};
use ns_retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("confidence_threshold must be within [0, 1], got {0}")]
    Threshold(f64),
    #[error("retry.max_attempts must be within 1..=10, got {0}")]
    MaxAttempts(u32),
    #[error("references.extension must not be empty")]
    EmptyExtension,
    #[error("pipeline.document_extension must not be empty")]
    EmptyDocumentExtension,
    #[error("references.poll_interval_ms must be greater than zero")]
    PollInterval,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AuditConfig {
    pub pipeline: PipelineConfig,
    pub references: ReferencesConfig,
    pub retry: RetryConfig,
    #[serde(default)]
    pub hints: HintsConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    pub confidence_threshold: f64,
    pub model_deadline_secs: u64,
    /// Accepted type of the audited document, independent of the reference filter.
    #[serde(default = "default_document_extension")]
    pub document_extension: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ReferencesConfig {
    pub directory: String,
    pub manifest_path: String,
    pub extension: String,
    #[serde(default)]
    pub fingerprint: FingerprintStrategy,
    pub poll_interval_ms: u64,
    pub max_poll_attempts: u32,
    pub upload_deadline_secs: u64,
    #[serde(default = "default_true")]
    pub wait_processing: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    #[serde(default = "default_true")]
    pub jitter: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HintsConfig {
    pub directory: String,
    /// CATEGORY -> candidate file names, first existing wins.
    #[serde(default)]
    pub categories: BTreeMap<String, Vec<String>>,
}

impl Default for HintsConfig {
    fn default() -> Self {
        Self {
            directory: "hints".to_string(),
            categories: BTreeMap::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_document_extension() -> String {
    "pdf".to_string()
}

/// Relative paths stay relative; they resolve against a root only when used.
impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig {
                confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
                model_deadline_secs: 300,
                document_extension: default_document_extension(),
            },
            references: ReferencesConfig {
                directory: "references".to_string(),
                manifest_path: ".northstar/manifests/references.json".to_string(),
                extension: "pdf".to_string(),
                fingerprint: FingerprintStrategy::Metadata,
                poll_interval_ms: 2_000,
                max_poll_attempts: 30,
                upload_deadline_secs: 120,
                wait_processing: true,
            },
            retry: RetryConfig {
                max_attempts: 4,
                backoff_base_ms: 1_000,
                backoff_max_ms: 30_000,
                jitter: true,
            },
            hints: HintsConfig::default(),
        }
    }
}

impl AuditConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let cfg: AuditConfig = toml::from_str(&s).with_context(|| format!("parse {}", path.display()))?;
        cfg.validate().with_context(|| format!("invalid config {}", path.display()))?;
        Ok(cfg)
    }

    /// Loads the root's config file, or the defaults when there is none.
    pub fn load_or_default(root: &Path) -> Result<Self> {
        let path = Self::config_path(root);
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        let s = toml::to_string_pretty(self).with_context(|| "serialize toml")?;
        std::fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = self.pipeline.confidence_threshold;
        if !(0.0..=1.0).contains(&t) {
            return Err(ConfigError::Threshold(t));
        }
        if !(1..=10).contains(&self.retry.max_attempts) {
            return Err(ConfigError::MaxAttempts(self.retry.max_attempts));
        }
        if normalize_extension(&self.references.extension).is_empty() {
            return Err(ConfigError::EmptyExtension);
        }
        if normalize_extension(&self.pipeline.document_extension).is_empty() {
            return Err(ConfigError::EmptyDocumentExtension);
        }
        if self.references.poll_interval_ms == 0 {
            return Err(ConfigError::PollInterval);
        }
        Ok(())
    }

    pub fn config_path(root: &Path) -> PathBuf {
        root.join(".northstar").join("northstar.toml")
    }

    pub fn references_dir(&self, root: &Path) -> PathBuf {
        resolve(root, &self.references.directory)
    }

    pub fn manifest_path(&self, root: &Path) -> PathBuf {
        resolve(root, &self.references.manifest_path)
    }

    pub fn hints_dir(&self, root: &Path) -> PathBuf {
        resolve(root, &self.hints.directory)
    }

    pub fn document_extension(&self) -> String {
        normalize_extension(&self.pipeline.document_extension)
    }

    pub fn model_deadline(&self) -> Duration {
        Duration::from_secs(self.pipeline.model_deadline_secs)
    }

    pub fn scan_options(&self) -> ScanOptions {
        let r = &self.references;
        ScanOptions {
            extension: normalize_extension(&r.extension),
            poll_interval: Duration::from_millis(r.poll_interval_ms),
            max_poll_attempts: r.max_poll_attempts,
            upload_timeout: Duration::from_secs(r.upload_deadline_secs),
            wait_processing: r.wait_processing,
            strategy: r.fingerprint,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            base_delay: Duration::from_millis(self.retry.backoff_base_ms),
            max_delay: Duration::from_millis(self.retry.backoff_max_ms),
            jitter: self.retry.jitter,
        }
    }
}

/// Lowercase, without the leading dot.
fn normalize_extension(raw: &str) -> String {
    raw.trim().trim_start_matches('.').to_lowercase()
}

/// `~` expands to the home directory; relative paths hang off `root`.
fn resolve(root: &Path, raw: &str) -> PathBuf {
    let expanded = PathBuf::from(shellexpand::tilde(raw).to_string());
    if expanded.is_absolute() {
        expanded
    } else {
        root.join(expanded)
    }
}
