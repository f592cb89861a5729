use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use ns_remote::RemoteRef;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub handle: String,
    pub locator: String,
    /// Unix seconds.
    pub uploaded_at: i64,
    pub local_name: String,
}

impl ManifestEntry {
    pub fn to_ref(&self) -> RemoteRef {
        RemoteRef {
            handle: self.handle.clone(),
            locator: self.locator.clone(),
            local_name: self.local_name.clone(),
        }
    }
}

/// Flat fingerprint -> entry map, persisted as a single JSON object.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Manifest {
    pub entries: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    /// Missing file is an empty manifest; so is a file that no longer parses,
    /// since every entry can be rebuilt by uploading again.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let bytes = std::fs::read(path).with_context(|| format!("read manifest {}", path.display()))?;
        match serde_json::from_slice(&bytes) {
            Ok(m) => Ok(m),
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "manifest unreadable; starting empty");
                Ok(Self::default())
            }
        }
    }

    /// Rewrites the whole file through a uniquely named sibling temp file, so
    /// concurrent writers never share one.
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        let bytes = serde_json::to_vec_pretty(self)?;
        let mut tmp = NamedTempFile::new_in(parent).with_context(|| format!("temp file in {}", parent.display()))?;
        tmp.write_all(&bytes).with_context(|| format!("write {}", tmp.path().display()))?;
        tmp.persist(path)
            .map_err(|e| e.error)
            .with_context(|| format!("replace manifest {}", path.display()))?;
        Ok(())
    }

    pub fn get(&self, fingerprint: &str) -> Option<&ManifestEntry> {
        self.entries.get(fingerprint)
    }

    pub fn insert(&mut self, fingerprint: String, entry: ManifestEntry) {
        self.entries.insert(fingerprint, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
