use std::io::Read;
use std::path::Path;
use std::time::UNIX_EPOCH;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerprintStrategy {
    /// name + byte size + mtime (whole seconds). Cheap; misses edits that keep
    /// both size and mtime.
    #[default]
    Metadata,
    /// SHA-256 of the file bytes; name and size stay in the key for inspection.
    Content,
}

pub fn fingerprint(path: &Path, strategy: FingerprintStrategy) -> Result<String> {
    match strategy {
        FingerprintStrategy::Metadata => metadata_fingerprint(path),
        FingerprintStrategy::Content => content_fingerprint(path),
    }
}

pub fn metadata_fingerprint(path: &Path) -> Result<String> {
    let meta = std::fs::metadata(path).with_context(|| format!("stat {}", path.display()))?;
    let mtime = meta
        .modified()
        .with_context(|| format!("mtime {}", path.display()))?
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    Ok(format!("{}__{}__{}", file_name(path), meta.len(), mtime))
}

pub fn content_fingerprint(path: &Path) -> Result<String> {
    let size = std::fs::metadata(path).with_context(|| format!("stat {}", path.display()))?.len();
    let mut f = std::fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = f.read(&mut buf).with_context(|| format!("read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{}__{}__sha256:{}", file_name(path), size, hex::encode(hasher.finalize())))
}

pub fn file_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default()
}
