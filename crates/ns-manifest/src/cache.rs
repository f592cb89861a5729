use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::Duration;

use anyhow::{Context, Result};
use ns_core::{now_unix, Deadline, Sleeper, ThreadSleeper};
use ns_remote::{ReferenceStore, RemoteError, RemoteFile, RemoteRef, RemoteState};

use crate::fingerprint::{file_name, fingerprint, FingerprintStrategy};
use crate::manifest::{Manifest, ManifestEntry};

#[derive(Clone, Debug)]
pub struct ScanOptions {
    /// Lowercase, without the dot.
    pub extension: String,
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
    /// Per-file bound on the liveness check, upload and readiness polling.
    pub upload_timeout: Duration,
    pub wait_processing: bool,
    pub strategy: FingerprintStrategy,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            extension: "pdf".into(),
            poll_interval: Duration::from_secs(2),
            max_poll_attempts: 30,
            upload_timeout: Duration::from_secs(120),
            wait_processing: true,
            strategy: FingerprintStrategy::Metadata,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub reused: usize,
    pub uploaded: usize,
    pub skipped: usize,
}

/// Fingerprint -> remote reference cache backed by a JSON manifest file.
///
/// Each `ensure_active` call reloads the manifest, decides reuse or upload per
/// file, and persists the result, all while holding a lock shared by every
/// cache in the process that points at the same manifest path.
pub struct ManifestCache {
    path: PathBuf,
    store: Arc<dyn ReferenceStore>,
    options: ScanOptions,
    sleeper: Arc<dyn Sleeper>,
    lock: Arc<Mutex<()>>,
}

impl ManifestCache {
    pub fn open(path: impl Into<PathBuf>, store: Arc<dyn ReferenceStore>, options: ScanOptions) -> Self {
        Self::with_sleeper(path, store, options, Arc::new(ThreadSleeper))
    }

    pub fn with_sleeper(
        path: impl Into<PathBuf>,
        store: Arc<dyn ReferenceStore>,
        options: ScanOptions,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        let path = path.into();
        let lock = lock_for(&path);
        Self { path, store, options, sleeper, lock }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Current on-disk contents.
    pub fn manifest(&self) -> Result<Manifest> {
        let _guard = self.guard();
        Manifest::load(&self.path)
    }

    pub fn ensure_active(&self, dir: &Path, deadline: Deadline) -> Result<Vec<RemoteRef>> {
        self.ensure_active_with_report(dir, deadline).map(|(refs, _)| refs)
    }

    /// Returns one usable reference per eligible file in `dir`, in file-name order.
    /// Files that cannot be uploaded are skipped; only an unreadable directory fails.
    pub fn ensure_active_with_report(&self, dir: &Path, deadline: Deadline) -> Result<(Vec<RemoteRef>, ScanReport)> {
        let _guard = self.guard();

        let files = self.eligible_files(dir)?;
        let mut manifest = Manifest::load(&self.path)?;
        let mut refs = Vec::with_capacity(files.len());
        let mut report = ScanReport::default();

        for path in files {
            let name = file_name(&path);
            let key = match fingerprint(&path, self.options.strategy) {
                Ok(k) => k,
                Err(e) => {
                    tracing::warn!(error = %e, file = %name, "cannot fingerprint; skipping");
                    report.skipped += 1;
                    continue;
                }
            };

            if let Some(entry) = manifest.get(&key) {
                if self.store.is_live(&entry.handle, self.file_deadline(deadline)) {
                    tracing::debug!(file = %name, handle = %entry.handle, "reusing remote reference");
                    refs.push(entry.to_ref());
                    report.reused += 1;
                    continue;
                }
                tracing::info!(file = %name, handle = %entry.handle, "remote reference stale; re-uploading");
            }

            match self.upload_ready(&path, deadline) {
                Ok(file) => {
                    let entry = ManifestEntry {
                        handle: file.handle,
                        locator: file.locator,
                        uploaded_at: now_unix(),
                        local_name: name,
                    };
                    refs.push(entry.to_ref());
                    manifest.insert(key, entry);
                    report.uploaded += 1;
                }
                Err(e) => {
                    tracing::warn!(error = %e, file = %name, "upload failed; skipping");
                    report.skipped += 1;
                }
            }
        }

        if let Err(e) = manifest.save(&self.path) {
            tracing::warn!(error = %e, path = %self.path.display(), "manifest not persisted");
        }
        tracing::info!(
            dir = %dir.display(),
            reused = report.reused,
            uploaded = report.uploaded,
            skipped = report.skipped,
            "reference scan complete"
        );
        Ok((refs, report))
    }

    fn eligible_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir).with_context(|| format!("read reference dir {}", dir.display()))? {
            let path = entry.with_context(|| format!("read reference dir {}", dir.display()))?.path();
            if path.is_file() && has_extension(&path, &self.options.extension) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Every remote call for one file is bounded by `upload_timeout`, even when
    /// the caller passes no deadline.
    fn file_deadline(&self, deadline: Deadline) -> Deadline {
        deadline.min(Deadline::after(self.options.upload_timeout))
    }

    fn upload_ready(&self, path: &Path, deadline: Deadline) -> Result<RemoteFile, RemoteError> {
        let deadline = self.file_deadline(deadline);
        let mut file = self.store.upload(path, deadline)?;
        if !self.options.wait_processing {
            return Ok(file);
        }

        let mut polls = 0;
        while file.state == RemoteState::Processing {
            if polls >= self.options.max_poll_attempts {
                return Err(RemoteError::Transient(format!(
                    "{} still processing after {polls} polls",
                    file.handle
                )));
            }
            if !deadline.allows(self.options.poll_interval) {
                return Err(RemoteError::DeadlineExceeded(format!("waiting for {}", file.handle)));
            }
            self.sleeper.sleep(self.options.poll_interval);
            file = self.store.status(&file.handle, deadline)?;
            polls += 1;
        }
        if let RemoteState::Failed = file.state {
            tracing::warn!(handle = %file.handle, "remote reports processing failed; using anyway");
        }
        Ok(file)
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|p| p.into_inner())
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().eq_ignore_ascii_case(ext.trim_start_matches('.')))
        .unwrap_or(false)
}

fn lock_for(path: &Path) -> Arc<Mutex<()>> {
    static LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();
    let key = canonical_key(path);
    let mut locks = LOCKS.get_or_init(Default::default).lock().unwrap_or_else(|p| p.into_inner());
    locks.entry(key).or_default().clone()
}

/// Neither the manifest nor its directory may exist yet, so canonicalize the
/// nearest existing ancestor and re-attach the missing tail. The key stays the
/// same before and after the first save creates those directories.
fn canonical_key(path: &Path) -> PathBuf {
    let mut tail = Vec::new();
    let mut cur = path;
    loop {
        let existing = if cur.as_os_str().is_empty() { Path::new(".") } else { cur };
        if let Ok(real) = existing.canonicalize() {
            return tail.iter().rev().fold(real, |acc, name| acc.join(name));
        }
        match (cur.parent(), cur.file_name()) {
            (Some(parent), Some(name)) => {
                tail.push(name.to_os_string());
                cur = parent;
            }
            _ => return path.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_filter_is_case_insensitive() {
        assert!(has_extension(Path::new("a.PDF"), "pdf"));
        assert!(has_extension(Path::new("a.pdf"), ".pdf"));
        assert!(!has_extension(Path::new("a.pdf.txt"), "pdf"));
        assert!(!has_extension(Path::new("pdf"), "pdf"));
    }

    #[test]
    fn same_manifest_shares_a_lock() {
        let dir = tempfile::tempdir().unwrap();
        let a = lock_for(&dir.path().join("m.json"));
        let b = lock_for(&dir.path().join(".").join("m.json"));
        let c = lock_for(&dir.path().join("other.json"));
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn lock_key_is_stable_once_manifest_dir_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state").join("m.json");
        let before = lock_for(&path);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let after = lock_for(&path);
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_manifest_dir_shares_the_real_lock() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real");
        let link = dir.path().join("link");
        std::fs::create_dir_all(&real).unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let through_link = link.join("state").join("m.json");
        let first = lock_for(&through_link);
        std::fs::create_dir_all(real.join("state")).unwrap();
        let second = lock_for(&through_link);
        let direct = lock_for(&real.join("state").join("m.json"));

        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &direct));
    }

    #[test]
    fn caches_built_before_and_after_first_scan_share_a_lock() {
        let dir = tempfile::tempdir().unwrap();
        let refs = dir.path().join("refs");
        std::fs::create_dir_all(&refs).unwrap();
        std::fs::write(refs.join("a.pdf"), b"%PDF-1.4").unwrap();
        let manifest = dir.path().join("state").join("m.json");
        let store: Arc<dyn ReferenceStore> = Arc::new(ns_remote::fakes::FakeReferenceStore::new());
        let open = || {
            let sleeper = Arc::new(ns_core::RecordingSleeper::default());
            ManifestCache::with_sleeper(&manifest, store.clone(), ScanOptions::default(), sleeper)
        };

        let a = open();
        a.ensure_active(&refs, Deadline::none()).unwrap();
        let b = open();

        assert!(manifest.exists());
        assert!(Arc::ptr_eq(&a.lock, &b.lock));
    }
}
