//! In-memory collaborators for tests. Not durable, not networked.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ns_core::Deadline;

use crate::error::RemoteError;
use crate::types::{Category, DocumentClassifier, ModelClient, ModelRequest, ReferenceStore, RemoteFile, RemoteRef, RemoteState};

#[derive(Default)]
pub struct FakeReferenceStore {
    inner: Mutex<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    files: HashMap<String, RemoteFile>,
    /// handle -> status polls left before the file turns Active
    pending: HashMap<String, u32>,
    uploads: Vec<PathBuf>,
    status_calls: u32,
    processing_polls: u32,
    failing: HashSet<String>,
    next_id: u32,
}

impl FakeReferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Newly uploaded files report Processing for `polls` status calls.
    pub fn with_processing_polls(polls: u32) -> Self {
        let store = Self::default();
        store.inner.lock().unwrap().processing_polls = polls;
        store
    }

    /// Uploads of a file with this name fail with a terminal error.
    pub fn fail_uploads_for(&self, local_name: &str) {
        self.inner.lock().unwrap().failing.insert(local_name.to_string());
    }

    /// Forget a handle, as if the remote service expired it.
    pub fn expire(&self, handle: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.files.remove(handle);
        inner.pending.remove(handle);
    }

    pub fn upload_count(&self) -> usize {
        self.inner.lock().unwrap().uploads.len()
    }

    pub fn uploads(&self) -> Vec<PathBuf> {
        self.inner.lock().unwrap().uploads.clone()
    }

    pub fn status_calls(&self) -> u32 {
        self.inner.lock().unwrap().status_calls
    }
}

impl ReferenceStore for FakeReferenceStore {
    fn upload(&self, path: &Path, deadline: Deadline) -> Result<RemoteFile, RemoteError> {
        if deadline.is_expired() {
            return Err(RemoteError::DeadlineExceeded("upload".into()));
        }
        let mut inner = self.inner.lock().unwrap();
        let name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
        if inner.failing.contains(&name) {
            return Err(RemoteError::Terminal(format!("upload rejected: {name}")));
        }
        inner.next_id += 1;
        let handle = format!("files/{}", inner.next_id);
        let polls = inner.processing_polls;
        let file = RemoteFile {
            handle: handle.clone(),
            locator: format!("fake://{handle}"),
            state: if polls > 0 { RemoteState::Processing } else { RemoteState::Active },
        };
        inner.pending.insert(handle.clone(), polls);
        inner.files.insert(handle, file.clone());
        inner.uploads.push(path.to_path_buf());
        Ok(file)
    }

    fn status(&self, handle: &str, deadline: Deadline) -> Result<RemoteFile, RemoteError> {
        let mut inner = self.inner.lock().unwrap();
        inner.status_calls += 1;
        if deadline.is_expired() {
            return Err(RemoteError::DeadlineExceeded(format!("status {handle}")));
        }
        let left = inner.pending.get(handle).copied().unwrap_or(0);
        if left > 0 {
            inner.pending.insert(handle.to_string(), left - 1);
        }
        let file = inner
            .files
            .get_mut(handle)
            .ok_or_else(|| RemoteError::Terminal(format!("no such file: {handle}")))?;
        file.state = if left > 1 { RemoteState::Processing } else { RemoteState::Active };
        Ok(file.clone())
    }
}

/// Replays a fixed list of responses, one per call.
#[derive(Default)]
pub struct ScriptedModel {
    script: Mutex<VecDeque<Result<String, RemoteError>>>,
    calls: Mutex<Vec<ModelCall>>,
}

#[derive(Clone, Debug)]
pub struct ModelCall {
    pub document: PathBuf,
    pub references: Vec<RemoteRef>,
    pub instruction: String,
}

impl ScriptedModel {
    pub fn new(script: impl IntoIterator<Item = Result<String, RemoteError>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            calls: Mutex::new(vec![]),
        }
    }

    pub fn replying(text: impl Into<String>) -> Self {
        Self::new([Ok(text.into())])
    }

    pub fn calls(&self) -> Vec<ModelCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl ModelClient for ScriptedModel {
    fn generate(&self, request: &ModelRequest<'_>, _deadline: Deadline) -> Result<String, RemoteError> {
        self.calls.lock().unwrap().push(ModelCall {
            document: request.document.to_path_buf(),
            references: request.references.to_vec(),
            instruction: request.instruction.to_string(),
        });
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(RemoteError::Terminal("script exhausted".into())))
    }
}

pub struct FixedClassifier(pub Category);

impl DocumentClassifier for FixedClassifier {
    fn classify(&self, _path: &Path) -> Category {
        self.0.clone()
    }
}
