use std::path::Path;

use ns_core::Deadline;
use serde::{Deserialize, Serialize};

use crate::error::RemoteError;

/// Remote processing state of an uploaded file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemoteState {
    Processing,
    Active,
    Failed,
    Other(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteFile {
    /// Opaque name assigned by the remote service.
    pub handle: String,
    /// Retrieval URI accepted by the inference call.
    pub locator: String,
    pub state: RemoteState,
}

/// A reference document attached to a model call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRef {
    pub handle: String,
    pub locator: String,
    pub local_name: String,
}

/// Source category reported by the document classifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Known(String),
    Unknown,
}

impl Category {
    pub fn known(name: impl Into<String>) -> Self {
        Category::Known(name.into().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Category::Known(s) => s,
            Category::Unknown => "UNKNOWN",
        }
    }
}

/// Upload + status client for the remote file service.
pub trait ReferenceStore: Send + Sync {
    fn upload(&self, path: &Path, deadline: Deadline) -> Result<RemoteFile, RemoteError>;

    fn status(&self, handle: &str, deadline: Deadline) -> Result<RemoteFile, RemoteError>;

    /// Live means the service still has the handle and reports it usable.
    fn is_live(&self, handle: &str, deadline: Deadline) -> bool {
        matches!(self.status(handle, deadline), Ok(f) if f.state == RemoteState::Active)
    }
}

/// Everything one inference call needs. The client owns getting the subject
/// document to the service.
#[derive(Clone, Copy, Debug)]
pub struct ModelRequest<'a> {
    pub document: &'a Path,
    pub references: &'a [RemoteRef],
    pub instruction: &'a str,
}

/// The single external inference call.
pub trait ModelClient: Send + Sync {
    fn generate(&self, request: &ModelRequest<'_>, deadline: Deadline) -> Result<String, RemoteError>;
}

/// Decides which source family a document belongs to. Must not fail; returns
/// `Category::Unknown` when unsure.
pub trait DocumentClassifier: Send + Sync {
    fn classify(&self, path: &Path) -> Category;
}
