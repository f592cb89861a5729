use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ns_remote::Category;
use serde_json::{Map, Value};

/// Candidate paths, relative to the hints directory, tried when a category has
/// no configured entry. Newest table version first.
pub const DEFAULT_HINT_CANDIDATES: [&str; 3] = ["BTM/BTM_{CAT}_v1_1.json", "BTM/BTM_{CAT}_v1_0.json", "BTM/BTM_{CAT}.json"];

/// Per-category lookup table handed to the instruction builder. Advisory only;
/// an empty table is always a valid answer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TranslationHints {
    pub source: Option<PathBuf>,
    pub entries: Map<String, Value>,
}

impl TranslationHints {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct HintsLibrary {
    dir: PathBuf,
    categories: BTreeMap<String, Vec<String>>,
}

impl HintsLibrary {
    pub fn new(dir: impl Into<PathBuf>, categories: BTreeMap<String, Vec<String>>) -> Self {
        Self {
            dir: dir.into(),
            categories: categories.into_iter().map(|(k, v)| (k.to_uppercase(), v)).collect(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn candidates(&self, category: &Category) -> Vec<String> {
        let cat = match category {
            Category::Known(c) => c,
            Category::Unknown => return vec![],
        };
        match self.categories.get(cat) {
            Some(names) => names.clone(),
            None => DEFAULT_HINT_CANDIDATES.iter().map(|t| t.replace("{CAT}", cat)).collect(),
        }
    }

    /// First existing candidate wins. Unknown category, no file or an unreadable
    /// file all give empty hints.
    pub fn load(&self, category: &Category) -> TranslationHints {
        let Some(path) = self
            .candidates(category)
            .into_iter()
            .map(|name| self.dir.join(name))
            .find(|p| p.is_file())
        else {
            tracing::debug!(category = category.as_str(), "no translation hints");
            return TranslationHints::default();
        };

        let parsed = std::fs::read(&path)
            .map_err(|e| e.to_string())
            .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).map_err(|e| e.to_string()));
        match parsed {
            Ok(Value::Object(entries)) => TranslationHints {
                source: Some(path),
                entries,
            },
            Ok(other) => {
                tracing::warn!(path = %path.display(), kind = ns_contract::json_kind(&other), "hints file is not an object; ignoring");
                TranslationHints::default()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "hints file unreadable; ignoring");
                TranslationHints::default()
            }
        }
    }
}
