use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

use super::discovery::{canonical_path, expand_home};
use super::error::RecordError;
use super::record::RepoRecord;

/// Re-key entries whose id is an existing path by its canonical form, so
/// they line up with discovered repositories and tag store ids.
fn canonical_keys(entries: Map<String, Value>) -> Map<String, Value> {
    let mut keyed = Map::new();
    for (id, value) in entries {
        let key = if expand_home(&id).exists() {
            canonical_path(&id).to_string_lossy().into_owned()
        } else {
            id
        };
        if keyed.insert(key.clone(), value).is_some() {
            tracing::warn!(id = %key, "several metadata entries resolve to the same repository, keeping the last");
        }
    }
    keyed
}

/// Read-only view of the upstream metadata store.
///
/// The file is a JSON object mapping repository id to its metadata record.
/// A missing file is an empty store.
#[derive(Debug, Clone, Default)]
pub struct MetadataStore {
    entries: Map<String, Value>,
    path: Option<PathBuf>,
}

impl MetadataStore {
    /// Load the store from `path`.
    ///
    /// # Errors
    /// Returns `RecordError` if the file exists but cannot be read, is not
    /// valid JSON, or is not a JSON object.
    pub fn load(path: &Path) -> Result<Self, RecordError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "metadata store not found, using empty store");
            return Ok(Self {
                entries: Map::new(),
                path: Some(path.to_path_buf()),
            });
        }

        let content = fs::read_to_string(path).map_err(|e| RecordError::io(path, e))?;
        let value: Value = serde_json::from_str(&content).map_err(|source| RecordError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;
        let Value::Object(entries) = value else {
            return Err(RecordError::NotAnObject { path: path.to_path_buf() });
        };

        tracing::debug!(path = %path.display(), entries = entries.len(), "loaded metadata store");
        Ok(Self {
            entries: canonical_keys(entries),
            path: Some(path.to_path_buf()),
        })
    }

    /// In-memory store, used by tests and piped input
    #[must_use]
    pub fn from_entries(entries: Map<String, Value>) -> Self {
        Self {
            entries: canonical_keys(entries),
            path: None,
        }
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Value> {
        self.entries.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every stored entry as a record, in id order.
    ///
    /// Entries that are not objects are skipped with a warning.
    #[must_use]
    pub fn records(&self) -> Vec<RepoRecord> {
        let mut ids: Vec<&String> = self.entries.keys().collect();
        ids.sort();
        ids.into_iter()
            .filter_map(|id| match &self.entries[id] {
                Value::Object(fields) => {
                    let mut fields = fields.clone();
                    fields
                        .entry("path")
                        .or_insert_with(|| Value::String(id.clone()));
                    Some(RepoRecord::new(id.clone(), fields))
                }
                other => {
                    tracing::warn!(id = %id, kind = ?other, "skipping non-object metadata entry");
                    None
                }
            })
            .collect()
    }

    /// Record for a discovered repository, merged with its entry if present
    #[must_use]
    pub fn record_for(&self, path: &Path) -> RepoRecord {
        let id = path.to_string_lossy();
        RepoRecord::with_metadata(path, self.get(&id))
    }
}
