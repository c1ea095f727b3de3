use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use super::error::{InvalidTagError, StorageError, TagStoreError};
use super::implicit::{self, check_reserved};
use super::types::Tag;
use crate::records::{RepoRecord, expand_home};

/// Explicit tag assignments, persisted as a JSON object mapping repository
/// id to a list of tags.
///
/// Mutations only touch memory; call [`TagStore::save`] (or use
/// [`TagStore::update`]) to persist. The store assumes a single writer:
/// two processes saving concurrently do not corrupt the file, but the last
/// one to save wins.
#[derive(Debug, Clone)]
pub struct TagStore {
    path: PathBuf,
    assignments: BTreeMap<String, BTreeSet<Tag>>,
}

impl TagStore {
    /// Empty store that will be saved to `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            assignments: BTreeMap::new(),
        }
    }

    /// Load the store from `path`; a missing file is an empty store.
    ///
    /// Stored tags that no longer parse are dropped with a warning.
    ///
    /// # Errors
    /// Returns `StorageError` if the file exists but cannot be read or does
    /// not contain a JSON object of string lists.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let mut store = Self::new(path.clone());
        if !path.exists() {
            tracing::debug!(path = %path.display(), "tag store not found, starting empty");
            return Ok(store);
        }

        let content = fs::read_to_string(&path).map_err(|e| StorageError::io(&path, e))?;
        let raw: BTreeMap<String, Vec<String>> =
            serde_json::from_str(&content).map_err(|source| StorageError::Malformed {
                path: path.clone(),
                source,
            })?;

        for (id, tags) in raw {
            let entry = store.assignments.entry(normalize_id(&id)).or_default();
            for raw_tag in tags {
                match Tag::parse(&raw_tag) {
                    Ok(tag) => {
                        entry.insert(tag);
                    }
                    Err(err) => tracing::warn!(repo = %id, tag = %raw_tag, error = %err, "dropping invalid stored tag"),
                }
            }
        }
        store.assignments.retain(|_, tags| !tags.is_empty());

        tracing::debug!(path = %path.display(), repos = store.assignments.len(), "loaded tag store");
        Ok(store)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist to the store path.
    ///
    /// Writes a sibling temporary file and renames it over the target, so a
    /// failed save leaves the previous file intact.
    ///
    /// # Errors
    /// Returns `StorageError` on serialization or filesystem failure.
    pub fn save(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
            }
        }

        let serializable: BTreeMap<&str, Vec<String>> = self
            .assignments
            .iter()
            .map(|(id, tags)| (id.as_str(), tags.iter().map(ToString::to_string).collect()))
            .collect();
        let content = serde_json::to_string_pretty(&serializable)?;

        let mut tmp_name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);

        fs::write(&tmp_path, content).map_err(|e| StorageError::io(&tmp_path, e))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| StorageError::io(&self.path, e))?;

        tracing::debug!(path = %self.path.display(), repos = self.assignments.len(), "saved tag store");
        Ok(())
    }

    /// Run a mutation and save if it succeeds.
    ///
    /// # Errors
    /// Returns the mutation's `InvalidTagError` (nothing is saved) or the
    /// `StorageError` of the save.
    pub fn update<T, F>(&mut self, mutation: F) -> Result<T, TagStoreError>
    where
        F: FnOnce(&mut Self) -> Result<T, InvalidTagError>,
    {
        let result = mutation(self)?;
        self.save()?;
        Ok(result)
    }

    /// Add explicit tags to a repository. Returns how many were new.
    ///
    /// Every tag is parsed and checked first; if any is invalid or reserved
    /// nothing is changed.
    ///
    /// # Errors
    /// Returns the first `InvalidTagError` in the batch.
    pub fn add_tags<S: AsRef<str>>(&mut self, repo_id: &str, tags: &[S]) -> Result<usize, InvalidTagError> {
        let parsed = parse_assignable(tags)?;
        Ok(self.insert_parsed(repo_id, &parsed))
    }

    fn insert_parsed(&mut self, repo_id: &str, tags: &[Tag]) -> usize {
        if tags.is_empty() {
            return 0;
        }
        let entry = self.assignments.entry(normalize_id(repo_id)).or_default();
        let added = tags.iter().filter(|tag| entry.insert((*tag).clone())).count();
        tracing::debug!(repo = repo_id, added, "added tags");
        added
    }

    /// Add and remove tags on many repositories at once.
    ///
    /// Removals run before additions. Every tag to add is validated before
    /// any repository is touched. Returns the ids whose explicit tags changed.
    ///
    /// # Errors
    /// Returns the first `InvalidTagError` in `add`; the store is unchanged.
    pub fn bulk_update<I, S>(&mut self, repo_ids: &[I], add: &[S], remove: &[S]) -> Result<Vec<String>, InvalidTagError>
    where
        I: AsRef<str>,
        S: AsRef<str>,
    {
        let parsed = parse_assignable(add)?;
        let mut changed = Vec::new();
        for repo_id in repo_ids {
            let id = normalize_id(repo_id.as_ref());
            let removed = self.remove_tags(&id, remove);
            let added = self.insert_parsed(&id, &parsed);
            if removed + added > 0 {
                changed.push(id);
            }
        }
        tracing::debug!(repos = repo_ids.len(), changed = changed.len(), "bulk tag update");
        Ok(changed)
    }

    /// Remove explicit tags by exact (canonical) match. Returns how many
    /// were removed. Unknown or unparseable tags are ignored.
    pub fn remove_tags<S: AsRef<str>>(&mut self, repo_id: &str, tags: &[S]) -> usize {
        let id = normalize_id(repo_id);
        let Some(entry) = self.assignments.get_mut(&id) else {
            return 0;
        };
        let removed = tags
            .iter()
            .filter_map(|t| Tag::parse(t.as_ref()).ok())
            .filter(|tag| entry.remove(tag))
            .count();
        if entry.is_empty() {
            self.assignments.remove(&id);
        }
        removed
    }

    /// Rename a tag on one repository. Returns whether `old` was present.
    ///
    /// `new` ends up assigned either way, matching a remove followed by an add.
    ///
    /// # Errors
    /// Returns `InvalidTagError` if either tag is malformed or `new` is
    /// reserved; the store is unchanged in that case.
    pub fn move_tag(&mut self, repo_id: &str, old: &str, new: &str) -> Result<bool, InvalidTagError> {
        let old_tag = Tag::parse(old)?;
        let new_tag = Tag::parse(new)?;
        check_reserved(&new_tag)?;

        let id = normalize_id(repo_id);
        let entry = self.assignments.entry(id).or_default();
        let had_old = entry.remove(&old_tag);
        entry.insert(new_tag);
        Ok(had_old)
    }

    /// Remove every explicit tag from a repository
    pub fn clear(&mut self, repo_id: &str) -> bool {
        self.assignments.remove(&normalize_id(repo_id)).is_some()
    }

    /// Remove a tag from every repository. Returns the number of repositories touched.
    pub fn remove_tag_everywhere(&mut self, tag: &str) -> usize {
        let Ok(tag) = Tag::parse(tag) else {
            return 0;
        };
        let mut touched = 0;
        self.assignments.retain(|_, tags| {
            if tags.remove(&tag) {
                touched += 1;
            }
            !tags.is_empty()
        });
        touched
    }

    #[must_use]
    pub fn explicit_tags(&self, repo_id: &str) -> BTreeSet<Tag> {
        self.assignments
            .get(&normalize_id(repo_id))
            .cloned()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn implicit_tags(&self, record: &RepoRecord) -> BTreeSet<Tag> {
        implicit::implicit_tags(record)
    }

    /// Explicit and implicit tags of a record
    #[must_use]
    pub fn list_tags(&self, record: &RepoRecord) -> BTreeSet<Tag> {
        let mut tags = self.implicit_tags(record);
        tags.extend(self.explicit_tags(&record.id));
        tags
    }

    /// Number of repositories carrying each explicit tag
    #[must_use]
    pub fn tag_counts(&self) -> BTreeMap<Tag, usize> {
        let mut counts = BTreeMap::new();
        for tag in self.assignments.values().flatten() {
            *counts.entry(tag.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Ids of repositories with at least one explicit tag
    pub fn repositories(&self) -> impl Iterator<Item = &str> {
        self.assignments.keys().map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

/// Parse tags meant for explicit assignment, rejecting reserved ones
fn parse_assignable<S: AsRef<str>>(tags: &[S]) -> Result<Vec<Tag>, InvalidTagError> {
    tags.iter()
        .map(|t| {
            let tag = Tag::parse(t.as_ref())?;
            check_reserved(&tag)?;
            Ok(tag)
        })
        .collect()
}

/// Canonical key for a repository id: `~` expanded, trailing `/` removed.
#[must_use]
pub fn normalize_id(repo_id: &str) -> String {
    let trimmed = repo_id.trim();
    let expanded = if trimmed.starts_with('~') {
        expand_home(trimmed).to_string_lossy().into_owned()
    } else {
        trimmed.to_string()
    };
    let without_slash = expanded.trim_end_matches('/');
    if without_slash.is_empty() {
        expanded
    } else {
        without_slash.to_string()
    }
}
