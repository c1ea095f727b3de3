//! Testing utilities for repotag
//!
//! This module provides helper types for writing tests, including a
//! `TestStore` wrapper around a tag store in a temporary directory and the
//! `record!` macro for building repository records.
//!
//! Only available when compiled with `cfg(test)`.

use tempfile::TempDir;

use crate::tags::TagStore;

/// Tag store backed by a temporary directory that is removed on drop
///
/// # Examples
/// ```ignore
/// let mut ts = TestStore::new();
/// ts.store.add_tags("/src/tool", &["work"]).unwrap();
/// ts.store.save().unwrap();
/// assert_eq!(ts.reload().explicit_tags("/src/tool").len(), 1);
/// ```
pub struct TestStore {
    pub dir: TempDir,
    pub store: TagStore,
}

impl TestStore {
    /// Empty store at `<tempdir>/tags.json`; nothing is written until saved
    ///
    /// # Panics
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let store = TagStore::new(dir.path().join("tags.json"));
        Self { dir, store }
    }

    /// Load a fresh copy of the store from disk
    ///
    /// # Panics
    /// Panics if the store file is unreadable.
    #[must_use]
    pub fn reload(&self) -> TagStore {
        TagStore::load(self.store.path()).expect("Failed to reload tag store")
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a [`RepoRecord`](crate::records::RepoRecord) from JSON object syntax
///
/// ```ignore
/// let r = record!({"path": "/src/tool", "stars": 3});
/// ```
#[macro_export]
macro_rules! record {
    ($($json:tt)+) => {
        $crate::records::RepoRecord::from_value(::serde_json::json!($($json)+))
            .expect("record needs a path, id or url")
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_cleanup() {
        let path = {
            let mut ts = TestStore::new();
            ts.store.add_tags("/src/tool", &["work"]).unwrap();
            ts.store.save().unwrap();
            assert_eq!(ts.reload().explicit_tags("/src/tool").len(), 1);
            ts.store.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_record_macro() {
        let r = record!({"path": "/src/tool", "stars": 3});
        assert_eq!(r.id, "/src/tool");
        assert_eq!(r.get("stars"), Some(&serde_json::json!(3)));
    }
}
