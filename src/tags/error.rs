//! Tag-specific error types
//!
//! Errors are split by when they can happen:
//!
//! - **`InvalidTagError`**: a tag or tag pattern was rejected before any state changed
//! - **`StorageError`**: reading or writing the tag store file failed
//! - **`TagStoreError`**: union of the two, returned by store operations
//!
//! All errors implement `std::error::Error` via the `thiserror` crate.

use std::path::PathBuf;
use thiserror::Error;

/// Rejected tag or tag pattern
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidTagError {
    /// The tag was empty or only whitespace
    #[error("Empty tag")]
    Empty,

    /// A component between delimiters was empty (e.g. `lang//rust`, `/lang`)
    #[error("Tag '{tag}' has an empty component")]
    EmptyComponent { tag: String },

    /// A character that is not allowed in tags was found
    #[error("Tag '{tag}' contains forbidden character {ch:?}")]
    ForbiddenChar { tag: String, ch: char },

    /// The tag falls into a namespace owned by implicit tags
    #[error("Tag '{tag}' uses reserved namespace '{namespace}' (implicit tags only)")]
    Reserved { tag: String, namespace: String },

    /// A tag selector pattern could not be compiled
    #[error("Invalid tag pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Failure reading or writing the persisted tag assignments
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem error, with the path that was being accessed
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The store file did not contain the expected JSON layout
    #[error("Malformed tag store '{}': {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Serializing the in-memory state failed
    #[error("Failed to serialize tag store: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

/// Errors returned by `TagStore` operations
#[derive(Debug, Error)]
pub enum TagStoreError {
    #[error(transparent)]
    InvalidTag(#[from] InvalidTagError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_message_names_namespace() {
        let err = InvalidTagError::Reserved {
            tag: "lang/rust".into(),
            namespace: "lang".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("lang/rust"));
        assert!(msg.contains("reserved namespace 'lang'"));
    }

    #[test]
    fn test_io_error_includes_path() {
        let err = StorageError::io(
            "/tmp/tags.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/tmp/tags.json"));
    }

    #[test]
    fn test_store_error_is_transparent() {
        let err: TagStoreError = InvalidTagError::Empty.into();
        assert_eq!(err.to_string(), "Empty tag");
    }
}
