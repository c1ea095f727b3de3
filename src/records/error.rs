//! Errors raised while loading repository records

use std::path::PathBuf;
use thiserror::Error;

/// Failures reading the metadata store or a record stream
#[derive(Debug, Error)]
pub enum RecordError {
    /// Filesystem error, with the path that was being read
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading from a stream (stdin, pipe) failed
    #[error("Failed to read input: {0}")]
    Stream(#[from] std::io::Error),

    /// The metadata store was not valid JSON
    #[error("Malformed metadata store '{}': {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The metadata store must be a JSON object keyed by repository id
    #[error("Metadata store '{}' is not a JSON object", path.display())]
    NotAnObject { path: PathBuf },

    /// A record had neither `path`, `id` nor `url`
    #[error("Record has no 'path', 'id' or 'url' field")]
    MissingId,
}

impl RecordError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}
