//! Repotag - organize local git repositories with hierarchical tags
//!
//! This library provides the tag store, the query language, and the
//! record loading and filtering used by the `repotag` binary.
//!
//! - [`tags`]: hierarchical tags, patterns, implicit tags and the tag store
//! - [`query`]: parser and evaluator for boolean and fuzzy queries
//! - [`records`]: repository records from the metadata store, JSONL or discovery
//! - [`filter`]: combined query and tag selector filtering

use thiserror::Error;

pub mod cli;
pub mod commands;
pub mod config;
pub mod filter;
pub mod output;
pub mod query;
pub mod records;
pub mod tags;

#[cfg(test)]
pub mod testing;

/// Error enum, contains all failure states of the program
#[derive(Debug, Error)]
pub enum RepotagError {
    /// A tag or tag pattern was rejected
    #[error("Invalid tag: {0}")]
    InvalidTag(#[from] tags::InvalidTagError),
    /// The tag store could not be read or written
    #[error("Tag store error: {0}")]
    Storage(#[from] tags::StorageError),
    /// A query string could not be parsed
    #[error(transparent)]
    QuerySyntax(#[from] query::QuerySyntaxError),
    /// Repository records could not be loaded
    #[error("Record error: {0}")]
    Record(#[from] records::RecordError),
    /// Represents a configuration error
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ::config::ConfigError),
    /// Represents an I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    /// CSV output failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    /// JSON output failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<tags::TagStoreError> for RepotagError {
    fn from(err: tags::TagStoreError) -> Self {
        match err {
            tags::TagStoreError::InvalidTag(e) => Self::InvalidTag(e),
            tags::TagStoreError::Storage(e) => Self::Storage(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_flattens() {
        let err: RepotagError = tags::TagStoreError::from(tags::InvalidTagError::Empty).into();
        assert!(matches!(err, RepotagError::InvalidTag(_)));
        assert_eq!(err.to_string(), "Invalid tag: Empty tag");
    }

    #[test]
    fn test_query_error_message() {
        let err: RepotagError = query::Query::parse("a ==").unwrap_err().into();
        assert!(err.to_string().starts_with("Invalid query:"));
    }
}
