use thiserror::Error;

/// A query string that could not be parsed.
///
/// `position` is the byte offset of `fragment` in the query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid query: {message} at position {position} (near '{fragment}')")]
pub struct QuerySyntaxError {
    pub message: String,
    pub fragment: String,
    pub position: usize,
}

impl QuerySyntaxError {
    pub(crate) fn new(message: impl Into<String>, fragment: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            fragment: fragment.into(),
            position,
        }
    }
}
