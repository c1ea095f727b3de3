//! Boolean query language over repository records
//!
//! ```text
//! stars > 10 and language == 'Python'
//! language ~= 'pyton'              # fuzzy
//! name =~ '^my-.*'                 # regex
//! 'python' in topics               # membership
//! tags contains 'work/*'           # hierarchical tag match
//! not (private or archived)        # truthiness
//! 'machine learning'               # text search anywhere
//! ```
//!
//! Keywords are case-insensitive; `&&`, `||` and `!` work too.
//!
//! # Examples
//!
//! ```
//! use repotag::query::{EvalOptions, Query};
//! use repotag::records::RepoRecord;
//! use serde_json::json;
//!
//! let query = Query::parse("stars > 10 and language == 'Python'").unwrap();
//! let record = RepoRecord::from_value(json!({
//!     "path": "/src/tool", "stars": 15, "language": "Python"
//! })).unwrap();
//! assert!(query.evaluate(&record, &EvalOptions::default()));
//! ```

pub mod ast;
pub mod error;
pub mod eval;
pub mod fuzzy;
pub mod lexer;
pub mod parser;

pub use ast::{CompareOp, Expr, FieldPath, Literal};
pub use error::QuerySyntaxError;
pub use eval::{EvalOptions, EvalStats, compare};
pub use fuzzy::{DEFAULT_FUZZY_THRESHOLD, partial_similarity, similarity};

use std::fmt;
use std::str::FromStr;

use crate::records::RepoRecord;

/// A parsed query, ready to be evaluated against any number of records
#[derive(Debug, Clone)]
pub struct Query {
    source: String,
    expr: Expr,
}

impl Query {
    /// Parse a query string.
    ///
    /// # Errors
    /// Returns `QuerySyntaxError` for empty or malformed queries, including
    /// invalid regular expressions after `=~`.
    pub fn parse(input: &str) -> Result<Self, QuerySyntaxError> {
        let expr = parser::parse(input)?;
        tracing::debug!(query = input, ?expr, "parsed query");
        Ok(Self {
            source: input.to_string(),
            expr,
        })
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub const fn expr(&self) -> &Expr {
        &self.expr
    }

    #[must_use]
    pub fn evaluate(&self, record: &RepoRecord, options: &EvalOptions) -> bool {
        let mut stats = EvalStats::default();
        self.evaluate_with_stats(record, options, &mut stats)
    }

    /// Evaluate and accumulate counters into `stats`
    pub fn evaluate_with_stats(&self, record: &RepoRecord, options: &EvalOptions, stats: &mut EvalStats) -> bool {
        eval::evaluate(&self.expr, record, options, stats)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for Query {
    type Err = QuerySyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
