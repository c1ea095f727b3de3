//! Record filtering by query and tag selector
//!
//! Records are first annotated with their full tag set (upstream tags,
//! implicit tags and explicit tags from the store), then kept if they match
//! both the tag selector and the query.

use rayon::prelude::*;
use serde_json::Value;
use std::collections::BTreeSet;

use crate::RepotagError;
use crate::query::{EvalOptions, Query};
use crate::records::RepoRecord;
use crate::tags::{MatchMode, Tag, TagSelector, TagStore};

/// Tags currently stored in a record's `tags` field; invalid entries are skipped
#[must_use]
pub fn record_tags(record: &RepoRecord) -> BTreeSet<Tag> {
    match record.get("tags") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .filter_map(|s| Tag::parse(s).ok())
            .collect(),
        _ => BTreeSet::new(),
    }
}

/// Merge implicit and explicit tags into the record's `tags` field
pub fn annotate(record: &mut RepoRecord, store: &TagStore) {
    let mut tags = record_tags(record);
    tags.extend(store.list_tags(record));
    record.set_tags(&tags);
}

/// A query and/or tag selector applied to records
#[derive(Debug, Clone, Default)]
pub struct RepoFilter {
    query: Option<Query>,
    selector: TagSelector,
    options: EvalOptions,
}

impl RepoFilter {
    #[must_use]
    pub const fn new(query: Option<Query>, selector: TagSelector, options: EvalOptions) -> Self {
        Self { query, selector, options }
    }

    /// Build a filter from command-line style inputs.
    ///
    /// Everything is validated here, before any record is read.
    ///
    /// # Errors
    /// Returns `RepotagError::QuerySyntax` or `RepotagError::InvalidTag`.
    pub fn parse<S: AsRef<str>>(
        query: Option<&str>,
        tag_patterns: &[S],
        require_all: bool,
        options: EvalOptions,
    ) -> Result<Self, RepotagError> {
        let query = query.map(Query::parse).transpose()?;
        let selector = TagSelector::parse(tag_patterns, MatchMode::from_require_all(require_all))?;
        Ok(Self { query, selector, options })
    }

    #[must_use]
    pub const fn query(&self) -> Option<&Query> {
        self.query.as_ref()
    }

    #[must_use]
    pub const fn options(&self) -> &EvalOptions {
        &self.options
    }

    /// True when neither a query nor a tag pattern was given
    #[must_use]
    pub fn is_pass_through(&self) -> bool {
        self.query.is_none() && self.selector.is_empty()
    }

    /// Check one (already annotated) record
    #[must_use]
    pub fn matches(&self, record: &RepoRecord) -> bool {
        if !self.selector.is_empty() && !self.selector.matches(&record_tags(record)) {
            return false;
        }
        self.query
            .as_ref()
            .is_none_or(|query| query.evaluate(record, &self.options))
    }

    /// Filter records in parallel, keeping input order
    #[must_use]
    pub fn apply(&self, records: Vec<RepoRecord>) -> Vec<RepoRecord> {
        if self.is_pass_through() {
            return records;
        }
        let kept: Vec<RepoRecord> = records
            .into_par_iter()
            .filter(|record| self.matches(record))
            .collect();
        tracing::debug!(kept = kept.len(), "filtered records");
        kept
    }

    /// Lazy, sequential filtering for streamed input
    pub fn filter_iter<'a, I>(&'a self, records: I) -> impl Iterator<Item = RepoRecord> + 'a
    where
        I: IntoIterator<Item = RepoRecord>,
        I::IntoIter: 'a,
    {
        records.into_iter().filter(move |record| self.matches(record))
    }
}
