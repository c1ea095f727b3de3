//! Tag patterns and selectors
//!
//! A pattern is parsed once and then matched against many tags:
//!
//! - `lang/python`: only that exact tag
//! - `alex/*`: any tag strictly below `alex` (not `alex` itself)
//! - `*`: every tag
//! - `topic/*ml*`: glob segments match exactly one component

use glob::Pattern;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::error::InvalidTagError;
use super::types::{HIERARCHY_DELIMITER, KEY_VALUE_DELIMITER, Tag};

fn is_glob_segment(segment: &str) -> bool {
    segment.contains('*') || segment.contains('?') || segment.contains('[')
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Glob(Pattern),
}

impl Segment {
    fn matches(&self, component: &str) -> bool {
        match self {
            Self::Literal(s) => s == component,
            Self::Glob(p) => p.matches(component),
        }
    }
}

/// Compiled hierarchical tag pattern
#[derive(Debug, Clone)]
pub struct TagPattern {
    original: String,
    segments: Vec<Segment>,
    descendants: bool,
}

impl TagPattern {
    /// Parse a pattern string.
    ///
    /// # Errors
    /// Returns `InvalidTagError::InvalidPattern` for empty patterns, empty
    /// segments, or glob segments that fail to compile.
    pub fn parse(input: &str) -> Result<Self, InvalidTagError> {
        let trimmed = input.trim();
        let invalid = |reason: &str| InvalidTagError::InvalidPattern {
            pattern: trimmed.to_string(),
            reason: reason.to_string(),
        };

        if trimmed.is_empty() {
            return Err(invalid("pattern is empty"));
        }

        let canonical = trimmed.replace(KEY_VALUE_DELIMITER, "/");
        if canonical == "*" {
            return Ok(Self {
                original: trimmed.to_string(),
                segments: Vec::new(),
                descendants: true,
            });
        }

        let (body, descendants) = match canonical.strip_suffix("/*") {
            Some(prefix) => (prefix, true),
            None => (canonical.as_str(), false),
        };

        let mut segments = Vec::new();
        for raw in body.split(HIERARCHY_DELIMITER) {
            let segment = raw.trim();
            if segment.is_empty() {
                return Err(invalid("empty segment"));
            }
            if is_glob_segment(segment) {
                let compiled = Pattern::new(segment).map_err(|e| invalid(e.msg))?;
                segments.push(Segment::Glob(compiled));
            } else {
                segments.push(Segment::Literal(segment.to_string()));
            }
        }

        Ok(Self {
            original: trimmed.to_string(),
            segments,
            descendants,
        })
    }

    /// Whether the pattern contains any wildcard
    #[must_use]
    pub fn has_wildcards(&self) -> bool {
        self.descendants || self.segments.iter().any(|s| matches!(s, Segment::Glob(_)))
    }

    /// The pattern as given by the user
    #[must_use]
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Check a single tag against this pattern
    #[must_use]
    pub fn matches(&self, tag: &Tag) -> bool {
        let components = tag.components();
        let depth_ok = if self.descendants {
            components.len() > self.segments.len()
        } else {
            components.len() == self.segments.len()
        };

        depth_ok
            && self
                .segments
                .iter()
                .zip(components)
                .all(|(segment, component)| segment.matches(component))
    }

    /// Check a tag given in string form; unparseable tags never match
    #[must_use]
    pub fn matches_str(&self, tag: &str) -> bool {
        Tag::parse(tag).is_ok_and(|t| self.matches(&t))
    }

    /// True if any tag in `tags` matches
    pub fn matches_any<'a>(&self, tags: impl IntoIterator<Item = &'a Tag>) -> bool {
        tags.into_iter().any(|t| self.matches(t))
    }
}

impl fmt::Display for TagPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl PartialEq for TagPattern {
    fn eq(&self, other: &Self) -> bool {
        self.original == other.original
    }
}

impl Eq for TagPattern {}

impl FromStr for TagPattern {
    type Err = InvalidTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// How multiple patterns in a selector combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// At least one pattern must match (OR)
    #[default]
    Any,
    /// Every pattern must match (AND)
    All,
}

impl MatchMode {
    #[must_use]
    pub const fn from_require_all(require_all: bool) -> Self {
        if require_all { Self::All } else { Self::Any }
    }
}

/// A list of tag patterns plus a match mode
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSelector {
    pub patterns: Vec<TagPattern>,
    pub mode: MatchMode,
}

impl TagSelector {
    #[must_use]
    pub const fn new(patterns: Vec<TagPattern>, mode: MatchMode) -> Self {
        Self { patterns, mode }
    }

    /// Parse every pattern string, failing on the first invalid one.
    ///
    /// # Errors
    /// Returns the `InvalidTagError` of the first pattern that does not parse.
    pub fn parse<S: AsRef<str>>(patterns: &[S], mode: MatchMode) -> Result<Self, InvalidTagError> {
        let patterns = patterns
            .iter()
            .map(|p| TagPattern::parse(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns, mode })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Match a repository's tag set. An empty selector matches everything.
    #[must_use]
    pub fn matches(&self, repo_tags: &BTreeSet<Tag>) -> bool {
        if self.patterns.is_empty() {
            return true;
        }
        match self.mode {
            MatchMode::Any => self.patterns.iter().any(|p| p.matches_any(repo_tags)),
            MatchMode::All => self.patterns.iter().all(|p| p.matches_any(repo_tags)),
        }
    }
}

/// Match a tag set against patterns; OR by default, AND with `require_all`.
#[must_use]
pub fn matches(repo_tags: &BTreeSet<Tag>, patterns: &[TagPattern], require_all: bool) -> bool {
    if patterns.is_empty() {
        return true;
    }
    if require_all {
        patterns.iter().all(|p| p.matches_any(repo_tags))
    } else {
        patterns.iter().any(|p| p.matches_any(repo_tags))
    }
}
