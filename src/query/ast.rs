//! Query syntax tree
//!
//! Built once by the parser and never mutated, so a parsed query can be
//! shared across threads and evaluated against any number of records.

use regex::Regex;
use std::fmt;

/// Dotted path into a record, e.g. `license.key`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    #[must_use]
    pub const fn new(segments: Vec<String>) -> Self {
        Self { segments }
    }

    /// Split a dotted string; empty segments are dropped
    #[must_use]
    pub fn parse(dotted: &str) -> Self {
        Self {
            segments: dotted
                .split('.')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        }
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    /// `~=`
    Fuzzy,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Fuzzy => "~=",
        };
        f.write_str(s)
    }
}

/// Literal value on the right-hand side of a condition
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(f64),
    Bool(bool),
    Null,
    List(Vec<Literal>),
}

#[derive(Debug, Clone)]
pub enum Expr {
    /// `path op literal`
    Comparison {
        path: FieldPath,
        op: CompareOp,
        literal: Literal,
    },
    /// `literal in path`, or equivalently `path contains literal`
    Membership { literal: Literal, path: FieldPath },
    /// `path in [..]` or `path in 'string'`
    OneOf { path: FieldPath, literal: Literal },
    /// `path =~ 'regex'`, compiled case-insensitive
    Regex { path: FieldPath, regex: Regex },
    /// Bare identifier: field is present and truthy
    Truthy(FieldPath),
    /// Bare quoted string: fuzzy search over every key and value
    Search(String),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Literal(bool),
}

impl Expr {
    /// Number of leaf conditions in the tree
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::And(l, r) | Self::Or(l, r) => l.leaf_count() + r.leaf_count(),
            Self::Not(inner) => inner.leaf_count(),
            Self::Literal(_) => 0,
            _ => 1,
        }
    }
}
