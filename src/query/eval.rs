//! Query evaluation
//!
//! A recursive walk over the expression tree with short-circuiting `and`
//! and `or`. Evaluation never fails: type mismatches and missing fields
//! simply make a condition false (see [`compare`] for the absent-field rules).

use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;

use super::ast::{CompareOp, Expr, Literal};
use super::fuzzy::{DEFAULT_FUZZY_THRESHOLD, partial_similarity, similarity};
use crate::records::{RepoRecord, is_truthy};
use crate::tags::{Tag, TagPattern};

/// Per-evaluation settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalOptions {
    /// Minimum similarity in `[0, 1]` for `~=` and text search
    pub fuzzy_threshold: f64,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
        }
    }
}

impl EvalOptions {
    /// Accepts either a fraction (`0.8`) or a percentage (`80`)
    #[must_use]
    pub fn with_threshold(threshold: f64) -> Self {
        let normalized = if threshold > 1.0 { threshold / 100.0 } else { threshold };
        Self {
            fuzzy_threshold: normalized.clamp(0.0, 1.0),
        }
    }
}

/// Counters collected while evaluating
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvalStats {
    /// Leaf conditions actually evaluated
    pub leaf_evaluations: usize,
}

/// The operation applied to a resolved field value
#[derive(Debug, Clone, Copy)]
pub enum Operation<'a> {
    Compare(CompareOp, &'a Literal),
    /// Field contains the literal
    Contains(&'a Literal),
    /// Field is one of / inside the literal
    OneOf(&'a Literal),
    Regex(&'a Regex),
}

/// Evaluate `expr` against `record`
pub fn evaluate(expr: &Expr, record: &RepoRecord, options: &EvalOptions, stats: &mut EvalStats) -> bool {
    match expr {
        Expr::And(left, right) => {
            evaluate(left, record, options, stats) && evaluate(right, record, options, stats)
        }
        Expr::Or(left, right) => {
            evaluate(left, record, options, stats) || evaluate(right, record, options, stats)
        }
        Expr::Not(inner) => !evaluate(inner, record, options, stats),
        Expr::Literal(value) => *value,
        Expr::Comparison { path, op, literal } => {
            stats.leaf_evaluations += 1;
            compare(record.resolve(path), Operation::Compare(*op, literal), options)
        }
        Expr::Membership { literal, path } => {
            stats.leaf_evaluations += 1;
            compare(record.resolve(path), Operation::Contains(literal), options)
        }
        Expr::OneOf { path, literal } => {
            stats.leaf_evaluations += 1;
            compare(record.resolve(path), Operation::OneOf(literal), options)
        }
        Expr::Regex { path, regex } => {
            stats.leaf_evaluations += 1;
            compare(record.resolve(path), Operation::Regex(regex), options)
        }
        Expr::Truthy(path) => {
            stats.leaf_evaluations += 1;
            record.resolve(path).is_some_and(is_truthy)
        }
        Expr::Search(term) => {
            stats.leaf_evaluations += 1;
            search_anywhere(&record.fields, &term.to_lowercase(), options.fuzzy_threshold)
        }
    }
}

/// Apply an operation to a possibly absent value.
///
/// An absent value (missing key or JSON `null`) fails every operation
/// except `!=` against a non-null literal, and `== null` holds exactly
/// when the value is absent.
#[must_use]
pub fn compare(actual: Option<&Value>, operation: Operation<'_>, options: &EvalOptions) -> bool {
    let Some(value) = actual else {
        return match operation {
            Operation::Compare(CompareOp::Eq, Literal::Null) => true,
            Operation::Compare(CompareOp::Ne, Literal::Null) => false,
            Operation::Compare(CompareOp::Ne, _) => true,
            _ => false,
        };
    };

    match operation {
        Operation::Compare(_, Literal::Null) => matches!(operation, Operation::Compare(CompareOp::Ne, _)),
        Operation::Compare(CompareOp::Eq, literal) => values_equal(value, literal),
        Operation::Compare(CompareOp::Ne, literal) => !values_equal(value, literal),
        Operation::Compare(CompareOp::Gt, literal) => ordering(value, literal) == Some(Ordering::Greater),
        Operation::Compare(CompareOp::Lt, literal) => ordering(value, literal) == Some(Ordering::Less),
        Operation::Compare(CompareOp::Ge, literal) => {
            matches!(ordering(value, literal), Some(Ordering::Greater | Ordering::Equal))
        }
        Operation::Compare(CompareOp::Le, literal) => {
            matches!(ordering(value, literal), Some(Ordering::Less | Ordering::Equal))
        }
        Operation::Compare(CompareOp::Fuzzy, literal) => fuzzy_match(value, literal, options.fuzzy_threshold),
        Operation::Contains(literal) => contains(value, literal),
        Operation::OneOf(literal) => one_of(value, literal),
        Operation::Regex(regex) => regex_match(value, regex),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn render_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Scalar value rendered for string comparisons
fn render(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.as_f64().map_or_else(|| n.to_string(), render_number)),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn render_literal(literal: &Literal) -> Option<String> {
    match literal {
        Literal::String(s) => Some(s.clone()),
        Literal::Number(n) => Some(render_number(*n)),
        Literal::Bool(b) => Some(b.to_string()),
        Literal::Null | Literal::List(_) => None,
    }
}

fn value_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn literal_number(literal: &Literal) -> Option<f64> {
    match literal {
        Literal::Number(n) => Some(*n),
        Literal::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn values_equal(value: &Value, literal: &Literal) -> bool {
    match (value, literal) {
        (Value::String(s), Literal::String(l)) => s.to_lowercase() == l.to_lowercase(),
        (Value::String(_), Literal::Number(l)) => value_number(value) == Some(*l),
        (Value::Number(_), Literal::Number(l)) => value_number(value) == Some(*l),
        (Value::Number(_), Literal::String(l)) => {
            render(value).is_some_and(|r| r.eq_ignore_ascii_case(l.trim()))
                || literal_number(literal).is_some_and(|n| value_number(value) == Some(n))
        }
        (Value::Bool(b), Literal::Bool(l)) => b == l,
        (Value::Array(items), Literal::List(expected)) => {
            items.len() == expected.len() && items.iter().zip(expected).all(|(v, l)| values_equal(v, l))
        }
        _ => false,
    }
}

fn ordering(value: &Value, literal: &Literal) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (value_number(value), literal_number(literal)) {
        return a.partial_cmp(&b);
    }
    match (value, literal) {
        (Value::String(a), Literal::String(b)) => Some(a.to_lowercase().cmp(&b.to_lowercase())),
        _ => None,
    }
}

fn fuzzy_match(value: &Value, literal: &Literal, threshold: f64) -> bool {
    if let Literal::List(items) = literal {
        return items.iter().any(|item| fuzzy_match(value, item, threshold));
    }
    if let Value::Array(items) = value {
        return items.iter().any(|item| fuzzy_match(item, literal, threshold));
    }
    match (render(value), render_literal(literal)) {
        (Some(actual), Some(expected)) => {
            similarity(&actual.to_lowercase(), &expected.to_lowercase()) >= threshold
        }
        _ => false,
    }
}

fn regex_match(value: &Value, regex: &Regex) -> bool {
    match value {
        Value::Array(items) => items.iter().any(|item| regex_match(item, regex)),
        other => render(other).is_some_and(|s| regex.is_match(&s)),
    }
}

/// Element test for sequence containers: wildcard patterns use tag
/// matching, tag-like strings compare canonically, everything else uses `==`.
fn element_matches(element: &Value, literal: &Literal) -> bool {
    if let (Value::String(item), Literal::String(needle)) = (element, literal) {
        if let Ok(pattern) = TagPattern::parse(needle) {
            if pattern.has_wildcards() {
                return pattern.matches_str(item);
            }
        }
        if let (Ok(a), Ok(b)) = (Tag::parse(item), Tag::parse(needle)) {
            if a == b {
                return true;
            }
        }
    }
    values_equal(element, literal)
}

fn contains(container: &Value, literal: &Literal) -> bool {
    if let Literal::List(items) = literal {
        return !items.is_empty() && items.iter().all(|item| contains(container, item));
    }
    match container {
        Value::String(haystack) => {
            render_literal(literal).is_some_and(|needle| haystack.to_lowercase().contains(&needle.to_lowercase()))
        }
        Value::Array(items) => items.iter().any(|item| element_matches(item, literal)),
        Value::Object(map) => render_literal(literal)
            .is_some_and(|key| map.keys().any(|k| k.eq_ignore_ascii_case(&key))),
        _ => false,
    }
}

fn one_of(value: &Value, literal: &Literal) -> bool {
    match (value, literal) {
        (Value::Array(items), Literal::List(_)) => items.iter().any(|item| one_of(item, literal)),
        (_, Literal::List(options)) => options.iter().any(|option| values_equal(value, option)),
        (_, Literal::String(haystack)) => {
            render(value).is_some_and(|needle| haystack.to_lowercase().contains(&needle.to_lowercase()))
        }
        _ => false,
    }
}

fn search_anywhere(fields: &serde_json::Map<String, Value>, term: &str, threshold: f64) -> bool {
    fields.iter().any(|(key, value)| {
        partial_similarity(&key.to_lowercase(), term) >= threshold || search_value(value, term, threshold)
    })
}

fn search_value(value: &Value, term: &str, threshold: f64) -> bool {
    match value {
        Value::Object(map) => search_anywhere(map, term, threshold),
        Value::Array(items) => items.iter().any(|item| search_value(item, term, threshold)),
        other => render(other).is_some_and(|s| partial_similarity(&s.to_lowercase(), term) >= threshold),
    }
}
