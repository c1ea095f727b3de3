use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::path::Path;

use super::error::RecordError;
use crate::query::FieldPath;
use crate::tags::Tag;

/// A repository and its loosely typed metadata.
///
/// `fields` is whatever the upstream metadata collector produced. JSON
/// `null` and missing keys are treated the same way: absent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RepoRecord {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl RepoRecord {
    #[must_use]
    pub const fn new(id: String, fields: Map<String, Value>) -> Self {
        Self { id, fields }
    }

    /// Minimal record for a discovered repository: `path` and `name` only.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        let id = path.to_string_lossy().into_owned();
        let mut fields = Map::new();
        fields.insert("path".into(), Value::String(id.clone()));
        if let Some(name) = path.file_name() {
            fields.insert("name".into(), Value::String(name.to_string_lossy().into_owned()));
        }
        Self { id, fields }
    }

    /// Build a record from a JSON object.
    ///
    /// The id is taken from `path`, then `id`, then `url`.
    ///
    /// # Errors
    /// Returns `RecordError::MissingId` when the value is not an object or
    /// carries none of the id fields.
    pub fn from_value(value: Value) -> Result<Self, RecordError> {
        let Value::Object(fields) = value else {
            return Err(RecordError::MissingId);
        };
        let id = ["path", "id", "url"]
            .iter()
            .find_map(|key| match fields.get(*key) {
                Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            })
            .ok_or(RecordError::MissingId)?;
        Ok(Self { id, fields })
    }

    /// Combine a discovered path with its metadata store entry, if any.
    ///
    /// Metadata fields win, except that `path` always reflects the
    /// discovered location and `name` falls back to the directory name.
    #[must_use]
    pub fn with_metadata(path: &Path, metadata: Option<&Value>) -> Self {
        let mut record = Self::from_path(path);
        if let Some(Value::Object(meta)) = metadata {
            for (key, value) in meta {
                if key == "path" {
                    continue;
                }
                if key == "name" && value.is_null() {
                    continue;
                }
                record.fields.insert(key.clone(), value.clone());
            }
        }
        record
    }

    /// Top-level field lookup; `null` counts as absent
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).filter(|v| !v.is_null())
    }

    /// Resolve a dotted path.
    ///
    /// Traversal through anything other than an object yields `None`, except
    /// that a numeric segment indexes into an array.
    #[must_use]
    pub fn resolve(&self, path: &FieldPath) -> Option<&Value> {
        self.resolve_segments(path.segments())
    }

    /// Same as `resolve` for a dotted string such as `license.key`
    #[must_use]
    pub fn resolve_dotted(&self, dotted: &str) -> Option<&Value> {
        let segments: Vec<&str> = dotted.split('.').collect();
        self.resolve_segments(&segments)
    }

    fn resolve_segments<S: AsRef<str>>(&self, segments: &[S]) -> Option<&Value> {
        let (first, rest) = segments.split_first()?;
        let mut current = self.get(first.as_ref())?;
        for segment in rest {
            let segment = segment.as_ref();
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
            if current.is_null() {
                return None;
            }
        }
        Some(current)
    }

    /// Display name: the `name` field, else the last path component of the id
    #[must_use]
    pub fn name(&self) -> Option<String> {
        if let Some(Value::String(name)) = self.get("name") {
            if !name.trim().is_empty() {
                return Some(name.clone());
            }
        }
        let source = match self.get("path") {
            Some(Value::String(p)) => p.as_str(),
            _ => self.id.as_str(),
        };
        Path::new(source.trim_end_matches('/'))
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
    }

    /// Replace the `tags` field with the canonical form of `tags`
    pub fn set_tags(&mut self, tags: &BTreeSet<Tag>) {
        let values = tags.iter().map(|t| Value::String(t.to_string())).collect();
        self.fields.insert("tags".into(), Value::Array(values));
    }

    /// The record as a JSON object
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

/// Truthiness of a present value: empty strings, empty collections, zero
/// and `false` are falsy.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> RepoRecord {
        RepoRecord::from_value(value).unwrap()
    }

    #[test]
    fn test_resolve_nested() {
        let r = record(json!({"path": "/src/a", "license": {"key": "mit"}}));
        assert_eq!(r.resolve_dotted("license.key"), Some(&json!("mit")));
        assert_eq!(r.resolve_dotted("license.name"), None);
        assert_eq!(r.resolve_dotted("missing.deep.path"), None);
    }

    #[test]
    fn test_resolve_through_scalar_is_absent() {
        let r = record(json!({"path": "/src/a", "language": "Rust"}));
        assert_eq!(r.resolve_dotted("language.name"), None);
    }

    #[test]
    fn test_null_is_absent() {
        let r = record(json!({"path": "/src/a", "license": null, "github": {"pages_url": null}}));
        assert_eq!(r.get("license"), None);
        assert_eq!(r.resolve_dotted("github.pages_url"), None);
    }

    #[test]
    fn test_numeric_segment_indexes_array() {
        let r = record(json!({"path": "/src/a", "topics": ["cli", "rust"]}));
        assert_eq!(r.resolve_dotted("topics.1"), Some(&json!("rust")));
        assert_eq!(r.resolve_dotted("topics.5"), None);
        assert_eq!(r.resolve_dotted("topics.x"), None);
    }

    #[test]
    fn test_id_fallbacks() {
        assert_eq!(record(json!({"path": "/a"})).id, "/a");
        assert_eq!(record(json!({"id": "x", "url": "u"})).id, "x");
        assert_eq!(record(json!({"url": "https://github.com/o/r"})).id, "https://github.com/o/r");
        assert!(matches!(
            RepoRecord::from_value(json!({"name": "a"})),
            Err(RecordError::MissingId)
        ));
        assert!(RepoRecord::from_value(json!([1, 2])).is_err());
    }

    #[test]
    fn test_from_path_and_metadata_merge() {
        let meta = json!({"path": "/elsewhere", "language": "Go", "name": null});
        let r = RepoRecord::with_metadata(Path::new("/home/u/src/tool"), Some(&meta));
        assert_eq!(r.get("path"), Some(&json!("/home/u/src/tool")));
        assert_eq!(r.get("name"), Some(&json!("tool")));
        assert_eq!(r.get("language"), Some(&json!("Go")));
    }

    #[test]
    fn test_name_fallback() {
        let r = record(json!({"path": "/src/widgets/"}));
        assert_eq!(r.name().as_deref(), Some("widgets"));
        let r = record(json!({"path": "/src/x", "name": "Pretty"}));
        assert_eq!(r.name().as_deref(), Some("Pretty"));
    }

    #[test]
    fn test_truthiness() {
        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!(3)));
        assert!(is_truthy(&json!("x")));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!([])));
        assert!(!is_truthy(&json!({})));
    }
}
