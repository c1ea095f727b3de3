//! Implicit tags derived from repository metadata
//!
//! Implicit tags are recomputed on every call and never stored. Their
//! namespaces are reserved so explicit tags cannot shadow them.

use serde_json::Value;
use std::collections::BTreeSet;
use std::path::Path;

use super::error::InvalidTagError;
use super::types::Tag;
use crate::records::{RepoRecord, is_truthy};

/// Namespaces owned by implicit tags
pub const RESERVED_NAMESPACES: [&str; 9] = [
    "repo",
    "dir",
    "lang",
    "license",
    "has",
    "status",
    "visibility",
    "org",
    "stars",
];

/// Single-component tags owned by implicit tags
pub const RESERVED_TAGS: [&str; 2] = ["github", "pypi"];

/// Reject tags that collide with implicit ones.
///
/// # Errors
/// Returns `InvalidTagError::Reserved` naming the reserved namespace.
pub fn check_reserved(tag: &Tag) -> Result<(), InvalidTagError> {
    let namespace = tag.namespace();
    let reserved = if tag.depth() == 1 {
        RESERVED_TAGS.contains(&namespace) || RESERVED_NAMESPACES.contains(&namespace)
    } else {
        RESERVED_NAMESPACES.contains(&namespace)
    };
    if reserved {
        return Err(InvalidTagError::Reserved {
            tag: tag.to_string(),
            namespace: namespace.to_string(),
        });
    }
    Ok(())
}

fn as_str(value: Option<&Value>) -> Option<&str> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.as_str()),
        _ => None,
    }
}

fn push(tags: &mut BTreeSet<Tag>, namespace: &str, value: &str) {
    if let Some(tag) = Tag::derived(namespace, value) {
        tags.insert(tag);
    }
}

fn location(record: &RepoRecord) -> &str {
    as_str(record.get("path")).unwrap_or(&record.id)
}

fn license_key(value: &Value) -> Option<String> {
    let raw = match value {
        Value::String(s) => s.as_str(),
        Value::Object(map) => ["key", "spdx_id", "type", "name"]
            .iter()
            .find_map(|k| as_str(map.get(*k)))?,
        _ => return None,
    };
    let key = raw.trim().to_lowercase();
    (!key.is_empty() && key != "none").then_some(key)
}

fn stars_bucket(count: f64) -> &'static str {
    if count >= 1000.0 {
        "1000+"
    } else if count >= 100.0 {
        "100+"
    } else if count >= 10.0 {
        "10+"
    } else if count >= 1.0 {
        "1+"
    } else {
        "0"
    }
}

fn status_tag(record: &RepoRecord) -> Option<&'static str> {
    if let Some(Value::Bool(clean)) = record.resolve_dotted("status.clean") {
        return Some(if *clean { "clean" } else { "dirty" });
    }
    let uncommitted = record.resolve_dotted("status.uncommitted_changes");
    let unpushed = record.resolve_dotted("status.unpushed_commits");
    if uncommitted.is_none() && unpushed.is_none() {
        return None;
    }
    let dirty = uncommitted.is_some_and(is_truthy) || unpushed.is_some_and(is_truthy);
    Some(if dirty { "dirty" } else { "clean" })
}

/// Derive the implicit tag set of a record. Pure and deterministic.
#[must_use]
pub fn implicit_tags(record: &RepoRecord) -> BTreeSet<Tag> {
    let mut tags = BTreeSet::new();
    let location = Path::new(location(record).trim_end_matches('/'));

    if let Some(name) = record.name() {
        push(&mut tags, "repo", &name);
    }
    if let Some(parent) = location.parent().and_then(Path::file_name) {
        push(&mut tags, "dir", &parent.to_string_lossy());
    }

    if let Some(language) = as_str(record.get("language")) {
        push(&mut tags, "lang", &language.to_lowercase());
    }

    if let Some(key) = record.get("license").and_then(license_key) {
        push(&mut tags, "license", &key);
        tags.insert(Tag::flag_path(&["has", "license"]));
    }

    let topics = record
        .get("topics")
        .or_else(|| record.resolve_dotted("github.topics"));
    if let Some(Value::Array(items)) = topics {
        for topic in items.iter().filter_map(|t| as_str(Some(t))) {
            push(&mut tags, "topic", topic);
        }
    }

    let owner = match record.get("owner") {
        Some(Value::Object(map)) => as_str(map.get("login")),
        other => as_str(other),
    };
    if let Some(owner) = owner {
        push(&mut tags, "org", owner);
    }

    if as_str(record.resolve_dotted("remote.url")).is_some_and(|url| url.contains("github.com")) {
        tags.insert(Tag::flag("github"));
    }

    if record.get("package").is_some() {
        tags.insert(Tag::flag_path(&["has", "package"]));
        if record.resolve_dotted("package.published").is_some_and(is_truthy) {
            tags.insert(Tag::flag("pypi"));
        }
    }

    if as_str(record.resolve_dotted("github.pages_url")).is_some() || record.get("has_pages").is_some_and(is_truthy) {
        tags.insert(Tag::flag_path(&["has", "pages"]));
    }
    if record.get("has_docs").is_some_and(is_truthy) {
        tags.insert(Tag::flag_path(&["has", "docs"]));
        if let Some(tool) = as_str(record.get("docs_tool")) {
            push(&mut tags, "tool", &tool.to_lowercase());
        }
    }
    for (field, feature) in [("has_issues", "issues"), ("has_wiki", "wiki")] {
        if record.get(field).is_some_and(is_truthy) {
            tags.insert(Tag::flag_path(&["has", feature]));
        }
    }
    for flag in ["fork", "archived"] {
        if record.get(flag).is_some_and(is_truthy) {
            tags.insert(Tag::flag(flag));
        }
    }

    let private = record
        .resolve_dotted("github.is_private")
        .or_else(|| record.get("private"));
    if let Some(Value::Bool(private)) = private {
        let visibility = if *private { "private" } else { "public" };
        tags.insert(Tag::flag_path(&["visibility", visibility]));
    }

    if let Some(status) = status_tag(record) {
        tags.insert(Tag::flag_path(&["status", status]));
    }

    if let Some(count) = record.get("stargazers_count").and_then(Value::as_f64) {
        tags.insert(Tag::flag_path(&["stars", stars_bucket(count)]));
    }

    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> RepoRecord {
        RepoRecord::from_value(value).unwrap()
    }

    fn strings(tags: &BTreeSet<Tag>) -> Vec<String> {
        tags.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_path_only_record() {
        let tags = implicit_tags(&record(json!({"path": "/home/u/work/api"})));
        assert_eq!(strings(&tags), ["dir/work", "repo/api"]);
    }

    #[test]
    fn test_full_metadata() {
        let r = record(json!({
            "path": "/src/proj",
            "name": "proj",
            "language": "Python",
            "license": {"key": "MIT", "name": "MIT License"},
            "topics": ["cli", "ml/research"],
            "owner": {"login": "acme"},
            "remote": {"url": "git@github.com:acme/proj.git"},
            "package": {"published": true, "name": "proj"},
            "github": {"pages_url": "https://acme.github.io/proj", "is_private": false},
            "has_docs": true,
            "status": {"clean": false},
            "stargazers_count": 150
        }));
        let tags = strings(&implicit_tags(&r));
        for expected in [
            "repo/proj",
            "dir/src",
            "lang/python",
            "license/mit",
            "has/license",
            "topic/cli",
            "topic/ml-research",
            "org/acme",
            "github",
            "pypi",
            "has/package",
            "has/pages",
            "has/docs",
            "visibility/public",
            "status/dirty",
            "stars/100+",
        ] {
            assert!(tags.contains(&expected.to_string()), "missing {expected}: {tags:?}");
        }
    }

    #[test]
    fn test_hosting_flags() {
        let r = record(json!({
            "path": "/src/proj",
            "fork": true,
            "archived": false,
            "has_issues": true,
            "has_wiki": true,
            "has_pages": true,
            "has_docs": true,
            "docs_tool": "MkDocs"
        }));
        let tags = strings(&implicit_tags(&r));
        for expected in ["fork", "has/issues", "has/wiki", "has/pages", "has/docs", "tool/mkdocs"] {
            assert!(tags.contains(&expected.to_string()), "missing {expected}: {tags:?}");
        }
        assert!(!tags.contains(&"archived".to_string()));

        let bare = strings(&implicit_tags(&record(json!({"path": "/src/proj", "docs_tool": "sphinx"}))));
        assert!(!bare.iter().any(|t| t.starts_with("tool/") || t == "fork"));
    }

    #[test]
    fn test_license_none_skipped() {
        let tags = strings(&implicit_tags(&record(json!({"path": "/a/b", "license": "none"}))));
        assert!(!tags.iter().any(|t| t.starts_with("license") || t == "has/license"));
    }

    #[test]
    fn test_star_buckets() {
        for (count, bucket) in [(0, "stars/0"), (1, "stars/1+"), (42, "stars/10+"), (5000, "stars/1000+")] {
            let tags = strings(&implicit_tags(&record(json!({"path": "/a/b", "stargazers_count": count}))));
            assert!(tags.contains(&bucket.to_string()), "{count} -> {tags:?}");
        }
    }

    #[test]
    fn test_status_from_counters() {
        let dirty = record(json!({"path": "/a/b", "status": {"uncommitted_changes": false, "unpushed_commits": 2}}));
        assert!(strings(&implicit_tags(&dirty)).contains(&"status/dirty".to_string()));

        let clean = record(json!({"path": "/a/b", "status": {"uncommitted_changes": false, "unpushed_commits": 0}}));
        assert!(strings(&implicit_tags(&clean)).contains(&"status/clean".to_string()));
    }

    #[test]
    fn test_derivation_is_pure() {
        let r = record(json!({"path": "/a/b", "language": "Go", "stargazers_count": 12}));
        assert_eq!(implicit_tags(&r), implicit_tags(&r));
    }

    #[test]
    fn test_check_reserved() {
        for reserved in ["lang/rust", "github", "has/docs", "stars", "org/acme/team"] {
            let tag = Tag::parse(reserved).unwrap();
            assert!(
                matches!(check_reserved(&tag), Err(InvalidTagError::Reserved { .. })),
                "{reserved} should be reserved"
            );
        }
        for allowed in ["topic/ml", "work/client", "languages", "github-actions", "pypi/extra"] {
            assert!(check_reserved(&Tag::parse(allowed).unwrap()).is_ok(), "{allowed} should be allowed");
        }
    }
}
