//! Integration tests for repotag
//!
//! These tests exercise the public library API end to end: a tag store in a
//! temporary directory, records loaded from JSONL and the metadata store,
//! queries and tag selectors applied together.

use serde_json::json;
use std::cell::Cell;
use std::collections::BTreeSet;
use std::fs;
use std::io::{BufReader, Cursor, Read};
use tempfile::TempDir;

use repotag::RepotagError;
use repotag::cli::QueryArgs;
use repotag::commands::query::run_reader;
use repotag::config::RepotagConfig;
use repotag::filter::{RepoFilter, annotate, record_tags};
use repotag::query::{EvalOptions, EvalStats, Query};
use repotag::records::{MetadataStore, RepoRecord, discover_repositories, read_jsonl};
use repotag::tags::{self, InvalidTagError, Tag, TagPattern, TagStore};

/// Helper function to create a store in a fresh temporary directory
fn setup_store() -> (TempDir, TagStore) {
    let temp_dir = TempDir::new().unwrap();
    let store = TagStore::new(temp_dir.path().join("tags.json"));
    (temp_dir, store)
}

fn record(value: serde_json::Value) -> RepoRecord {
    RepoRecord::from_value(value).unwrap()
}

fn tag_strings(tags: &BTreeSet<Tag>) -> Vec<String> {
    tags.iter().map(ToString::to_string).collect()
}

#[test]
fn test_add_is_idempotent_and_canonical() {
    let (_dir, mut store) = setup_store();
    let repo = record(json!({"path": "/src/tool"}));

    store.add_tags("/src/tool", &["topic:ml/research"]).unwrap();
    store.add_tags("/src/tool", &["topic/ml/research"]).unwrap();

    let listed = tag_strings(&store.list_tags(&repo));
    let count = listed.iter().filter(|t| *t == "topic/ml/research").count();
    assert_eq!(count, 1);
}

#[test]
fn test_remove_after_add() {
    let (_dir, mut store) = setup_store();
    let repo = record(json!({"path": "/src/tool"}));

    store.add_tags("/src/tool", &["work"]).unwrap();
    assert_eq!(store.remove_tags("/src/tool", &["work"]), 1);
    assert!(!tag_strings(&store.list_tags(&repo)).contains(&"work".to_string()));
    assert_eq!(store.remove_tags("/src/tool", &["work"]), 0);
}

#[test]
fn test_move_tag_matches_remove_then_add() {
    let (_dir, mut moved) = setup_store();
    let (_dir2, mut manual) = setup_store();
    for store in [&mut moved, &mut manual] {
        store.add_tags("/src/tool", &["draft", "keep"]).unwrap();
    }

    moved.move_tag("/src/tool", "draft", "final").unwrap();
    manual.remove_tags("/src/tool", &["draft"]);
    manual.add_tags("/src/tool", &["final"]).unwrap();
    assert_eq!(moved.explicit_tags("/src/tool"), manual.explicit_tags("/src/tool"));

    let before = moved.explicit_tags("/src/tool");
    let result = moved.move_tag("/src/tool", "final", "bad//tag");
    assert!(matches!(result, Err(InvalidTagError::EmptyComponent { .. })));
    assert_eq!(moved.explicit_tags("/src/tool"), before);
}

#[test]
fn test_store_round_trip_through_disk() {
    let (_dir, mut store) = setup_store();
    store
        .update(|s| s.add_tags("/src/b", &["z", "a/b"]))
        .unwrap();
    store.update(|s| s.add_tags("/src/a", &["m"])).unwrap();

    let reloaded = TagStore::load(store.path()).unwrap();
    assert_eq!(reloaded.repositories().collect::<Vec<_>>(), ["/src/a", "/src/b"]);
    assert_eq!(tag_strings(&reloaded.explicit_tags("/src/b")), ["a/b", "z"]);
}

#[test]
fn test_implicit_tags_are_pure() {
    let metadata = record(json!({
        "path": "/home/u/github/tool",
        "language": "Python",
        "license": {"key": "MIT"},
        "topics": ["ml"],
        "stargazers_count": 120
    }));
    let first = tags::implicit_tags(&metadata);
    let second = tags::implicit_tags(&metadata);
    assert_eq!(first, second);
    for expected in ["lang/python", "license/mit", "has/license", "topic/ml", "stars/100+", "repo/tool", "dir/github"] {
        assert!(tag_strings(&first).contains(&expected.to_string()), "missing {expected}");
    }
}

#[test]
fn test_wildcard_does_not_match_bare_prefix() {
    let tagged = |t: &str| -> BTreeSet<Tag> { [Tag::parse(t).unwrap()].into_iter().collect() };
    let patterns = [TagPattern::parse("alex/*").unwrap()];
    assert!(tags::matches(&tagged("alex/beta"), &patterns, false));
    assert!(!tags::matches(&tagged("alex"), &patterns, false));
}

#[test]
fn test_query_round_trip() {
    let query = Query::parse("stars > 10 and language == 'Python'").unwrap();
    let options = EvalOptions::default();
    assert!(query.evaluate(&record(json!({"path": "/a", "stars": 15, "language": "Python"})), &options));
    assert!(!query.evaluate(&record(json!({"path": "/a", "stars": 5, "language": "Python"})), &options));
}

#[test]
fn test_absent_field() {
    let repo = record(json!({"path": "/a", "language": "Go"}));
    let options = EvalOptions::default();
    assert!(!Query::parse("license.name == 'MIT'").unwrap().evaluate(&repo, &options));
    assert!(Query::parse("license.name != 'MIT'").unwrap().evaluate(&repo, &options));
}

#[test]
fn test_fuzzy_match() {
    let repo = record(json!({"path": "/a", "language": "Python"}));
    let options = EvalOptions::default();
    assert!(Query::parse("language ~= 'Pyhton'").unwrap().evaluate(&repo, &options));
    assert!(!Query::parse("language ~= 'Java'").unwrap().evaluate(&repo, &options));
}

#[test]
fn test_short_circuit_or() {
    let repo = record(json!({"path": "/a", "stars": 3}));
    let query = Query::parse("stars == 3 or no.such.nested.path =~ '^x'").unwrap();
    let mut stats = EvalStats::default();
    assert!(query.evaluate_with_stats(&repo, &EvalOptions::default(), &mut stats));
    assert_eq!(stats.leaf_evaluations, 1);
}

/// Reader that records whether anything was read from it
struct TrackingReader<'a> {
    inner: Cursor<&'a str>,
    touched: &'a Cell<bool>,
}

impl Read for TrackingReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.touched.set(true);
        self.inner.read(buf)
    }
}

#[test]
fn test_syntax_error_before_records_are_touched() {
    let (_dir, store) = setup_store();
    let touched = Cell::new(false);
    let reader = BufReader::new(TrackingReader {
        inner: Cursor::new("{\"path\": \"/src/a\", \"stars\": 5}\n"),
        touched: &touched,
    });
    let args = QueryArgs {
        query: Some("(stars > 1 and private".into()),
        ..QueryArgs::default()
    };

    let mut out = Vec::new();
    let result = run_reader(&args, &RepotagConfig::default(), &store, reader, &mut out);
    let Err(RepotagError::QuerySyntax(err)) = result else {
        panic!("expected a syntax error");
    };
    assert_eq!(err.fragment, "end of query");
    assert!(!touched.get());
    assert!(out.is_empty());
}

#[test]
fn test_jsonl_pipeline_with_store_tags() {
    let (_dir, mut store) = setup_store();
    store.add_tags("/src/alpha", &["work/client"]).unwrap();
    store.add_tags("/src/gamma", &["personal"]).unwrap();

    let input = "\
{\"path\": \"/src/alpha\", \"language\": \"Python\", \"stars\": 20}
{broken
{\"path\": \"/src/beta\", \"language\": \"Python\", \"stars\": 30}
{\"path\": \"/src/gamma\", \"language\": \"Rust\", \"stars\": 40}
";
    let mut records: Vec<RepoRecord> = read_jsonl(Cursor::new(input)).map(Result::unwrap).collect();
    assert_eq!(records.len(), 3);
    for r in &mut records {
        annotate(r, &store);
    }

    let filter = RepoFilter::parse(Some("language == 'python'"), &["work/*"], false, EvalOptions::default()).unwrap();
    let kept = filter.apply(records.clone());
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].id, "/src/alpha");
    assert!(tag_strings(&record_tags(&kept[0])).contains(&"work/client".to_string()));

    let filter = RepoFilter::parse(Some("tags contains 'lang/*' and stars >= 30"), &[] as &[&str], false, EvalOptions::default()).unwrap();
    let ids: Vec<String> = filter.apply(records).into_iter().map(|r| r.id).collect();
    assert_eq!(ids, ["/src/beta", "/src/gamma"]);
}

#[test]
fn test_discovery_with_metadata_store() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("github");
    fs::create_dir_all(root.join("tool/.git")).unwrap();
    fs::create_dir_all(root.join("lib/.git")).unwrap();
    fs::create_dir_all(root.join("scratch")).unwrap();
    let root = root.canonicalize().unwrap();

    let tool = root.join("tool");
    let metadata_path = temp_dir.path().join("metadata.json");
    fs::write(
        &metadata_path,
        json!({ tool.to_string_lossy(): {"language": "Rust", "private": true} }).to_string(),
    )
    .unwrap();

    let metadata = MetadataStore::load(&metadata_path).unwrap();
    let paths = discover_repositories(&[root.to_string_lossy()], false);
    assert_eq!(paths, [root.join("lib"), root.join("tool")]);

    let records: Vec<RepoRecord> = paths.iter().map(|p| metadata.record_for(p)).collect();
    let query = Query::parse("private and language == 'rust'").unwrap();
    let matched: Vec<&RepoRecord> = records.iter().filter(|r| query.evaluate(r, &EvalOptions::default())).collect();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].name().as_deref(), Some("tool"));
}

#[cfg(unix)]
#[test]
fn test_tags_set_through_symlink_reach_discovered_repos() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir_all(temp_dir.path().join("real/tool/.git")).unwrap();
    let link = temp_dir.path().join("link");
    std::os::unix::fs::symlink(temp_dir.path().join("real"), &link).unwrap();

    let mut store = TagStore::new(temp_dir.path().join("tags.json"));
    let linked_tool = link.join("tool").to_string_lossy().into_owned();
    repotag::commands::tag::execute(&mut store, &linked_tool, &["work".to_string()], true).unwrap();

    let config = RepotagConfig {
        repository_directories: vec![link.to_string_lossy().into_owned()],
        metadata_store: Some(temp_dir.path().join("metadata.json")),
        ..RepotagConfig::default()
    };
    let args = QueryArgs {
        tags: vec!["work".into()],
        fields: vec!["name".into()],
        ..QueryArgs::default()
    };
    let mut out = Vec::new();
    let matched = repotag::commands::query::run(&args, &config, &store, &mut out).unwrap();
    assert_eq!(matched, 1);
    assert_eq!(String::from_utf8(out).unwrap(), "{\"name\":\"tool\"}\n");

    let real_tool = temp_dir.path().join("real/tool").to_string_lossy().into_owned();
    assert_eq!(tag_strings(&store.explicit_tags(&repotag::commands::tag::resolve_repo(&real_tool))), ["work"]);
}
