//! Query command - filter repository records and stream them out

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use crate::cli::QueryArgs;
use crate::config::{OutputFormat, RepotagConfig};
use crate::filter::{RepoFilter, annotate};
use crate::output::{DEFAULT_FIELDS, RecordSink};
use crate::query::EvalOptions;
use crate::records::{MetadataStore, RecordError, RepoRecord, discover_repositories, read_jsonl};
use crate::tags::TagStore;
use crate::RepotagError;

type Result<T> = std::result::Result<T, RepotagError>;

/// Execute the query command, writing matches to stdout
///
/// # Errors
/// Returns an error on an invalid query or tag pattern (before any record
/// is read), or if records cannot be loaded or written
pub fn execute(args: &QueryArgs, config: &RepotagConfig, store: &TagStore) -> Result<()> {
    let stdout = io::stdout();
    let matched = run(args, config, store, stdout.lock())?;
    tracing::info!(matched, "query finished");
    Ok(())
}

/// Validated query inputs. Building one reads no records.
struct Prepared {
    filter: RepoFilter,
    fields: Vec<String>,
    limit: usize,
    format: OutputFormat,
}

impl Prepared {
    fn new(args: &QueryArgs, config: &RepotagConfig) -> Result<Self> {
        let options = eval_options(args.threshold, config)?;
        let filter = RepoFilter::parse(args.query.as_deref(), &args.tags, args.all_tags, options)?;
        let fields = if args.fields.is_empty() {
            DEFAULT_FIELDS.iter().map(|f| (*f).to_string()).collect()
        } else {
            args.fields.iter().map(|f| f.trim().to_string()).collect()
        };
        Ok(Self {
            filter,
            fields,
            limit: args.limit.unwrap_or(usize::MAX),
            format: args.format.unwrap_or(config.output_format),
        })
    }

    fn stream<R: BufRead, W: Write>(&self, reader: R, store: &TagStore, out: W) -> Result<usize> {
        let mut sink = RecordSink::new(self.format, out);
        let written = stream_jsonl(reader, &self.filter, store, &mut sink, &self.fields, self.limit)?;
        sink.finish(&self.fields)?;
        Ok(written)
    }

    fn collect<W: Write>(&self, mut records: Vec<RepoRecord>, store: &TagStore, out: W) -> Result<usize> {
        let mut sink = RecordSink::new(self.format, out);
        for record in &mut records {
            annotate(record, store);
        }
        let mut written = 0;
        for record in self.filter.apply(records).iter().take(self.limit) {
            sink.write(record, &self.fields)?;
            written += 1;
        }
        sink.finish(&self.fields)?;
        Ok(written)
    }
}

/// Run a query against the configured record source, writing to `out`.
/// Returns the number of records written.
///
/// # Errors
/// See [`execute`]
pub fn run<W: Write>(args: &QueryArgs, config: &RepotagConfig, store: &TagStore, out: W) -> Result<usize> {
    let prepared = Prepared::new(args, config)?;
    match &args.input {
        Some(input) => prepared.stream(open_input(input)?, store, out),
        None => prepared.collect(load_records(config)?, store, out),
    }
}

/// Run a query over JSONL records from `reader`, ignoring `args.input`.
///
/// Nothing is read from `reader` when the query, a tag pattern or the
/// threshold is invalid.
///
/// # Errors
/// See [`execute`]
pub fn run_reader<R: BufRead, W: Write>(
    args: &QueryArgs,
    config: &RepotagConfig,
    store: &TagStore,
    reader: R,
    out: W,
) -> Result<usize> {
    Prepared::new(args, config)?.stream(reader, store, out)
}

fn eval_options(threshold: Option<f64>, config: &RepotagConfig) -> Result<EvalOptions> {
    match threshold {
        Some(t) if !(0.0..=100.0).contains(&t) => Err(RepotagError::InvalidInput(format!(
            "Threshold must be between 0 and 1 (or 0 and 100), got {t}"
        ))),
        Some(t) => Ok(EvalOptions::with_threshold(t)),
        None => Ok(EvalOptions::with_threshold(config.fuzzy_threshold)),
    }
}

fn open_input(input: &Path) -> Result<Box<dyn BufRead>> {
    if input == Path::new("-") {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(input).map_err(|e| RecordError::io(input, e))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Filter a JSONL stream lazily so early matches are written before the
/// rest of the input is read
fn stream_jsonl<R: BufRead, W: Write>(
    reader: R,
    filter: &RepoFilter,
    store: &TagStore,
    sink: &mut RecordSink<W>,
    fields: &[String],
    limit: usize,
) -> Result<usize> {
    let mut read_error = None;
    let records = read_jsonl(reader)
        .map_while(|item| match item {
            Ok(record) => Some(record),
            Err(e) => {
                read_error = Some(e);
                None
            }
        })
        .map(|mut record| {
            annotate(&mut record, store);
            record
        });

    let mut written = 0;
    for record in filter.filter_iter(records).take(limit) {
        sink.write(&record, fields)?;
        written += 1;
    }

    match read_error {
        Some(e) => Err(e.into()),
        None => Ok(written),
    }
}

/// Records for every discovered repository, merged with the metadata store.
///
/// When no repository is found on disk the metadata store entries are used
/// as they are.
///
/// # Errors
/// Returns an error if the metadata store exists but cannot be parsed
pub fn load_records(config: &RepotagConfig) -> Result<Vec<RepoRecord>> {
    let metadata = MetadataStore::load(&config.metadata_store_path()?)?;
    let paths = discover_repositories(&config.repository_directories, config.recursive);
    tracing::debug!(discovered = paths.len(), metadata = metadata.len(), "loading records");

    if paths.is_empty() {
        return Ok(metadata.records());
    }
    Ok(paths.iter().map(|path| metadata.record_for(path)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestStore;
    use std::cell::Cell;
    use std::fs;
    use std::io::Read;

    const INPUT: &str = r#"{"path": "/src/alpha", "language": "Python", "stars": 42, "topics": ["ml"]}
{"path": "/src/beta", "language": "Rust", "stars": 3}
not json at all
{"path": "/src/gamma", "language": "Python", "stars": 7, "license": {"key": "mit"}}
"#;

    fn setup(ts: &TestStore) -> (RepotagConfig, std::path::PathBuf) {
        let input = ts.dir.path().join("records.jsonl");
        fs::write(&input, INPUT).unwrap();
        let config = RepotagConfig {
            repository_directories: vec![ts.dir.path().join("none").to_string_lossy().into_owned()],
            metadata_store: Some(ts.dir.path().join("metadata.json")),
            ..RepotagConfig::default()
        };
        (config, input)
    }

    fn run_to_string(args: &QueryArgs, config: &RepotagConfig, store: &TagStore) -> (usize, String) {
        let mut buf = Vec::new();
        let written = run(args, config, store, &mut buf).unwrap();
        (written, String::from_utf8(buf).unwrap())
    }

    #[test]
    fn test_query_jsonl_input() {
        let ts = TestStore::new();
        let (config, input) = setup(&ts);
        let args = QueryArgs {
            query: Some("language == 'python' and stars > 10".into()),
            input: Some(input),
            fields: vec!["path".into(), "stars".into()],
            ..QueryArgs::default()
        };

        let (written, text) = run_to_string(&args, &config, &ts.store);
        assert_eq!(written, 1);
        assert_eq!(text, "{\"path\":\"/src/alpha\",\"stars\":42}\n");
    }

    #[test]
    fn test_query_by_explicit_and_implicit_tags() {
        let mut ts = TestStore::new();
        ts.store.add_tags("/src/gamma", &["work/client"]).unwrap();
        let (config, input) = setup(&ts);

        let args = QueryArgs {
            tags: vec!["work/*".into(), "license/mit".into()],
            all_tags: true,
            input: Some(input.clone()),
            fields: vec!["name".into()],
            format: Some(OutputFormat::Csv),
            ..QueryArgs::default()
        };
        let (_, text) = run_to_string(&args, &config, &ts.store);
        assert_eq!(text, "name\ngamma\n");

        let args = QueryArgs {
            query: Some("tags contains 'topic/ml'".into()),
            input: Some(input),
            fields: vec!["name".into()],
            ..QueryArgs::default()
        };
        let (_, text) = run_to_string(&args, &config, &ts.store);
        assert_eq!(text, "{\"name\":\"alpha\"}\n");
    }

    #[test]
    fn test_query_limit_and_threshold() {
        let ts = TestStore::new();
        let (config, input) = setup(&ts);
        let args = QueryArgs {
            query: Some("language ~= 'pyhton'".into()),
            threshold: Some(80.0),
            input: Some(input),
            limit: Some(1),
            ..QueryArgs::default()
        };
        let (written, _) = run_to_string(&args, &config, &ts.store);
        assert_eq!(written, 1);
    }

    #[test]
    fn test_query_syntax_error() {
        let ts = TestStore::new();
        let (config, _) = setup(&ts);
        let args = QueryArgs {
            query: Some("stars >".into()),
            input: Some(ts.dir.path().join("missing.jsonl")),
            ..QueryArgs::default()
        };
        let mut buf = Vec::new();
        let result = run(&args, &config, &ts.store, &mut buf);
        assert!(matches!(result, Err(RepotagError::QuerySyntax(_))));
        assert!(buf.is_empty());
    }

    /// Reader that counts the bytes handed out
    struct CountingReader<'a> {
        inner: &'a [u8],
        read: &'a Cell<usize>,
    }

    impl Read for CountingReader<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.inner.read(buf)?;
            self.read.set(self.read.get() + n);
            Ok(n)
        }
    }

    #[test]
    fn test_invalid_inputs_read_nothing() {
        let ts = TestStore::new();
        let (config, _) = setup(&ts);
        let invalid = [
            QueryArgs { query: Some("(stars > 1 and private".into()), ..QueryArgs::default() },
            QueryArgs { tags: vec!["a//b".into()], ..QueryArgs::default() },
            QueryArgs { threshold: Some(-1.0), ..QueryArgs::default() },
        ];

        for args in &invalid {
            let read = Cell::new(0);
            let reader = BufReader::new(CountingReader { inner: INPUT.as_bytes(), read: &read });
            let mut buf = Vec::new();
            assert!(run_reader(args, &config, &ts.store, reader, &mut buf).is_err());
            assert_eq!(read.get(), 0, "{args:?}");
            assert!(buf.is_empty());
        }

        let read = Cell::new(0);
        let reader = BufReader::new(CountingReader { inner: INPUT.as_bytes(), read: &read });
        let args = QueryArgs { query: Some("stars > 1".into()), ..QueryArgs::default() };
        assert_eq!(run_reader(&args, &config, &ts.store, reader, io::sink()).unwrap(), 3);
        assert_eq!(read.get(), INPUT.len());
    }

    #[test]
    fn test_query_rejects_bad_threshold() {
        let ts = TestStore::new();
        let (config, input) = setup(&ts);
        let args = QueryArgs {
            threshold: Some(150.0),
            input: Some(input),
            ..QueryArgs::default()
        };
        let mut buf = Vec::new();
        assert!(matches!(run(&args, &config, &ts.store, &mut buf), Err(RepotagError::InvalidInput(_))));
    }

    #[test]
    fn test_query_missing_input_file() {
        let ts = TestStore::new();
        let (config, _) = setup(&ts);
        let args = QueryArgs {
            input: Some(ts.dir.path().join("missing.jsonl")),
            ..QueryArgs::default()
        };
        let mut buf = Vec::new();
        assert!(matches!(run(&args, &config, &ts.store, &mut buf), Err(RepotagError::Record(_))));
    }

    #[test]
    fn test_query_discovered_repositories() {
        let ts = TestStore::new();
        let root = ts.dir.path().join("github");
        fs::create_dir_all(root.join("tool/.git")).unwrap();
        fs::create_dir_all(root.join("notes")).unwrap();
        let metadata = ts.dir.path().join("metadata.json");
        let tool = root.join("tool");
        fs::write(
            &metadata,
            serde_json::json!({ tool.to_string_lossy(): {"language": "Go", "stars": 12} }).to_string(),
        )
        .unwrap();

        let config = RepotagConfig {
            repository_directories: vec![root.to_string_lossy().into_owned()],
            metadata_store: Some(metadata),
            ..RepotagConfig::default()
        };
        let args = QueryArgs {
            query: Some("stars >= 12".into()),
            fields: vec!["name".into(), "language".into()],
            ..QueryArgs::default()
        };
        let (_, text) = run_to_string(&args, &config, &ts.store);
        assert_eq!(text, "{\"name\":\"tool\",\"language\":\"Go\"}\n");
    }

    #[test]
    fn test_metadata_fallback_when_nothing_discovered() {
        let ts = TestStore::new();
        let metadata = ts.dir.path().join("metadata.json");
        fs::write(&metadata, r#"{"/elsewhere/lib": {"language": "C"}}"#).unwrap();
        let config = RepotagConfig {
            repository_directories: vec![ts.dir.path().join("empty").to_string_lossy().into_owned()],
            metadata_store: Some(metadata),
            ..RepotagConfig::default()
        };
        let records = load_records(&config).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "/elsewhere/lib");
    }
}
