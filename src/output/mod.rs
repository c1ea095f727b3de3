//! Output formatting for CLI display
//!
//! Query results are written as JSONL, a colored table, or CSV. Only the
//! selected fields are emitted; dotted field names reach into nested values.

use colored::Colorize;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use std::io::Write;

use crate::RepotagError;
use crate::config::OutputFormat;
use crate::records::RepoRecord;

/// Fields emitted when `--fields` is not given
pub const DEFAULT_FIELDS: [&str; 5] = ["path", "name", "tags", "language", "stars"];

/// Format a tag with usage count
#[must_use]
pub fn tag_with_count(tag: &str, count: usize, quiet: bool) -> String {
    if quiet {
        tag.to_string()
    } else {
        format!("  {tag} (used by {count} repo(s))")
    }
}

/// Format a repository with its tags for display
#[must_use]
pub fn repo_with_tags(repo: &str, tags: &[String], quiet: bool) -> String {
    if quiet {
        tags.join("\n")
    } else if tags.is_empty() {
        format!("{} (no tags)", repo.bold())
    } else {
        format!("{}\n  {}", repo.bold(), tags.join("\n  "))
    }
}

/// Look up an output field. `stars` falls back to `stargazers_count`.
fn field_value(record: &RepoRecord, field: &str) -> Value {
    let value = match field {
        "stars" => record
            .resolve_dotted("stars")
            .or_else(|| record.get("stargazers_count")),
        "name" => return record.name().map_or(Value::Null, Value::String),
        _ => record.resolve_dotted(field),
    };
    value.cloned().unwrap_or(Value::Null)
}

/// The selected fields of one record, in the order they were requested
#[derive(Debug, Clone, PartialEq)]
pub struct Projection(pub Vec<(String, Value)>);

impl Projection {
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.iter().find(|(name, _)| name == field).map(|(_, value)| value)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.0.iter().map(|(_, value)| value)
    }
}

// Serialized as a JSON object whose keys keep the requested order
impl Serialize for Projection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Keep only `fields` from a record, in that order
#[must_use]
pub fn project(record: &RepoRecord, fields: &[String]) -> Projection {
    Projection(
        fields
            .iter()
            .map(|field| (field.clone(), field_value(record, field)))
            .collect(),
    )
}

/// Plain-text rendering of a value for table and CSV cells
fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(cell).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

/// Destination for query results
pub enum RecordSink<W: Write> {
    Jsonl { out: W },
    Csv { writer: csv::Writer<W>, header_written: bool },
    Table { out: W, rows: Vec<Vec<String>> },
}

impl<W: Write> RecordSink<W> {
    #[must_use]
    pub fn new(format: OutputFormat, out: W) -> Self {
        match format {
            OutputFormat::Jsonl => Self::Jsonl { out },
            OutputFormat::Csv => Self::Csv {
                writer: csv::Writer::from_writer(out),
                header_written: false,
            },
            OutputFormat::Table => Self::Table { out, rows: Vec::new() },
        }
    }

    /// Write one record. JSONL and CSV stream; tables are buffered until `finish`.
    ///
    /// # Errors
    /// Returns `RepotagError` if serialization or writing fails.
    pub fn write(&mut self, record: &RepoRecord, fields: &[String]) -> Result<(), RepotagError> {
        let projected = project(record, fields);
        match self {
            Self::Jsonl { out } => {
                serde_json::to_writer(&mut *out, &projected)?;
                writeln!(out)?;
            }
            Self::Csv { writer, header_written } => {
                if !*header_written {
                    writer.write_record(fields)?;
                    *header_written = true;
                }
                writer.write_record(projected.values().map(cell))?;
            }
            Self::Table { rows, .. } => rows.push(projected.values().map(cell).collect()),
        }
        Ok(())
    }

    /// Flush buffered output
    ///
    /// # Errors
    /// Returns `RepotagError` if writing fails.
    pub fn finish(self, fields: &[String]) -> Result<(), RepotagError> {
        match self {
            Self::Jsonl { mut out } => out.flush()?,
            Self::Csv { mut writer, header_written } => {
                if !header_written {
                    writer.write_record(fields)?;
                }
                writer.flush()?;
            }
            Self::Table { mut out, rows } => write_table(&mut out, fields, &rows)?,
        }
        Ok(())
    }
}

fn write_table<W: Write>(out: &mut W, fields: &[String], rows: &[Vec<String>]) -> std::io::Result<()> {
    let widths: Vec<usize> = fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            rows.iter()
                .map(|row| row.get(i).map_or(0, |c| c.chars().count()))
                .chain(std::iter::once(field.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let header: Vec<String> = fields
        .iter()
        .zip(&widths)
        .map(|(f, w)| format!("{:<w$}", f.to_uppercase(), w = *w).bold().to_string())
        .collect();
    writeln!(out, "{}", header.join("  ").trim_end())?;

    for row in rows {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(i, (c, w))| {
                let padded = format!("{c:<w$}", w = *w);
                if i == 0 { padded.cyan().to_string() } else { padded }
            })
            .collect();
        writeln!(out, "{}", line.join("  ").trim_end())?;
    }
    Ok(())
}
