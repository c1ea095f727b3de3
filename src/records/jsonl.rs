//! JSON Lines input
//!
//! One record per line. Blank lines are ignored. Lines that are not JSON
//! objects with an id are logged and skipped so a bulk scan keeps going.

use serde_json::Value;
use std::io::BufRead;

use super::error::RecordError;
use super::record::RepoRecord;

/// Lazily read records from a JSONL stream.
///
/// Only read failures of the underlying stream are yielded as errors.
pub fn read_jsonl<R: BufRead>(reader: R) -> impl Iterator<Item = Result<RepoRecord, RecordError>> {
    reader
        .lines()
        .enumerate()
        .filter_map(|(index, line)| {
            let line = match line {
                Ok(line) => line,
                Err(err) => return Some(Err(RecordError::Stream(err))),
            };
            parse_line(index + 1, &line).map(Ok)
        })
}

fn parse_line(line_no: usize, line: &str) -> Option<RepoRecord> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let value: Value = match serde_json::from_str(trimmed) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(line = line_no, error = %err, "skipping malformed JSON line");
            return None;
        }
    };
    match RepoRecord::from_value(value) {
        Ok(record) => Some(record),
        Err(err) => {
            tracing::warn!(line = line_no, error = %err, "skipping record");
            None
        }
    }
}
