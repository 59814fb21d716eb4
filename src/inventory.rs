// ABOUTME: Parser for the labelled, tab-separated inventory a remote discovery script prints.
// ABOUTME: Produces one HostRecord per non-blank line, preserving input order.

use serde::Serialize;
use thiserror::Error;

/// Separator between `key:value` fields of one record.
pub const FIELD_DELIMITER: char = '\t';

/// Separator between a field's key and its value.
pub const KEY_SEPARATOR: char = ':';

/// One deployment entity reported by the inventory script.
///
/// `branch` and `date` are empty when the remote side could not resolve them,
/// for example when the path is not a git checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HostRecord {
    pub name: String,
    pub path: String,
    pub branch: String,
    pub date: String,
}

impl HostRecord {
    pub fn has_branch(&self) -> bool {
        !self.branch.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed inventory record on line {line}: {content:?}")]
    MalformedRecord { line: usize, content: String },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Parse inventory text into records.
///
/// Each line holds `key:value` fields separated by tabs, in any order; a
/// repeated key keeps its last value. Keys other than `name`, `path`,
/// `branch` and `date` are ignored. Blank lines are skipped. A non-empty field
/// without a `:` or with an empty key makes the whole line malformed.
pub fn parse_inventory(text: &str) -> Result<Vec<HostRecord>> {
    let mut records = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        if raw.trim().is_empty() {
            continue;
        }
        records.push(parse_record(raw).ok_or_else(|| Error::MalformedRecord {
            line: index + 1,
            content: raw.to_string(),
        })?);
    }

    Ok(records)
}

fn parse_record(line: &str) -> Option<HostRecord> {
    let mut record = HostRecord::default();

    for field in line.split(FIELD_DELIMITER) {
        if field.is_empty() {
            continue;
        }
        let (key, value) = field.split_once(KEY_SEPARATOR)?;
        if key.is_empty() {
            return None;
        }
        let value = value.to_string();
        match key {
            "name" => record.name = value,
            "path" => record.path = value,
            "branch" => record.branch = value,
            "date" => record.date = value,
            other => tracing::trace!(key = other, "ignoring unknown inventory key"),
        }
    }

    Some(record)
}
