//! INSERT statement parser.
//!
//! Turns `INSERT INTO table (cols) VALUES (...), (...);` text into typed
//! [`Record`]s. Only the column-list form is supported; values are typed by
//! [`Value::infer`].

pub mod scanner;


use crate::record::Record;
use crate::value::Value;
use once_cell::sync::Lazy;
use regex::Regex;
use scanner::TupleScanner;
use std::sync::Arc;

static INSERT_HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)INSERT\s+INTO\s+([\w."]+)\s*\(([^)]+)\)\s*VALUES"#).unwrap()
});

/// One parsed INSERT statement.
#[derive(Debug, Clone)]
pub struct ParsedInsert {
    pub table: String,
    pub columns: Arc<[String]>,
    /// Rows in source order
    pub records: Vec<Record>,
    /// Tuples dropped because their arity did not match the column list
    pub skipped: usize,
}

impl ParsedInsert {
    /// Number of tuples seen in the VALUES clause
    pub fn tuple_count(&self) -> usize {
        self.records.len() + self.skipped
    }
}

/// Parse the first INSERT statement in `sql` into records.
///
/// Returns an empty vector when no INSERT statement is present.
pub fn parse(sql: &str) -> Vec<Record> {
    parse_insert(sql).map(|p| p.records).unwrap_or_default()
}

/// Parse the first INSERT statement in `sql`.
pub fn parse_insert(sql: &str) -> Option<ParsedInsert> {
    parse_insert_at(sql, 0).map(|(parsed, _)| parsed)
}

/// Parse every INSERT statement in `sql`, in file order.
pub fn parse_inserts(sql: &str) -> Vec<ParsedInsert> {
    let mut statements = Vec::new();
    let mut pos = 0;

    while let Some((parsed, end)) = parse_insert_at(sql, pos) {
        statements.push(parsed);
        if end <= pos {
            break;
        }
        pos = end;
    }

    statements
}

/// Parse the first INSERT at or after byte offset `start`, returning the
/// statement and the offset where scanning stopped.
fn parse_insert_at(sql: &str, start: usize) -> Option<(ParsedInsert, usize)> {
    let caps = INSERT_HEADER_RE.captures_at(sql, start)?;
    let header = caps.get(0)?;

    let table = caps[1].replace('"', "");
    let columns = parse_column_list(&caps[2]);

    let body_start = header.end();
    let mut scanner = TupleScanner::new(&sql[body_start..]);
    let mut records = Vec::new();
    let mut skipped = 0;

    for raw in scanner.by_ref() {
        let values: Vec<Value> = raw.iter().map(|v| Value::infer(v)).collect();
        match Record::new(Arc::clone(&columns), values) {
            Some(record) => records.push(record),
            None => skipped += 1,
        }
    }

    let end = body_start + scanner.offset();
    Some((
        ParsedInsert {
            table,
            columns,
            records,
            skipped,
        },
        end,
    ))
}

/// Split a column list on commas, trimming whitespace and double quotes.
pub fn parse_column_list(list: &str) -> Arc<[String]> {
    list.split(',')
        .map(|c| c.trim().trim_matches('"').to_string())
        .collect()
}
