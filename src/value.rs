//! Typed values for parsed INSERT tuples.
//!
//! Types are inferred from the lexical shape of each token. No schema is
//! consulted, so a quoted-looking number stays a string and an unquoted
//! `007` becomes the integer 7.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// A single column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    /// JSON-like object; keys keep their source order
    Object(Vec<(String, Value)>),
}

impl Value {
    /// Infer a value from a trimmed token taken from a VALUES tuple.
    ///
    /// Rules are tried in a fixed order and the first match wins:
    /// NULL, booleans, single-quoted strings, double-quoted strings,
    /// brace literals, integers, floats, and finally the raw text.
    pub fn infer(token: &str) -> Value {
        let token = token.trim();

        if token.eq_ignore_ascii_case("NULL") {
            return Value::Null;
        }
        if token.eq_ignore_ascii_case("TRUE") {
            return Value::Bool(true);
        }
        if token.eq_ignore_ascii_case("FALSE") {
            return Value::Bool(false);
        }

        if let Some(inner) = strip_quotes(token, '\'') {
            let text = inner.replace("''", "'").replace("\\'", "'");
            // Postgres array and JSON literals are written as quoted strings
            if text.starts_with('{') && text.ends_with('}') {
                return infer_braced(&text);
            }
            return Value::String(text);
        }

        if let Some(inner) = strip_quotes(token, '"') {
            return Value::String(inner.to_string());
        }

        if token.starts_with('{') && token.ends_with('}') {
            return infer_braced(token);
        }

        if token.starts_with('{') && token.contains('}') {
            return parse_json(token)
                .or_else(|| parse_json_like(token))
                .unwrap_or_else(|| Value::String(token.to_string()));
        }

        if is_integer(token) {
            if let Ok(n) = token.parse::<i64>() {
                return Value::Int(n);
            }
        }

        if is_float(token) {
            if let Ok(f) = token.parse::<f64>() {
                return Value::Float(f);
            }
        }

        Value::String(token.to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n
                    .as_f64()
                    .map(Value::Float)
                    .unwrap_or_else(|| Value::String(n.to_string())),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Object(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (k, v) in fields {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

/// Body between a leading and trailing `quote`. A lone quote character
/// counts as an empty literal.
fn strip_quotes(token: &str, quote: char) -> Option<&str> {
    if !token.ends_with(quote) {
        return None;
    }
    let inner = token.strip_prefix(quote)?;
    Some(inner.strip_suffix(quote).unwrap_or(inner))
}

/// `{...}` literal: JSON first, then a Postgres-style array of strings.
fn infer_braced(token: &str) -> Value {
    if let Some(v) = parse_json(token).or_else(|| parse_json_like(token)) {
        return v;
    }

    let inner = &token[1..token.len() - 1];
    if inner.trim().is_empty() {
        return Value::Array(Vec::new());
    }

    // Not quote-aware: a comma inside a quoted element splits it
    let parts = split_outside_braces(inner)
        .into_iter()
        .map(|p| Value::String(p.trim().trim_matches(|c| c == '\'' || c == '"').to_string()))
        .collect();
    Value::Array(parts)
}

fn parse_json(token: &str) -> Option<Value> {
    serde_json::from_str::<serde_json::Value>(token)
        .ok()
        .map(Value::from)
}

/// JSON written with single quotes.
fn parse_json_like(token: &str) -> Option<Value> {
    serde_json::from_str::<serde_json::Value>(&token.replace('\'', "\""))
        .ok()
        .map(Value::from)
}

fn split_outside_braces(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

fn is_integer(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn is_float(s: &str) -> bool {
    let body = s.strip_prefix('-').unwrap_or(s);
    body.matches('.').count() == 1
        && body.len() > 1
        && body.bytes().all(|b| b.is_ascii_digit() || b == b'.')
}
