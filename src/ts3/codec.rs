//! ServerQuery line codec.
//!
//! Requests look like `clientmove clid=5 cid=2`. Responses are zero or more
//! data lines followed by `error id=0 msg=ok`. A data line carries one or
//! more records separated by `|`, each record a list of `key=value` pairs.

use std::collections::HashMap;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;

use crate::ts3::error::QueryError;

lazy_static! {
    // Example: "error id=0 msg=ok" or "error id=512 msg=invalid\sclientID extra_msg=..."
    static ref STATUS_PATTERN: Regex = Regex::new(r"^error id=(\d+) msg=(\S*)").unwrap();
}

/// One `key=value` record from a response line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: HashMap<String, String>,
}

impl Record {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(|s| s.as_str())
    }

    pub fn required(&self, key: &str) -> Result<&str, QueryError> {
        self.get(key)
            .ok_or_else(|| QueryError::Protocol(format!("missing field '{key}'")))
    }

    pub fn parse<T: FromStr>(&self, key: &str) -> Result<T, QueryError> {
        let raw = self.required(key)?;
        raw.parse::<T>()
            .map_err(|_| QueryError::Protocol(format!("invalid value for '{key}': {raw}")))
    }

    /// Like [`Record::parse`] but a missing field yields `None`.
    pub fn parse_opt<T: FromStr>(&self, key: &str) -> Result<Option<T>, QueryError> {
        match self.get(key) {
            Some(_) => self.parse(key).map(Some),
            None => Ok(None),
        }
    }
}

/// Status line terminating every response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub id: u32,
    pub msg: String,
}

impl Status {
    pub fn is_ok(&self) -> bool {
        self.id == 0
    }

    pub fn into_result(self) -> Result<(), QueryError> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(QueryError::Server { id: self.id, msg: self.msg })
        }
    }
}

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '/' => out.push_str("\\/"),
            ' ' => out.push_str("\\s"),
            '|' => out.push_str("\\p"),
            '\x07' => out.push_str("\\a"),
            '\x08' => out.push_str("\\b"),
            '\x0c' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\x0b' => out.push_str("\\v"),
            other => out.push(other),
        }
    }
    out
}

pub fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some('s') => out.push(' '),
            Some('p') => out.push('|'),
            Some('a') => out.push('\x07'),
            Some('b') => out.push('\x08'),
            Some('f') => out.push('\x0c'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('v') => out.push('\x0b'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}

/// Builds a request line (without the trailing newline).
pub fn build_command(name: &str, params: &[(&str, String)]) -> String {
    let mut line = name.to_string();
    for (key, value) in params {
        line.push(' ');
        line.push_str(key);
        line.push('=');
        line.push_str(&escape(value));
    }
    line
}

/// Parses a status line, returning `None` for anything else.
pub fn parse_status(line: &str) -> Option<Status> {
    let caps = STATUS_PATTERN.captures(line)?;
    let id = caps.get(1)?.as_str().parse::<u32>().ok()?;
    let msg = caps.get(2).map(|m| unescape(m.as_str())).unwrap_or_default();
    Some(Status { id, msg })
}

/// Splits a data line into its `|`-separated records.
pub fn parse_records(line: &str) -> Vec<Record> {
    line.split('|')
        .filter(|chunk| !chunk.trim().is_empty())
        .map(parse_record)
        .collect()
}

fn parse_record(chunk: &str) -> Record {
    let mut fields = HashMap::new();
    for token in chunk.split(' ').filter(|t| !t.is_empty()) {
        match token.split_once('=') {
            Some((key, value)) => {
                fields.insert(key.to_string(), unescape(value));
            }
            None => {
                fields.insert(token.to_string(), String::new());
            }
        }
    }
    Record { fields }
}
