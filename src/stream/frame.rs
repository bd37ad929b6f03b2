//! Raw event-stream frames.
//!
//! One frame per line. Fields are separated by `0x01`, a key from its value
//! by `0x02`, and list values by `0x03`.

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};

pub const FIELD_SEPARATOR: char = '\u{1}';
pub const VALUE_SEPARATOR: char = '\u{2}';
pub const LIST_SEPARATOR: char = '\u{3}';

/// A parsed frame borrowing from its line.
#[derive(Debug)]
pub struct Frame<'a> {
    line: &'a str,
    fields: FxHashMap<&'a str, &'a str>,
}

impl<'a> Frame<'a> {
    /// Split a line into fields. Empty segments are skipped; a segment
    /// without a key/value separator or a repeated key is malformed.
    pub fn parse(line: &'a str) -> Result<Self> {
        let mut fields = FxHashMap::default();
        for segment in line.split(FIELD_SEPARATOR).filter(|s| !s.is_empty()) {
            let Some((key, value)) = segment.split_once(VALUE_SEPARATOR) else {
                return Err(Error::frame(
                    format!("field without separator: {segment:?}"),
                    line,
                ));
            };
            if key.is_empty() {
                return Err(Error::frame("field with empty key", line));
            }
            if fields.insert(key, value).is_some() {
                return Err(Error::frame(format!("duplicate field {key}"), line));
            }
        }
        Ok(Self { line, fields })
    }

    pub fn line(&self) -> &'a str {
        self.line
    }

    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.fields.get(key).copied()
    }

    /// Value with blanks folded into `None`.
    pub fn present(&self, key: &str) -> Option<&'a str> {
        self.get(key).map(str::trim).filter(|v| !v.is_empty())
    }

    /// List values of a field.
    pub fn values(&self, key: &str) -> Vec<&'a str> {
        self.get(key)
            .map(|v| v.split(LIST_SEPARATOR).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a str)> + '_ {
        self.fields.iter().map(|(k, v)| (*k, *v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
