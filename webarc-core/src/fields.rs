//! Named field lists with line folding and case-insensitive lookup.
//!
//! The same `name: value` syntax appears in three places in a WARC file: the
//! record header, embedded HTTP headers, and `application/warc-fields`
//! blocks. [`FieldList`] implements that shared syntax; [`HttpFields`] adds
//! the leading status line HTTP messages carry.

use std::collections::VecDeque;
use std::fmt;

use crate::error::{Result, WebArcError};

/// The line terminator used throughout the format.
pub const CRLF: &str = "\r\n";

/// The doubled line terminator that ends a header block and separates
/// records.
pub const FIELD_DELIM: &[u8] = b"\r\n\r\n";

/// Ordered name/value pairs with case-insensitive name lookup.
///
/// Insertion order is preserved and meaningful for serialization. Duplicate
/// names are legal; [`FieldList::add`] keeps them, while [`FieldList::set`]
/// collapses all occurrences of a name into one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldList {
    pairs: Vec<(String, String)>,
}

impl FieldList {
    /// Create an empty field list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a field list from an existing pair list, preserving order.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    /// Number of fields, duplicates included.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether the list holds no fields.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Iterate over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Whether a field with this name exists (case-insensitive).
    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Value of the first field with this name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Values of every field with this name, in order.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Index of the first field with this name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.pairs.iter().position(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    /// Number of fields with this name.
    pub fn count(&self, name: &str) -> usize {
        self.pairs
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .count()
    }

    /// Replace every field with this name by a single pair.
    ///
    /// The new pair lands at the position of the first prior occurrence, or
    /// is appended when the name was absent.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.index_of(&name) {
            None => self.pairs.push((name, value)),
            Some(index) => {
                self.pairs.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
                self.pairs.insert(index, (name, value));
            }
        }
    }

    /// Append a field, never replacing existing ones.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((name.into(), value.into()));
    }

    /// Remove every field with this name.
    pub fn remove(&mut self, name: &str) {
        self.pairs.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    /// All field names, in order, duplicates included.
    pub fn names(&self) -> Vec<&str> {
        self.pairs.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// All field values, in order.
    pub fn values(&self) -> Vec<&str> {
        self.pairs.iter().map(|(_, v)| v.as_str()).collect()
    }

    /// Remove all fields.
    pub fn clear(&mut self) {
        self.pairs.clear();
    }

    /// Parse a field block.
    ///
    /// Input lines are separated by CRLF. Blank lines are skipped. A line
    /// starting with a space or tab continues the previous field's value:
    /// exactly one leading whitespace character is stripped and the rest is
    /// appended with no separator. A non-blank line without a colon is a
    /// fatal error.
    pub fn parse(input: &str) -> Result<Self> {
        let mut fields = FieldList::new();
        let mut lines: VecDeque<&str> = input.split(CRLF).collect();

        while let Some(line) = lines.pop_front() {
            if line.is_empty() {
                continue;
            }

            let (name, value) = line.split_once(':').ok_or_else(|| {
                WebArcError::invalid_header(format!("field line without a colon: {line:?}"))
            })?;
            let mut value = value.trim_start().to_string();

            // Fold continuation lines into the value. A non-continuation
            // line goes back on the queue for normal processing.
            while let Some(next) = lines.pop_front() {
                if next.is_empty() {
                    break;
                }
                if !next.starts_with(' ') && !next.starts_with('\t') {
                    lines.push_front(next);
                    break;
                }
                value.push_str(&next[1..]);
            }

            fields.add(name, value);
        }

        Ok(fields)
    }

    /// Serialized length in bytes.
    pub fn byte_len(&self) -> u64 {
        self.pairs
            .iter()
            .map(|(n, v)| (n.len() + v.len() + 4) as u64)
            .sum()
    }

    /// Serialize to the canonical text form as bytes.
    ///
    /// Long values are emitted on one line; no folding is performed.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for FieldList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.pairs {
            write!(f, "{name}: {value}{CRLF}")?;
        }
        Ok(())
    }
}

/// A field list preceded by an opaque HTTP status line.
///
/// Used for `application/http` content blocks, where the first line is a
/// request or status line rather than a field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpFields {
    /// The request or status line, without its terminator.
    pub status: String,
    /// The header fields following the status line.
    pub fields: FieldList,
}

impl HttpFields {
    /// Parse an HTTP header block: status line first, then ordinary fields.
    pub fn parse(input: &str) -> Result<Self> {
        let (status, rest) = input.split_once(CRLF).ok_or_else(|| {
            WebArcError::invalid_header("HTTP header block without a status line")
        })?;

        Ok(Self {
            status: status.to_string(),
            fields: FieldList::parse(rest)?,
        })
    }

    /// Serialized length in bytes.
    pub fn byte_len(&self) -> u64 {
        self.status.len() as u64 + 2 + self.fields.byte_len()
    }

    /// Serialize to bytes: status line, terminator, then the fields.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for HttpFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{CRLF}{}", self.status, self.fields)
    }
}
