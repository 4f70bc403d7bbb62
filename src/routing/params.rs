//! Route parameters and query strings.
//!
//! # Responsibilities
//! - Percent-decode path segments
//! - Parse query strings independently of path matching
//! - Keep parameter order stable (pattern order)
//!
//! # Design Decisions
//! - `?flag` (no `=`) is recorded as present without a value (`None`),
//!   distinct from an absent key
//! - `+` decodes to a space in query components only, never in paths
//! - Invalid UTF-8 after decoding is replaced, not rejected

use std::fmt;

use percent_encoding::percent_decode_str;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Percent-decode a single path segment.
pub fn decode_segment(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

/// Decode a query component (`+` means space).
pub fn decode_query_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

/// Normalize a path: leading slash, no trailing slash (except root),
/// no empty segments.
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// Split a path into raw (still encoded) segments.
pub fn split_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Value captured by a dynamic segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// A single `[name]` segment.
    One(String),
    /// A trailing `[...name]` catch-all.
    Many(Vec<String>),
}

impl ParamValue {
    /// The value as a single string. Catch-all values are joined with `/`.
    pub fn as_string(&self) -> String {
        match self {
            ParamValue::One(value) => value.clone(),
            ParamValue::Many(values) => values.join("/"),
        }
    }

    /// The value as a slice of segments.
    pub fn segments(&self) -> &[String] {
        match self {
            ParamValue::One(value) => std::slice::from_ref(value),
            ParamValue::Many(values) => values,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

/// Ordered mapping of parameter name to decoded value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    entries: Vec<(String, ParamValue)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a parameter, replacing an earlier value with the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) {
        let name = name.into();
        if let Some(slot) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Single-segment value for `name`, if present.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            ParamValue::One(value) => Some(value.as_str()),
            ParamValue::Many(_) => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for Params {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Parsed query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    entries: Vec<(String, Option<String>)>,
}

impl Query {
    /// Parse a raw query string, with or without the leading `?`.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.strip_prefix('?').unwrap_or(raw);
        let mut entries = Vec::new();

        for pair in raw.split('&').filter(|p| !p.is_empty()) {
            let entry = match pair.split_once('=') {
                Some((key, value)) => (
                    decode_query_component(key),
                    Some(decode_query_component(value)),
                ),
                None => (decode_query_component(pair), None),
            };
            entries.push(entry);
        }

        Self { entries }
    }

    /// Whether `name` appears in the query at all.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// First value for `name`. A key without `=` reads as the empty string.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_deref().unwrap_or(""))
    }

    /// Raw entry for `name`: `Some(None)` means present without a value.
    pub fn entry(&self, name: &str) -> Option<Option<&str>> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_deref())
    }

    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(n, _)| n == name)
            .map(|(_, v)| v.as_deref().unwrap_or(""))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_deref()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for Query {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
