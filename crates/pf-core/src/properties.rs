//! Flat `key=value` property files.
//!
//! The format handled here is deliberately small: one property per line,
//! `#` comments, first `=` separates key from value. No escapes, no line
//! continuations, no `:` separator.

use std::collections::HashMap;
use std::path::Path;

use pf_redact::PropertyStore;
use serde::Serialize;

use crate::error::{ForgeError, Result};

/// Ordered flat property map.
///
/// Keys keep the position of their first insertion; inserting an existing
/// key replaces only the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyMap {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl PropertyMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a property, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.index.get(&key) {
            Some(&pos) => Some(std::mem::replace(&mut self.entries[pos].1, value)),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.index
            .get(key)
            .map(|&pos| self.entries[pos].1.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PropertyMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = PropertyMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl PropertyStore for PropertyMap {
    fn get_value(&self, key: &str) -> Option<&str> {
        self.get(key)
    }

    fn replace_value(&mut self, key: &str, value: String) -> Option<String> {
        let pos = *self.index.get(key)?;
        Some(std::mem::replace(&mut self.entries[pos].1, value))
    }

    fn keys_iter<'a>(&'a self) -> Box<dyn Iterator<Item = &'a str> + 'a> {
        Box::new(self.keys())
    }
}

/// A non-blank, non-comment line without a `=` separator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedLine {
    /// 1-based line number.
    pub line_number: usize,
    /// The trimmed line text.
    pub content: String,
}

/// Parser output: the property map plus lines that were ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedProperties {
    pub map: PropertyMap,
    pub skipped: Vec<SkippedLine>,
}

/// How lines without `=` are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParseMode {
    /// Record them in [`ParsedProperties::skipped`].
    #[default]
    Lenient,
    /// Fail with [`ForgeError::MalformedLine`].
    Strict,
}

/// Parse property text, skipping malformed lines.
pub fn parse_properties(text: &str) -> ParsedProperties {
    let mut parsed = ParsedProperties::default();
    for (idx, raw) in text.lines().enumerate() {
        match classify_line(raw) {
            Line::Ignored => {}
            Line::Property(key, value) => {
                parsed.map.insert(key, value);
            }
            Line::Malformed(content) => parsed.skipped.push(SkippedLine {
                line_number: idx + 1,
                content: content.to_string(),
            }),
        }
    }
    parsed
}

/// Parse property text with an explicit [`ParseMode`].
pub fn parse_properties_with(text: &str, mode: ParseMode) -> Result<ParsedProperties> {
    let parsed = parse_properties(text);
    if mode == ParseMode::Strict {
        if let Some(first) = parsed.skipped.first() {
            return Err(ForgeError::MalformedLine {
                line_number: first.line_number,
                content: first.content.clone(),
            });
        }
    }
    Ok(parsed)
}

/// Read and parse a UTF-8 property file.
pub fn read_properties_file(path: &Path, mode: ParseMode) -> Result<ParsedProperties> {
    let text = std::fs::read_to_string(path).map_err(|e| ForgeError::io(path, e))?;
    parse_properties_with(&text, mode)
}

enum Line<'a> {
    Ignored,
    Property(&'a str, &'a str),
    Malformed(&'a str),
}

fn classify_line(raw: &str) -> Line<'_> {
    let line = raw.trim();
    if line.is_empty() || line.starts_with('#') {
        return Line::Ignored;
    }
    match line.split_once('=') {
        Some((key, value)) => Line::Property(key.trim(), value.trim()),
        None => Line::Malformed(line),
    }
}
