//! Property storage seam.
//!
//! Extraction and overrides work on any ordered or unordered key/value
//! store. The parser's `PropertyMap` implements this trait; the std map
//! implementations exist for callers that do not care about ordering.

use std::collections::{BTreeMap, HashMap};

/// A mutable view over flat `key -> value` properties.
pub trait PropertyStore {
    /// Look up the value stored for `key`.
    fn get_value(&self, key: &str) -> Option<&str>;

    /// Replace the value of an existing key, returning the previous value.
    ///
    /// Absent keys are left absent and `None` is returned.
    fn replace_value(&mut self, key: &str, value: String) -> Option<String>;

    /// Iterate over all keys.
    fn keys_iter<'a>(&'a self) -> Box<dyn Iterator<Item = &'a str> + 'a>;
}

impl PropertyStore for BTreeMap<String, String> {
    fn get_value(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }

    fn replace_value(&mut self, key: &str, value: String) -> Option<String> {
        self.get_mut(key).map(|slot| std::mem::replace(slot, value))
    }

    fn keys_iter<'a>(&'a self) -> Box<dyn Iterator<Item = &'a str> + 'a> {
        Box::new(self.keys().map(String::as_str))
    }
}

impl PropertyStore for HashMap<String, String> {
    fn get_value(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }

    fn replace_value(&mut self, key: &str, value: String) -> Option<String> {
        self.get_mut(key).map(|slot| std::mem::replace(slot, value))
    }

    fn keys_iter<'a>(&'a self) -> Box<dyn Iterator<Item = &'a str> + 'a> {
        Box::new(self.keys().map(String::as_str))
    }
}
