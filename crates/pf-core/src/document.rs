//! Dotted keys to nested documents.
//!
//! `spring.datasource.url=x` becomes `spring: { datasource: { url: x } }`.
//! Children keep the order in which their first key appeared, and every leaf
//! stays a string: `8080` is written as the string `'8080'`, never coerced.

use serde_yaml::{Mapping, Value};

use crate::error::{ForgeError, Result};
use crate::properties::PropertyMap;

/// A node in the structured document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Leaf(String),
    Branch(Vec<(String, Node)>),
}

/// Nested configuration built from a flat property map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    root: Vec<(String, Node)>,
}

impl Document {
    /// Build the tree for every property, in map order.
    ///
    /// A key that needs a branch where a leaf already sits (or the reverse)
    /// fails with [`ForgeError::ConflictingKeyPath`].
    pub fn from_properties(map: &PropertyMap) -> Result<Self> {
        let mut doc = Document::default();
        for (key, value) in map.iter() {
            doc.insert(key, value)?;
        }
        Ok(doc)
    }

    fn insert(&mut self, key: &str, value: &str) -> Result<()> {
        let segments: Vec<&str> = key.split('.').collect();
        let Some((last, parents)) = segments.split_last() else {
            return Ok(());
        };

        let mut level: &mut Vec<(String, Node)> = &mut self.root;
        for (depth, segment) in parents.iter().enumerate() {
            let pos = match level.iter().position(|entry| entry.0 == *segment) {
                Some(pos) => pos,
                None => {
                    level.push((segment.to_string(), Node::Branch(Vec::new())));
                    level.len() - 1
                }
            };
            level = match &mut level[pos].1 {
                Node::Branch(children) => children,
                Node::Leaf(_) => return Err(conflict(key, &segments[..=depth])),
            };
        }

        match level.iter_mut().find(|entry| entry.0 == *last) {
            Some((_, Node::Branch(_))) => Err(conflict(key, &segments)),
            Some((_, Node::Leaf(existing))) => {
                *existing = value.to_string();
                Ok(())
            }
            None => {
                level.push((last.to_string(), Node::Leaf(value.to_string())));
                Ok(())
            }
        }
    }

    /// Look up a node by dotted path.
    pub fn get(&self, dotted: &str) -> Option<&Node> {
        let mut segments = dotted.split('.');
        let mut node = find_child(&self.root, segments.next()?)?;
        for segment in segments {
            node = match node {
                Node::Branch(children) => find_child(children, segment)?,
                Node::Leaf(_) => return None,
            };
        }
        Some(node)
    }

    /// Leaf value at a dotted path.
    pub fn get_str(&self, dotted: &str) -> Option<&str> {
        match self.get(dotted)? {
            Node::Leaf(value) => Some(value.as_str()),
            Node::Branch(_) => None,
        }
    }

    /// Top-level keys in document order.
    pub fn top_level_keys(&self) -> Vec<&str> {
        self.root.iter().map(|(k, _)| k.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Number of leaves in the tree.
    pub fn leaf_count(&self) -> usize {
        fn count(children: &[(String, Node)]) -> usize {
            children
                .iter()
                .map(|(_, node)| match node {
                    Node::Leaf(_) => 1,
                    Node::Branch(next) => count(next),
                })
                .sum()
        }
        count(&self.root)
    }

    /// Convert to an insertion-ordered YAML value.
    pub fn to_yaml_value(&self) -> Value {
        Value::Mapping(to_mapping(&self.root))
    }

    /// Render as block-style YAML. Non-ASCII text is written as-is.
    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.to_yaml_value())?)
    }
}

fn find_child<'a>(children: &'a [(String, Node)], name: &str) -> Option<&'a Node> {
    children
        .iter()
        .find(|entry| entry.0 == name)
        .map(|entry| &entry.1)
}

fn to_mapping(children: &[(String, Node)]) -> Mapping {
    let mut mapping = Mapping::new();
    for (key, node) in children {
        let value = match node {
            Node::Leaf(v) => Value::String(v.clone()),
            Node::Branch(next) => Value::Mapping(to_mapping(next)),
        };
        mapping.insert(Value::String(key.clone()), value);
    }
    mapping
}

fn conflict(key: &str, prefix: &[&str]) -> ForgeError {
    ForgeError::ConflictingKeyPath {
        key: key.to_string(),
        path: prefix.join("."),
    }
}
