//! Sensitive key registry.
//!
//! Maps known dotted property keys to the variable names their values are
//! extracted to. Order matters: it is the order of lines in the secrets file.

use crate::{RedactionError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

static VARIABLE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// One registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensitiveKey {
    /// Exact dotted property key, e.g. `spring.datasource.password`.
    pub property: String,

    /// Redaction variable name, e.g. `DB_PASSWORD`.
    pub variable: String,
}

impl SensitiveKey {
    /// Create a new registry entry.
    pub fn new(property: impl Into<String>, variable: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            variable: variable.into(),
        }
    }
}

/// Ordered registry of sensitive property keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensitiveKeyRegistry {
    entries: Vec<SensitiveKey>,
}

impl SensitiveKeyRegistry {
    /// Create a registry from explicit entries.
    pub fn new(entries: Vec<SensitiveKey>) -> Self {
        Self { entries }
    }

    /// An empty registry; extraction becomes a no-op.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Load a registry from a JSON file (array of entries).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let registry: SensitiveKeyRegistry = serde_json::from_str(&content)?;
        registry.validate()?;
        Ok(registry)
    }

    /// Save the registry to a JSON file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Append an entry.
    pub fn push(&mut self, entry: SensitiveKey) {
        self.entries.push(entry);
    }

    /// Entries in registry order.
    pub fn entries(&self) -> &[SensitiveKey] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Variable name registered for an exact property key.
    pub fn variable_for(&self, property: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.property == property)
            .map(|e| e.variable.as_str())
    }

    /// Whether a property key is registered.
    pub fn contains(&self, property: &str) -> bool {
        self.variable_for(property).is_some()
    }

    /// Check that keys and variable names are unique and well formed.
    pub fn validate(&self) -> Result<()> {
        let mut properties = HashSet::new();
        let mut variables = HashSet::new();

        for entry in &self.entries {
            if entry.property.trim().is_empty() {
                return Err(RedactionError::InvalidRegistry(
                    "property key cannot be empty".to_string(),
                ));
            }
            if !VARIABLE_NAME.is_match(&entry.variable) {
                return Err(RedactionError::InvalidRegistry(format!(
                    "variable name '{}' for '{}' is not a valid environment variable name",
                    entry.variable, entry.property
                )));
            }
            if !properties.insert(entry.property.as_str()) {
                return Err(RedactionError::InvalidRegistry(format!(
                    "property '{}' is registered more than once",
                    entry.property
                )));
            }
            if !variables.insert(entry.variable.as_str()) {
                return Err(RedactionError::InvalidRegistry(format!(
                    "variable '{}' is used by more than one property",
                    entry.variable
                )));
            }
        }

        Ok(())
    }
}

impl Default for SensitiveKeyRegistry {
    fn default() -> Self {
        Self::new(vec![
            SensitiveKey::new("spring.datasource.username", "DB_USERNAME"),
            SensitiveKey::new("spring.datasource.password", "DB_PASSWORD"),
            SensitiveKey::new(
                "spring.security.oauth2.client.registration.google.client-id",
                "GOOGLE_CLIENT_ID",
            ),
            SensitiveKey::new(
                "spring.security.oauth2.client.registration.google.client-secret",
                "GOOGLE_CLIENT_SECRET",
            ),
            SensitiveKey::new("app.jwt.secret", "JWT_SECRET"),
        ])
    }
}
