//! Sensitive value extraction.
//!
//! The extractor moves every registered value out of a property store into a
//! [`SecretMap`] and writes a `${VARIABLE}` placeholder in its place. It must
//! run before the properties are structured so that the placeholder, not the
//! raw value, ends up in the generated document.

use crate::{PropertyStore, Result, SensitiveKeyRegistry};

/// Format the placeholder that replaces an extracted value.
pub fn placeholder(variable: &str) -> String {
    format!("${{{}}}", variable)
}

/// Ordered mapping of variable name to extracted value.
///
/// `Debug` masks the values so the map can be logged safely.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretMap {
    entries: Vec<(String, String)>,
}

impl SecretMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous value for the same variable.
    pub fn insert(&mut self, variable: impl Into<String>, value: impl Into<String>) {
        let variable = variable.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(name, _)| *name == variable) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((variable, value)),
        }
    }

    /// Value extracted for a variable.
    pub fn get(&self, variable: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == variable)
            .map(|(_, value)| value.as_str())
    }

    /// Number of extracted values.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was extracted.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Variable names in extraction order.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// `(variable, value)` pairs in extraction order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Render as `.env` content: one `NAME=value` line per entry.
    pub fn to_env_file(&self) -> String {
        let mut out = String::new();
        for (name, value) in &self.entries {
            out.push_str(name);
            out.push('=');
            out.push_str(value);
            out.push('\n');
        }
        out
    }
}

impl std::fmt::Debug for SecretMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(name, _)| (name, "[REDACTED]")))
            .finish()
    }
}

/// Applies a [`SensitiveKeyRegistry`] to property stores.
#[derive(Debug, Clone)]
pub struct SecretExtractor {
    registry: SensitiveKeyRegistry,
}

impl SecretExtractor {
    /// Create an extractor, validating the registry first.
    pub fn new(registry: SensitiveKeyRegistry) -> Result<Self> {
        registry.validate()?;
        Ok(Self { registry })
    }

    /// The registry in use.
    pub fn registry(&self) -> &SensitiveKeyRegistry {
        &self.registry
    }

    /// Whether a property key would be extracted.
    pub fn is_sensitive(&self, property: &str) -> bool {
        self.registry.contains(property)
    }

    /// Extract registered values and leave placeholders behind.
    ///
    /// Registry keys that are absent from the store are skipped. The result
    /// follows registry order, not store order.
    pub fn extract<S: PropertyStore + ?Sized>(&self, store: &mut S) -> SecretMap {
        let mut secrets = SecretMap::new();

        for entry in self.registry.entries() {
            if let Some(original) = store.replace_value(&entry.property, placeholder(&entry.variable))
            {
                secrets.insert(entry.variable.clone(), original);
            }
        }

        secrets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SensitiveKey;
    use std::collections::BTreeMap;

    fn props(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn default_extractor() -> SecretExtractor {
        SecretExtractor::new(SensitiveKeyRegistry::default()).unwrap()
    }

    #[test]
    fn test_placeholder_format() {
        assert_eq!(placeholder("DB_PASSWORD"), "${DB_PASSWORD}");
    }

    #[test]
    fn test_extracts_registered_keys() {
        let mut store = props(&[
            ("spring.application.name", "lm-users"),
            ("spring.datasource.username", "admin"),
            ("spring.datasource.password", "secret123"),
        ]);

        let secrets = default_extractor().extract(&mut store);

        assert_eq!(secrets.len(), 2);
        assert_eq!(secrets.get("DB_USERNAME"), Some("admin"));
        assert_eq!(secrets.get("DB_PASSWORD"), Some("secret123"));
        assert_eq!(store["spring.datasource.password"], "${DB_PASSWORD}");
        assert_eq!(store["spring.datasource.username"], "${DB_USERNAME}");
        assert_eq!(store["spring.application.name"], "lm-users");
    }

    #[test]
    fn test_absent_keys_are_omitted() {
        let mut store = props(&[("server.port", "8080")]);
        let secrets = default_extractor().extract(&mut store);

        assert!(secrets.is_empty());
        assert_eq!(store.len(), 1);
        assert_eq!(store["server.port"], "8080");
    }

    #[test]
    fn test_secret_order_follows_registry() {
        let mut store = props(&[
            ("app.jwt.secret", "jwt"),
            ("spring.datasource.password", "pw"),
        ]);
        let secrets = default_extractor().extract(&mut store);

        let order: Vec<&str> = secrets.variables().collect();
        assert_eq!(order, vec!["DB_PASSWORD", "JWT_SECRET"]);
    }

    #[test]
    fn test_env_file_rendering() {
        let mut secrets = SecretMap::new();
        secrets.insert("DB_PASSWORD", "secret123");
        secrets.insert("JWT_SECRET", "a=b=c");

        assert_eq!(secrets.to_env_file(), "DB_PASSWORD=secret123\nJWT_SECRET=a=b=c\n");
    }

    #[test]
    fn test_empty_secret_value_is_still_extracted() {
        let mut store = props(&[("spring.datasource.password", "")]);
        let secrets = default_extractor().extract(&mut store);

        assert_eq!(secrets.get("DB_PASSWORD"), Some(""));
        assert_eq!(secrets.to_env_file(), "DB_PASSWORD=\n");
    }

    #[test]
    fn test_debug_masks_values() {
        let mut secrets = SecretMap::new();
        secrets.insert("DB_PASSWORD", "super_secret_token");

        let debug = format!("{:?}", secrets);
        assert!(debug.contains("DB_PASSWORD"));
        assert!(!debug.contains("super_secret_token"));
    }

    #[test]
    fn test_invalid_registry_rejected() {
        let registry = SensitiveKeyRegistry::new(vec![
            SensitiveKey::new("a", "X"),
            SensitiveKey::new("b", "X"),
        ]);
        assert!(SecretExtractor::new(registry).is_err());
    }

    #[test]
    fn test_empty_registry_is_noop() {
        let extractor = SecretExtractor::new(SensitiveKeyRegistry::empty()).unwrap();
        let mut store = props(&[("spring.datasource.password", "pw")]);

        assert!(extractor.extract(&mut store).is_empty());
        assert_eq!(store["spring.datasource.password"], "pw");
    }
}
