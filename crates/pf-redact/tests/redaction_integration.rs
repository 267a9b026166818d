//! Integration tests for pf-redact.
//!
//! These tests verify:
//! - Canary secrets never survive extraction in the property store
//! - Registry files round through disk and are validated on load
//! - Override and extraction compose in the order the pipeline uses

use pf_redact::{
    placeholder, suspicious_keys, HostOverride, OverrideOutcome, PropertyStore, SecretExtractor,
    SensitiveKey, SensitiveKeyRegistry,
};
use std::collections::{BTreeMap, HashMap};
use tempfile::TempDir;

/// Values that must never remain in a store after extraction.
const CANARY_SECRETS: &[&str] = &[
    "password123!@#",
    "super_secret_token",
    "GOCSPX-xxxxxxxxxxxxxxxxxxxxxxxxxxxx",
    "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.eyJzdWIiOiIxMjM0NTY3ODkwIn0",
    "ñandú-contraseña",
];

fn canary_store(secret: &str) -> HashMap<String, String> {
    let mut store = HashMap::new();
    for entry in SensitiveKeyRegistry::default().entries() {
        store.insert(entry.property.clone(), secret.to_string());
    }
    store.insert("spring.application.name".to_string(), "lm-users".to_string());
    store
}

#[test]
fn test_canary_secrets_never_remain_in_store() {
    let extractor = SecretExtractor::new(SensitiveKeyRegistry::default()).unwrap();

    for canary in CANARY_SECRETS {
        let mut store = canary_store(canary);
        let secrets = extractor.extract(&mut store);

        assert_eq!(secrets.len(), 5);
        for (key, value) in &store {
            assert!(
                !value.contains(canary),
                "Canary '{}' remained under '{}'",
                canary,
                key
            );
        }
        for (_, value) in secrets.iter() {
            assert_eq!(value, *canary);
        }
    }
}

#[test]
fn test_every_registered_key_gets_its_placeholder() {
    let registry = SensitiveKeyRegistry::default();
    let extractor = SecretExtractor::new(registry.clone()).unwrap();
    let mut store = canary_store("x");
    extractor.extract(&mut store);

    for entry in registry.entries() {
        assert_eq!(
            store.get_value(&entry.property),
            Some(placeholder(&entry.variable).as_str())
        );
    }
}

#[test]
fn test_extraction_is_idempotent_on_placeholders() {
    let extractor = SecretExtractor::new(SensitiveKeyRegistry::default()).unwrap();
    let mut store = BTreeMap::new();
    store.insert("app.jwt.secret".to_string(), "jwt-value".to_string());

    let first = extractor.extract(&mut store);
    let after_first = store.clone();
    let second = extractor.extract(&mut store);

    assert_eq!(first.get("JWT_SECRET"), Some("jwt-value"));
    assert_eq!(second.get("JWT_SECRET"), Some("${JWT_SECRET}"));
    assert_eq!(store, after_first);
}

#[test]
fn test_registry_file_roundtrip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("registry.json");

    let mut registry = SensitiveKeyRegistry::default();
    registry.push(SensitiveKey::new("spring.mail.password", "MAIL_PASSWORD"));
    registry.save(&path).unwrap();

    let loaded = SensitiveKeyRegistry::load(&path).unwrap();
    assert_eq!(loaded, registry);
    assert_eq!(loaded.variable_for("spring.mail.password"), Some("MAIL_PASSWORD"));
}

#[test]
fn test_registry_load_rejects_invalid_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("registry.json");
    std::fs::write(
        &path,
        r#"[{"property":"a","variable":"X"},{"property":"b","variable":"X"}]"#,
    )
    .unwrap();

    let err = SensitiveKeyRegistry::load(&path).unwrap_err();
    assert!(err.to_string().contains("invalid registry"));
}

#[test]
fn test_override_then_extract() {
    let mut store = BTreeMap::new();
    store.insert(
        "spring.datasource.url".to_string(),
        "jdbc:postgresql://localhost:5432/lm_audit".to_string(),
    );
    store.insert("spring.datasource.password".to_string(), "pw".to_string());

    let ov = HostOverride::new("spring.datasource.url", "pre-db", 6543);
    assert_eq!(ov.apply(&mut store), OverrideOutcome::Applied);

    let extractor = SecretExtractor::new(SensitiveKeyRegistry::default()).unwrap();
    let secrets = extractor.extract(&mut store);

    assert_eq!(store["spring.datasource.url"], "jdbc:postgresql://pre-db:6543/lm_audit");
    assert_eq!(store["spring.datasource.password"], "${DB_PASSWORD}");
    assert_eq!(secrets.to_env_file(), "DB_PASSWORD=pw\n");
}

#[test]
fn test_suspicious_keys_after_extraction() {
    let mut store = BTreeMap::new();
    store.insert("spring.datasource.password".to_string(), "pw".to_string());
    store.insert("spring.mail.password".to_string(), "mail".to_string());

    let registry = SensitiveKeyRegistry::default();
    SecretExtractor::new(registry.clone())
        .unwrap()
        .extract(&mut store);

    assert_eq!(
        suspicious_keys(&store, &registry),
        vec!["spring.mail.password".to_string()]
    );
}
