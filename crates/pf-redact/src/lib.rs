//! Sensitive value extraction for propforge.
//!
//! This crate owns everything that decides which property values must not
//! reach a generated configuration document:
//!
//! - **Registry**: a fixed, ordered mapping from dotted property keys to
//!   environment-style variable names (`spring.datasource.password` ->
//!   `DB_PASSWORD`). It is configuration, passed in at call time.
//! - **Extraction**: exact-key matching that moves each registered value into
//!   a [`SecretMap`] and leaves a `${VARIABLE}` placeholder behind.
//! - **Host override**: a narrow rewrite of the `//host:port` fragment of one
//!   connection URL, used by environment-specific profiles.
//! - **Detection**: advisory heuristics that flag unregistered keys whose
//!   names look like credentials. Detection never extracts anything.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use pf_redact::{SecretExtractor, SensitiveKeyRegistry};
//!
//! let mut props = BTreeMap::new();
//! props.insert("spring.datasource.password".to_string(), "secret123".to_string());
//!
//! let extractor = SecretExtractor::new(SensitiveKeyRegistry::default()).unwrap();
//! let secrets = extractor.extract(&mut props);
//!
//! assert_eq!(props["spring.datasource.password"], "${DB_PASSWORD}");
//! assert_eq!(secrets.get("DB_PASSWORD"), Some("secret123"));
//! ```

pub mod detect;
pub mod error;
pub mod extract;
pub mod override_url;
pub mod registry;
pub mod store;

pub use detect::{looks_sensitive, suspicious_keys};
pub use error::{RedactionError, Result};
pub use extract::{placeholder, SecretExtractor, SecretMap};
pub use override_url::{HostOverride, OverrideOutcome};
pub use registry::{SensitiveKey, SensitiveKeyRegistry};
pub use store::PropertyStore;
