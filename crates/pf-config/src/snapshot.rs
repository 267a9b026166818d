//! Configuration snapshots.
//!
//! A snapshot records which configuration a run used, so generated files can
//! be traced back to the registry and profiles that produced them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::forge::ForgeConfig;
use crate::resolve::{ConfigPaths, ConfigSource};

/// A frozen snapshot of configuration state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// When this snapshot was taken.
    pub timestamp: DateTime<Utc>,

    /// Schema version of the configuration.
    pub schema_version: String,

    /// Path the configuration was loaded from.
    #[serde(default)]
    pub config_path: Option<String>,

    /// Where the configuration came from.
    pub source: String,

    /// SHA-256 of the file content, or of the serialized defaults.
    pub config_hash: String,

    /// Key configuration values for quick reference.
    pub summary: ConfigSummary,
}

/// Summary of key configuration values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSummary {
    pub default_profile: String,
    pub profiles: Vec<String>,
    /// Variable names only; values never live in the config.
    pub sensitive_variables: Vec<String>,
    pub repository_count: usize,
    pub target_dir: String,
}

impl ConfigSnapshot {
    /// Snapshot a configuration loaded from `raw` content.
    pub fn new(config: &ForgeConfig, paths: &ConfigPaths, raw: &str) -> Self {
        ConfigSnapshot {
            timestamp: Utc::now(),
            schema_version: config.schema_version.clone(),
            config_path: paths.config.as_ref().map(|p| p.display().to_string()),
            source: paths.source.to_string(),
            config_hash: hash_content(raw),
            summary: ConfigSummary::from_config(config),
        }
    }

    /// Snapshot of the built-in defaults.
    pub fn defaults_only() -> Self {
        let config = ForgeConfig::default();
        let raw = config.to_json().unwrap_or_default();
        ConfigSnapshot {
            timestamp: Utc::now(),
            schema_version: config.schema_version.clone(),
            config_path: None,
            source: ConfigSource::BuiltinDefault.to_string(),
            config_hash: hash_content(&raw),
            summary: ConfigSummary::from_config(&config),
        }
    }

    /// Serialize snapshot to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Check if this snapshot describes the same configuration as another.
    pub fn matches(&self, other: &ConfigSnapshot) -> bool {
        self.config_hash == other.config_hash
    }

    /// Short identifier (first 12 chars of hash).
    pub fn short_id(&self) -> &str {
        &self.config_hash[..12.min(self.config_hash.len())]
    }
}

impl ConfigSummary {
    fn from_config(config: &ForgeConfig) -> Self {
        ConfigSummary {
            default_profile: config.default_profile.clone(),
            profiles: config.profiles.keys().cloned().collect(),
            sensitive_variables: config
                .sensitive_keys
                .entries()
                .iter()
                .map(|e| e.variable.clone())
                .collect(),
            repository_count: config.sync.repositories.len(),
            target_dir: config.sync.target_dir.display().to_string(),
        }
    }
}

/// Hash content with SHA-256 and return hex string.
fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
