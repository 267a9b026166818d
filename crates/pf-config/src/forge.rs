//! Tool configuration types.
//!
//! Every field has a serde default equal to the built-in value, so a config
//! file only needs the sections it changes.

use pf_redact::{HostOverride, SensitiveKeyRegistry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::validate::ValidationError;

/// Property every source must define; names the output directory.
pub const APPLICATION_NAME_KEY: &str = "spring.application.name";

/// Complete propforge configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForgeConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    /// Keys whose values are moved to the secrets file.
    #[serde(default)]
    pub sensitive_keys: SensitiveKeyRegistry,

    /// Profile used when `convert` is run without `--profile`.
    #[serde(default = "default_profile_name")]
    pub default_profile: String,

    /// Conversion profiles by name.
    #[serde(default = "default_profiles")]
    pub profiles: BTreeMap<String, Profile>,

    /// Repository distribution settings.
    #[serde(default)]
    pub sync: SyncConfig,
}

/// A conversion variant: which sources to read and what to write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// File name pattern for sources; `*` matches any run of characters.
    pub input_pattern: String,

    /// Structured document written per source.
    pub output_file: String,

    /// Secrets file written when anything was extracted.
    #[serde(default = "default_secrets_file")]
    pub secrets_file: String,

    /// Property naming the service; sources without it are skipped.
    #[serde(default = "default_required_key")]
    pub required_key: String,

    /// Optional URL host/port rewrite applied before extraction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_override: Option<HostOverride>,
}

/// Repository distribution settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Remote repository URLs.
    #[serde(default = "default_repositories")]
    pub repositories: Vec<String>,

    /// Directory the repositories are cloned into.
    #[serde(default = "default_target_dir")]
    pub target_dir: PathBuf,

    /// Directory holding one generated folder per service.
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,

    /// Path inside each repository that receives the generated files.
    #[serde(default = "default_config_subpath")]
    pub config_subpath: PathBuf,

    /// Generated files copied into each repository.
    #[serde(default = "default_expected_files")]
    pub expected_files: Vec<String>,

    /// Commit message used by `sync publish`.
    #[serde(default = "default_commit_message")]
    pub commit_message: String,

    /// Version-control executable.
    #[serde(default = "default_git_program")]
    pub git_program: String,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            sensitive_keys: SensitiveKeyRegistry::default(),
            default_profile: default_profile_name(),
            profiles: default_profiles(),
            sync: SyncConfig::default(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            repositories: default_repositories(),
            target_dir: default_target_dir(),
            source_dir: default_source_dir(),
            config_subpath: default_config_subpath(),
            expected_files: default_expected_files(),
            commit_message: default_commit_message(),
            git_program: default_git_program(),
        }
    }
}

impl ForgeConfig {
    /// Load configuration from a file.
    ///
    /// `.toml` files are parsed as TOML, everything else as JSON.
    pub fn from_file(path: &Path) -> Result<Self, ValidationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::parse_for_path(path, &content)
    }

    /// Parse file content in the format its path implies.
    ///
    /// `.toml` is TOML, everything else JSON.
    pub fn parse_for_path(path: &Path, content: &str) -> Result<Self, ValidationError> {
        if is_toml(path) {
            Self::parse_toml(content)
        } else {
            Self::parse_json(content)
        }
    }

    /// Parse configuration from a JSON string.
    pub fn parse_json(json: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(json)
            .map_err(|e| ValidationError::ParseError(format!("Invalid JSON: {}", e)))
    }

    /// Parse configuration from a TOML string.
    pub fn parse_toml(text: &str) -> Result<Self, ValidationError> {
        toml::from_str(text)
            .map_err(|e| ValidationError::ParseError(format!("Invalid TOML: {}", e)))
    }

    /// Serialize as pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Look up a profile by name.
    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    /// Profile names in sorted order.
    pub fn profile_names(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }
}

impl Profile {
    /// Profile with default secrets file and required key.
    pub fn new(input_pattern: impl Into<String>, output_file: impl Into<String>) -> Self {
        Self {
            input_pattern: input_pattern.into(),
            output_file: output_file.into(),
            secrets_file: default_secrets_file(),
            required_key: default_required_key(),
            host_override: None,
        }
    }

    /// Attach a host override.
    pub fn with_host_override(mut self, host_override: HostOverride) -> Self {
        self.host_override = Some(host_override);
        self
    }
}

impl SyncConfig {
    /// Repository names derived from the configured URLs, in order.
    pub fn repository_names(&self) -> Vec<String> {
        self.repositories
            .iter()
            .map(|url| repo_name_from_url(url))
            .collect()
    }
}

/// Derive a repository directory name from its URL.
///
/// `https://github.com/org/lm-users.git` → `lm-users`.
pub fn repo_name_from_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    let last = trimmed
        .rsplit(|c: char| c == '/' || c == ':')
        .next()
        .unwrap_or(trimmed);
    last.strip_suffix(".git").unwrap_or(last).to_string()
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false)
}

// Default value functions

fn default_schema_version() -> String {
    crate::CONFIG_SCHEMA_VERSION.to_string()
}

fn default_profile_name() -> String {
    "local".to_string()
}

fn default_profiles() -> BTreeMap<String, Profile> {
    let mut profiles = BTreeMap::new();
    profiles.insert(
        "local".to_string(),
        Profile::new("*---application.properties", "application-local.yml"),
    );
    profiles.insert(
        "pre".to_string(),
        Profile::new("audit---application.properties", "application-pre.yml").with_host_override(
            HostOverride::new("spring.datasource.url", "postgres-pre", 5432),
        ),
    );
    profiles
}

fn default_secrets_file() -> String {
    ".env".to_string()
}

fn default_required_key() -> String {
    APPLICATION_NAME_KEY.to_string()
}

fn default_repositories() -> Vec<String> {
    [
        "lm-audit",
        "lm-comments",
        "lm-config",
        "lm-integration",
        "lm-issues",
        "lm-notifications",
        "lm-oauth",
        "lm-projects",
        "lm-sprint",
        "lm-users",
    ]
    .iter()
    .map(|name| format!("https://github.com/cartagena-corp/{}.git", name))
    .collect()
}

fn default_target_dir() -> PathBuf {
    PathBuf::from("repositories")
}

fn default_source_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_config_subpath() -> PathBuf {
    PathBuf::from("src/main/resources/config")
}

fn default_expected_files() -> Vec<String> {
    vec![
        "application-local.yml".to_string(),
        "application-pre.yml".to_string(),
    ]
}

fn default_commit_message() -> String {
    "Actualización de archivos de configuración".to_string()
}

fn default_git_program() -> String {
    "git".to_string()
}
