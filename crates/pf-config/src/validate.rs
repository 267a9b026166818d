//! Configuration validation errors and semantic validation.

use std::collections::HashSet;
use std::path::Component;

use thiserror::Error;

use crate::forge::{repo_name_from_url, ForgeConfig, Profile, SyncConfig};

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Semantic validation failed: {0}")]
    SemanticError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 61,
            ValidationError::SemanticError(_) => 63,
            ValidationError::MissingField(_) => 64,
            ValidationError::InvalidValue { .. } => 65,
            ValidationError::VersionMismatch { .. } => 66,
        }
    }
}

/// Validate a loaded configuration semantically.
pub fn validate_config(config: &ForgeConfig) -> ValidationResult<()> {
    // Same major version only
    let expected_major = crate::CONFIG_SCHEMA_VERSION.split('.').next();
    if config.schema_version.split('.').next() != expected_major {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: config.schema_version.clone(),
        });
    }

    config
        .sensitive_keys
        .validate()
        .map_err(|e| ValidationError::InvalidValue {
            field: "sensitive_keys".to_string(),
            message: e.to_string(),
        })?;

    if config.profiles.is_empty() {
        return Err(ValidationError::MissingField("profiles".to_string()));
    }
    if !config.profiles.contains_key(&config.default_profile) {
        return Err(ValidationError::InvalidValue {
            field: "default_profile".to_string(),
            message: format!("no profile named '{}'", config.default_profile),
        });
    }

    for (name, profile) in &config.profiles {
        validate_profile(name, profile)?;
    }

    validate_sync(&config.sync)
}

fn validate_profile(name: &str, profile: &Profile) -> ValidationResult<()> {
    let field = |suffix: &str| format!("profiles.{}.{}", name, suffix);

    if profile.input_pattern.trim().is_empty() {
        return Err(ValidationError::MissingField(field("input_pattern")));
    }
    if profile.input_pattern.contains('/') || profile.input_pattern.contains('\\') {
        return Err(ValidationError::InvalidValue {
            field: field("input_pattern"),
            message: "must be a file name pattern, not a path".to_string(),
        });
    }

    check_file_name(&field("output_file"), &profile.output_file)?;
    check_file_name(&field("secrets_file"), &profile.secrets_file)?;

    if profile.output_file == profile.secrets_file {
        return Err(ValidationError::SemanticError(format!(
            "profile '{}' writes the document and the secrets to the same file",
            name
        )));
    }

    if profile.required_key.trim().is_empty() {
        return Err(ValidationError::MissingField(field("required_key")));
    }

    if let Some(ov) = &profile.host_override {
        ov.validate().map_err(|e| ValidationError::InvalidValue {
            field: field("host_override"),
            message: e.to_string(),
        })?;
    }

    Ok(())
}

fn validate_sync(sync: &SyncConfig) -> ValidationResult<()> {
    let mut names = HashSet::new();
    for url in &sync.repositories {
        let name = repo_name_from_url(url);
        if name.is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "sync.repositories".to_string(),
                message: format!("cannot derive a repository name from '{}'", url),
            });
        }
        if !names.insert(name.clone()) {
            return Err(ValidationError::SemanticError(format!(
                "repository name '{}' appears more than once",
                name
            )));
        }
    }

    let escapes = sync
        .config_subpath
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(ValidationError::InvalidValue {
            field: "sync.config_subpath".to_string(),
            message: "must be a relative path inside the repository".to_string(),
        });
    }

    for file in &sync.expected_files {
        check_file_name("sync.expected_files", file)?;
    }

    if sync.commit_message.trim().is_empty() {
        return Err(ValidationError::MissingField("sync.commit_message".to_string()));
    }
    if sync.git_program.trim().is_empty() {
        return Err(ValidationError::MissingField("sync.git_program".to_string()));
    }

    Ok(())
}

fn check_file_name(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field.to_string()));
    }
    if value.contains('/') || value.contains('\\') || value == "." || value == ".." {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: format!("'{}' must be a plain file name", value),
        });
    }
    Ok(())
}
