//! Configuration loading for the CLI.
//!
//! This module handles:
//! - Config resolution (`--config` > env > working dir > XDG > /etc > defaults)
//! - Parsing JSON or TOML by extension
//! - Semantic validation
//! - Snapshots for `config show`
//! - Writing a starter file for `config init`

use std::path::{Path, PathBuf};

use pf_config::resolve::{resolve_config, ConfigPaths, ConfigSource};
use pf_config::{validate_config, ConfigSnapshot, ForgeConfig, ValidationError};
use thiserror::Error;

use crate::exit_codes::ExitCode;

/// Errors that can occur during config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Invalid config file {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: ValidationError,
    },

    #[error("Semantic validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config file already exists: {path} (use --force to overwrite)")]
    AlreadyExists { path: PathBuf },

    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Numeric code for structured error output.
    pub fn code(&self) -> u32 {
        match self {
            ConfigError::NotFound { .. } => 10,
            ConfigError::Invalid { source, .. } => source.code(),
            ConfigError::Validation(e) => e.code(),
            ConfigError::AlreadyExists { .. } => 12,
            ConfigError::IoError { .. } => 21,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        match self {
            ConfigError::NotFound { .. } | ConfigError::AlreadyExists { .. } => {
                ExitCode::ArgsError
            }
            ConfigError::Invalid { .. } | ConfigError::Validation(_) => ExitCode::ConfigError,
            ConfigError::IoError { .. } => ExitCode::IoError,
        }
    }
}

/// Configuration resolution options.
#[derive(Debug, Default)]
pub struct ConfigOptions {
    /// Explicit config file (highest priority).
    pub config_path: Option<PathBuf>,
}

/// Loaded configuration with provenance.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: ForgeConfig,
    pub paths: ConfigPaths,
    /// Raw file content; `None` when running on defaults.
    pub raw: Option<String>,
}

impl ResolvedConfig {
    /// Whether no config file was found.
    pub fn using_defaults(&self) -> bool {
        self.paths.source == ConfigSource::BuiltinDefault
    }

    pub fn snapshot(&self) -> ConfigSnapshot {
        match &self.raw {
            Some(raw) => ConfigSnapshot::new(&self.config, &self.paths, raw),
            None => ConfigSnapshot::defaults_only(),
        }
    }
}

/// Load configuration with the standard resolution order.
pub fn load_config(options: &ConfigOptions) -> Result<ResolvedConfig, ConfigError> {
    let paths = resolve_config(options.config_path.as_deref());

    let Some(path) = paths.config.clone() else {
        return Ok(ResolvedConfig {
            config: ForgeConfig::default(),
            paths,
            raw: None,
        });
    };

    let (config, raw) = load_config_file(&path)?;
    Ok(ResolvedConfig {
        config,
        paths,
        raw: Some(raw),
    })
}

/// Load and validate one config file, returning it with its raw content.
pub fn load_config_file(path: &Path) -> Result<(ForgeConfig, String), ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::IoError {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;

    let config =
        ForgeConfig::parse_for_path(path, &raw).map_err(|source| ConfigError::Invalid {
            path: path.to_path_buf(),
            source,
        })?;

    validate_config(&config)?;
    Ok((config, raw))
}

/// Write the built-in defaults as pretty JSON.
pub fn write_default_config(path: &Path, force: bool) -> Result<(), ConfigError> {
    if path.exists() && !force {
        return Err(ConfigError::AlreadyExists {
            path: path.to_path_buf(),
        });
    }

    let io_err = |source| ConfigError::IoError {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let json = ForgeConfig::default().to_json().map_err(|e| {
        ConfigError::Validation(ValidationError::ParseError(e.to_string()))
    })?;
    std::fs::write(path, json + "\n").map_err(io_err)
}
