//! Error types for conversion and repository sync.

use std::path::{Path, PathBuf};

use pf_redact::RedactionError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::exit_codes::ExitCode;
use crate::vcs::VcsError;

/// Result alias used across pf-core.
pub type Result<T> = std::result::Result<T, ForgeError>;

/// Errors raised while converting sources or syncing repositories.
#[derive(Debug, Error)]
pub enum ForgeError {
    #[error("{path}: missing required key '{key}'")]
    MissingRequiredKey { path: PathBuf, key: String },

    #[error("line {line_number}: expected 'key=value', found '{content}'")]
    MalformedLine { line_number: usize, content: String },

    #[error("key '{key}' conflicts with the value already at '{path}'")]
    ConflictingKeyPath { key: String, path: String },

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("'{name}' cannot be used as an output directory name")]
    InvalidServiceName { name: String },

    #[error("unknown repository '{name}'")]
    UnknownRepository { name: String },

    #[error(transparent)]
    ExternalCommandFailed(#[from] VcsError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML rendering failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Redaction(#[from] RedactionError),
}

impl ForgeError {
    /// Wrap an I/O error with the path it concerns.
    ///
    /// `NotFound` becomes [`ForgeError::FileNotFound`].
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            ForgeError::FileNotFound(path.to_path_buf())
        } else {
            ForgeError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    /// Process exit code when this error ends a command.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            ForgeError::MissingRequiredKey { .. } => ExitCode::SkippedSources,
            ForgeError::MalformedLine { .. }
            | ForgeError::ConflictingKeyPath { .. }
            | ForgeError::InvalidServiceName { .. }
            | ForgeError::ExternalCommandFailed(_) => ExitCode::PartialFail,
            ForgeError::FileNotFound(_) | ForgeError::UnknownRepository { .. } => {
                ExitCode::ArgsError
            }
            ForgeError::Io { .. } => ExitCode::IoError,
            ForgeError::Config(e) => e.exit_code(),
            ForgeError::Redaction(_) => ExitCode::ConfigError,
            ForgeError::Yaml(_) => ExitCode::InternalError,
        }
    }

    /// Stable machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ForgeError::MissingRequiredKey { .. } => "missing_required_key",
            ForgeError::MalformedLine { .. } => "malformed_line",
            ForgeError::ConflictingKeyPath { .. } => "conflicting_key_path",
            ForgeError::FileNotFound(_) => "file_not_found",
            ForgeError::InvalidServiceName { .. } => "invalid_service_name",
            ForgeError::UnknownRepository { .. } => "unknown_repository",
            ForgeError::ExternalCommandFailed(_) => "external_command_failed",
            ForgeError::Io { .. } => "io",
            ForgeError::Yaml(_) => "yaml",
            ForgeError::Config(_) => "config",
            ForgeError::Redaction(_) => "redaction",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_io_not_found_maps_to_file_not_found() {
        let err = ForgeError::io(
            Path::new("/tmp/missing.properties"),
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, ForgeError::FileNotFound(_)));
        assert_eq!(err.exit_code(), ExitCode::ArgsError);
    }

    #[test]
    fn test_io_other_kept_as_io() {
        let err = ForgeError::io(
            Path::new("/root/x"),
            io::Error::new(io::ErrorKind::PermissionDenied, "nope"),
        );
        assert_eq!(err.kind(), "io");
        assert_eq!(err.exit_code(), ExitCode::IoError);
        assert!(err.to_string().contains("/root/x"));
    }

    #[test]
    fn test_conflict_message_names_both_paths() {
        let err = ForgeError::ConflictingKeyPath {
            key: "a.b".to_string(),
            path: "a".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'a.b'"));
        assert!(msg.contains("'a'"));
        assert_eq!(err.exit_code(), ExitCode::PartialFail);
    }
}
