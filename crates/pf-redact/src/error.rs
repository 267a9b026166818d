//! Error types for sensitive value handling.

use thiserror::Error;

/// Result type for redaction operations.
pub type Result<T> = std::result::Result<T, RedactionError>;

/// Errors that can occur while building or loading redaction inputs.
///
/// Messages name keys and variables but never carry property values.
#[derive(Error, Debug)]
pub enum RedactionError {
    /// The sensitive key registry is inconsistent.
    #[error("invalid registry: {0}")]
    InvalidRegistry(String),

    /// A host override cannot be applied as configured.
    #[error("invalid host override for '{property}': {message}")]
    InvalidOverride { property: String, message: String },

    /// I/O error while reading or writing a registry file.
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),
}
