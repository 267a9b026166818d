//! Structured event definitions for logging.
//!
//! Every event carries the run id, the command and the stage it was emitted
//! from. `JsonlLayer` lifts those three to the top level of each line.

use serde::{Deserialize, Serialize};

/// Log levels for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Level::Trace,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

/// Pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup and configuration loading.
    Init,
    /// Source discovery and property parsing.
    Parse,
    /// Override, extraction and tree building.
    Convert,
    /// Writing documents and secrets files.
    Write,
    /// Cloning repositories and copying generated files.
    Fetch,
    /// Pull, stage, commit and push.
    Publish,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Parse => "parse",
            Stage::Convert => "convert",
            Stage::Write => "write",
            Stage::Fetch => "fetch",
            Stage::Publish => "publish",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names used in logging.
pub mod event_names {
    // Run lifecycle
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    // Conversion
    pub const CONVERT_STARTED: &str = "convert.started";
    pub const CONVERT_SOURCES_FOUND: &str = "convert.sources_found";
    pub const CONVERT_LINE_SKIPPED: &str = "convert.line_skipped";
    pub const CONVERT_OVERRIDE: &str = "convert.override";
    pub const CONVERT_SECRETS_EXTRACTED: &str = "convert.secrets_extracted";
    pub const CONVERT_SUSPICIOUS_KEY: &str = "convert.suspicious_key";
    pub const CONVERT_SOURCE_DONE: &str = "convert.source_done";
    pub const CONVERT_SOURCE_SKIPPED: &str = "convert.source_skipped";
    pub const CONVERT_SOURCE_FAILED: &str = "convert.source_failed";
    pub const CONVERT_FINISHED: &str = "convert.finished";

    // Repository sync
    pub const SYNC_STARTED: &str = "sync.started";
    pub const SYNC_STEP: &str = "sync.step";
    pub const SYNC_FILE_MISSING: &str = "sync.file_missing";
    pub const SYNC_REPO_DONE: &str = "sync.repo_done";
    pub const SYNC_REPO_SKIPPED: &str = "sync.repo_skipped";
    pub const SYNC_FINISHED: &str = "sync.finished";

    // Config
    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_DEFAULT_USED: &str = "config.default_used";
    pub const CONFIG_ERROR: &str = "config.error";
}

/// Correlation data shared by every event of one invocation.
#[derive(Debug, Clone)]
pub struct LogContext {
    pub run_id: String,
    pub command: String,
}

impl LogContext {
    pub fn new(run_id: impl Into<String>, command: impl Into<String>) -> Self {
        LogContext {
            run_id: run_id.into(),
            command: command.into(),
        }
    }

    /// Context with a fresh run id.
    pub fn for_command(command: impl Into<String>) -> Self {
        Self::new(super::generate_run_id(), command)
    }
}
