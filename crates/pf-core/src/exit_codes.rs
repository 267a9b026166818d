//! Exit codes for the propforge CLI.
//!
//! Exit code ranges:
//! - 0-3: Operational outcomes (the run finished; the code says how)
//! - 10-19: User/environment errors (recoverable by user action)
//! - 20-29: Internal errors

/// Exit codes for propforge operations.
///
/// These codes are a stable contract for scripts wrapping the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    // ========================================================================
    // Operational Outcomes (0-3)
    // ========================================================================
    /// Every source or repository was processed.
    Clean = 0,

    /// No sources matched, or no repositories selected.
    NothingToDo = 1,

    /// Completed, but some sources or repositories were skipped.
    SkippedSources = 2,

    /// Some sources or repositories failed.
    PartialFail = 3,

    // ========================================================================
    // User / Environment Errors (10-19)
    // ========================================================================
    /// Invalid arguments.
    ArgsError = 10,

    /// Configuration file missing, unreadable or invalid.
    ConfigError = 11,

    // ========================================================================
    // Internal Errors (20-29)
    // ========================================================================
    /// Internal error.
    InternalError = 20,

    /// I/O error.
    IoError = 21,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Whether the run completed without failures (codes 0-2).
    pub fn is_success(self) -> bool {
        matches!(
            self,
            ExitCode::Clean | ExitCode::NothingToDo | ExitCode::SkippedSources
        )
    }

    /// Check if this exit code is an operational outcome (codes 0-3).
    pub fn is_operational(self) -> bool {
        (self as i32) < 10
    }

    /// Check if this exit code is a user/environment error (codes 10-19).
    pub fn is_user_error(self) -> bool {
        (10..20).contains(&(self as i32))
    }

    /// Check if this exit code is an internal error (codes 20-29).
    pub fn is_internal_error(self) -> bool {
        (self as i32) >= 20
    }

    /// Get the code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK_CLEAN",
            ExitCode::NothingToDo => "OK_NOTHING_TO_DO",
            ExitCode::SkippedSources => "OK_SKIPPED",
            ExitCode::PartialFail => "ERR_PARTIAL",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }

    /// Combine two outcomes, keeping the more severe one.
    pub fn worst(self, other: ExitCode) -> ExitCode {
        if other.as_i32() > self.as_i32() {
            other
        } else {
            self
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}
