//! Command output rendering.
//!
//! Reports go to stdout either as human-readable lines or as pretty JSON.
//! Errors go to stderr in the same format.

use std::fmt::Write as _;
use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::convert::{ConversionReport, SourceOutcome};
use crate::exit_codes::ExitCode;
use crate::sync::{RepoStatus, StepStatus, SyncReport};

/// Output formats for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable lines (default)
    #[default]
    Human,

    /// Pretty-printed JSON
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Human => write!(f, "human"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Pretty JSON, or a minimal error object if serialization fails.
pub fn to_pretty_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!(r#"{{"status":"error","error":{{"message":"{}"}}}}"#, e))
}

/// Structured error body shared by every command.
pub fn error_response(code: u32, kind: &str, message: &str, exit: ExitCode) -> serde_json::Value {
    serde_json::json!({
        "status": "error",
        "generated_at": chrono::Utc::now().to_rfc3339(),
        "error": {
            "code": code,
            "kind": kind,
            "message": message,
            "exit_code": exit.as_i32(),
            "exit_name": exit.code_name(),
        }
    })
}

/// Print an error to stderr in the requested format.
pub fn print_error(format: OutputFormat, code: u32, kind: &str, message: &str, exit: ExitCode) {
    match format {
        OutputFormat::Json => {
            eprintln!("{}", to_pretty_json(&error_response(code, kind, message, exit)));
        }
        OutputFormat::Human => eprintln!("error: {}", message),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Human rendering of a conversion report.
pub fn render_conversion(report: &ConversionReport) -> String {
    let mut out = String::new();

    if report.outcomes.is_empty() {
        let _ = writeln!(
            out,
            "No sources found in {} for profile '{}'",
            report.input_dir.display(),
            report.profile
        );
        return out;
    }

    for outcome in &report.outcomes {
        match outcome {
            SourceOutcome::Converted {
                source,
                service,
                document_path,
                secrets_path,
                skipped_lines,
                host_override,
                suspicious_keys,
                ..
            } => {
                let _ = write!(
                    out,
                    "✓ {} -> {}/{}",
                    file_name(source),
                    service,
                    file_name(document_path)
                );
                if let Some(env) = secrets_path {
                    let _ = write!(out, " + {}", file_name(env));
                }
                if let Some(target) = host_override {
                    let _ = write!(out, " (host {})", target);
                }
                out.push('\n');
                if *skipped_lines > 0 {
                    let _ = writeln!(out, "    {} line(s) without '=' skipped", skipped_lines);
                }
                for key in suspicious_keys {
                    let _ = writeln!(
                        out,
                        "    warning: '{}' looks sensitive but is not registered",
                        key
                    );
                }
            }
            SourceOutcome::Skipped { source, reason } => {
                let _ = writeln!(out, "– {}: skipped, {}", file_name(source), reason);
            }
            SourceOutcome::Failed { source, error, .. } => {
                let _ = writeln!(out, "✗ {}: {}", file_name(source), error);
            }
        }
    }

    let _ = writeln!(
        out,
        "{} source(s): {} converted, {} skipped, {} failed{}",
        report.outcomes.len(),
        report.converted(),
        report.skipped(),
        report.failed(),
        if report.dry_run { " (dry run, nothing written)" } else { "" }
    );
    out
}

/// Human rendering of a sync report.
pub fn render_sync(report: &SyncReport) -> String {
    let mut out = String::new();

    if report.repos.is_empty() {
        let _ = writeln!(out, "No repositories selected");
        return out;
    }

    for repo in &report.repos {
        let mark = match repo.status {
            RepoStatus::Synced => "✓",
            RepoStatus::Skipped => "–",
            RepoStatus::Failed => "✗",
        };
        let _ = writeln!(out, "{} {}", mark, repo.name);
        for step in &repo.steps {
            let status = match step.status {
                StepStatus::Ok => "ok",
                StepStatus::Failed => "failed",
                StepStatus::Skipped => "skipped",
            };
            let _ = write!(out, "    {} {}", step.step, status);
            if let Some(text) = step.detail.as_ref().or(step.command.as_ref()) {
                let _ = write!(out, ": {}", text);
            }
            out.push('\n');
        }
        for missing in &repo.missing {
            let _ = writeln!(out, "    {} not found", missing);
        }
    }

    let _ = writeln!(
        out,
        "sync {}: {} synced, {} failed, {} skipped{}",
        report.operation,
        report.count(RepoStatus::Synced),
        report.count(RepoStatus::Failed),
        report.count(RepoStatus::Skipped),
        if report.dry_run { " (dry run)" } else { "" }
    );
    out
}
