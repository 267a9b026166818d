//! Version-control client abstraction.
//!
//! Repository sync talks to version control only through [`VcsClient`].
//! [`GitCli`] runs the `git` executable directly, without a shell, and
//! captures its output; [`DryRunVcs`] records what would have run.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Mutex;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, trace};

/// Errors from version-control operations.
#[derive(Debug, Error)]
pub enum VcsError {
    #[error("`{command}` exited with {status}: {stderr}")]
    ExternalCommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("repository not found at {0}")]
    RepoMissing(PathBuf),
}

/// Captured result of one version-control command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutput {
    /// Command line as it would be typed, for reporting.
    pub command: String,
    /// Exit code, `None` when killed by a signal or not actually run.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// The version-control operations repository sync needs.
pub trait VcsClient {
    /// Clone `url` into `dest`.
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<CommandOutput, VcsError>;

    /// Pull the current branch.
    fn pull(&self, repo: &Path) -> Result<CommandOutput, VcsError>;

    /// Stage every change in the working tree.
    fn stage_all(&self, repo: &Path) -> Result<CommandOutput, VcsError>;

    /// Commit staged changes.
    fn commit(&self, repo: &Path, message: &str) -> Result<CommandOutput, VcsError>;

    /// Push the current branch.
    fn push(&self, repo: &Path) -> Result<CommandOutput, VcsError>;
}

/// `git` executable client.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: String,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn run_in(&self, repo: &Path, args: &[&str]) -> Result<CommandOutput, VcsError> {
        if !repo.is_dir() {
            return Err(VcsError::RepoMissing(repo.to_path_buf()));
        }
        self.run(Some(repo), args)
    }

    fn run(&self, cwd: Option<&Path>, args: &[&str]) -> Result<CommandOutput, VcsError> {
        let command_line = render_command(&self.program, args);
        debug!(command = %command_line, cwd = ?cwd, "running version-control command");

        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        let output = cmd.output().map_err(|source| VcsError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        let result = CommandOutput {
            command: command_line,
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).trim_end().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
        };
        trace!(status = ?result.status, "command finished");

        if output.status.success() {
            Ok(result)
        } else {
            Err(VcsError::ExternalCommandFailed {
                command: result.command,
                status: result
                    .status
                    .map(|c| format!("status {}", c))
                    .unwrap_or_else(|| "a signal".to_string()),
                stderr: result.stderr,
            })
        }
    }
}

impl VcsClient for GitCli {
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<CommandOutput, VcsError> {
        let dest = dest.to_string_lossy();
        self.run(None, &["clone", url, dest.as_ref()])
    }

    fn pull(&self, repo: &Path) -> Result<CommandOutput, VcsError> {
        self.run_in(repo, &["pull"])
    }

    fn stage_all(&self, repo: &Path) -> Result<CommandOutput, VcsError> {
        self.run_in(repo, &["add", "."])
    }

    fn commit(&self, repo: &Path, message: &str) -> Result<CommandOutput, VcsError> {
        self.run_in(repo, &["commit", "-m", message])
    }

    fn push(&self, repo: &Path) -> Result<CommandOutput, VcsError> {
        self.run_in(repo, &["push"])
    }
}

/// A client that runs nothing and records each command.
#[derive(Debug, Default)]
pub struct DryRunVcs {
    program: String,
    log: Mutex<Vec<String>>,
}

impl DryRunVcs {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Commands recorded so far, in order.
    pub fn commands(&self) -> Vec<String> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    fn record(&self, repo: Option<&Path>, args: &[&str]) -> Result<CommandOutput, VcsError> {
        let mut command = render_command(&self.program, args);
        if let Some(dir) = repo {
            command = format!("(cd {}) {}", dir.display(), command);
        }
        if let Ok(mut log) = self.log.lock() {
            log.push(command.clone());
        }
        Ok(CommandOutput {
            command,
            status: None,
            stdout: String::new(),
            stderr: String::new(),
        })
    }
}

impl VcsClient for DryRunVcs {
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<CommandOutput, VcsError> {
        let dest = dest.to_string_lossy();
        self.record(None, &["clone", url, dest.as_ref()])
    }

    fn pull(&self, repo: &Path) -> Result<CommandOutput, VcsError> {
        self.record(Some(repo), &["pull"])
    }

    fn stage_all(&self, repo: &Path) -> Result<CommandOutput, VcsError> {
        self.record(Some(repo), &["add", "."])
    }

    fn commit(&self, repo: &Path, message: &str) -> Result<CommandOutput, VcsError> {
        self.record(Some(repo), &["commit", "-m", message])
    }

    fn push(&self, repo: &Path) -> Result<CommandOutput, VcsError> {
        self.record(Some(repo), &["push"])
    }
}

/// Render a command for display, quoting arguments that contain spaces.
fn render_command(program: &str, args: &[&str]) -> String {
    let mut out = program.to_string();
    for arg in args {
        out.push(' ');
        if arg.is_empty() || arg.chars().any(char::is_whitespace) {
            out.push('"');
            out.push_str(&arg.replace('"', "\\\""));
            out.push('"');
        } else {
            out.push_str(arg);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_render_command_quotes_spaces() {
        assert_eq!(
            render_command("git", &["commit", "-m", "Update config files"]),
            "git commit -m \"Update config files\""
        );
        assert_eq!(render_command("git", &["push"]), "git push");
    }

    #[test]
    fn test_dry_run_records_in_order() {
        let vcs = DryRunVcs::new("git");
        let repo = Path::new("repos/lm-users");
        vcs.pull(repo).unwrap();
        vcs.stage_all(repo).unwrap();
        vcs.commit(repo, "msg").unwrap();
        vcs.push(repo).unwrap();

        let commands = vcs.commands();
        assert_eq!(commands.len(), 4);
        assert!(commands[0].ends_with("git pull"));
        assert!(commands[1].ends_with("git add ."));
        assert!(commands[2].ends_with("git commit -m msg"));
        assert!(commands[3].ends_with("git push"));
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let vcs = GitCli::new("propforge-definitely-not-a-real-binary");
        let dir = TempDir::new().unwrap();
        let err = vcs.pull(dir.path()).unwrap_err();
        assert!(matches!(err, VcsError::Spawn { .. }));
    }

    #[test]
    fn test_missing_repo_is_reported_before_running() {
        let vcs = GitCli::default();
        let err = vcs.push(Path::new("/nonexistent/repo")).unwrap_err();
        assert!(matches!(err, VcsError::RepoMissing(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_status_is_checked() {
        let dir = TempDir::new().unwrap();

        let ok = GitCli::new("true").stage_all(dir.path()).unwrap();
        assert_eq!(ok.status, Some(0));
        assert_eq!(ok.command, "true add .");

        let err = GitCli::new("false").push(dir.path()).unwrap_err();
        match err {
            VcsError::ExternalCommandFailed { command, status, .. } => {
                assert_eq!(command, "false push");
                assert_eq!(status, "status 1");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
