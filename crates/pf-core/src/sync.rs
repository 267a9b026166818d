//! Repository sync: distribute generated files to service repositories.
//!
//! `fetch` clones missing repositories and copies each service's generated
//! files into its config directory. `publish` pulls, stages, commits and
//! pushes every repository present locally. Each repository is handled to
//! completion before the next, and one repository failing never stops the
//! others.

use std::path::PathBuf;

use pf_config::{repo_name_from_url, SyncConfig};
use serde::Serialize;

use crate::error::{ForgeError, Result};
use crate::exit_codes::ExitCode;
use crate::log_event;
use crate::logging::{event_names, LogContext, Stage};
use crate::vcs::{CommandOutput, VcsClient, VcsError};

/// One step of a repository operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStep {
    Clone,
    CreateConfigDir,
    Copy,
    Pull,
    Stage,
    Commit,
    Push,
}

impl std::fmt::Display for SyncStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SyncStep::Clone => "clone",
            SyncStep::CreateConfigDir => "create_config_dir",
            SyncStep::Copy => "copy",
            SyncStep::Pull => "pull",
            SyncStep::Stage => "stage",
            SyncStep::Commit => "commit",
            SyncStep::Push => "push",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Ok,
    Failed,
    Skipped,
}

/// Record of one executed (or skipped) step.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub step: SyncStep,
    pub status: StepStatus,
    /// Command line for version-control steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Error text or skip reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Error kind for failed steps (see [`ForgeError::kind`]).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
}

impl StepRecord {
    fn ok(step: SyncStep, command: Option<String>) -> Self {
        Self {
            step,
            status: StepStatus::Ok,
            command,
            detail: None,
            kind: None,
        }
    }

    fn failed(step: SyncStep, error: &ForgeError) -> Self {
        Self {
            step,
            status: StepStatus::Failed,
            command: None,
            detail: Some(error.to_string()),
            kind: Some(error.kind()),
        }
    }

    fn skipped(step: SyncStep, detail: impl Into<String>) -> Self {
        Self {
            step,
            status: StepStatus::Skipped,
            command: None,
            detail: Some(detail.into()),
            kind: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepoStatus {
    Synced,
    Failed,
    Skipped,
}

/// Result for one repository.
#[derive(Debug, Clone, Serialize)]
pub struct RepoOutcome {
    pub name: String,
    pub url: String,
    pub path: PathBuf,
    pub status: RepoStatus,
    pub steps: Vec<StepRecord>,
    /// Files copied into the config directory (fetch only).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub copied: Vec<String>,
    /// Expected files absent from the source directory (fetch only).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,
}

impl RepoOutcome {
    fn new(name: &str, url: &str, path: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            path,
            status: RepoStatus::Synced,
            steps: Vec::new(),
            copied: Vec::new(),
            missing: Vec::new(),
        }
    }

    fn finish(mut self) -> Self {
        if self.status != RepoStatus::Skipped
            && self.steps.iter().any(|s| s.status == StepStatus::Failed)
        {
            self.status = RepoStatus::Failed;
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOperation {
    Fetch,
    Publish,
}

impl std::fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncOperation::Fetch => f.write_str("fetch"),
            SyncOperation::Publish => f.write_str("publish"),
        }
    }
}

/// Outcome of `sync fetch` or `sync publish`.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub operation: SyncOperation,
    pub target_dir: PathBuf,
    pub dry_run: bool,
    pub repos: Vec<RepoOutcome>,
}

impl SyncReport {
    pub fn count(&self, status: RepoStatus) -> usize {
        self.repos.iter().filter(|r| r.status == status).count()
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.repos.is_empty() {
            ExitCode::NothingToDo
        } else if self.count(RepoStatus::Failed) > 0 {
            ExitCode::PartialFail
        } else if self.count(RepoStatus::Skipped) > 0 {
            ExitCode::SkippedSources
        } else {
            ExitCode::Clean
        }
    }
}

/// Runs sync operations against the configured repositories.
pub struct RepoManager<'a> {
    vcs: &'a dyn VcsClient,
    config: SyncConfig,
    dry_run: bool,
    ctx: &'a LogContext,
}

impl<'a> RepoManager<'a> {
    pub fn new(vcs: &'a dyn VcsClient, config: SyncConfig, ctx: &'a LogContext) -> Self {
        Self {
            vcs,
            config,
            dry_run: false,
            ctx,
        }
    }

    /// Skip filesystem changes. Pair with a [`crate::vcs::DryRunVcs`].
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// `(name, url)` of the repositories selected by `filter`.
    ///
    /// An empty filter selects all; an unknown name is an error.
    pub fn select(&self, filter: &[String]) -> Result<Vec<(String, String)>> {
        let all: Vec<(String, String)> = self
            .config
            .repositories
            .iter()
            .map(|url| (repo_name_from_url(url), url.clone()))
            .collect();

        if filter.is_empty() {
            return Ok(all);
        }
        if let Some(unknown) = filter.iter().find(|n| !all.iter().any(|(name, _)| name == *n)) {
            return Err(ForgeError::UnknownRepository {
                name: unknown.clone(),
            });
        }
        Ok(all
            .into_iter()
            .filter(|(name, _)| filter.contains(name))
            .collect())
    }

    /// Clone missing repositories and copy generated files into them.
    pub fn fetch(&self, filter: &[String]) -> Result<SyncReport> {
        let selected = self.select(filter)?;
        self.log_started(SyncOperation::Fetch, selected.len());

        let target = &self.config.target_dir;
        if !self.dry_run {
            std::fs::create_dir_all(target).map_err(|e| ForgeError::io(target, e))?;
        }

        let repos = selected
            .iter()
            .map(|(name, url)| self.fetch_one(name, url))
            .collect();
        Ok(self.finish(SyncOperation::Fetch, repos))
    }

    /// Pull, stage, commit and push every selected repository present locally.
    pub fn publish(&self, filter: &[String]) -> Result<SyncReport> {
        let selected = self.select(filter)?;
        self.log_started(SyncOperation::Publish, selected.len());

        let repos = selected
            .iter()
            .map(|(name, url)| self.publish_one(name, url))
            .collect();
        Ok(self.finish(SyncOperation::Publish, repos))
    }

    fn fetch_one(&self, name: &str, url: &str) -> RepoOutcome {
        let ctx = self.ctx;
        let path = self.config.target_dir.join(name);
        let mut outcome = RepoOutcome::new(name, url, path.clone());

        if path.exists() {
            outcome
                .steps
                .push(StepRecord::skipped(SyncStep::Clone, "already present"));
        } else {
            let record = self.vcs_step(SyncStep::Clone, name, self.vcs.clone_repo(url, &path));
            let failed = record.status == StepStatus::Failed;
            outcome.steps.push(record);
            if failed {
                return self.log_repo(outcome.finish(), Stage::Fetch);
            }
        }

        let config_dir = path.join(&self.config.config_subpath);
        if !self.dry_run {
            if let Err(e) = std::fs::create_dir_all(&config_dir) {
                outcome.steps.push(StepRecord::failed(
                    SyncStep::CreateConfigDir,
                    &ForgeError::io(&config_dir, e),
                ));
                return self.log_repo(outcome.finish(), Stage::Fetch);
            }
        }
        outcome
            .steps
            .push(StepRecord::ok(SyncStep::CreateConfigDir, None));

        let source_dir = self.config.source_dir.join(name);
        for file in &self.config.expected_files {
            let from = source_dir.join(file);
            if !from.is_file() {
                log_event!(
                    ctx,
                    WARN,
                    event_names::SYNC_FILE_MISSING,
                    Stage::Fetch,
                    format!("{} not found for {}", file, name),
                    repo = name,
                    path = display(from.display())
                );
                outcome.missing.push(file.clone());
                continue;
            }

            let to = config_dir.join(file);
            let copied = if self.dry_run {
                Ok(())
            } else {
                std::fs::copy(&from, &to).map(|_| ())
            };
            match copied {
                Ok(()) => {
                    outcome.copied.push(file.clone());
                    outcome.steps.push(StepRecord {
                        step: SyncStep::Copy,
                        status: StepStatus::Ok,
                        command: None,
                        detail: Some(file.clone()),
                        kind: None,
                    });
                }
                Err(e) => outcome
                    .steps
                    .push(StepRecord::failed(SyncStep::Copy, &ForgeError::io(&to, e))),
            }
        }

        self.log_repo(outcome.finish(), Stage::Fetch)
    }

    fn publish_one(&self, name: &str, url: &str) -> RepoOutcome {
        let ctx = self.ctx;
        let path = self.config.target_dir.join(name);
        let mut outcome = RepoOutcome::new(name, url, path.clone());

        if !path.is_dir() {
            log_event!(
                ctx,
                WARN,
                event_names::SYNC_REPO_SKIPPED,
                Stage::Publish,
                format!("{} is not present locally; run `sync fetch` first", name),
                repo = name,
                path = display(path.display())
            );
            outcome.status = RepoStatus::Skipped;
            outcome.steps.push(StepRecord::skipped(
                SyncStep::Pull,
                format!("{} does not exist", path.display()),
            ));
            return outcome;
        }

        let message = self.config.commit_message.as_str();
        let steps = [
            (SyncStep::Pull, self.vcs.pull(&path)),
            (SyncStep::Stage, self.vcs.stage_all(&path)),
            (SyncStep::Commit, self.vcs.commit(&path, message)),
            (SyncStep::Push, self.vcs.push(&path)),
        ];
        for (step, result) in steps {
            let record = self.vcs_step(step, name, result);
            outcome.steps.push(record);
        }

        self.log_repo(outcome.finish(), Stage::Publish)
    }

    fn vcs_step(
        &self,
        step: SyncStep,
        repo: &str,
        result: std::result::Result<CommandOutput, VcsError>,
    ) -> StepRecord {
        let ctx = self.ctx;
        let stage = match step {
            SyncStep::Clone | SyncStep::CreateConfigDir | SyncStep::Copy => Stage::Fetch,
            _ => Stage::Publish,
        };
        match result {
            Ok(output) => {
                log_event!(
                    ctx,
                    DEBUG,
                    event_names::SYNC_STEP,
                    stage,
                    output.command.as_str(),
                    repo = repo,
                    step = display(step)
                );
                StepRecord::ok(step, Some(output.command))
            }
            Err(e) => {
                let error = ForgeError::from(e);
                log_event!(
                    ctx,
                    ERROR,
                    event_names::SYNC_STEP,
                    stage,
                    error.to_string(),
                    repo = repo,
                    step = display(step),
                    kind = error.kind()
                );
                StepRecord::failed(step, &error)
            }
        }
    }

    fn log_repo(&self, outcome: RepoOutcome, stage: Stage) -> RepoOutcome {
        let ctx = self.ctx;
        log_event!(
            ctx,
            INFO,
            event_names::SYNC_REPO_DONE,
            stage,
            format!("{}: {:?}", outcome.name, outcome.status),
            repo = outcome.name.as_str(),
            steps = outcome.steps.len(),
            copied = outcome.copied.len(),
            missing = outcome.missing.len()
        );
        outcome
    }

    fn log_started(&self, operation: SyncOperation, repos: usize) {
        let ctx = self.ctx;
        log_event!(
            ctx,
            INFO,
            event_names::SYNC_STARTED,
            Stage::Init,
            format!("sync {} over {} repositories", operation, repos),
            target_dir = display(self.config.target_dir.display()),
            dry_run = self.dry_run
        );
    }

    fn finish(&self, operation: SyncOperation, repos: Vec<RepoOutcome>) -> SyncReport {
        let report = SyncReport {
            operation,
            target_dir: self.config.target_dir.clone(),
            dry_run: self.dry_run,
            repos,
        };
        let ctx = self.ctx;
        log_event!(
            ctx,
            INFO,
            event_names::SYNC_FINISHED,
            Stage::Init,
            format!("sync {} finished", operation),
            synced = report.count(RepoStatus::Synced),
            failed = report.count(RepoStatus::Failed),
            skipped = report.count(RepoStatus::Skipped)
        );
        report
    }
}
