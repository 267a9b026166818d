//! Conversion pipeline: property sources to YAML documents plus secrets files.
//!
//! For each source matching the profile pattern:
//!
//! 1. parse the properties
//! 2. require the service name key
//! 3. apply the profile's host override, if any
//! 4. replace registered secrets with `${VAR}` placeholders
//! 5. build the nested document and write it under `<output>/<service>/`
//!
//! Sources are independent. A failing source is recorded and the batch
//! moves on.

use std::path::{Path, PathBuf};

use pf_config::Profile;
use pf_redact::{suspicious_keys, OverrideOutcome, SecretExtractor};
use regex::Regex;
use serde::Serialize;

use crate::document::Document;
use crate::error::{ForgeError, Result};
use crate::exit_codes::ExitCode;
use crate::log_event;
use crate::logging::{event_names, LogContext, Stage};
use crate::properties::{read_properties_file, ParseMode};

/// Options that change how sources are processed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvertOptions {
    /// Run everything except file writes.
    pub dry_run: bool,
    /// Treat lines without `=` as errors.
    pub strict: bool,
}

/// Why a source produced no output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    MissingRequiredKey { key: String },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::MissingRequiredKey { key } => write!(f, "missing required key '{}'", key),
        }
    }
}

/// Result of converting one source.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceOutcome {
    Converted {
        source: PathBuf,
        service: String,
        document_path: PathBuf,
        /// Present only when secrets were extracted.
        #[serde(skip_serializing_if = "Option::is_none")]
        secrets_path: Option<PathBuf>,
        /// Extracted variable names, in registry order.
        secret_variables: Vec<String>,
        skipped_lines: usize,
        /// `host:port` written by the override, when it applied.
        #[serde(skip_serializing_if = "Option::is_none")]
        host_override: Option<String>,
        /// Credential-looking keys left in the document.
        #[serde(skip_serializing_if = "Vec::is_empty")]
        suspicious_keys: Vec<String>,
    },
    Skipped {
        source: PathBuf,
        reason: SkipReason,
    },
    Failed {
        source: PathBuf,
        kind: String,
        error: String,
    },
}

impl SourceOutcome {
    pub fn source(&self) -> &Path {
        match self {
            SourceOutcome::Converted { source, .. }
            | SourceOutcome::Skipped { source, .. }
            | SourceOutcome::Failed { source, .. } => source,
        }
    }

    pub fn is_converted(&self) -> bool {
        matches!(self, SourceOutcome::Converted { .. })
    }
}

/// Outcome of a whole `convert` run.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub profile: String,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub dry_run: bool,
    pub outcomes: Vec<SourceOutcome>,
}

impl ConversionReport {
    pub fn converted(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_converted()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, SourceOutcome::Skipped { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, SourceOutcome::Failed { .. }))
            .count()
    }

    /// Exit code summarising the batch.
    pub fn exit_code(&self) -> ExitCode {
        if self.outcomes.is_empty() {
            ExitCode::NothingToDo
        } else if self.failed() > 0 {
            ExitCode::PartialFail
        } else if self.skipped() > 0 {
            ExitCode::SkippedSources
        } else {
            ExitCode::Clean
        }
    }
}

/// Files in `dir` whose name matches `pattern`, sorted by name.
///
/// `*` in the pattern matches any run of characters; everything else is
/// literal. Subdirectories and non-UTF-8 names are ignored.
pub fn discover_sources(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let matcher = pattern_regex(pattern);
    let entries = std::fs::read_dir(dir).map_err(|e| ForgeError::io(dir, e))?;

    let mut sources = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ForgeError::io(dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let matches = match (entry.file_name().to_str(), &matcher) {
            (Some(name), Some(re)) => re.is_match(name),
            _ => false,
        };
        if matches {
            sources.push(path);
        }
    }
    sources.sort();
    Ok(sources)
}

// Escaped literals joined by `.*` always compile; `None` is unreachable in
// practice and matches nothing.
fn pattern_regex(pattern: &str) -> Option<Regex> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{}$", body)).ok()
}

/// Converts sources for one profile.
pub struct Converter<'a> {
    profile_name: String,
    profile: &'a Profile,
    extractor: &'a SecretExtractor,
    options: ConvertOptions,
    ctx: &'a LogContext,
}

impl<'a> Converter<'a> {
    pub fn new(
        profile_name: impl Into<String>,
        profile: &'a Profile,
        extractor: &'a SecretExtractor,
        options: ConvertOptions,
        ctx: &'a LogContext,
    ) -> Self {
        Self {
            profile_name: profile_name.into(),
            profile,
            extractor,
            options,
            ctx,
        }
    }

    /// Convert every matching source in `input_dir`.
    ///
    /// Fails only when `input_dir` cannot be listed; per-source errors are
    /// recorded as [`SourceOutcome::Failed`].
    pub fn convert_all(&self, input_dir: &Path, output_root: &Path) -> Result<ConversionReport> {
        let ctx = self.ctx;
        log_event!(
            ctx,
            INFO,
            event_names::CONVERT_STARTED,
            Stage::Init,
            "starting conversion",
            profile = self.profile_name.as_str(),
            input_dir = display(input_dir.display()),
            output_dir = display(output_root.display()),
            dry_run = self.options.dry_run
        );

        let sources = discover_sources(input_dir, &self.profile.input_pattern)?;
        log_event!(
            ctx,
            INFO,
            event_names::CONVERT_SOURCES_FOUND,
            Stage::Parse,
            format!("found {} source(s)", sources.len()),
            pattern = self.profile.input_pattern.as_str(),
            count = sources.len()
        );

        let mut outcomes = Vec::with_capacity(sources.len());
        for source in sources {
            let outcome = match self.convert_source(&source, output_root) {
                Ok(outcome) => outcome,
                Err(e) => {
                    log_event!(
                        ctx,
                        ERROR,
                        event_names::CONVERT_SOURCE_FAILED,
                        Stage::Convert,
                        e.to_string(),
                        source = display(source.display()),
                        kind = e.kind()
                    );
                    SourceOutcome::Failed {
                        source,
                        kind: e.kind().to_string(),
                        error: e.to_string(),
                    }
                }
            };
            outcomes.push(outcome);
        }

        let report = ConversionReport {
            profile: self.profile_name.clone(),
            input_dir: input_dir.to_path_buf(),
            output_dir: output_root.to_path_buf(),
            dry_run: self.options.dry_run,
            outcomes,
        };
        log_event!(
            ctx,
            INFO,
            event_names::CONVERT_FINISHED,
            Stage::Write,
            "conversion finished",
            converted = report.converted(),
            skipped = report.skipped(),
            failed = report.failed()
        );
        Ok(report)
    }

    /// Convert a single source.
    pub fn convert_source(&self, path: &Path, output_root: &Path) -> Result<SourceOutcome> {
        let ctx = self.ctx;
        let mode = if self.options.strict {
            ParseMode::Strict
        } else {
            ParseMode::Lenient
        };
        let parsed = read_properties_file(path, mode)?;
        let mut map = parsed.map;

        for line in &parsed.skipped {
            log_event!(
                ctx,
                WARN,
                event_names::CONVERT_LINE_SKIPPED,
                Stage::Parse,
                "line without '=' skipped",
                source = display(path.display()),
                line = line.line_number
            );
        }

        let required = self.profile.required_key.as_str();
        let service = match map.get(required).filter(|v| !v.is_empty()) {
            Some(name) => name.to_string(),
            None => {
                let err = ForgeError::MissingRequiredKey {
                    path: path.to_path_buf(),
                    key: required.to_string(),
                };
                log_event!(
                    ctx,
                    WARN,
                    event_names::CONVERT_SOURCE_SKIPPED,
                    Stage::Parse,
                    err.to_string(),
                    source = display(path.display())
                );
                return Ok(SourceOutcome::Skipped {
                    source: path.to_path_buf(),
                    reason: SkipReason::MissingRequiredKey {
                        key: required.to_string(),
                    },
                });
            }
        };
        validate_service_name(&service)?;

        let mut host_override = None;
        if let Some(rule) = &self.profile.host_override {
            match rule.apply(&mut map) {
                OverrideOutcome::Applied => {
                    let label = format!("{}:{}", rule.host, rule.port);
                    log_event!(
                        ctx,
                        DEBUG,
                        event_names::CONVERT_OVERRIDE,
                        Stage::Convert,
                        "host override applied",
                        property = rule.property.as_str(),
                        target = label.as_str()
                    );
                    host_override = Some(label);
                }
                OverrideOutcome::NoAuthority => {
                    log_event!(
                        ctx,
                        DEBUG,
                        event_names::CONVERT_OVERRIDE,
                        Stage::Convert,
                        "value has no //host fragment; left unchanged",
                        property = rule.property.as_str()
                    );
                }
                OverrideOutcome::Missing => {
                    log_event!(
                        ctx,
                        DEBUG,
                        event_names::CONVERT_OVERRIDE,
                        Stage::Convert,
                        "override property not present",
                        property = rule.property.as_str()
                    );
                }
            }
        }

        let secrets = self.extractor.extract(&mut map);
        let secret_variables: Vec<String> = secrets.variables().map(str::to_string).collect();
        if !secrets.is_empty() {
            log_event!(
                ctx,
                DEBUG,
                event_names::CONVERT_SECRETS_EXTRACTED,
                Stage::Convert,
                format!("{} secret(s) extracted", secrets.len()),
                service = service.as_str(),
                variables = display(secret_variables.join(","))
            );
        }

        let suspicious = suspicious_keys(&map, self.extractor.registry());
        for key in &suspicious {
            log_event!(
                ctx,
                WARN,
                event_names::CONVERT_SUSPICIOUS_KEY,
                Stage::Convert,
                "key looks sensitive but is not registered; value kept in document",
                service = service.as_str(),
                key = key.as_str()
            );
        }

        let document = Document::from_properties(&map)?;
        let yaml = document.to_yaml_string()?;

        let service_dir = output_root.join(&service);
        let document_path = service_dir.join(&self.profile.output_file);
        let secrets_path = if secrets.is_empty() {
            None
        } else {
            Some(service_dir.join(&self.profile.secrets_file))
        };

        if !self.options.dry_run {
            std::fs::create_dir_all(&service_dir).map_err(|e| ForgeError::io(&service_dir, e))?;
            std::fs::write(&document_path, yaml).map_err(|e| ForgeError::io(&document_path, e))?;
            if let Some(env_path) = &secrets_path {
                std::fs::write(env_path, secrets.to_env_file())
                    .map_err(|e| ForgeError::io(env_path, e))?;
            }
        }

        log_event!(
            ctx,
            INFO,
            event_names::CONVERT_SOURCE_DONE,
            Stage::Write,
            format!("{} -> {}", service, self.profile.output_file),
            source = display(path.display()),
            extracted = secrets.len(),
            leaves = document.leaf_count(),
            dry_run = self.options.dry_run
        );

        Ok(SourceOutcome::Converted {
            source: path.to_path_buf(),
            service,
            document_path,
            secrets_path,
            secret_variables,
            skipped_lines: parsed.skipped.len(),
            host_override,
            suspicious_keys: suspicious,
        })
    }
}

/// The service name becomes a directory name; it must stay a single component.
fn validate_service_name(name: &str) -> Result<()> {
    let bad = name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');
    if bad {
        return Err(ForgeError::InvalidServiceName {
            name: name.to_string(),
        });
    }
    Ok(())
}
