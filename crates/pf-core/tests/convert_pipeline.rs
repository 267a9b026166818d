//! End-to-end conversion over temporary directories.
//!
//! Covers the batch behaviour: several services at once, secrets kept out
//! of documents, `.env` only when something was extracted, and one bad
//! source not blocking the rest.

use std::fs;
use std::path::Path;

use pf_config::{ForgeConfig, Profile};
use pf_core::convert::{ConvertOptions, Converter, SourceOutcome};
use pf_core::exit_codes::ExitCode;
use pf_core::logging::LogContext;
use pf_redact::{SecretExtractor, SensitiveKey, SensitiveKeyRegistry};
use tempfile::TempDir;

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

fn yaml(path: &Path) -> serde_yaml::Value {
    serde_yaml::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

struct Fixture {
    input: TempDir,
    output: TempDir,
    config: ForgeConfig,
    ctx: LogContext,
}

impl Fixture {
    fn new() -> Self {
        Self {
            input: TempDir::new().unwrap(),
            output: TempDir::new().unwrap(),
            config: ForgeConfig::default(),
            ctx: LogContext::new("run-pipeline", "convert"),
        }
    }

    fn run(&self, profile: &str, options: ConvertOptions) -> pf_core::convert::ConversionReport {
        let extractor = SecretExtractor::new(self.config.sensitive_keys.clone()).unwrap();
        let converter = Converter::new(
            profile,
            self.config.profile(profile).unwrap(),
            &extractor,
            options,
            &self.ctx,
        );
        converter
            .convert_all(self.input.path(), self.output.path())
            .unwrap()
    }
}

#[test]
fn converts_every_matching_source() {
    let fx = Fixture::new();
    write(
        fx.input.path(),
        "users---application.properties",
        "# users service\n\
         spring.application.name=lm-users\n\
         server.port=8081\n\
         spring.datasource.url=jdbc:postgresql://localhost:5432/users\n\
         spring.datasource.username=admin\n\
         spring.datasource.password=p@ss=word\n",
    );
    write(
        fx.input.path(),
        "issues---application.properties",
        "spring.application.name=lm-issues\nserver.port=8082\n",
    );
    write(fx.input.path(), "README.md", "not a source");

    let report = fx.run("local", ConvertOptions::default());
    assert_eq!(report.converted(), 2);
    assert_eq!(report.exit_code(), ExitCode::Clean);

    let users_dir = fx.output.path().join("lm-users");
    let doc = yaml(&users_dir.join("application-local.yml"));
    assert_eq!(doc["server"]["port"].as_str(), Some("8081"));
    assert_eq!(
        doc["spring"]["datasource"]["password"].as_str(),
        Some("${DB_PASSWORD}")
    );
    assert_eq!(
        doc["spring"]["datasource"]["url"].as_str(),
        Some("jdbc:postgresql://localhost:5432/users")
    );

    let env = fs::read_to_string(users_dir.join(".env")).unwrap();
    assert_eq!(env, "DB_USERNAME=admin\nDB_PASSWORD=p@ss=word\n");

    let rendered = fs::read_to_string(users_dir.join("application-local.yml")).unwrap();
    assert!(!rendered.contains("p@ss=word"));
    assert!(!rendered.contains("admin"));

    // No secrets, no .env.
    let issues_dir = fx.output.path().join("lm-issues");
    assert!(issues_dir.join("application-local.yml").is_file());
    assert!(!issues_dir.join(".env").exists());
}

#[test]
fn document_keeps_first_seen_order() {
    let fx = Fixture::new();
    write(
        fx.input.path(),
        "a---application.properties",
        "spring.application.name=lm-a\n\
         server.port=1\n\
         spring.profiles.active=local\n\
         logging.level.root=INFO\n",
    );

    fx.run("local", ConvertOptions::default());
    let text = fs::read_to_string(fx.output.path().join("lm-a/application-local.yml")).unwrap();

    let spring = text.find("spring:").unwrap();
    let server = text.find("server:").unwrap();
    let logging = text.find("logging:").unwrap();
    assert!(spring < server && server < logging);
}

#[test]
fn missing_service_name_skips_without_output() {
    let fx = Fixture::new();
    write(
        fx.input.path(),
        "orphan---application.properties",
        "server.port=9000\n",
    );
    write(
        fx.input.path(),
        "users---application.properties",
        "spring.application.name=lm-users\n",
    );

    let report = fx.run("local", ConvertOptions::default());
    assert_eq!(report.skipped(), 1);
    assert_eq!(report.converted(), 1);
    assert_eq!(report.exit_code(), ExitCode::SkippedSources);

    let dirs: Vec<_> = fs::read_dir(fx.output.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(dirs, vec!["lm-users"]);
}

#[test]
fn conflicting_keys_fail_one_source_only() {
    let fx = Fixture::new();
    write(
        fx.input.path(),
        "bad---application.properties",
        "spring.application.name=lm-bad\napp=1\napp.name=x\n",
    );
    write(
        fx.input.path(),
        "good---application.properties",
        "spring.application.name=lm-good\n",
    );

    let report = fx.run("local", ConvertOptions::default());
    assert_eq!(report.failed(), 1);
    assert_eq!(report.exit_code(), ExitCode::PartialFail);

    let failed = report
        .outcomes
        .iter()
        .find(|o| matches!(o, SourceOutcome::Failed { .. }))
        .unwrap();
    match failed {
        SourceOutcome::Failed { kind, .. } => assert_eq!(kind, "conflicting_key_path"),
        _ => unreachable!(),
    }
    assert!(!fx.output.path().join("lm-bad").exists());
    assert!(fx.output.path().join("lm-good").is_dir());
}

#[test]
fn pre_profile_reads_only_audit_and_rewrites_host() {
    let fx = Fixture::new();
    write(
        fx.input.path(),
        "audit---application.properties",
        "spring.application.name=lm-audit\n\
         spring.datasource.url=jdbc:postgresql://localhost:5432/audit\n\
         spring.datasource.password=pw\n",
    );
    write(
        fx.input.path(),
        "users---application.properties",
        "spring.application.name=lm-users\n",
    );

    let report = fx.run("pre", ConvertOptions::default());
    assert_eq!(report.outcomes.len(), 1);

    let doc = yaml(&fx.output.path().join("lm-audit/application-pre.yml"));
    assert_eq!(
        doc["spring"]["datasource"]["url"].as_str(),
        Some("jdbc:postgresql://postgres-pre:5432/audit")
    );
    let env = fs::read_to_string(fx.output.path().join("lm-audit/.env")).unwrap();
    assert_eq!(env, "DB_PASSWORD=pw\n");
}

#[test]
fn custom_registry_and_profile() {
    let mut fx = Fixture::new();
    fx.config.sensitive_keys =
        SensitiveKeyRegistry::new(vec![SensitiveKey::new("mail.smtp.password", "SMTP_PASSWORD")]);
    fx.config.profiles.insert(
        "staging".to_string(),
        Profile::new("*.properties", "application-staging.yml"),
    );
    write(
        fx.input.path(),
        "notifications.properties",
        "spring.application.name=lm-notifications\n\
         mail.smtp.password=hunter2\n\
         spring.datasource.password=kept\n",
    );

    let report = fx.run("staging", ConvertOptions::default());
    let SourceOutcome::Converted {
        secret_variables,
        suspicious_keys,
        ..
    } = &report.outcomes[0]
    else {
        panic!("expected conversion");
    };
    assert_eq!(secret_variables, &vec!["SMTP_PASSWORD".to_string()]);
    // Looks like a credential but the custom registry does not list it.
    assert_eq!(suspicious_keys, &vec!["spring.datasource.password".to_string()]);

    let doc = yaml(
        &fx.output
            .path()
            .join("lm-notifications/application-staging.yml"),
    );
    assert_eq!(doc["mail"]["smtp"]["password"].as_str(), Some("${SMTP_PASSWORD}"));
}

#[test]
fn empty_input_is_nothing_to_do() {
    let fx = Fixture::new();
    let report = fx.run("local", ConvertOptions::default());
    assert!(report.outcomes.is_empty());
    assert_eq!(report.exit_code(), ExitCode::NothingToDo);
}

#[test]
fn converting_twice_gives_identical_documents() {
    let fx = Fixture::new();
    write(
        fx.input.path(),
        "catalog---application.properties",
        "spring.application.name=lm-catalog\n\
         server.port=8090\n\
         spring.jpa.hibernate.ddl-auto=update\n\
         app.greeting=¡Hola!\n",
    );
    let document = fx.output.path().join("lm-catalog/application-local.yml");

    fx.run("local", ConvertOptions::default());
    let first = fs::read(&document).unwrap();
    fx.run("local", ConvertOptions::default());
    let second = fs::read(&document).unwrap();

    assert_eq!(first, second);
    assert!(!fx.output.path().join("lm-catalog/.env").exists());
}

const USERS_SOURCE: &str = "spring.application.name=lm-users\n\
                            spring.datasource.username=admin\n\
                            spring.datasource.password=secret123";

#[test]
fn builtin_registry_extracts_username_and_password() {
    let fx = Fixture::new();
    write(fx.input.path(), "users---application.properties", USERS_SOURCE);

    fx.run("local", ConvertOptions::default());
    let users = fx.output.path().join("lm-users");
    let doc = yaml(&users.join("application-local.yml"));

    assert_eq!(doc["spring"]["application"]["name"].as_str(), Some("lm-users"));
    assert_eq!(
        doc["spring"]["datasource"]["username"].as_str(),
        Some("${DB_USERNAME}")
    );
    assert_eq!(
        doc["spring"]["datasource"]["password"].as_str(),
        Some("${DB_PASSWORD}")
    );
    assert_eq!(
        fs::read_to_string(users.join(".env")).unwrap(),
        "DB_USERNAME=admin\nDB_PASSWORD=secret123\n"
    );
}

#[test]
fn password_only_registry_keeps_username_in_document() {
    let mut fx = Fixture::new();
    fx.config.sensitive_keys = SensitiveKeyRegistry::new(vec![SensitiveKey::new(
        "spring.datasource.password",
        "DB_PASSWORD",
    )]);
    write(fx.input.path(), "users---application.properties", USERS_SOURCE);

    let report = fx.run("local", ConvertOptions::default());
    assert_eq!(report.exit_code(), ExitCode::Clean);

    let users = fx.output.path().join("lm-users");
    let doc = yaml(&users.join("application-local.yml"));
    assert_eq!(doc["spring"]["application"]["name"].as_str(), Some("lm-users"));
    assert_eq!(doc["spring"]["datasource"]["username"].as_str(), Some("admin"));
    assert_eq!(
        doc["spring"]["datasource"]["password"].as_str(),
        Some("${DB_PASSWORD}")
    );
    assert_eq!(
        fs::read_to_string(users.join(".env")).unwrap(),
        "DB_PASSWORD=secret123\n"
    );
}
