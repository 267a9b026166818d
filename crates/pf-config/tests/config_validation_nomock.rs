//! No-mock configuration loading, resolution and validation tests.
//!
//! Covers:
//! - Loading JSON and TOML files written to a temp directory
//! - Resolution order (CLI > PROPFORGE_CONFIG > PROPFORGE_CONFIG_DIR)
//! - Validation of realistic broken configurations

use pf_config::resolve::{resolve_config, ConfigSource, ENV_CONFIG_DIR, ENV_CONFIG_PATH};
use pf_config::{validate_config, ConfigSnapshot, ForgeConfig, ValidationError};
use std::env;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, OnceLock};
use tempfile::TempDir;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

struct EnvGuard {
    keys: Vec<String>,
    saved: Vec<Option<String>>,
}

impl EnvGuard {
    fn new(keys: &[&str]) -> Self {
        let saved = keys.iter().map(|key| env::var(key).ok()).collect();
        for key in keys {
            env::remove_var(key);
        }
        Self {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            saved,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, saved) in self.keys.iter().zip(&self.saved) {
            match saved {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }
    }
}

fn with_env_lock<T>(f: impl FnOnce() -> T) -> T {
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .expect("env lock poisoned");
    f()
}

fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("write fixture");
    path
}

#[test]
fn test_load_json_file() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "propforge.json",
        r#"{
            "default_profile": "local",
            "sync": { "repositories": ["https://github.com/org/svc-a.git"] }
        }"#,
    );

    let config = ForgeConfig::from_file(&path).unwrap();
    assert_eq!(config.sync.repository_names(), vec!["svc-a".to_string()]);
    assert!(validate_config(&config).is_ok());
}

#[test]
fn test_load_toml_file() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "propforge.toml",
        r#"
            [sync]
            target_dir = "/srv/checkouts"
        "#,
    );

    let config = ForgeConfig::from_file(&path).unwrap();
    assert_eq!(config.sync.target_dir, Path::new("/srv/checkouts"));
    assert_eq!(config.profiles.len(), 2);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = ForgeConfig::from_file(&dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ValidationError::IoError(_)));
    assert_eq!(err.code(), 60);
}

#[test]
fn test_toml_syntax_error_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "propforge.toml", "[sync\nbroken");
    let err = ForgeConfig::from_file(&path).unwrap_err();
    assert_eq!(err.code(), 61);
}

#[test]
fn test_duplicate_variable_names_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "propforge.json",
        r#"{
            "sensitive_keys": [
                {"property": "spring.datasource.password", "variable": "SECRET"},
                {"property": "app.jwt.secret", "variable": "SECRET"}
            ]
        }"#,
    );

    let config = ForgeConfig::from_file(&path).unwrap();
    let err = validate_config(&config).unwrap_err();
    assert!(err.to_string().contains("sensitive_keys"));
}

#[test]
fn test_bad_variable_name_rejected() {
    let config = ForgeConfig::parse_json(
        r#"{"sensitive_keys": [{"property": "a.b", "variable": "9LIVES"}]}"#,
    )
    .unwrap();
    assert!(validate_config(&config).is_err());
}

#[test]
fn test_resolution_cli_beats_env() {
    with_env_lock(|| {
        let _env = EnvGuard::new(&[ENV_CONFIG_PATH, ENV_CONFIG_DIR]);
        let dir = TempDir::new().unwrap();
        let cli = write(dir.path(), "cli.json", "{}");
        let from_env = write(dir.path(), "env.json", "{}");
        env::set_var(ENV_CONFIG_PATH, &from_env);

        let paths = resolve_config(Some(&cli));
        assert_eq!(paths.source, ConfigSource::CliArgument);
        assert_eq!(paths.config.as_deref(), Some(cli.as_path()));
    });
}

#[test]
fn test_resolution_env_path() {
    with_env_lock(|| {
        let _env = EnvGuard::new(&[ENV_CONFIG_PATH, ENV_CONFIG_DIR]);
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "custom.json", "{}");
        env::set_var(ENV_CONFIG_PATH, &path);

        let paths = resolve_config(None);
        assert_eq!(paths.source, ConfigSource::Environment);
        assert_eq!(paths.config.as_deref(), Some(path.as_path()));
    });
}

#[test]
fn test_resolution_env_dir() {
    with_env_lock(|| {
        let _env = EnvGuard::new(&[ENV_CONFIG_PATH, ENV_CONFIG_DIR]);
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "propforge.toml", "");
        env::set_var(ENV_CONFIG_DIR, dir.path());

        let paths = resolve_config(None);
        assert_eq!(paths.source, ConfigSource::Environment);
        assert_eq!(paths.config.as_deref(), Some(path.as_path()));
    });
}

#[test]
fn test_resolution_skips_missing_env_path() {
    with_env_lock(|| {
        let _env = EnvGuard::new(&[ENV_CONFIG_PATH, ENV_CONFIG_DIR]);
        let dir = TempDir::new().unwrap();
        env::set_var(ENV_CONFIG_PATH, dir.path().join("nope.json"));
        let fallback = write(dir.path(), "propforge.json", "{}");
        env::set_var(ENV_CONFIG_DIR, dir.path());

        let paths = resolve_config(None);
        assert_eq!(paths.config.as_deref(), Some(fallback.as_path()));
    });
}

#[test]
fn test_snapshot_hash_tracks_file_content() {
    let dir = TempDir::new().unwrap();
    let a = write(dir.path(), "a.json", r#"{"default_profile": "local"}"#);
    let b = write(dir.path(), "b.json", r#"{"default_profile": "pre"}"#);

    let snap = |path: &Path| {
        let raw = fs::read_to_string(path).unwrap();
        let config = ForgeConfig::parse_json(&raw).unwrap();
        let paths = resolve_config(Some(path));
        ConfigSnapshot::new(&config, &paths, &raw)
    };

    let sa = snap(&a);
    let sb = snap(&b);
    assert!(!sa.matches(&sb));
    assert_eq!(sb.summary.default_profile, "pre");
}

#[test]
fn test_format_follows_extension() {
    let toml = "default_profile = \"pre\"\n";
    let json = r#"{"default_profile": "pre"}"#;

    let from_toml = ForgeConfig::parse_for_path(Path::new("propforge.TOML"), toml).unwrap();
    assert_eq!(from_toml.default_profile, "pre");
    let from_json = ForgeConfig::parse_for_path(Path::new("propforge.json"), json).unwrap();
    assert_eq!(from_json, from_toml);

    // Anything that is not .toml is read as JSON.
    let err = ForgeConfig::parse_for_path(Path::new("propforge.conf"), toml).unwrap_err();
    assert!(matches!(err, ValidationError::ParseError(_)));
}
