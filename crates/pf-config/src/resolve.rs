//! Configuration file discovery.
//!
//! Resolution order: CLI argument → environment → working directory → XDG → /etc → defaults.

use std::path::{Path, PathBuf};

/// Discovered configuration file path.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    /// Path to the config file (or None when running on defaults).
    pub config: Option<PathBuf>,

    /// Where the path came from.
    pub source: ConfigSource,
}

/// Where a configuration file was found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided via `--config`.
    CliArgument,

    /// Set via `PROPFORGE_CONFIG` or `PROPFORGE_CONFIG_DIR`.
    Environment,

    /// Found in the current working directory.
    WorkingDirectory,

    /// Found in the XDG config directory.
    XdgConfig,

    /// Found in /etc/propforge/.
    SystemConfig,

    /// Using built-in defaults.
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::WorkingDirectory => write!(f, "working directory"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::SystemConfig => write!(f, "system config"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Environment variable holding a config file path.
pub const ENV_CONFIG_PATH: &str = "PROPFORGE_CONFIG";

/// Environment variable holding a directory to search.
pub const ENV_CONFIG_DIR: &str = "PROPFORGE_CONFIG_DIR";

const APP_NAME: &str = "propforge";

/// File names searched in each directory, in order.
const CONFIG_FILENAMES: &[&str] = &["propforge.json", "propforge.toml"];

/// Resolve the configuration file path.
///
/// An explicit CLI path is returned as-is even when it does not exist, so the
/// loader can report it; every other candidate must exist to be selected.
pub fn resolve_config(cli_path: Option<&Path>) -> ConfigPaths {
    if let Some(path) = cli_path {
        return ConfigPaths {
            config: Some(path.to_path_buf()),
            source: ConfigSource::CliArgument,
        };
    }

    if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return found(path, ConfigSource::Environment);
        }
    }

    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        if let Some(path) = find_in_dir(Path::new(&dir)) {
            return found(path, ConfigSource::Environment);
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if let Some(path) = find_in_dir(&cwd) {
            return found(path, ConfigSource::WorkingDirectory);
        }
    }

    if let Some(dir) = xdg_config_dir() {
        if let Some(path) = find_in_dir(&dir) {
            return found(path, ConfigSource::XdgConfig);
        }
    }

    if let Some(path) = find_in_dir(&system_config_dir()) {
        return found(path, ConfigSource::SystemConfig);
    }

    ConfigPaths::default()
}

fn found(path: PathBuf, source: ConfigSource) -> ConfigPaths {
    ConfigPaths {
        config: Some(path),
        source,
    }
}

/// First known config file name present in `dir`.
pub fn find_in_dir(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Get the XDG config directory for propforge.
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Get the system config directory.
pub fn system_config_dir() -> PathBuf {
    PathBuf::from("/etc").join(APP_NAME)
}

/// Default location for `config init`.
pub fn default_config_path() -> PathBuf {
    xdg_config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_FILENAMES[0])
}
