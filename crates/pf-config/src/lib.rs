//! propforge configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for `propforge.json` / `propforge.toml`
//! - Config resolution (CLI → env → working dir → XDG → system → defaults)
//! - Semantic validation
//! - Config snapshots for `config show`

pub mod forge;
pub mod resolve;
pub mod snapshot;
pub mod validate;

pub use forge::{repo_name_from_url, ForgeConfig, Profile, SyncConfig};
pub use resolve::{resolve_config, ConfigPaths, ConfigSource};
pub use snapshot::ConfigSnapshot;
pub use validate::{validate_config, ValidationError, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
