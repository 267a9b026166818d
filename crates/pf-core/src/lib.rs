//! propforge core library
//!
//! This library provides:
//! - Property file parsing and dotted-key to nested-document conversion
//! - The conversion pipeline (host override, secret extraction, file output)
//! - Repository sync through a version-control client abstraction
//! - Exit codes, configuration loading and structured logging for the CLI
//!
//! The binary entry point is in `main.rs`.

pub mod config;
pub mod convert;
pub mod document;
pub mod error;
pub mod exit_codes;
pub mod logging;
pub mod output;
pub mod properties;
pub mod sync;
pub mod vcs;

pub use error::{ForgeError, Result};
