//! Structured logging for propforge.
//!
//! Provides dual-mode logging:
//! - Human-readable console output for interactive use
//! - Machine-parseable JSONL when `--format json` or `PROPFORGE_LOG_FORMAT=jsonl`
//!
//! # Usage
//!
//! ```ignore
//! use pf_core::log_event;
//! use pf_core::logging::{event_names, init_logging, LogConfig, LogContext, Stage};
//!
//! init_logging(&LogConfig::from_env(None, None));
//! let ctx = LogContext::for_command("convert");
//! log_event!(ctx, INFO, event_names::CONVERT_STARTED, Stage::Init, "starting", profile = "local");
//! ```
//!
//! stdout is reserved for command output; all logs go to stderr. Secret
//! values are never passed to the logger, only variable names and counts.

pub mod config;
pub mod events;
pub mod layer;

pub use config::{LogConfig, LogFormat, LogLevel};
pub use events::{event_names, Level, LogContext, Stage};
pub use layer::JsonlLayer;

use std::io::IsTerminal;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::fmt;

/// Initialize the logging subsystem.
///
/// Call once at startup. A second call is ignored.
pub fn init_logging(config: &LogConfig) {
    let filter = LevelFilter::from(config.level);

    match config.format {
        LogFormat::Human => {
            let use_ansi = std::io::stderr().is_terminal();
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(use_ansi);

            if config.timestamps {
                let _ = tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer)
                    .try_init();
            } else {
                let _ = tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer.without_time())
                    .try_init();
            }
        }
        LogFormat::Jsonl => {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(JsonlLayer::stderr())
                .try_init();
        }
    }
}

/// Generate a unique run ID for this invocation.
pub fn generate_run_id() -> String {
    let uuid = uuid::Uuid::new_v4();
    format!("run-{}", &uuid.simple().to_string()[..12])
}

/// Structured event logging with context.
///
/// ```ignore
/// log_event!(ctx, INFO, "convert.started", Stage::Init, "Starting conversion");
/// log_event!(ctx, DEBUG, "convert.override", Stage::Convert, "Override applied",
///     property = "spring.datasource.url");
/// ```
#[macro_export]
macro_rules! log_event {
    ($ctx:expr, INFO, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        tracing::info!(
            target: $event,
            run_id = %$ctx.run_id,
            command = %$ctx.command,
            stage = %$stage,
            $($key = $val,)*
            "{}", $msg
        )
    };
    ($ctx:expr, DEBUG, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        tracing::debug!(
            target: $event,
            run_id = %$ctx.run_id,
            command = %$ctx.command,
            stage = %$stage,
            $($key = $val,)*
            "{}", $msg
        )
    };
    ($ctx:expr, WARN, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        tracing::warn!(
            target: $event,
            run_id = %$ctx.run_id,
            command = %$ctx.command,
            stage = %$stage,
            $($key = $val,)*
            "{}", $msg
        )
    };
    ($ctx:expr, ERROR, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        tracing::error!(
            target: $event,
            run_id = %$ctx.run_id,
            command = %$ctx.command,
            stage = %$stage,
            $($key = $val,)*
            "{}", $msg
        )
    };
}
