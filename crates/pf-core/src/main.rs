//! propforge command-line entry point.
//!
//! - `convert`: property files to YAML documents plus `.env` secrets files
//! - `sync fetch` / `sync publish`: distribute generated files to repositories
//! - `config show|validate|init`: inspect and bootstrap configuration

use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand};
use pf_config::resolve::default_config_path;
use pf_config::CONFIG_SCHEMA_VERSION;
use pf_core::config::{
    load_config, load_config_file, write_default_config, ConfigError, ConfigOptions,
    ResolvedConfig,
};
use pf_core::convert::{ConvertOptions, Converter};
use pf_core::exit_codes::ExitCode;
use pf_core::log_event;
use pf_core::logging::{
    event_names, init_logging, LogConfig, LogContext, LogFormat, LogLevel, Stage,
};
use pf_core::output::{
    print_error, render_conversion, render_sync, to_pretty_json, OutputFormat,
};
use pf_core::sync::RepoManager;
use pf_core::vcs::{DryRunVcs, GitCli, VcsClient};
use pf_core::ForgeError;
use pf_redact::SecretExtractor;

/// propforge - property files to YAML configuration, secrets to .env
#[derive(Parser)]
#[command(name = "propforge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Config file (overrides PROPFORGE_CONFIG and the search path)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "human")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Run everything except writes and version-control commands
    #[arg(long, global = true)]
    dry_run: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert property files to YAML documents and secrets files
    Convert(ConvertArgs),

    /// Distribute generated files to service repositories
    Sync(SyncArgs),

    /// Configuration management
    Config(ConfigArgs),

    /// Print version information
    Version,
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Conversion profile (defaults to the config's default_profile)
    #[arg(long, short = 'p')]
    profile: Option<String>,

    /// Directory containing the property sources
    #[arg(long, default_value = ".")]
    input_dir: PathBuf,

    /// Directory receiving one folder per service
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Fail a source on lines without '=' instead of skipping them
    #[arg(long)]
    strict: bool,
}

#[derive(Args, Debug)]
struct SyncArgs {
    #[command(subcommand)]
    command: SyncCommands,
}

#[derive(Subcommand, Debug)]
enum SyncCommands {
    /// Clone missing repositories and copy generated files into them
    Fetch(FetchArgs),

    /// Pull, stage, commit and push each local repository
    Publish(PublishArgs),
}

#[derive(Args, Debug)]
struct FetchArgs {
    /// Only these repositories (repeatable)
    #[arg(long = "repo")]
    repos: Vec<String>,

    /// Directory holding the repository checkouts
    #[arg(long)]
    target_dir: Option<PathBuf>,

    /// Directory holding one generated folder per service
    #[arg(long)]
    source_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct PublishArgs {
    /// Only these repositories (repeatable)
    #[arg(long = "repo")]
    repos: Vec<String>,

    /// Directory holding the repository checkouts
    #[arg(long)]
    target_dir: Option<PathBuf>,

    /// Commit message
    #[arg(long, short = 'm')]
    message: Option<String>,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show the resolved configuration and where it came from
    Show,

    /// Validate a config file (or the resolved one)
    Validate {
        /// File to validate
        path: Option<PathBuf>,
    },

    /// Write the built-in defaults to a config file
    Init {
        /// Destination (defaults to the user config directory)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::Clean,
                _ => ExitCode::ArgsError,
            };
            let _ = e.print();
            std::process::exit(code.as_i32());
        }
    };

    let cli_level = if cli.global.quiet || cli.global.verbose > 0 {
        Some(LogLevel::from_verbosity(cli.global.verbose, cli.global.quiet))
    } else {
        None
    };
    // Machine-readable stdout pairs with machine-readable stderr.
    let cli_format = match cli.global.format {
        OutputFormat::Json => Some(LogFormat::Jsonl),
        OutputFormat::Human => None,
    };
    init_logging(&LogConfig::from_env(cli_level, cli_format));

    let exit_code = match &cli.command {
        Commands::Convert(args) => run_convert(&cli.global, args),
        Commands::Sync(args) => match &args.command {
            SyncCommands::Fetch(fetch) => run_sync_fetch(&cli.global, fetch),
            SyncCommands::Publish(publish) => run_sync_publish(&cli.global, publish),
        },
        Commands::Config(args) => match &args.command {
            ConfigCommands::Show => run_config_show(&cli.global),
            ConfigCommands::Validate { path } => run_config_validate(&cli.global, path.as_ref()),
            ConfigCommands::Init { path, force } => {
                run_config_init(&cli.global, path.as_ref(), *force)
            }
        },
        Commands::Version => {
            print_version(&cli.global);
            ExitCode::Clean
        }
    };

    std::process::exit(exit_code.as_i32());
}

// ============================================================================
// Command implementations
// ============================================================================

fn load(global: &GlobalOpts, ctx: &LogContext) -> Result<ResolvedConfig, ExitCode> {
    let options = ConfigOptions {
        config_path: global.config.clone(),
    };
    match load_config(&options) {
        Ok(resolved) => {
            if resolved.using_defaults() {
                log_event!(
                    ctx,
                    DEBUG,
                    event_names::CONFIG_DEFAULT_USED,
                    Stage::Init,
                    "no config file found; using built-in defaults"
                );
            } else {
                log_event!(
                    ctx,
                    DEBUG,
                    event_names::CONFIG_LOADED,
                    Stage::Init,
                    "config loaded",
                    source = display(resolved.paths.source),
                    path = display(
                        resolved
                            .paths
                            .config
                            .as_ref()
                            .map(|p| p.display().to_string())
                            .unwrap_or_default()
                    )
                );
            }
            Ok(resolved)
        }
        Err(e) => Err(output_config_error(global, ctx, &e)),
    }
}

fn run_convert(global: &GlobalOpts, args: &ConvertArgs) -> ExitCode {
    let ctx = LogContext::for_command("convert");
    log_event!(ctx, DEBUG, event_names::RUN_STARTED, Stage::Init, "run started");

    let resolved = match load(global, &ctx) {
        Ok(r) => r,
        Err(code) => return code,
    };
    let config = &resolved.config;

    let profile_name = args
        .profile
        .clone()
        .unwrap_or_else(|| config.default_profile.clone());
    let Some(profile) = config.profile(&profile_name) else {
        let message = format!(
            "unknown profile '{}' (available: {})",
            profile_name,
            config.profile_names().join(", ")
        );
        print_error(global.format, 10, "unknown_profile", &message, ExitCode::ArgsError);
        return ExitCode::ArgsError;
    };

    let extractor = match SecretExtractor::new(config.sensitive_keys.clone()) {
        Ok(x) => x,
        Err(e) => return output_forge_error(global, &ForgeError::from(e)),
    };

    let options = ConvertOptions {
        dry_run: global.dry_run,
        strict: args.strict,
    };
    let converter = Converter::new(&profile_name, profile, &extractor, options, &ctx);
    let report = match converter.convert_all(&args.input_dir, &args.output_dir) {
        Ok(report) => report,
        Err(e) => return output_forge_error(global, &e),
    };

    match global.format {
        OutputFormat::Json => println!("{}", to_pretty_json(&report)),
        OutputFormat::Human => print!("{}", render_conversion(&report)),
    }

    let code = report.exit_code();
    log_event!(
        ctx,
        DEBUG,
        event_names::RUN_FINISHED,
        Stage::Write,
        "run finished",
        exit_code = code.as_i32()
    );
    code
}

fn run_sync_fetch(global: &GlobalOpts, args: &FetchArgs) -> ExitCode {
    let ctx = LogContext::for_command("sync fetch");
    let resolved = match load(global, &ctx) {
        Ok(r) => r,
        Err(code) => return code,
    };

    let mut sync = resolved.config.sync;
    if let Some(dir) = &args.target_dir {
        sync.target_dir = dir.clone();
    }
    if let Some(dir) = &args.source_dir {
        sync.source_dir = dir.clone();
    }

    let git;
    let dry;
    let vcs: &dyn VcsClient = if global.dry_run {
        dry = DryRunVcs::new(sync.git_program.clone());
        &dry
    } else {
        git = GitCli::new(sync.git_program.clone());
        &git
    };

    let manager = RepoManager::new(vcs, sync, &ctx).dry_run(global.dry_run);
    match manager.fetch(&args.repos) {
        Ok(report) => {
            match global.format {
                OutputFormat::Json => println!("{}", to_pretty_json(&report)),
                OutputFormat::Human => print!("{}", render_sync(&report)),
            }
            report.exit_code()
        }
        Err(e) => output_forge_error(global, &e),
    }
}

fn run_sync_publish(global: &GlobalOpts, args: &PublishArgs) -> ExitCode {
    let ctx = LogContext::for_command("sync publish");
    let resolved = match load(global, &ctx) {
        Ok(r) => r,
        Err(code) => return code,
    };

    let mut sync = resolved.config.sync;
    if let Some(dir) = &args.target_dir {
        sync.target_dir = dir.clone();
    }
    if let Some(message) = &args.message {
        sync.commit_message = message.clone();
    }

    let git;
    let dry;
    let vcs: &dyn VcsClient = if global.dry_run {
        dry = DryRunVcs::new(sync.git_program.clone());
        &dry
    } else {
        git = GitCli::new(sync.git_program.clone());
        &git
    };

    let manager = RepoManager::new(vcs, sync, &ctx).dry_run(global.dry_run);
    match manager.publish(&args.repos) {
        Ok(report) => {
            match global.format {
                OutputFormat::Json => println!("{}", to_pretty_json(&report)),
                OutputFormat::Human => print!("{}", render_sync(&report)),
            }
            report.exit_code()
        }
        Err(e) => output_forge_error(global, &e),
    }
}

fn run_config_show(global: &GlobalOpts) -> ExitCode {
    let ctx = LogContext::for_command("config show");
    let resolved = match load(global, &ctx) {
        Ok(r) => r,
        Err(code) => return code,
    };
    let snapshot = resolved.snapshot();

    match global.format {
        OutputFormat::Json => {
            let response = serde_json::json!({
                "schema_version": CONFIG_SCHEMA_VERSION,
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "source": {
                    "path": snapshot.config_path,
                    "kind": resolved.paths.source.to_string(),
                    "hash": snapshot.config_hash,
                    "using_defaults": resolved.using_defaults(),
                },
                "config": resolved.config,
            });
            println!("{}", to_pretty_json(&response));
        }
        OutputFormat::Human => {
            println!("# propforge configuration");
            println!();
            match &snapshot.config_path {
                Some(path) => println!("file:     {} ({})", path, resolved.paths.source),
                None => println!("file:     none (built-in defaults)"),
            }
            println!("hash:     {}", snapshot.short_id());
            println!("profiles: {}", snapshot.summary.profiles.join(", "));
            println!("default:  {}", snapshot.summary.default_profile);
            println!("secrets:  {}", snapshot.summary.sensitive_variables.join(", "));
            println!(
                "repos:    {} under {}",
                snapshot.summary.repository_count, snapshot.summary.target_dir
            );
        }
    }
    ExitCode::Clean
}

fn run_config_validate(global: &GlobalOpts, path: Option<&PathBuf>) -> ExitCode {
    let ctx = LogContext::for_command("config validate");

    let described = match path {
        Some(path) => match load_config_file(path) {
            Ok(_) => path.display().to_string(),
            Err(e) => return output_config_error(global, &ctx, &e),
        },
        None => match load(global, &ctx) {
            Ok(resolved) => resolved
                .paths
                .config
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "built-in defaults".to_string()),
            Err(code) => return code,
        },
    };

    match global.format {
        OutputFormat::Json => {
            let response = serde_json::json!({
                "status": "ok",
                "path": described,
            });
            println!("{}", to_pretty_json(&response));
        }
        OutputFormat::Human => println!("✓ {} is valid", described),
    }
    ExitCode::Clean
}

fn run_config_init(global: &GlobalOpts, path: Option<&PathBuf>, force: bool) -> ExitCode {
    let ctx = LogContext::for_command("config init");
    let path = path.cloned().unwrap_or_else(default_config_path);

    if global.dry_run {
        println!("would write default config to {}", path.display());
        return ExitCode::Clean;
    }
    if let Err(e) = write_default_config(&path, force) {
        return output_config_error(global, &ctx, &e);
    }

    match global.format {
        OutputFormat::Json => {
            let response = serde_json::json!({
                "status": "ok",
                "path": path.display().to_string(),
            });
            println!("{}", to_pretty_json(&response));
        }
        OutputFormat::Human => println!("wrote default config to {}", path.display()),
    }
    ExitCode::Clean
}

fn print_version(global: &GlobalOpts) {
    match global.format {
        OutputFormat::Json => {
            let version_info = serde_json::json!({
                "version": env!("CARGO_PKG_VERSION"),
                "config_schema_version": CONFIG_SCHEMA_VERSION,
                "rust_version": env!("CARGO_PKG_RUST_VERSION"),
            });
            println!("{}", to_pretty_json(&version_info));
        }
        OutputFormat::Human => {
            println!("propforge {}", env!("CARGO_PKG_VERSION"));
            println!("config schema version: {}", CONFIG_SCHEMA_VERSION);
        }
    }
}

// ============================================================================
// Error output
// ============================================================================

fn output_config_error(global: &GlobalOpts, ctx: &LogContext, error: &ConfigError) -> ExitCode {
    log_event!(
        ctx,
        DEBUG,
        event_names::CONFIG_ERROR,
        Stage::Init,
        error.to_string(),
        code = error.code()
    );
    let exit = error.exit_code();
    print_error(global.format, error.code(), "config", &error.to_string(), exit);
    exit
}

fn output_forge_error(global: &GlobalOpts, error: &ForgeError) -> ExitCode {
    let exit = error.exit_code();
    let code = match error {
        ForgeError::Config(e) => e.code(),
        _ => exit.as_i32() as u32,
    };
    print_error(global.format, code, error.kind(), &error.to_string(), exit);
    exit
}
