//! Stowage - namespaced key-value storage with expiry
//!
//! Main entry point for the Stowage CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{config, shell, store};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Stowage - namespaced key-value storage with expiry
#[derive(Parser)]
#[command(name = "stowage")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Directory holding the user config file
    #[arg(long, global = true, env = "STOWAGE_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// Directory holding the durable store
    #[arg(long, global = true, env = "STOWAGE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Namespace to operate in (overrides config)
    #[arg(short, long, global = true)]
    pub namespace: Option<String>,

    /// Target the session store instead of the durable one
    #[arg(long, global = true)]
    pub session: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store a value (parsed as JSON, else kept as a string)
    Set(store::SetArgs),

    /// Read a value
    Get(store::GetArgs),

    /// Remove a key
    #[command(alias = "remove")]
    Rm(store::KeyArgs),

    /// Check whether a record is physically stored
    Has(store::KeyArgs),

    /// List the keys in the namespace
    Keys,

    /// Show every live value in the namespace
    All,

    /// Delete expired and unreadable records
    Prune,

    /// Show how much space the namespace uses
    Size,

    /// Delete every key in the namespace
    Clear,

    /// Configuration management
    Config(config::ConfigArgs),

    /// Interactive shell with both stores open
    Shell,
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded =
        stowage_config::load_config_with_options(None, cli.config_dir.as_deref())?;
    let logging = loaded.config.logging();

    // Initialize tracing: console (stderr, human-readable) + rotating JSON file
    let filter = if cli.verbose {
        "stowage=debug,stowage_store=debug,stowage_config=debug,warn".to_string()
    } else {
        let level = logging.level().to_ascii_lowercase();
        format!("stowage={level},stowage_store={level},stowage_config={level},warn")
    };

    let log_dir = cli
        .config_dir
        .clone()
        .or_else(stowage_config::xdg_config_dir)
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));

    use tracing_subscriber::prelude::*;
    let (file_layer, _guard) = if logging.file_enabled() {
        let file_appender = tracing_appender::rolling::daily(&log_dir, "stowage.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(non_blocking)
            .with_filter(tracing_subscriber::EnvFilter::new(
                "stowage=trace,stowage_store=trace,stowage_config=trace,info",
            ));
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(file_layer)
        .init();

    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }

    // Create context for commands
    let ctx = commands::Context::new(
        loaded,
        commands::Overrides {
            config_dir: cli.config_dir,
            data_dir: cli.data_dir,
            namespace: cli.namespace,
            session: cli.session,
        },
        cli.json,
        cli.verbose,
    )?;

    // Dispatch to command handlers
    match cli.command {
        Commands::Set(args) => store::set(args, &ctx),
        Commands::Get(args) => store::get(args, &ctx),
        Commands::Rm(args) => store::remove(args, &ctx),
        Commands::Has(args) => store::has(args, &ctx),
        Commands::Keys => store::keys(&ctx),
        Commands::All => store::all(&ctx),
        Commands::Prune => store::prune(&ctx),
        Commands::Size => store::size(&ctx),
        Commands::Clear => store::clear(&ctx),
        Commands::Config(args) => config::run(args, &ctx),
        Commands::Shell => shell::run(&ctx),
    }
}
