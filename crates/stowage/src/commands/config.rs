//! Config command - configuration management.

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use console::{Style, style};

use stowage_config::StowageConfig;

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved configuration
    Show,

    /// Show which config files are loaded and their precedence
    Which,

    /// Initialize a config file with defaults
    Init {
        /// Create project-local config (./stowage.toml) instead of user config
        #[arg(long)]
        local: bool,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show configuration file path
    Path,
}

/// Run the config command.
pub fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Which => cmd_which(ctx),
        ConfigCommand::Init { local, force } => cmd_init(ctx, local, force),
        ConfigCommand::Path => cmd_path(ctx),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let storage = ctx.config.storage();
    let local = storage.local();
    let session = storage.session();
    let logging = ctx.config.logging();

    if ctx.json_output {
        let resolved = serde_json::json!({
            "durable_path": ctx.durable_path(),
            "local": { "namespace": local.namespace(), "quota_bytes": local.quota_bytes },
            "session": { "namespace": session.namespace(), "quota_bytes": session.quota_bytes },
            "logging": { "level": logging.level(), "file": logging.file_enabled() },
        });
        println!("{}", serde_json::to_string_pretty(&resolved)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    println!("{}", style("Stowage Configuration").bold());
    println!("{}", dim.apply_to("─".repeat(40)));

    let sources = ctx.loaded.loaded_from();
    if sources.is_empty() {
        println!("No config files loaded (using defaults)");
    } else {
        println!("Config files:");
        for source in &sources {
            println!("  {}", source.display());
        }
    }
    println!();

    println!("Durable store:  {}", ctx.durable_path().display());
    println!(
        "  local:   namespace={} quota={}",
        local.namespace(),
        quota_label(local.quota_bytes)
    );
    println!(
        "  session: namespace={} quota={}",
        session.namespace(),
        quota_label(session.quota_bytes)
    );
    println!(
        "Logging:  level={} file={}",
        logging.level(),
        logging.file_enabled()
    );

    if !ctx.loaded.warnings.is_empty() {
        println!();
        println!("Warnings:");
        for w in &ctx.loaded.warnings {
            println!("  ⚠ {}", w);
        }
    }

    if ctx.verbose {
        println!("\n---\nRaw config:\n");
        println!("{}", ctx.config.to_toml()?);
    }

    Ok(())
}

fn cmd_which(ctx: &Context) -> Result<()> {
    println!("Config file search order (later overrides earlier):\n");
    for source in &ctx.loaded.sources {
        let status = if source.loaded {
            "✓ loaded"
        } else {
            "· not found"
        };
        println!("  {} {}", status, source.path.display());
    }
    Ok(())
}

fn cmd_init(ctx: &Context, local: bool, force: bool) -> Result<()> {
    let path = if local {
        stowage_config::project_config_path(&std::env::current_dir()?)
    } else {
        match ctx.user_config_path() {
            Some(path) => path,
            None => bail!("could not determine user config directory"),
        }
    };

    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    stowage_config::save_config(&StowageConfig::with_defaults(), &path)?;

    let green = Style::new().green();
    println!("{} Wrote {}", green.apply_to("✓"), path.display());
    Ok(())
}

fn cmd_path(ctx: &Context) -> Result<()> {
    match ctx.user_config_path() {
        Some(path) => println!("{}", path.display()),
        None => bail!("could not determine user config directory"),
    }
    Ok(())
}

fn quota_label(quota: Option<usize>) -> String {
    match quota {
        Some(bytes) => format!("{} bytes", bytes),
        None => "unbounded".to_string(),
    }
}
