//! CLI command handlers.

pub mod config;
pub mod ops;
pub mod shell;
pub mod store;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use console::Style;
use stowage_config::{LoadedConfig, StowageConfig};
use stowage_store::{BackendOptions, RegistryOptions, StoreKind, StoreRegistry};

/// Command-line values that take priority over config files.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Directory holding the user config file.
    pub config_dir: Option<PathBuf>,
    /// Directory for the durable store.
    pub data_dir: Option<PathBuf>,
    /// Namespace for the targeted store.
    pub namespace: Option<String>,
    /// Target the session store.
    pub session: bool,
}

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Merged configuration, with command-line overrides applied.
    pub config: StowageConfig,
    /// Config layers that were checked.
    pub loaded: LoadedConfig,
    /// Explicit user config directory, if given.
    pub config_dir: Option<PathBuf>,
    /// Explicit data directory, if given.
    pub data_dir: Option<PathBuf>,
    /// Store the one-shot commands act on.
    pub target: StoreKind,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Apply overrides to the loaded config and validate the result.
    pub fn new(
        loaded: LoadedConfig,
        overrides: Overrides,
        json_output: bool,
        verbose: bool,
    ) -> Result<Self> {
        let target = if overrides.session {
            StoreKind::Session
        } else {
            StoreKind::Local
        };

        let mut config = loaded.config.clone();
        if let Some(namespace) = overrides.namespace {
            let storage = config.storage.get_or_insert_with(Default::default);
            let section = match target {
                StoreKind::Local => storage.local.get_or_insert_with(Default::default),
                StoreKind::Session => storage.session.get_or_insert_with(Default::default),
            };
            section.namespace = Some(namespace);
        }
        config.validate().context("invalid configuration")?;

        Ok(Self {
            config,
            loaded,
            config_dir: overrides.config_dir,
            data_dir: overrides.data_dir,
            target,
            json_output,
            verbose,
        })
    }

    /// Path of the user config file.
    pub fn user_config_path(&self) -> Option<PathBuf> {
        match &self.config_dir {
            Some(dir) => Some(dir.join("config.toml")),
            None => stowage_config::xdg_config_path(),
        }
    }

    /// Path of the durable database.
    pub fn durable_path(&self) -> PathBuf {
        let storage = self.config.storage();
        match &self.data_dir {
            Some(dir) => dir.join(
                storage
                    .durable_file
                    .as_deref()
                    .unwrap_or(stowage_config::DEFAULT_DURABLE_FILE),
            ),
            None => storage.durable_path(),
        }
    }

    /// Registry settings derived from the config.
    pub fn registry_options(&self) -> RegistryOptions {
        let storage = self.config.storage();
        let local = storage.local();
        let session = storage.session();
        RegistryOptions {
            durable_path: self.durable_path(),
            local: BackendOptions {
                namespace: Some(local.namespace().to_string()),
                quota: local.quota_bytes,
            },
            session: BackendOptions {
                namespace: Some(session.namespace().to_string()),
                quota: session.quota_bytes,
            },
        }
    }

    /// Open both stores.
    pub fn open_registry(&self) -> Result<StoreRegistry> {
        let options = self.registry_options();
        StoreRegistry::open(&options).with_context(|| {
            format!(
                "failed to open store at {}",
                options.durable_path.display()
            )
        })
    }
}

/// Print an error line to stderr.
pub fn print_error(message: &str) {
    let red = Style::new().red();
    eprintln!("{} {}", red.apply_to("Error:"), message);
}

/// Print a dimmed note to stderr.
pub fn print_note(message: &str) {
    let dim = Style::new().dim();
    eprintln!("{}", dim.apply_to(message));
}
