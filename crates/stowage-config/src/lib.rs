//! Configuration system for Stowage.
//!
//! Provides TOML-based configuration with:
//! - Durable store location (`[storage]`)
//! - Per-store namespace and quota (`[storage.local]`, `[storage.session]`)
//! - Logging level and file output (`[logging]`)
//! - Config file layering (XDG user config + project-local overrides)

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigSource, LoadedConfig, load_config, load_config_file, load_config_with_options,
    project_config_path, save_config, xdg_config_dir, xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
