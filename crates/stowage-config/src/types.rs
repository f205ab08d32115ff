//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [storage]
//! data_dir = "~/.local/share/stowage"
//! durable_file = "local.db"
//!
//! [storage.local]
//! namespace = "app"
//! quota_bytes = 5242880
//!
//! [storage.session]
//! namespace = "app"
//!
//! [logging]
//! level = "info"
//! file = true
//! ```
//!
//! # Environment Variables
//!
//! - `STOWAGE_DATA_DIR` - Override the directory holding the durable store

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

/// Default namespace for both stores.
pub const DEFAULT_NAMESPACE: &str = "app";

/// Default file name of the durable database.
pub const DEFAULT_DURABLE_FILE: &str = "local.db";

/// Default console log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "STOWAGE_DATA_DIR";

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StowageConfig {
    /// Storage locations and per-store settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageConfig>,

    /// Logging settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

impl StowageConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// A configuration with every default spelled out, for `config init`.
    pub fn with_defaults() -> Self {
        Self {
            storage: Some(StorageConfig {
                data_dir: None,
                durable_file: Some(DEFAULT_DURABLE_FILE.to_string()),
                local: Some(StoreSection {
                    namespace: Some(DEFAULT_NAMESPACE.to_string()),
                    quota_bytes: None,
                }),
                session: Some(StoreSection {
                    namespace: Some(DEFAULT_NAMESPACE.to_string()),
                    quota_bytes: None,
                }),
            }),
            logging: Some(LoggingConfig {
                level: Some(DEFAULT_LOG_LEVEL.to_string()),
                file: Some(true),
            }),
        }
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: StowageConfig) {
        merge_section(&mut self.storage, other.storage, StorageConfig::merge);
        merge_section(&mut self.logging, other.logging, LoggingConfig::merge);
    }

    /// Storage section, or defaults.
    pub fn storage(&self) -> StorageConfig {
        self.storage.clone().unwrap_or_default()
    }

    /// Logging section, or defaults.
    pub fn logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }

    /// Check every present value.
    pub fn validate(&self) -> Result<()> {
        let storage = self.storage();
        if let Some(local) = &storage.local {
            local.validate("storage.local")?;
        }
        if let Some(session) = &storage.session {
            session.validate("storage.session")?;
        }
        if let Some(file) = &storage.durable_file
            && file.trim().is_empty()
        {
            return Err(invalid("storage.durable_file", "must not be empty"));
        }

        if let Some(level) = &self.logging().level
            && !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str())
        {
            return Err(invalid(
                "logging.level",
                format!("'{}' is not one of {}", level, LOG_LEVELS.join(", ")),
            ));
        }
        Ok(())
    }
}

/// Merge an optional section, keeping the base when the top is absent.
fn merge_section<T>(base: &mut Option<T>, top: Option<T>, merge: fn(&mut T, T)) {
    let Some(top) = top else {
        return;
    };
    match base {
        Some(existing) => merge(existing, top),
        None => *base = Some(top),
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason: reason.into(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Storage
// ─────────────────────────────────────────────────────────────────────────────

/// Storage section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the durable database.
    /// Default: platform data dir + `stowage`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// File name of the durable database inside `data_dir`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub durable_file: Option<String>,

    /// Durable store settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local: Option<StoreSection>,

    /// Session store settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<StoreSection>,
}

impl StorageConfig {
    fn merge(&mut self, other: StorageConfig) {
        if other.data_dir.is_some() {
            self.data_dir = other.data_dir;
        }
        if other.durable_file.is_some() {
            self.durable_file = other.durable_file;
        }
        merge_section(&mut self.local, other.local, StoreSection::merge);
        merge_section(&mut self.session, other.session, StoreSection::merge);
    }

    /// Get the effective data directory.
    ///
    /// Resolution order:
    /// 1. `STOWAGE_DATA_DIR` environment variable
    /// 2. Configured `data_dir` (a leading `~` is expanded)
    /// 3. Platform data dir + `stowage`, else `./.stowage`
    pub fn effective_data_dir(&self) -> PathBuf {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV)
            && !dir.is_empty()
        {
            return PathBuf::from(dir);
        }

        if let Some(dir) = &self.data_dir {
            return expand_tilde(dir);
        }

        dirs::data_dir()
            .map(|d| d.join("stowage"))
            .unwrap_or_else(|| PathBuf::from(".stowage"))
    }

    /// Full path of the durable database.
    pub fn durable_path(&self) -> PathBuf {
        let file = self.durable_file.as_deref().unwrap_or(DEFAULT_DURABLE_FILE);
        self.effective_data_dir().join(file)
    }

    /// Durable store section, or defaults.
    pub fn local(&self) -> StoreSection {
        self.local.clone().unwrap_or_default()
    }

    /// Session store section, or defaults.
    pub fn session(&self) -> StoreSection {
        self.session.clone().unwrap_or_default()
    }
}

/// Settings for one store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Key prefix. Default: `app`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Capacity of the backend in bytes. Default: unbounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota_bytes: Option<usize>,
}

impl StoreSection {
    fn merge(&mut self, other: StoreSection) {
        if other.namespace.is_some() {
            self.namespace = other.namespace;
        }
        if other.quota_bytes.is_some() {
            self.quota_bytes = other.quota_bytes;
        }
    }

    /// Configured namespace or the default.
    pub fn namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE)
    }

    fn validate(&self, section: &str) -> Result<()> {
        if let Some(namespace) = &self.namespace
            && (namespace.is_empty() || namespace.contains(':'))
        {
            return Err(invalid(
                &format!("{section}.namespace"),
                format!("'{namespace}' must be non-empty and must not contain ':'"),
            ));
        }
        if self.quota_bytes == Some(0) {
            return Err(invalid(
                &format!("{section}.quota_bytes"),
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────────────────────────────────────

/// Logging section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Console log level: trace, debug, info, warn or error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Whether to also write JSON logs to a rolling file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<bool>,
}

impl LoggingConfig {
    fn merge(&mut self, other: LoggingConfig) {
        if other.level.is_some() {
            self.level = other.level;
        }
        if other.file.is_some() {
            self.file = other.file;
        }
    }

    /// Configured level or the default.
    pub fn level(&self) -> &str {
        self.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    /// Whether file logging is on. Default: on.
    pub fn file_enabled(&self) -> bool {
        self.file.unwrap_or(true)
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = StowageConfig::from_toml(
            r#"
[storage]
data_dir = "/var/lib/stowage"
durable_file = "state.db"

[storage.local]
namespace = "prefs"
quota_bytes = 1024

[storage.session]
namespace = "tab"

[logging]
level = "debug"
file = false
"#,
        )
        .unwrap();

        let storage = config.storage();
        assert_eq!(storage.local().namespace(), "prefs");
        assert_eq!(storage.local().quota_bytes, Some(1024));
        assert_eq!(storage.session().namespace(), "tab");
        assert_eq!(storage.session().quota_bytes, None);
        assert_eq!(config.logging().level(), "debug");
        assert!(!config.logging().file_enabled());
        config.validate().unwrap();
    }

    #[test]
    fn test_empty_config_defaults() {
        let config = StowageConfig::from_toml("").unwrap();
        assert_eq!(config.storage().local().namespace(), "app");
        assert_eq!(config.storage().session().namespace(), "app");
        assert_eq!(config.logging().level(), "info");
        assert!(config.logging().file_enabled());
        assert!(config.storage().durable_path().ends_with("local.db"));
    }

    #[test]
    fn test_merge_is_field_level() {
        let mut base = StowageConfig::from_toml(
            r#"
[storage.local]
namespace = "base"
quota_bytes = 10

[logging]
level = "warn"
"#,
        )
        .unwrap();
        let top = StowageConfig::from_toml(
            r#"
[storage.local]
quota_bytes = 20

[storage.session]
namespace = "top"
"#,
        )
        .unwrap();

        base.merge(top);

        let storage = base.storage();
        assert_eq!(storage.local().namespace(), "base");
        assert_eq!(storage.local().quota_bytes, Some(20));
        assert_eq!(storage.session().namespace(), "top");
        assert_eq!(base.logging().level(), "warn");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        for (toml_str, field) in [
            ("[storage.local]\nnamespace = \"\"", "storage.local.namespace"),
            ("[storage.session]\nnamespace = \"a:b\"", "storage.session.namespace"),
            ("[storage.local]\nquota_bytes = 0", "storage.local.quota_bytes"),
            ("[storage]\ndurable_file = \" \"", "storage.durable_file"),
            ("[logging]\nlevel = \"loud\"", "logging.level"),
        ] {
            let err = StowageConfig::from_toml(toml_str)
                .unwrap()
                .validate()
                .unwrap_err();
            match err {
                ConfigError::Invalid { field: got, .. } => assert_eq!(got, field),
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn test_defaults_round_trip() {
        let config = StowageConfig::with_defaults();
        let parsed = StowageConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, config);
        parsed.validate().unwrap();
    }

    #[test]
    fn test_expand_tilde() {
        let expanded = expand_tilde(Path::new("~/data"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expanded, home.join("data"));
        }
        assert_eq!(expand_tilde(Path::new("/abs")), PathBuf::from("/abs"));
    }
}
