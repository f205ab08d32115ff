//! Configuration for stores and individual writes.

use std::fmt;
use std::time::Duration;

use crate::error::{Result, StoreError};

/// Default namespace for store instances.
pub const DEFAULT_NAMESPACE: &str = "app";

/// Separator between namespace and key in backend keys.
pub const NAMESPACE_SEPARATOR: char = ':';

/// Which backend a store lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    /// Durable across restarts.
    Local,
    /// Scoped to the current process.
    Session,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Session => f.write_str("session"),
        }
    }
}

/// Configuration for a namespaced store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Backend this store is meant for.
    pub kind: StoreKind,

    /// Prefix applied to every key.
    pub namespace: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::Local,
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

impl StoreConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the backend kind.
    pub fn with_kind(mut self, kind: StoreKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Check the namespace can't collide with another one's prefix.
    pub fn validate(&self) -> Result<()> {
        validate_namespace(&self.namespace)
    }
}

/// Reject empty namespaces and namespaces containing the separator.
pub fn validate_namespace(namespace: &str) -> Result<()> {
    if namespace.is_empty() || namespace.contains(NAMESPACE_SEPARATOR) {
        return Err(StoreError::InvalidNamespace(namespace.to_string()));
    }
    Ok(())
}

/// Options for a single `set`.
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    /// Lifetime of the entry from the moment it is written.
    /// `None` means the entry never expires.
    pub expire: Option<Duration>,

    /// Must match the store's namespace when given; namespaces are fixed
    /// per instance.
    pub namespace: Option<String>,
}

impl SetOptions {
    /// Options for an entry that never expires.
    pub fn new() -> Self {
        Self::default()
    }

    /// Expire the entry `ttl` after it is written.
    pub fn with_expire(mut self, ttl: Duration) -> Self {
        self.expire = Some(ttl);
        self
    }

    /// Expire the entry `millis` milliseconds after it is written.
    pub fn with_expire_millis(self, millis: u64) -> Self {
        self.with_expire(Duration::from_millis(millis))
    }

    /// Name the namespace this write is meant for.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Absolute expiry instant for a write at `now_millis`.
    pub(crate) fn expires_at(&self, now_millis: i64) -> Option<i64> {
        self.expire.map(|ttl| {
            let millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
            now_millis.saturating_add(millis)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_namespace() {
        let config = StoreConfig::default();
        assert_eq!(config.namespace, "app");
        assert_eq!(config.kind, StoreKind::Local);
        config.validate().unwrap();
    }

    #[test]
    fn test_namespace_validation() {
        assert!(validate_namespace("user-prefs").is_ok());
        assert!(matches!(
            validate_namespace(""),
            Err(StoreError::InvalidNamespace(_))
        ));
        assert!(matches!(
            validate_namespace("a:b"),
            Err(StoreError::InvalidNamespace(ns)) if ns == "a:b"
        ));
    }

    #[test]
    fn test_expires_at() {
        assert_eq!(SetOptions::new().expires_at(100), None);
        assert_eq!(SetOptions::new().with_expire_millis(0).expires_at(100), Some(100));
        assert_eq!(
            SetOptions::new()
                .with_expire(Duration::from_secs(2))
                .expires_at(100),
            Some(2_100)
        );
        assert_eq!(
            SetOptions::new()
                .with_expire(Duration::MAX)
                .expires_at(100),
            Some(i64::MAX)
        );
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(StoreKind::Local.to_string(), "local");
        assert_eq!(StoreKind::Session.to_string(), "session");
    }
}
