//! Namespaced store with lazy per-entry expiration.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, trace, warn};

use crate::backend::{StorageBackend, pair_size};
use crate::clock::{Clock, SystemClock};
use crate::config::{NAMESPACE_SEPARATOR, SetOptions, StoreConfig, StoreKind};
use crate::entry::StoredEntry;
use crate::error::{BackendResult, Result, StoreError};

/// Typed key-value store scoped to one namespace of a backend.
///
/// This store provides:
/// - Key isolation: every key is written as `"<namespace>:<key>"`
/// - Optional per-entry expiry, enforced lazily on read and on scans
/// - One purge-and-retry when a write is rejected (e.g. over quota)
///
/// Read paths never fail: a missing, expired, corrupt or unreadable record
/// yields `None`. Write paths return a `Result` so callers can decide
/// whether to retry.
///
/// Clones are cheap and share the backend.
#[derive(Clone)]
pub struct NamespacedStore {
    backend: Arc<dyn StorageBackend>,
    clock: Arc<dyn Clock>,
    config: StoreConfig,
    prefix: String,
}

impl std::fmt::Debug for NamespacedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamespacedStore")
            .field("kind", &self.config.kind)
            .field("namespace", &self.config.namespace)
            .finish_non_exhaustive()
    }
}

impl NamespacedStore {
    /// Create a store over `backend` using the system clock.
    ///
    /// # Errors
    ///
    /// Returns `InvalidNamespace` if the configured namespace is empty or
    /// contains `:`.
    pub fn new(backend: Arc<dyn StorageBackend>, config: StoreConfig) -> Result<Self> {
        Self::with_clock(backend, config, Arc::new(SystemClock))
    }

    /// Create a store with an explicit time source.
    pub fn with_clock(
        backend: Arc<dyn StorageBackend>,
        config: StoreConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let prefix = format!("{}{}", config.namespace, NAMESPACE_SEPARATOR);

        debug!(kind = %config.kind, namespace = %config.namespace, "Store created");

        Ok(Self {
            backend,
            clock,
            config,
            prefix,
        })
    }

    /// The namespace all keys are scoped to.
    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    /// Which backend this store was configured for.
    pub fn kind(&self) -> StoreKind {
        self.config.kind
    }

    /// The store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The backend this store writes to.
    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// If the backend rejects the write, expired entries in this namespace
    /// are purged and the write is retried once.
    ///
    /// # Errors
    ///
    /// - `NamespaceOverride` if `options.namespace` names another namespace
    /// - `Serialization` if `value` has no JSON form
    /// - `WriteFailed` if the retry is rejected too
    ///
    /// On error the key's previous value is left in place.
    pub fn set<T>(&self, key: &str, value: &T, options: &SetOptions) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        if let Some(requested) = &options.namespace
            && requested != &self.config.namespace
        {
            return Err(StoreError::NamespaceOverride {
                expected: self.config.namespace.clone(),
                found: requested.clone(),
            });
        }

        let full_key = self.full_key(key);
        let entry = StoredEntry {
            value,
            expires_at: options.expires_at(self.clock.now_millis()),
        };

        let raw = entry.to_json().map_err(|e| {
            warn!(namespace = %self.config.namespace, key = %key, error = %e, "Value is not serializable");
            StoreError::Serialization(e)
        })?;

        let first = match self.backend.set_item(&full_key, &raw) {
            Ok(()) => {
                trace!(
                    namespace = %self.config.namespace,
                    key = %key,
                    expires_at = ?entry.expires_at,
                    "Entry stored"
                );
                return Ok(());
            }
            Err(e) => e,
        };

        warn!(
            namespace = %self.config.namespace,
            key = %key,
            error = %first,
            "Write rejected, purging expired entries and retrying"
        );

        let purged = match self.clear_expired() {
            Ok(count) => count,
            Err(e) => {
                warn!(namespace = %self.config.namespace, error = %e, "Purge before retry failed");
                0
            }
        };

        match self.backend.set_item(&full_key, &raw) {
            Ok(()) => {
                debug!(
                    namespace = %self.config.namespace,
                    key = %key,
                    purged = purged,
                    "Write succeeded after purge"
                );
                Ok(())
            }
            Err(retry) => {
                error!(
                    namespace = %self.config.namespace,
                    key = %key,
                    purged = purged,
                    error = %retry,
                    "Write retry failed"
                );
                Err(StoreError::WriteFailed {
                    key: key.to_string(),
                    source: retry,
                })
            }
        }
    }

    /// Read the value under `key`.
    ///
    /// Returns `None` when the key is absent, expired, unparseable, or holds
    /// a value that does not deserialize into `T`. An expired record is
    /// deleted as a side effect; a corrupt one is left in place.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let full_key = self.full_key(key);

        let raw = match self.backend.get_item(&full_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(namespace = %self.config.namespace, key = %key, error = %e, "Backend read failed");
                return None;
            }
        };

        let entry = match StoredEntry::<Value>::from_json(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(namespace = %self.config.namespace, key = %key, error = %e, "Ignoring unreadable record");
                return None;
            }
        };

        if entry.is_expired(self.clock.now_millis()) {
            debug!(namespace = %self.config.namespace, key = %key, "Entry expired, removing");
            if let Err(e) = self.backend.remove_item(&full_key) {
                warn!(namespace = %self.config.namespace, key = %key, error = %e, "Failed to remove expired entry");
            }
            return None;
        }

        match serde_json::from_value(entry.value) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(namespace = %self.config.namespace, key = %key, error = %e, "Stored value has unexpected shape");
                None
            }
        }
    }

    /// Read the value under `key`, falling back to `default`.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Delete `key`. Removing an absent key succeeds.
    pub fn remove(&self, key: &str) -> Result<()> {
        self.backend.remove_item(&self.full_key(key))?;
        trace!(namespace = %self.config.namespace, key = %key, "Entry removed");
        Ok(())
    }

    /// Whether a record is physically stored under `key`.
    ///
    /// Expiry is not checked: an expired record that has not been purged
    /// still counts. Use [`get`](Self::get) for logical presence.
    pub fn has(&self, key: &str) -> bool {
        match self.backend.get_item(&self.full_key(key)) {
            Ok(raw) => raw.is_some(),
            Err(e) => {
                warn!(namespace = %self.config.namespace, key = %key, error = %e, "Backend read failed");
                false
            }
        }
    }

    /// Prefixed keys of this namespace, in backend order.
    fn namespace_keys(&self) -> BackendResult<Vec<String>> {
        Ok(self
            .backend
            .keys()?
            .into_iter()
            .filter(|k| k.starts_with(&self.prefix))
            .collect())
    }

    /// Delete every key in this namespace. Returns how many were removed.
    ///
    /// Keys are enumerated first, then removed one by one; keys written by
    /// others in between may be missed, and keys that vanished in between
    /// are not counted.
    pub fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        for full_key in self.namespace_keys()? {
            if self.backend.get_item(&full_key)?.is_none() {
                continue;
            }
            self.backend.remove_item(&full_key)?;
            removed += 1;
        }

        debug!(namespace = %self.config.namespace, count = removed, "Namespace cleared");
        Ok(removed)
    }

    /// Fully qualified keys currently stored in this namespace.
    ///
    /// Includes expired records that have not been purged yet.
    pub fn get_keys(&self) -> Vec<String> {
        self.namespace_keys().unwrap_or_else(|e| {
            warn!(namespace = %self.config.namespace, error = %e, "Key enumeration failed");
            Vec::new()
        })
    }

    /// Every logically present value, keyed by un-prefixed key.
    ///
    /// Goes through [`get`](Self::get) for each key, so expired records are
    /// deleted and corrupt ones skipped.
    pub fn get_all<T: DeserializeOwned>(&self) -> BTreeMap<String, T> {
        self.get_keys()
            .iter()
            .filter_map(|full_key| full_key.strip_prefix(&self.prefix))
            .filter_map(|key| self.get(key).map(|value| (key.to_string(), value)))
            .collect()
    }

    /// Delete expired and unparseable records in this namespace.
    ///
    /// Returns how many records were deleted. A key that disappears
    /// between enumeration and inspection is skipped.
    pub fn clear_expired(&self) -> Result<usize> {
        let now = self.clock.now_millis();
        let mut removed = 0;

        for full_key in self.namespace_keys()? {
            let raw = match self.backend.get_item(&full_key) {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(e) => {
                    warn!(key = %full_key, error = %e, "Backend read failed during purge");
                    continue;
                }
            };

            let stale = match StoredEntry::<Value>::from_json(&raw) {
                Ok(entry) => entry.is_expired(now),
                Err(_) => {
                    debug!(key = %full_key, "Deleting unparseable record");
                    true
                }
            };
            if !stale {
                continue;
            }

            match self.backend.remove_item(&full_key) {
                Ok(()) => removed += 1,
                Err(e) => warn!(key = %full_key, error = %e, "Failed to delete stale record"),
            }
        }

        if removed > 0 {
            debug!(namespace = %self.config.namespace, count = removed, "Purged stale records");
        }
        Ok(removed)
    }

    /// Approximate bytes used by this namespace: key plus raw record length.
    pub fn get_size(&self) -> usize {
        self.get_keys()
            .iter()
            .filter_map(|full_key| match self.backend.get_item(full_key) {
                Ok(raw) => raw.map(|raw| pair_size(full_key, &raw)),
                Err(e) => {
                    warn!(key = %full_key, error = %e, "Backend read failed while sizing");
                    None
                }
            })
            .sum()
    }

    /// Classify every record in the namespace without modifying anything.
    pub fn stats(&self) -> StoreStats {
        let now = self.clock.now_millis();
        let mut stats = StoreStats::default();

        for full_key in self.get_keys() {
            let Ok(Some(raw)) = self.backend.get_item(&full_key) else {
                continue;
            };
            stats.keys += 1;
            stats.size += pair_size(&full_key, &raw);
            match StoredEntry::<Value>::from_json(&raw) {
                Ok(entry) if entry.is_expired(now) => stats.expired += 1,
                Ok(_) => stats.live += 1,
                Err(_) => stats.corrupt += 1,
            }
        }

        stats
    }
}

/// Breakdown of the records in one namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Records physically present.
    pub keys: usize,

    /// Records `get` would return.
    pub live: usize,

    /// Records past their expiry but not yet purged.
    pub expired: usize,

    /// Records that fail to parse.
    pub corrupt: usize,

    /// Same measure as [`NamespacedStore::get_size`].
    pub size: usize,
}
