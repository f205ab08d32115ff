//! The two long-lived stores an application owns.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::backend::MemoryBackend;
use crate::config::{StoreConfig, StoreKind};
use crate::error::{Result, StoreError};
use crate::sqlite::SqliteBackend;
use crate::store::NamespacedStore;

/// Settings for one side of the registry.
#[derive(Debug, Clone, Default)]
pub struct BackendOptions {
    /// Namespace for the store; `None` keeps the default.
    pub namespace: Option<String>,

    /// Capacity in bytes; `None` is unbounded.
    pub quota: Option<usize>,
}

/// Everything needed to open both stores.
#[derive(Debug, Clone)]
pub struct RegistryOptions {
    /// SQLite file for the durable store.
    pub durable_path: PathBuf,

    /// Durable store settings.
    pub local: BackendOptions,

    /// Session store settings.
    pub session: BackendOptions,
}

/// Owns the durable and the session store.
///
/// Built once by the composition root and handed to whatever needs storage.
#[derive(Debug, Clone)]
pub struct StoreRegistry {
    local: NamespacedStore,
    session: NamespacedStore,
}

impl StoreRegistry {
    /// Pair two already-built stores.
    pub fn new(local: NamespacedStore, session: NamespacedStore) -> Self {
        Self { local, session }
    }

    /// Open the durable store on disk and a fresh in-memory session store.
    pub fn open(options: &RegistryOptions) -> Result<Self> {
        let durable = SqliteBackend::open(&options.durable_path, options.local.quota)
            .map_err(StoreError::Backend)?;
        let local = NamespacedStore::new(
            Arc::new(durable),
            store_config(StoreKind::Local, &options.local),
        )?;

        let ephemeral = match options.session.quota {
            Some(quota) => MemoryBackend::with_quota(quota),
            None => MemoryBackend::new(),
        };
        let session = NamespacedStore::new(
            Arc::new(ephemeral),
            store_config(StoreKind::Session, &options.session),
        )?;

        debug!(
            path = %options.durable_path.display(),
            local_namespace = %local.namespace(),
            session_namespace = %session.namespace(),
            "Store registry opened"
        );

        Ok(Self { local, session })
    }

    /// Two in-memory stores, for tests and throwaway runs.
    pub fn in_memory() -> Result<Self> {
        let local = NamespacedStore::new(
            Arc::new(MemoryBackend::new()),
            StoreConfig::new().with_kind(StoreKind::Local),
        )?;
        let session = NamespacedStore::new(
            Arc::new(MemoryBackend::new()),
            StoreConfig::new().with_kind(StoreKind::Session),
        )?;
        Ok(Self { local, session })
    }

    /// The durable store.
    pub fn local(&self) -> &NamespacedStore {
        &self.local
    }

    /// The session store.
    pub fn session(&self) -> &NamespacedStore {
        &self.session
    }

    /// The store for `kind`.
    pub fn get(&self, kind: StoreKind) -> &NamespacedStore {
        match kind {
            StoreKind::Local => &self.local,
            StoreKind::Session => &self.session,
        }
    }
}

fn store_config(kind: StoreKind, options: &BackendOptions) -> StoreConfig {
    let config = StoreConfig::new().with_kind(kind);
    match &options.namespace {
        Some(namespace) => config.with_namespace(namespace.clone()),
        None => config,
    }
}
