//! Namespaced key-value storage with per-entry expiry.
//!
//! This crate layers a typed store over a flat string-to-string backend:
//! - Namespacing so several stores can share one backend without collisions
//! - Optional per-entry expiry, enforced lazily on reads and scans
//! - One purge-and-retry when a backend rejects a write for lack of space
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use stowage_store::{MemoryBackend, NamespacedStore, SetOptions, StoreConfig};
//!
//! let store = NamespacedStore::new(Arc::new(MemoryBackend::new()), StoreConfig::default())?;
//! store.set("token", "abc", &SetOptions::new().with_expire(Duration::from_secs(3600)))?;
//! let token: Option<String> = store.get("token");
//! ```

mod backend;
mod clock;
mod config;
mod entry;
mod error;
mod handle;
mod registry;
mod sqlite;
mod store;

pub use backend::{MemoryBackend, StorageBackend};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    DEFAULT_NAMESPACE, NAMESPACE_SEPARATOR, SetOptions, StoreConfig, StoreKind,
    validate_namespace,
};
pub use entry::StoredEntry;
pub use error::{BackendError, BackendResult, Result, StoreError};
pub use handle::StoredValue;
pub use registry::{BackendOptions, RegistryOptions, StoreRegistry};
pub use sqlite::SqliteBackend;
pub use store::{NamespacedStore, StoreStats};
