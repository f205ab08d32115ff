//! Storage backend trait and the in-memory implementation.
//!
//! A backend is a flat, synchronous string-to-string map with an
//! index-addressable enumeration order. The namespaced store layers keys,
//! records and expiry on top; backends know nothing about either.
//!
//! # Example
//!
//! ```ignore
//! use stowage_store::{MemoryBackend, StorageBackend};
//!
//! let backend = MemoryBackend::with_quota(5 * 1024 * 1024);
//! backend.set_item("app:theme", r#"{"value":"dark"}"#)?;
//! assert_eq!(backend.len()?, 1);
//! ```

use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;

use crate::error::{BackendError, BackendResult};

/// Trait for the flat key-value surface a store wraps.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Individual calls are atomic;
/// sequences of calls are not.
pub trait StorageBackend: Send + Sync {
    /// Store `value` under `key`, replacing any existing value.
    ///
    /// # Errors
    ///
    /// Returns `QuotaExceeded` if the write would exceed the backend's
    /// capacity. A failed write leaves the previous value in place.
    fn set_item(&self, key: &str, value: &str) -> BackendResult<()>;

    /// Fetch the value under `key`, or `Ok(None)` if absent.
    fn get_item(&self, key: &str) -> BackendResult<Option<String>>;

    /// Delete `key`. Removing an absent key succeeds.
    fn remove_item(&self, key: &str) -> BackendResult<()>;

    /// Number of keys currently stored (across all namespaces).
    fn len(&self) -> BackendResult<usize>;

    /// Key at position `index` in enumeration order.
    fn key(&self, index: usize) -> BackendResult<Option<String>>;

    /// Whether the backend holds no keys.
    fn is_empty(&self) -> BackendResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Snapshot of every key in enumeration order.
    ///
    /// The default walks `len`/`key`; backends with a cheaper listing
    /// should override it.
    fn keys(&self) -> BackendResult<Vec<String>> {
        let len = self.len()?;
        let mut keys = Vec::with_capacity(len);
        for index in 0..len {
            if let Some(key) = self.key(index)? {
                keys.push(key);
            }
        }
        Ok(keys)
    }
}

/// Size of one stored pair as counted against a quota.
pub(crate) fn pair_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}

#[derive(Debug, Default)]
struct MemoryInner {
    /// Pairs keyed by insertion sequence, so iteration is insertion order.
    entries: BTreeMap<u64, (String, String)>,

    /// Sequence number of each key in `entries`.
    index: HashMap<String, u64>,

    /// Sequence number for the next new key.
    next_seq: u64,

    /// Sum of `pair_size` over all entries.
    used: usize,
}

/// Ephemeral, insertion-ordered backend.
///
/// Backs the session store, and stands in for the durable backend in tests.
/// Writes and removals are logarithmic; `key(index)` walks from the start.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    inner: Mutex<MemoryInner>,
    quota: Option<usize>,
}

impl MemoryBackend {
    /// Create an unbounded backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend that rejects writes beyond `quota` bytes.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            inner: Mutex::default(),
            quota: Some(quota),
        }
    }

    /// Configured quota, if any.
    pub fn quota(&self) -> Option<usize> {
        self.quota
    }

    /// Bytes currently counted against the quota.
    pub fn used(&self) -> usize {
        self.inner.lock().used
    }
}

impl StorageBackend for MemoryBackend {
    fn set_item(&self, key: &str, value: &str) -> BackendResult<()> {
        let mut guard = self.inner.lock();
        let MemoryInner {
            entries,
            index,
            next_seq,
            used,
        } = &mut *guard;

        let slot = index.get(key).copied();
        let existing = slot
            .and_then(|seq| entries.get(&seq))
            .map(|(k, v)| pair_size(k, v))
            .unwrap_or(0);
        let needed = *used - existing + pair_size(key, value);

        if let Some(quota) = self.quota
            && needed > quota
        {
            return Err(BackendError::QuotaExceeded { needed, quota });
        }

        match slot.and_then(|seq| entries.get_mut(&seq)) {
            Some((_, stored)) => *stored = value.to_string(),
            None => {
                let seq = *next_seq;
                *next_seq += 1;
                index.insert(key.to_string(), seq);
                entries.insert(seq, (key.to_string(), value.to_string()));
            }
        }
        *used = needed;
        Ok(())
    }

    fn get_item(&self, key: &str) -> BackendResult<Option<String>> {
        let inner = self.inner.lock();
        Ok(inner
            .index
            .get(key)
            .and_then(|seq| inner.entries.get(seq))
            .map(|(_, v)| v.clone()))
    }

    fn remove_item(&self, key: &str) -> BackendResult<()> {
        let mut guard = self.inner.lock();
        let MemoryInner {
            entries,
            index,
            used,
            ..
        } = &mut *guard;

        if let Some(seq) = index.remove(key)
            && let Some((key, value)) = entries.remove(&seq)
        {
            *used -= pair_size(&key, &value);
        }
        Ok(())
    }

    fn len(&self) -> BackendResult<usize> {
        Ok(self.inner.lock().entries.len())
    }

    fn key(&self, index: usize) -> BackendResult<Option<String>> {
        Ok(self
            .inner
            .lock()
            .entries
            .values()
            .nth(index)
            .map(|(k, _)| k.clone()))
    }

    fn keys(&self) -> BackendResult<Vec<String>> {
        Ok(self
            .inner
            .lock()
            .entries
            .values()
            .map(|(k, _)| k.clone())
            .collect())
    }
}
