//! Store behavior over real and failing backends.
//!
//! These tests verify:
//! - Quota recovery purges once and retries once
//! - Namespace isolation, expiry and corrupt-record handling on SQLite
//! - Scans tolerate keys vanishing between enumeration and use
//! - Read and listing failures surface as absence, not panics

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::{Value, json};
use stowage_store::{
    BackendError, BackendResult, ManualClock, MemoryBackend, NamespacedStore, SetOptions,
    SqliteBackend, StorageBackend, StoreConfig, StoreError,
};
use tempfile::TempDir;

const T0: i64 = 1_700_000_000_000;

/// Wraps a backend, rejecting the first `failures` writes and counting
/// key enumerations (one per namespace scan).
struct FlakyBackend {
    inner: MemoryBackend,
    failures: AtomicUsize,
    writes: AtomicUsize,
    scans: AtomicUsize,
}

impl FlakyBackend {
    fn new(failures: usize) -> Self {
        Self {
            inner: MemoryBackend::new(),
            failures: AtomicUsize::new(failures),
            writes: AtomicUsize::new(0),
            scans: AtomicUsize::new(0),
        }
    }

    fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn scans(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }
}

impl StorageBackend for FlakyBackend {
    fn set_item(&self, key: &str, value: &str) -> BackendResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(BackendError::QuotaExceeded {
                needed: key.len() + value.len(),
                quota: 0,
            });
        }
        self.inner.set_item(key, value)
    }

    fn get_item(&self, key: &str) -> BackendResult<Option<String>> {
        self.inner.get_item(key)
    }

    fn remove_item(&self, key: &str) -> BackendResult<()> {
        self.inner.remove_item(key)
    }

    fn len(&self) -> BackendResult<usize> {
        self.inner.len()
    }

    fn key(&self, index: usize) -> BackendResult<Option<String>> {
        self.inner.key(index)
    }

    fn keys(&self) -> BackendResult<Vec<String>> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        self.inner.keys()
    }
}

/// Enumerates keys that have already been removed.
struct StaleListingBackend {
    inner: MemoryBackend,
    ghosts: Vec<String>,
}

impl StorageBackend for StaleListingBackend {
    fn set_item(&self, key: &str, value: &str) -> BackendResult<()> {
        self.inner.set_item(key, value)
    }

    fn get_item(&self, key: &str) -> BackendResult<Option<String>> {
        self.inner.get_item(key)
    }

    fn remove_item(&self, key: &str) -> BackendResult<()> {
        self.inner.remove_item(key)
    }

    fn len(&self) -> BackendResult<usize> {
        Ok(self.inner.len()? + self.ghosts.len())
    }

    fn key(&self, index: usize) -> BackendResult<Option<String>> {
        let len = self.inner.len()?;
        if index < len {
            self.inner.key(index)
        } else {
            Ok(self.ghosts.get(index - len).cloned())
        }
    }
}

/// Backend whose reads and listings can be switched off, and whose
/// next `write_failures` writes are rejected.
struct UnavailableBackend {
    inner: MemoryBackend,
    reads_down: AtomicBool,
    write_failures: AtomicUsize,
}

impl UnavailableBackend {
    fn new() -> Self {
        Self {
            inner: MemoryBackend::new(),
            reads_down: AtomicBool::new(false),
            write_failures: AtomicUsize::new(0),
        }
    }

    fn set_reads_down(&self, down: bool) {
        self.reads_down.store(down, Ordering::SeqCst);
    }

    fn check_reads(&self) -> BackendResult<()> {
        if self.reads_down.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("reads disabled".to_string()));
        }
        Ok(())
    }
}

impl StorageBackend for UnavailableBackend {
    fn set_item(&self, key: &str, value: &str) -> BackendResult<()> {
        let remaining = self.write_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.write_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(BackendError::Unavailable("write rejected".to_string()));
        }
        self.inner.set_item(key, value)
    }

    fn get_item(&self, key: &str) -> BackendResult<Option<String>> {
        self.check_reads()?;
        self.inner.get_item(key)
    }

    fn remove_item(&self, key: &str) -> BackendResult<()> {
        self.inner.remove_item(key)
    }

    fn len(&self) -> BackendResult<usize> {
        self.check_reads()?;
        self.inner.len()
    }

    fn key(&self, index: usize) -> BackendResult<Option<String>> {
        self.check_reads()?;
        self.inner.key(index)
    }
}

fn store_over(backend: Arc<dyn StorageBackend>, namespace: &str, clock: &ManualClock) -> NamespacedStore {
    NamespacedStore::with_clock(
        backend,
        StoreConfig::new().with_namespace(namespace),
        Arc::new(clock.clone()),
    )
    .unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// Quota Recovery
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_write_recovers_after_one_purge() {
    let backend = Arc::new(FlakyBackend::new(1));
    let clock = ManualClock::new(T0);
    let store = store_over(backend.clone(), "app", &clock);

    store.set("k", &json!({"a": 1}), &SetOptions::new()).unwrap();

    assert_eq!(backend.writes(), 2);
    assert_eq!(backend.scans(), 1);
    assert_eq!(store.get::<Value>("k"), Some(json!({"a": 1})));
}

#[test]
fn test_write_gives_up_after_one_retry() {
    let backend = Arc::new(FlakyBackend::new(5));
    let clock = ManualClock::new(T0);
    let store = store_over(backend.clone(), "app", &clock);

    let err = store.set("k", &1, &SetOptions::new()).unwrap_err();

    assert!(matches!(err, StoreError::WriteFailed { ref key, .. } if key == "k"));
    assert_eq!(backend.writes(), 2);
    assert_eq!(backend.scans(), 1);
    assert!(!store.has("k"));
}

#[test]
fn test_successful_write_does_not_scan() {
    let backend = Arc::new(FlakyBackend::new(0));
    let clock = ManualClock::new(T0);
    let store = store_over(backend.clone(), "app", &clock);

    store.set("k", &1, &SetOptions::new()).unwrap();

    assert_eq!(backend.writes(), 1);
    assert_eq!(backend.scans(), 0);
}

#[test]
fn test_failed_write_keeps_previous_value() {
    let backend = Arc::new(FlakyBackend::new(0));
    let clock = ManualClock::new(T0);
    let store = store_over(backend.clone(), "app", &clock);
    store.set("k", "old", &SetOptions::new()).unwrap();

    backend.failures.store(2, Ordering::SeqCst);
    assert!(store.set("k", "new", &SetOptions::new()).is_err());

    assert_eq!(store.get::<String>("k").as_deref(), Some("old"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Durable Backend
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_sqlite_namespace_isolation_and_clear_scope() {
    let backend: Arc<dyn StorageBackend> = Arc::new(SqliteBackend::open_in_memory(None).unwrap());
    let clock = ManualClock::new(T0);
    let n1 = store_over(backend.clone(), "n1", &clock);
    let n2 = store_over(backend.clone(), "n2", &clock);

    n1.set("a", &1, &SetOptions::new()).unwrap();
    n1.set("b", &2, &SetOptions::new()).unwrap();
    n2.set("a", &"other", &SetOptions::new()).unwrap();

    assert_eq!(n2.get::<String>("a").as_deref(), Some("other"));
    assert!(!n2.has("b"));

    assert_eq!(n1.clear().unwrap(), 2);
    assert!(n1.get_keys().is_empty());
    assert_eq!(n2.get_keys(), vec!["n2:a"]);
}

#[test]
fn test_sqlite_expiry_and_physical_presence() {
    let backend: Arc<dyn StorageBackend> = Arc::new(SqliteBackend::open_in_memory(None).unwrap());
    let clock = ManualClock::new(T0);
    let store = store_over(backend, "app", &clock);

    store
        .set("session", "s1", &SetOptions::new().with_expire(Duration::from_secs(30)))
        .unwrap();
    clock.advance(Duration::from_secs(31));

    assert!(store.has("session"));
    assert_eq!(store.get_keys(), vec!["app:session"]);
    assert!(store.get_all::<Value>().is_empty());
    assert!(!store.has("session"));
}

#[test]
fn test_sqlite_quota_recovery_end_to_end() {
    let dir = TempDir::new().unwrap();
    let backend: Arc<dyn StorageBackend> =
        Arc::new(SqliteBackend::open(dir.path().join("local.db"), Some(80)).unwrap());
    let clock = ManualClock::new(T0);
    let store = store_over(backend, "app", &clock);

    store
        .set("cache", &"c".repeat(30), &SetOptions::new().with_expire_millis(100))
        .unwrap();
    clock.advance(Duration::from_millis(101));

    store.set("fresh", &"f".repeat(30), &SetOptions::new()).unwrap();

    assert_eq!(store.get_keys(), vec!["app:fresh"]);
}

#[test]
fn test_sqlite_corrupt_record_asymmetry() {
    let backend: Arc<dyn StorageBackend> = Arc::new(SqliteBackend::open_in_memory(None).unwrap());
    let clock = ManualClock::new(T0);
    let store = store_over(backend.clone(), "app", &clock);
    backend.set_item("app:bad", r#"{"expire":1}"#).unwrap();

    assert_eq!(store.get_or("bad", "fallback".to_string()), "fallback");
    assert!(store.has("bad"));
    assert!(store.get_all::<Value>().is_empty());
    assert!(store.has("bad"));

    assert_eq!(store.clear_expired().unwrap(), 1);
    assert!(!store.has("bad"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Stale Enumeration
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_scans_skip_vanished_keys() {
    let backend = Arc::new(StaleListingBackend {
        inner: MemoryBackend::new(),
        ghosts: vec!["app:gone".to_string()],
    });
    let clock = ManualClock::new(T0);
    let store = store_over(backend.clone(), "app", &clock);
    store.set("here", &1, &SetOptions::new()).unwrap();

    assert_eq!(store.get_keys(), vec!["app:here", "app:gone"]);
    assert_eq!(store.clear_expired().unwrap(), 0);
    assert_eq!(store.get_all::<i32>().len(), 1);
    assert_eq!(store.get_size(), "app:here".len() + r#"{"value":1}"#.len());
}

#[test]
fn test_clear_counts_only_records_present() {
    let backend = Arc::new(StaleListingBackend {
        inner: MemoryBackend::new(),
        ghosts: vec![
            "app:gone1".to_string(),
            "app:gone2".to_string(),
            "app:gone3".to_string(),
        ],
    });
    let clock = ManualClock::new(T0);
    let store = store_over(backend.clone(), "app", &clock);
    store.set("here", &1, &SetOptions::new()).unwrap();

    assert_eq!(store.get_keys().len(), 4);
    assert_eq!(store.clear().unwrap(), 1);
    assert!(!store.has("here"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Unavailable Backend
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_write_retry_survives_failing_purge() {
    let backend = Arc::new(UnavailableBackend::new());
    let clock = ManualClock::new(T0);
    let store = store_over(backend.clone(), "app", &clock);

    backend.write_failures.store(1, Ordering::SeqCst);
    backend.set_reads_down(true);
    assert!(store.clear_expired().is_err());

    store.set("k", "v", &SetOptions::new()).unwrap();

    backend.set_reads_down(false);
    assert_eq!(store.get::<String>("k").as_deref(), Some("v"));
}

#[test]
fn test_read_failures_look_like_absence() {
    let backend = Arc::new(UnavailableBackend::new());
    let clock = ManualClock::new(T0);
    let store = store_over(backend.clone(), "app", &clock);
    store.set("k", &1, &SetOptions::new()).unwrap();

    backend.set_reads_down(true);

    assert_eq!(store.get::<i32>("k"), None);
    assert_eq!(store.get_or("k", 9), 9);
    assert!(!store.has("k"));
    assert!(store.get_keys().is_empty());
    assert!(store.get_all::<i32>().is_empty());
    assert_eq!(store.get_size(), 0);
    assert!(matches!(
        store.clear(),
        Err(StoreError::Backend(BackendError::Unavailable(_)))
    ));

    backend.set_reads_down(false);
    assert_eq!(store.get::<i32>("k"), Some(1));
}
