//! A typed value bound to one key.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::SetOptions;
use crate::error::Result;
use crate::store::NamespacedStore;

/// Holds the current value of one key and writes changes through.
///
/// The value is seeded from the store when the handle is loaded. Setting a
/// value that serializes to JSON `null` removes the key instead of storing
/// it. Changes made to the key through other handles are not observed.
#[derive(Debug, Clone)]
pub struct StoredValue<T> {
    store: NamespacedStore,
    key: String,
    default: T,
    current: T,
    options: SetOptions,
}

impl<T> StoredValue<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    /// Bind `key` in `store`, reading the current value or `default`.
    pub fn load(
        store: NamespacedStore,
        key: impl Into<String>,
        default: T,
        options: SetOptions,
    ) -> Self {
        let key = key.into();
        let current = store.get_or(&key, default.clone());
        Self {
            store,
            key,
            default,
            current,
            options,
        }
    }

    /// The bound key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The last value loaded or set.
    pub fn value(&self) -> &T {
        &self.current
    }

    /// Replace the value and persist it.
    ///
    /// On error the cached value is left unchanged.
    pub fn set(&mut self, value: T) -> Result<()> {
        if serde_json::to_value(&value)?.is_null() {
            self.store.remove(&self.key)?;
        } else {
            self.store.set(&self.key, &value, &self.options)?;
        }
        self.current = value;
        Ok(())
    }

    /// Delete the key and fall back to the default.
    pub fn remove(&mut self) -> Result<()> {
        self.store.remove(&self.key)?;
        self.current = self.default.clone();
        Ok(())
    }

    /// Re-read the key from the store.
    pub fn reload(&mut self) -> &T {
        self.current = self.store.get_or(&self.key, self.default.clone());
        &self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::config::StoreConfig;
    use std::sync::Arc;

    fn store() -> NamespacedStore {
        NamespacedStore::new(Arc::new(MemoryBackend::new()), StoreConfig::new()).unwrap()
    }

    #[test]
    fn test_seeds_from_store() {
        let store = store();
        store.set("theme", "dark", &SetOptions::new()).unwrap();

        let theme = StoredValue::load(store.clone(), "theme", "light".to_string(), SetOptions::new());
        assert_eq!(theme.value(), "dark");

        let missing = StoredValue::load(store, "lang", "en".to_string(), SetOptions::new());
        assert_eq!(missing.value(), "en");
    }

    #[test]
    fn test_set_writes_through() {
        let store = store();
        let mut count = StoredValue::load(store.clone(), "count", 0u32, SetOptions::new());

        count.set(5).unwrap();
        assert_eq!(*count.value(), 5);
        assert_eq!(store.get::<u32>("count"), Some(5));
    }

    #[test]
    fn test_null_removes_key() {
        let store = store();
        let mut user = StoredValue::load(store.clone(), "user", Some("ada".to_string()), SetOptions::new());
        user.set(Some("ada".to_string())).unwrap();
        assert!(store.has("user"));

        user.set(None).unwrap();
        assert!(!store.has("user"));
        assert_eq!(user.value(), &None);
    }

    #[test]
    fn test_remove_resets_to_default() {
        let store = store();
        let mut volume = StoredValue::load(store.clone(), "volume", 50, SetOptions::new());
        volume.set(80).unwrap();

        volume.remove().unwrap();
        assert_eq!(*volume.value(), 50);
        assert!(!store.has("volume"));
    }

    #[test]
    fn test_reload_sees_external_writes() {
        let store = store();
        let mut flag = StoredValue::load(store.clone(), "flag", false, SetOptions::new());

        store.set("flag", &true, &SetOptions::new()).unwrap();
        assert!(!*flag.value());
        assert!(*flag.reload());
    }
}
