//! The persisted record format.
//!
//! Each key holds one JSON document:
//!
//! ```json
//! { "value": <any JSON>, "expire": 1735689600000 }
//! ```
//!
//! `expire` is an absolute epoch-millisecond instant and is omitted for
//! entries that never expire. A document without `value` is corrupt.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// One stored value with its optional expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry<T> {
    /// The payload.
    pub value: T,

    /// Epoch milliseconds after which the entry is gone.
    #[serde(rename = "expire", default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl<T> StoredEntry<T> {
    /// Create an entry that never expires.
    pub fn new(value: T) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    /// Set the absolute expiry instant.
    pub fn with_expires_at(mut self, expires_at: i64) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Whether the entry is expired at `now_millis`.
    ///
    /// The expiry instant itself still counts as live.
    pub fn is_expired(&self, now_millis: i64) -> bool {
        match self.expires_at {
            None => false,
            Some(expires_at) => now_millis > expires_at,
        }
    }
}

impl<T: Serialize> StoredEntry<T> {
    /// Serialize to the persisted text form.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl<T: DeserializeOwned> StoredEntry<T> {
    /// Parse the persisted text form.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}
