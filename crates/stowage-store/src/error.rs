//! Error types for store and backend operations.

/// Error raised by a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The write would push the backend past its capacity.
    #[error("Quota exceeded: write needs {needed} bytes, quota is {quota}")]
    QuotaExceeded { needed: usize, quota: usize },

    /// SQLite operation failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend cannot serve requests right now.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

impl BackendError {
    /// Whether this error signals a capacity problem.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}

/// Error type for namespaced store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The value could not be converted to its persisted JSON form.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The write failed, and so did the retry after purging expired entries.
    #[error("Write failed for '{key}': {source}")]
    WriteFailed {
        key: String,
        #[source]
        source: BackendError,
    },

    /// Error from the backend outside the write path.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Namespace rejected at construction.
    #[error("Invalid namespace '{0}': must be non-empty and must not contain ':'")]
    InvalidNamespace(String),

    /// A per-call namespace that differs from the store's own.
    #[error("Namespace override not supported: store uses '{expected}', options asked for '{found}'")]
    NamespaceOverride { expected: String, found: String },
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Result type for backend operations.
pub type BackendResult<T> = std::result::Result<T, BackendError>;
