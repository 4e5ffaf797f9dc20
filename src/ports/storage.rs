use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Classified storage failure. `is_transient` decides retry eligibility:
/// transient errors are retried with backoff by the adapters, everything
/// else fails the operation immediately.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("not found: {reference}")]
    NotFound { reference: String },

    #[error("permission denied: {reference}")]
    PermissionDenied { reference: String },

    #[error("unsafe reference {reference:?}: {reason}")]
    UnsafeReference { reference: String, reason: String },

    #[error("fetched object is empty: {reference}")]
    EmptyObject { reference: String },

    #[error("transient storage failure for {reference}: {detail}")]
    Transient { reference: String, detail: String },
}

impl StorageError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Transient { .. })
    }
}

/// Uniform interface over storage backends (local filesystem, object
/// store). Backend selection happens once at configuration time.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StoragePort: Send + Sync {
    /// Fetch a stored object to a local path. Returns once the file is
    /// fully written and verified non-empty.
    async fn fetch(&self, reference: &str, local_path: &Path) -> Result<(), StorageError>;

    /// Upload a local file to storage. Returns the destination URL or
    /// resolved path.
    async fn upload(&self, local_path: &Path, reference: &str) -> Result<String, StorageError>;

    /// Whether an object exists in storage.
    async fn exists(&self, reference: &str) -> Result<bool, StorageError>;

    /// A URL granting time-limited read access. On the local backend this
    /// is a direct file reference with no signing or expiry.
    async fn signed_url(&self, reference: &str, ttl: Duration) -> Result<String, StorageError>;
}
