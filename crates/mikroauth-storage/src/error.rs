//! Error types for the storage layer.

/// Errors that can occur while reading or writing persisted values.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The key can't be used by this backend (e.g. it would escape the
    /// namespace directory of a [`FileStorage`](crate::FileStorage)).
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),

    /// The backing medium failed.
    #[error("storage i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// The backend refused the operation for a reason of its own
    /// (locked keychain, quota exceeded, and so on).
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
