//! Persistence adapters for MikroAuth.
//!
//! The session layer never keeps tokens in memory between calls. Every
//! operation reads them from a [`Storage`] and writes them back, so the
//! store is the single source of truth. If something else clears it
//! (another process, a user wiping app data), the next call sees that.
//!
//! Two backends ship with the crate:
//!
//! - [`MemoryStorage`]: a process-local map, for tests and short-lived
//!   tools.
//! - [`FileStorage`]: one file per key inside a namespace directory.
//!
//! Anything else (OS keychain, encrypted blobs, browser storage) plugs in
//! by implementing the trait.

mod error;
mod file;
mod memory;

pub use error::StorageError;
pub use file::FileStorage;
pub use memory::MemoryStorage;

use std::future::Future;
use std::sync::Arc;

/// Stores opaque string values under string keys, within one namespace.
///
/// Every method may do I/O and is therefore async. The session layer calls
/// these from Tokio tasks, so the returned futures must be `Send`.
///
/// # Idempotence
///
/// Callers may retry any operation. In particular, `remove` on a key that
/// doesn't exist and `clear` on an empty namespace both succeed.
///
/// # Example
///
/// ```rust
/// use mikroauth_storage::{MemoryStorage, Storage};
///
/// # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// # rt.block_on(async {
/// let storage = MemoryStorage::new();
/// storage.store("greeting", "hello").await.unwrap();
/// assert_eq!(storage.fetch("greeting").await.unwrap().as_deref(), Some("hello"));
///
/// storage.remove("greeting").await.unwrap();
/// storage.remove("greeting").await.unwrap(); // still fine
/// assert_eq!(storage.fetch("greeting").await.unwrap(), None);
/// # });
/// ```
pub trait Storage: Send + Sync + 'static {
    /// Writes `value` under `key`, replacing any previous value.
    fn store(
        &self,
        key: &str,
        value: &str,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Reads the value under `key`, or `None` if nothing is stored.
    fn fetch(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, StorageError>> + Send;

    /// Deletes the value under `key`. Absent keys are not an error.
    fn remove(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Deletes every value in the namespace, not just one key.
    fn clear(&self) -> impl Future<Output = Result<(), StorageError>> + Send;
}

impl<T: Storage> Storage for Arc<T> {
    fn store(
        &self,
        key: &str,
        value: &str,
    ) -> impl Future<Output = Result<(), StorageError>> + Send {
        (**self).store(key, value)
    }

    fn fetch(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, StorageError>> + Send {
        (**self).fetch(key)
    }

    fn remove(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<(), StorageError>> + Send {
        (**self).remove(key)
    }

    fn clear(&self) -> impl Future<Output = Result<(), StorageError>> + Send {
        (**self).clear()
    }
}
