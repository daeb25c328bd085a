//! File-backed storage: one file per key inside a namespace directory.
//!
//! Writes go to a hidden temp file first and are renamed into place, so a
//! crash mid-write leaves either the old value or the new one, never half
//! of each. On Unix the files are created with mode `0600` since they
//! usually hold bearer tokens.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use rand::Rng;
use tokio::io::AsyncWriteExt;

use crate::{Storage, StorageError};

/// Extension of entry files. `clear()` only deletes files with this
/// extension, so a namespace directory can sit next to unrelated files.
const ENTRY_EXTENSION: &str = "entry";

/// A [`Storage`] that persists each key as a file in `dir`.
///
/// The directory is the namespace: [`Storage::clear`] empties every entry
/// in it. It is created on the first write.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Creates a store rooted at `dir`. Nothing touches the disk until the
    /// first operation.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the namespace directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Maps a key to its entry file, rejecting keys that could escape the
    /// directory or collide with temp files.
    fn entry_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.{ENTRY_EXTENSION}")))
    }
}

impl Storage for FileStorage {
    async fn store(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.entry_path(key)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let suffix: u64 = rand::rng().random();
        let tmp = self.dir.join(format!(".{key}.{suffix:016x}.tmp"));

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o600);

        let written = async {
            let mut file = options.open(&tmp).await?;
            file.write_all(value.as_bytes()).await?;
            file.sync_all().await?;
            tokio::fs::rename(&tmp, &path).await
        }
        .await;

        if let Err(e) = written {
            // Best effort: don't leave temp files behind on failure.
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        tracing::debug!(key, "stored entry");
        Ok(())
    }

    async fn fetch(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.entry_path(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.entry_path(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(key, "removed entry");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0usize;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        tracing::debug!(dir = %self.dir.display(), removed, "cleared namespace");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_path_accepts_plain_keys() {
        let storage = FileStorage::new("/tmp/ns");
        let path = storage.entry_path("mikroauth_tokens").expect("valid key");
        assert_eq!(path, PathBuf::from("/tmp/ns/mikroauth_tokens.entry"));
    }

    #[test]
    fn test_entry_path_rejects_traversal_and_hidden_keys() {
        let storage = FileStorage::new("/tmp/ns");
        for key in ["", "../etc/passwd", "a/b", ".hidden", "sp ace"] {
            assert!(
                matches!(storage.entry_path(key), Err(StorageError::InvalidKey(_))),
                "key {key:?} should be rejected"
            );
        }
    }
}
