//! # Riskcore Ext File
//!
//! File-backed [`BlobStore`] for the analysis cache's disk tier (§4.10,
//! §6): one file per blob under a root directory, keyed by cache
//! fingerprint. Intended for development, tests, and single-operator
//! deployments that don't want a `redb` file — `riskcore-ext-redb` is
//! the production-shaped alternative.
//!
//! Grounded on `convex-ext-file`'s file-backed-source construction
//! pattern (a source wraps a configured path and talks to it directly,
//! no intermediate database); since a cache blob has no tabular
//! structure the way a CSV quote record does, this store addresses
//! files by fingerprint rather than parsing rows.

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use riskcore_traits::error::TraitError;
use riskcore_traits::storage::BlobStore;

const QUARANTINE_DIR: &str = "quarantine";

/// A [`BlobStore`] that keeps each blob as its own file under `root`,
/// named after its fingerprint key. Fingerprints are hex SHA-256
/// digests (`riskcore_cache::fingerprint`), so they are always valid
/// filenames with no escaping needed.
pub struct FileBlobStore {
    root: PathBuf,
}

impl FileBlobStore {
    /// Opens (creating if absent) a file-backed store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns `TraitError::ConnectionFailed` if `root` or its
    /// quarantine subdirectory cannot be created.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, TraitError> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| TraitError::ConnectionFailed(e.to_string()))?;
        tokio::fs::create_dir_all(root.join(QUARANTINE_DIR))
            .await
            .map_err(|e| TraitError::ConnectionFailed(e.to_string()))?;
        Ok(Self { root })
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn quarantine_path(&self, key: &str) -> PathBuf {
        self.root.join(QUARANTINE_DIR).join(key)
    }
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, TraitError> {
        match tokio::fs::read(self.blob_path(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TraitError::ConnectionFailed(e.to_string())),
        }
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), TraitError> {
        tokio::fs::write(self.blob_path(key), value)
            .await
            .map_err(|e| TraitError::ConnectionFailed(e.to_string()))
    }

    async fn remove(&self, key: &str) -> Result<(), TraitError> {
        match tokio::fs::remove_file(self.blob_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TraitError::ConnectionFailed(e.to_string())),
        }
    }

    async fn quarantine(&self, key: &str) -> Result<(), TraitError> {
        match tokio::fs::rename(self.blob_path(key), self.quarantine_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TraitError::ConnectionFailed(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> (FileBlobStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBlobStore::open(dir.path()).await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn test_put_then_get_round_trips() {
        let (store, _dir) = store().await;
        store.put("fp1", b"hello").await.unwrap();
        assert_eq!(store.get("fp1").await.unwrap(), Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn test_get_missing_key_is_none_not_error() {
        let (store, _dir) = store().await;
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_remove_missing_key_is_a_no_op() {
        let (store, _dir) = store().await;
        store.remove("missing").await.unwrap();
    }

    #[tokio::test]
    async fn test_quarantine_moves_blob_out_of_main_store_without_deleting_it() {
        let (store, dir) = store().await;
        store.put("fp1", b"corrupted").await.unwrap();
        store.quarantine("fp1").await.unwrap();

        assert_eq!(store.get("fp1").await.unwrap(), None);
        let quarantined = tokio::fs::read(dir.path().join(QUARANTINE_DIR).join("fp1"))
            .await
            .unwrap();
        assert_eq!(quarantined, b"corrupted");
    }

    #[tokio::test]
    async fn test_quarantine_of_missing_key_is_a_no_op() {
        let (store, _dir) = store().await;
        store.quarantine("missing").await.unwrap();
    }
}
