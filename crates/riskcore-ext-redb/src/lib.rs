//! # Riskcore Ext Redb
//!
//! Embedded [`redb`] storage for the analysis cache's disk tier (§4.10,
//! §6): a `BlobStore` over a single content-addressed table, plus a
//! quarantine table for entries that failed self-validation.
//!
//! Grounded on `convex-ext-redb`'s table/transaction pattern
//! (`TableDefinition<&str, &[u8]>`, `begin_read`/`begin_write`,
//! `TableError::TableDoesNotExist` mapped to a cold-key `Ok(None)`).
//! `riskcore_traits::error::TraitError` carries no dedicated
//! database/parse/serialization variants the way the teacher's own
//! `TraitError` does, so every redb and serialization failure here maps
//! onto `TraitError::ConnectionFailed` — the closest existing variant
//! for "the backing store could not satisfy this request".

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition};

use riskcore_traits::error::TraitError;
use riskcore_traits::storage::BlobStore;

const BLOBS: TableDefinition<&str, &[u8]> = TableDefinition::new("analysis_cache_blobs");
const QUARANTINE: TableDefinition<&str, &[u8]> = TableDefinition::new("analysis_cache_quarantine");

/// A [`BlobStore`] backed by a single-file `redb` database.
pub struct RedbBlobStore {
    db: Arc<Database>,
}

impl RedbBlobStore {
    /// Wraps an already-open database.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Opens (creating if absent) a `redb` database file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `TraitError::ConnectionFailed` if the file cannot be
    /// created or opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TraitError> {
        let db = Database::create(path).map_err(|e| TraitError::ConnectionFailed(e.to_string()))?;
        Ok(Self::new(Arc::new(db)))
    }

    /// Opens an in-memory-backed database at a fresh temp file, for
    /// tests and short-lived processes that still want the disk-tier
    /// code path exercised.
    ///
    /// # Errors
    ///
    /// Returns `TraitError::ConnectionFailed` if the temp file cannot be
    /// created.
    pub fn open_temp() -> Result<Self, TraitError> {
        let tmp = tempfile_path().map_err(|e| TraitError::ConnectionFailed(e.to_string()))?;
        Self::open(tmp)
    }
}

fn tempfile_path() -> std::io::Result<std::path::PathBuf> {
    let dir = std::env::temp_dir();
    let name = format!("riskcore-cache-{}.redb", std::process::id());
    Ok(dir.join(name))
}

#[async_trait]
impl BlobStore for RedbBlobStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, TraitError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| TraitError::ConnectionFailed(e.to_string()))?;

        let table = match read_txn.open_table(BLOBS) {
            Ok(t) => t,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(TraitError::ConnectionFailed(e.to_string())),
        };

        match table.get(key) {
            Ok(Some(value)) => Ok(Some(value.value().to_vec())),
            Ok(None) => Ok(None),
            Err(e) => Err(TraitError::ConnectionFailed(e.to_string())),
        }
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), TraitError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| TraitError::ConnectionFailed(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(BLOBS)
                .map_err(|e| TraitError::ConnectionFailed(e.to_string()))?;
            table
                .insert(key, value)
                .map_err(|e| TraitError::ConnectionFailed(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| TraitError::ConnectionFailed(e.to_string()))?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), TraitError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| TraitError::ConnectionFailed(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(BLOBS)
                .map_err(|e| TraitError::ConnectionFailed(e.to_string()))?;
            table
                .remove(key)
                .map_err(|e| TraitError::ConnectionFailed(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| TraitError::ConnectionFailed(e.to_string()))?;
        Ok(())
    }

    async fn quarantine(&self, key: &str) -> Result<(), TraitError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| TraitError::ConnectionFailed(e.to_string()))?;
        {
            let value = {
                let mut blobs = write_txn
                    .open_table(BLOBS)
                    .map_err(|e| TraitError::ConnectionFailed(e.to_string()))?;
                let value = blobs
                    .remove(key)
                    .map_err(|e| TraitError::ConnectionFailed(e.to_string()))?
                    .map(|v| v.value().to_vec());
                value
            };

            if let Some(value) = value {
                let mut quarantine = write_txn
                    .open_table(QUARANTINE)
                    .map_err(|e| TraitError::ConnectionFailed(e.to_string()))?;
                quarantine
                    .insert(key, value.as_slice())
                    .map_err(|e| TraitError::ConnectionFailed(e.to_string()))?;
            }
        }
        write_txn
            .commit()
            .map_err(|e| TraitError::ConnectionFailed(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> RedbBlobStore {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let db = Database::create(tmp.path()).unwrap();
        std::mem::forget(tmp);
        RedbBlobStore::new(Arc::new(db))
    }

    #[tokio::test]
    async fn test_put_then_get_round_trips() {
        let store = store();
        store.put("fp1", b"hello").await.unwrap();
        assert_eq!(store.get("fp1").await.unwrap(), Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn test_get_missing_key_is_none_not_error() {
        let store = store();
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_remove_deletes_entry() {
        let store = store();
        store.put("fp1", b"hello").await.unwrap();
        store.remove("fp1").await.unwrap();
        assert_eq!(store.get("fp1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_quarantine_moves_blob_out_of_main_table_without_deleting_it() {
        let store = store();
        store.put("fp1", b"corrupted").await.unwrap();
        store.quarantine("fp1").await.unwrap();

        assert_eq!(store.get("fp1").await.unwrap(), None);

        let read_txn = store.db.begin_read().unwrap();
        let quarantine = read_txn.open_table(QUARANTINE).unwrap();
        let value = quarantine.get("fp1").unwrap().unwrap();
        assert_eq!(value.value(), b"corrupted");
    }

    #[tokio::test]
    async fn test_quarantine_of_missing_key_is_a_no_op() {
        let store = store();
        store.quarantine("missing").await.unwrap();
        assert_eq!(store.get("missing").await.unwrap(), None);
    }
}
