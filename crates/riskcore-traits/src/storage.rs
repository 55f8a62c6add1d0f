//! Portfolio store trait (§6): the engine only reads.

use async_trait::async_trait;

use riskcore_core::types::Portfolio;

use crate::error::TraitError;

/// Opaque portfolio identifier assigned by the store on save.
pub type PortfolioId = String;

/// Portfolio persistence. The engine is a read-only consumer; `save` is
/// exposed for the CLI/ingestion path that populates the store, not for
/// use by any analysis kernel.
#[async_trait]
pub trait PortfolioStore: Send + Sync {
    /// Loads a portfolio by id.
    ///
    /// # Errors
    ///
    /// `TraitError::NotFound` if no portfolio is stored under `id`.
    async fn load(&self, portfolio_id: &PortfolioId) -> Result<Portfolio, TraitError>;

    /// Saves a portfolio, returning its assigned id.
    async fn save(&self, portfolio: &Portfolio) -> Result<PortfolioId, TraitError>;
}

/// Content-addressed blob persistence for the analysis cache's (C10)
/// disk tier (§6). Keys are cache fingerprints; values are
/// self-describing serialized blobs (header with engine version,
/// `inputs_digest`, `as_of`, length).
///
/// Implementors need not be concurrency-safe against themselves beyond
/// what the underlying store already guarantees — the in-memory cache
/// layer above serializes writes per key via its single-flight registry.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Reads a blob by key. Returns `Ok(None)` for a cold key, not an
    /// error.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, TraitError>;

    /// Writes (or overwrites) a blob.
    async fn put(&self, key: &str, value: &[u8]) -> Result<(), TraitError>;

    /// Deletes a blob, e.g. on capacity eviction.
    async fn remove(&self, key: &str) -> Result<(), TraitError>;

    /// Quarantines a blob that failed self-validation (§7): the entry is
    /// marked or renamed, never silently deleted, so it remains
    /// available for operator inspection. The computation that found it
    /// corrupt proceeds as a cache miss.
    async fn quarantine(&self, key: &str) -> Result<(), TraitError>;
}
