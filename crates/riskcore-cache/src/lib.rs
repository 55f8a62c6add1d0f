//! # Riskcore Cache
//!
//! The Analysis Cache (C10, §4.10): the only shared mutable state in the
//! core. Every other component is a pure function of its inputs given a
//! fixed provider view.
//!
//! - [`fingerprint`]: derives a stable cache key from a computation's
//!   logical inputs.
//! - [`cache`]: the in-memory `AnalysisCache` itself — hit/miss/eviction
//!   bookkeeping, per-kind TTL, capacity-bounded LRU eviction.
//! - [`singleflight`]: ensures concurrent requests for the same
//!   fingerprint share one computation.
//!
//! Disk persistence of cache entries as content-addressed blobs is a
//! separate concern behind `riskcore_traits::storage::BlobStore`
//! (implemented by `riskcore-ext-redb` and `riskcore-ext-file`), kept
//! out of this crate so the hot in-process tier has no I/O dependency.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod fingerprint;
pub mod singleflight;

pub use cache::{AnalysisCache, CacheStats};
pub use singleflight::SingleFlight;
