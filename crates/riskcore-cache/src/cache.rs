//! The analysis cache itself (§4.10): a `DashMap` of fingerprint to
//! entry, atomic hit/miss/update/eviction counters, and a capacity bound
//! on both entry count and approximate byte size — generalized from
//! `convex-engine::cache::CurveCache`'s single-TTL, curve-keyed design
//! to a per-`AnalysisKind` TTL over `AnalysisResult` payloads.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::RwLock;

use riskcore_core::result::AnalysisResult;
use riskcore_core::RiskError;
use riskcore_traits::config::{AnalysisKind, EngineConfig};

/// One cached analysis result plus the bookkeeping needed for TTL and
/// LRU eviction.
struct CacheEntry {
    result: AnalysisResult,
    kind: AnalysisKind,
    cached_at: Instant,
    last_accessed: RwLock<Instant>,
    access_count: AtomicU64,
    size_bytes: u64,
}

impl CacheEntry {
    fn new(result: AnalysisResult, kind: AnalysisKind, size_bytes: u64) -> Self {
        let now = Instant::now();
        Self {
            result,
            kind,
            cached_at: now,
            last_accessed: RwLock::new(now),
            access_count: AtomicU64::new(0),
            size_bytes,
        }
    }

    fn age(&self) -> Duration {
        self.cached_at.elapsed()
    }

    fn touch(&self) -> AnalysisResult {
        *self.last_accessed.write() = Instant::now();
        self.access_count.fetch_add(1, Ordering::Relaxed);
        self.result.clone()
    }

    /// A fingerprint-matching self-check (§7's "cache entry fails its
    /// self-validation" trigger): an entry whose stored result carries a
    /// different fingerprint than the key it is stored under has been
    /// corrupted in transit or at rest.
    fn is_valid_for(&self, fingerprint: &str) -> bool {
        self.result.fingerprint == fingerprint
    }
}

/// Cache statistics, exposed for monitoring.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of entries currently cached.
    pub entry_count: usize,
    /// Approximate bytes in use.
    pub bytes_in_use: u64,
    /// Total cache hits.
    pub hits: u64,
    /// Total cache misses (including TTL expiry and corruption).
    pub misses: u64,
    /// Total writes (new entries, not overwrites of identical keys).
    pub updates: u64,
    /// Total evictions (capacity, TTL expiry, or quarantine).
    pub evictions: u64,
}

impl CacheStats {
    /// Hit rate in `[0, 1]`; `0.0` when no lookups have occurred.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// The in-memory analysis cache (C10). Disk persistence of evicted or
/// long-lived entries is a separate concern, handled by a
/// `riskcore_traits::storage::BlobStore` implementation the caller
/// wires in (`riskcore-ext-redb`/`riskcore-ext-file`) — this type only
/// owns the hot in-process tier.
pub struct AnalysisCache {
    entries: DashMap<String, Arc<CacheEntry>>,
    ttl_by_kind: std::collections::BTreeMap<AnalysisKind, Duration>,
    entry_limit: usize,
    capacity_bytes: u64,
    bytes_in_use: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    updates: AtomicU64,
    evictions: AtomicU64,
}

impl AnalysisCache {
    /// Builds a cache sized and timed-out per `config`.
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            entries: DashMap::new(),
            ttl_by_kind: config.cache_ttl_seconds_by_kind.clone(),
            entry_limit: config.cache_entry_limit,
            capacity_bytes: config.cache_capacity_bytes,
            bytes_in_use: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            updates: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Looks up `fingerprint`. Returns `None` on a cold key, an expired
    /// entry (evicted as a side effect), or an entry that fails its
    /// fingerprint self-check (quarantined as a side effect via
    /// `RiskError::CacheCorrupt`, logged and treated as a miss per §7).
    pub fn get(&self, fingerprint: &str) -> Option<AnalysisResult> {
        let entry = match self.entries.get(fingerprint) {
            Some(entry) => Arc::clone(&entry),
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        if !entry.is_valid_for(fingerprint) {
            tracing::warn!(fingerprint, "cache entry failed fingerprint self-check, quarantining");
            self.remove_entry(fingerprint, &entry);
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        if let Some(ttl) = self.ttl_by_kind.get(&entry.kind) {
            if entry.age() > *ttl {
                self.remove_entry(fingerprint, &entry);
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        }

        self.hits.fetch_add(1, Ordering::Relaxed);
        Some(entry.touch())
    }

    /// Stores `result` under `fingerprint`, evicting by approximate LRU
    /// until both the entry-count and byte-size caps are satisfied.
    ///
    /// # Errors
    ///
    /// Returns `RiskError::NumericalFailure` only if estimating the
    /// entry's size (a JSON serialization) itself fails; a result that
    /// already passed `to_api()` upstream will not hit this path in
    /// practice.
    pub fn put(&self, fingerprint: String, kind: AnalysisKind, result: AnalysisResult) -> Result<(), RiskError> {
        let size_bytes = result
            .to_api()
            .map(|v| v.to_string().len() as u64)
            .map_err(|e| RiskError::numerical_failure(format!("cache entry size estimation failed: {e}")))?;

        self.evict_to_fit(size_bytes);

        let entry = Arc::new(CacheEntry::new(result, kind, size_bytes));
        self.bytes_in_use.fetch_add(size_bytes, Ordering::Relaxed);
        if let Some(old) = self.entries.insert(fingerprint, entry) {
            self.bytes_in_use.fetch_sub(old.size_bytes, Ordering::Relaxed);
        }
        self.updates.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Current statistics snapshot.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.entries.len(),
            bytes_in_use: self.bytes_in_use.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Number of entries currently cached.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache currently holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn remove_entry(&self, fingerprint: &str, entry: &CacheEntry) {
        if self.entries.remove(fingerprint).is_some() {
            self.bytes_in_use.fetch_sub(entry.size_bytes, Ordering::Relaxed);
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn evict_to_fit(&self, incoming_bytes: u64) {
        while self.entries.len() >= self.entry_limit
            || self.bytes_in_use.load(Ordering::Relaxed) + incoming_bytes > self.capacity_bytes
        {
            let oldest = self
                .entries
                .iter()
                .map(|r| (r.key().clone(), *r.value().last_accessed.read()))
                .max_by_key(|(_, last_accessed)| last_accessed.elapsed())
                .map(|(key, _)| key);

            match oldest {
                Some(key) => {
                    if let Some((_, entry)) = self.entries.remove(&key) {
                        self.bytes_in_use.fetch_sub(entry.size_bytes, Ordering::Relaxed);
                        self.evictions.fetch_add(1, Ordering::Relaxed);
                    }
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use riskcore_core::result::{AnalysisResultKind, FiniteF64, RiskCategory};
    use riskcore_core::types::{Date, DateRange};

    fn sample_result(fingerprint: &str) -> AnalysisResult {
        AnalysisResult {
            kind: AnalysisResultKind::RiskScore {
                score: FiniteF64::new(72.0).unwrap(),
                component_scores: vec![],
                rationale: vec![],
                category: RiskCategory::Moderate,
            },
            fingerprint: fingerprint.to_string(),
            as_of: 1_700_000_000,
            inputs_digest: "digest".to_string(),
        }
    }

    fn config() -> EngineConfig {
        let range = DateRange::new(Date::from_ymd(2014, 1, 31).unwrap(), Date::from_ymd(2024, 1, 31).unwrap()).unwrap();
        EngineConfig::with_defaults(range)
    }

    #[test]
    fn test_put_then_get_hits() {
        let cache = AnalysisCache::new(&config());
        cache.put("fp1".to_string(), AnalysisKind::RiskScore, sample_result("fp1")).unwrap();
        assert!(cache.get("fp1").is_some());
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_get_missing_is_a_miss() {
        let cache = AnalysisCache::new(&config());
        assert!(cache.get("missing").is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_mismatched_fingerprint_is_quarantined_as_corrupt() {
        let cache = AnalysisCache::new(&config());
        // Stored under "fp1" but the payload claims "fp2" - simulates
        // corruption in transit.
        cache.put("fp1".to_string(), AnalysisKind::RiskScore, sample_result("fp2")).unwrap();
        assert!(cache.get("fp1").is_none());
        assert_eq!(cache.stats().evictions, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_entry_limit_evicts_oldest() {
        let mut config = config();
        config.cache_entry_limit = 2;
        let cache = AnalysisCache::new(&config);
        cache.put("fp1".to_string(), AnalysisKind::RiskScore, sample_result("fp1")).unwrap();
        cache.put("fp2".to_string(), AnalysisKind::RiskScore, sample_result("fp2")).unwrap();
        cache.put("fp3".to_string(), AnalysisKind::RiskScore, sample_result("fp3")).unwrap();
        assert!(cache.len() <= 2);
        assert!(cache.get("fp3").is_some());
    }
}
