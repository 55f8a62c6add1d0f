//! Single-flight join points (§4.10, §5): concurrent requests for the
//! same fingerprint produce exactly one computation. Late arrivals await
//! the in-flight computation and receive its result; cancellation of the
//! caller that happened to start it does not abort the computation while
//! others still await it.
//!
//! No teacher precedent exists for this exact structure in
//! `convex-engine::cache`; the broadcast-channel wrapping pattern is
//! grounded on `convex_traits::market_data::QuoteReceiver`, the only
//! `tokio::sync::broadcast` usage in the teacher's own source.

use std::future::Future;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::broadcast;

use riskcore_core::result::AnalysisResult;
use riskcore_core::{RiskError, RiskResult};

/// Registry of in-flight computations, keyed by cache fingerprint.
///
/// The computation itself always runs on a detached `tokio::spawn` task,
/// never directly inside a caller's `run` future: a caller that drops
/// its `run` future (cancellation, timeout) stops *waiting*, but the
/// spawned task keeps running to completion and any other caller still
/// subscribed receives the result when it lands.
pub struct SingleFlight {
    registry: Arc<DashMap<String, broadcast::Sender<Arc<RiskResult<AnalysisResult>>>>>,
}

impl SingleFlight {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: Arc::new(DashMap::new()),
        }
    }

    /// Runs `compute` for `fingerprint` if no computation is already in
    /// flight for it; otherwise joins the in-flight computation and
    /// returns its result once it completes.
    ///
    /// `compute` must be `'static` because it is handed to
    /// `tokio::spawn` the moment this caller becomes the leader — it
    /// should only close over owned/`Arc`-shared state.
    pub async fn run<F, Fut>(&self, fingerprint: impl Into<String>, compute: F) -> RiskResult<AnalysisResult>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = RiskResult<AnalysisResult>> + Send + 'static,
    {
        let fingerprint = fingerprint.into();
        loop {
            if let Some(sender) = self.registry.get(&fingerprint).map(|entry| entry.clone()) {
                let mut receiver = sender.subscribe();
                drop(sender);
                match receiver.recv().await {
                    Ok(result) => return (*result).clone(),
                    Err(broadcast::error::RecvError::Closed) => continue,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }

            let (sender, _) = broadcast::channel(1);
            let became_leader = match self.registry.entry(fingerprint.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(sender.clone());
                    true
                }
                Entry::Occupied(_) => false,
            };
            if !became_leader {
                continue;
            }

            let registry = Arc::clone(&self.registry);
            let leader_key = fingerprint.clone();
            let mut receiver = sender.subscribe();
            tokio::spawn(async move {
                let result = compute().await;
                let _ = sender.send(Arc::new(result));
                registry.remove(&leader_key);
            });

            return match receiver.recv().await {
                Ok(result) => (*result).clone(),
                Err(_) => Err(RiskError::numerical_failure(
                    "single-flight leader task ended without producing a result",
                )),
            };
        }
    }

    /// Number of computations currently in flight.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Whether no computation is currently in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }
}

impl Default for SingleFlight {
    fn default() -> Self {
        Self::new()
    }
}
