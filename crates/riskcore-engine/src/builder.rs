//! Fluent builder for [`crate::RiskEngine`], grounded on
//! `convex_engine::builder::PricingEngineBuilder`'s `Option<T>` fields,
//! `with_*` fluent setters, and a `build()` that validates required
//! fields via `ok_or_else`.

use std::sync::Arc;

use riskcore_traits::reference::ReferenceMappings;
use riskcore_traits::storage::BlobStore;
use riskcore_traits::{EngineConfig, PriceProvider};

use crate::error::EngineError;
use crate::pipeline::RiskEngine;

const DEFAULT_EXCHANGE: &str = "NYSE";

/// Builds a [`RiskEngine`] from its required collaborators.
#[derive(Default)]
pub struct RiskEngineBuilder {
    config: Option<EngineConfig>,
    provider: Option<Arc<dyn PriceProvider>>,
    reference: Option<Arc<dyn ReferenceMappings>>,
    blob_store: Option<Arc<dyn BlobStore>>,
    default_exchange: Option<String>,
}

impl RiskEngineBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the engine configuration (§6).
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the price provider (C1).
    #[must_use]
    pub fn with_price_provider(mut self, provider: impl PriceProvider + 'static) -> Self {
        self.provider = Some(Arc::new(provider));
        self
    }

    /// Sets the reference mappings (C2/C3).
    #[must_use]
    pub fn with_reference_mappings(mut self, reference: impl ReferenceMappings + 'static) -> Self {
        self.reference = Some(Arc::new(reference));
        self
    }

    /// Wires a disk tier for the analysis cache (§4.10). Optional: an
    /// engine with none configured runs with the in-process cache only.
    #[must_use]
    pub fn with_blob_store(mut self, blob_store: impl BlobStore + 'static) -> Self {
        self.blob_store = Some(Arc::new(blob_store));
        self
    }

    /// Sets the exchange used for auto-assigned factor proxies (§4.7)
    /// when a scenario introduces a new ticker with no existing
    /// portfolio peer to borrow proxies from. Defaults to `"NYSE"`.
    #[must_use]
    pub fn with_default_exchange(mut self, exchange: impl Into<String>) -> Self {
        self.default_exchange = Some(exchange.into());
        self
    }

    /// Builds the engine.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::ConfigError` if `config`, `provider`, or
    /// `reference` was never set.
    pub fn build(self) -> Result<RiskEngine, EngineError> {
        let config = self
            .config
            .ok_or_else(|| EngineError::ConfigError("config not configured".into()))?;
        let provider = self
            .provider
            .ok_or_else(|| EngineError::ConfigError("price_provider not configured".into()))?;
        let reference = self
            .reference
            .ok_or_else(|| EngineError::ConfigError("reference_mappings not configured".into()))?;
        let default_exchange = self.default_exchange.unwrap_or_else(|| DEFAULT_EXCHANGE.to_string());

        Ok(RiskEngine::new(config, provider, reference, self.blob_store, default_exchange))
    }
}
