//! The engine pipeline (C11's caller-facing surface): one public async
//! method per analysis kind, each wrapping the Analysis Cache and
//! single-flight join point around a pure computation, generalized from
//! `convex_engine::PricingEngine`'s own "check cache, join in-flight,
//! else compute and populate" dispatch.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio_util::sync::CancellationToken;

use riskcore_cache::{fingerprint, AnalysisCache, SingleFlight};
use riskcore_core::result::{AnalysisResult, AnalysisResultKind, FiniteF64, OptimizationKind};
use riskcore_core::types::{DateRange, Portfolio, ProxySet, Ticker};
use riskcore_core::{RiskError, RiskResult};
use riskcore_traits::config::AnalysisKind;
use riskcore_traits::reference::ReferenceMappings;
use riskcore_traits::storage::BlobStore;
use riskcore_traits::{EngineConfig, PriceProvider};

use riskcore_scenario::ScenarioSpec;

/// Entry-point pipeline for every analysis kind (C5 through C9),
/// cache-backed and single-flighted per §4.10 and §5.
///
/// Construct via [`crate::RiskEngineBuilder`], not directly.
pub struct RiskEngine {
    config: EngineConfig,
    provider: Arc<dyn PriceProvider>,
    reference: Arc<dyn ReferenceMappings>,
    blob_store: Option<Arc<dyn BlobStore>>,
    default_exchange: String,
    cache: AnalysisCache,
    single_flight: SingleFlight,
}

impl RiskEngine {
    pub(crate) fn new(
        config: EngineConfig,
        provider: Arc<dyn PriceProvider>,
        reference: Arc<dyn ReferenceMappings>,
        blob_store: Option<Arc<dyn BlobStore>>,
        default_exchange: String,
    ) -> Self {
        let cache = AnalysisCache::new(&config);
        Self {
            config,
            provider,
            reference,
            blob_store,
            default_exchange,
            cache,
            single_flight: SingleFlight::new(),
        }
    }

    /// Current in-memory cache statistics.
    #[must_use]
    pub fn cache_stats(&self) -> riskcore_cache::CacheStats {
        self.cache.stats()
    }

    /// Runs a standalone risk analysis (C5/C6/C9, §4.5-§4.6) over
    /// `portfolio`.
    ///
    /// # Errors
    ///
    /// Returns `RiskError::Cancelled` if `cancellation` fires before the
    /// result is available. Propagates any `RiskError` from factor
    /// assembly, the risk engine, or limit evaluation on a cache miss.
    pub async fn analyze(&self, portfolio: &Portfolio, cancellation: &CancellationToken) -> RiskResult<AnalysisResult> {
        let fp = fingerprint::compute(portfolio, AnalysisKind::RiskAnalysis, None)?;
        let provider = Arc::clone(&self.provider);
        let reference = Arc::clone(&self.reference);
        let config = self.config.clone();
        let portfolio = portfolio.clone();
        self.dispatch(fp, AnalysisKind::RiskAnalysis, cancellation, move || async move {
            let analysis = riskcore_risk::build_analysis(&portfolio, provider.as_ref(), reference.as_ref(), &config).await?;
            Ok(AnalysisResultKind::RiskAnalysis(analysis))
        })
        .await
    }

    /// Runs a before/after scenario comparison (C7, §4.7) of `spec`
    /// applied to `base`.
    ///
    /// # Errors
    ///
    /// Returns `RiskError::Cancelled` if `cancellation` fires before the
    /// result is available, `RiskError::InputInvalid` if `spec` cannot
    /// be canonicalized for fingerprinting. Propagates any `RiskError`
    /// from scenario application or either leg's risk analysis on a
    /// cache miss.
    pub async fn run_scenario(
        &self,
        base: &Portfolio,
        spec: &ScenarioSpec,
        cancellation: &CancellationToken,
    ) -> RiskResult<AnalysisResult> {
        let spec_value = serde_json::to_value(spec)
            .map_err(|e| RiskError::input_invalid(format!("scenario spec is not serializable: {e}")))?;
        let fp = fingerprint::compute(base, AnalysisKind::Scenario, Some(&spec_value))?;

        let provider = Arc::clone(&self.provider);
        let reference = Arc::clone(&self.reference);
        let config = self.config.clone();
        let default_exchange = self.default_exchange.clone();
        let base = base.clone();
        let spec = spec.clone();
        self.dispatch(fp, AnalysisKind::Scenario, cancellation, move || async move {
            let output = riskcore_scenario::run(&base, &spec, provider.as_ref(), reference.as_ref(), &config, &default_exchange).await?;
            Ok(AnalysisResultKind::Scenario {
                before: output.before,
                after: output.after,
                new_tickers_assigned: output.new_tickers_assigned,
            })
        })
        .await
    }

    /// Solves a convex optimization program (C8, §4.8) over
    /// `portfolio`'s tickers.
    ///
    /// # Errors
    ///
    /// Returns `RiskError::Cancelled` if `cancellation` fires before or
    /// during the solve, `RiskError::Infeasible` if the program has no
    /// interior. Propagates any `RiskError` from factor assembly on a
    /// cache miss.
    pub async fn optimize(
        &self,
        portfolio: &Portfolio,
        kind: OptimizationKind,
        cancellation: &CancellationToken,
    ) -> RiskResult<AnalysisResult> {
        let kind_value = serde_json::to_value(kind)
            .map_err(|e| RiskError::numerical_failure(format!("optimization kind serialization failed: {e}")))?;
        let fp = fingerprint::compute(portfolio, AnalysisKind::Optimization, Some(&kind_value))?;

        let provider = Arc::clone(&self.provider);
        let reference = Arc::clone(&self.reference);
        let config = self.config.clone();
        let portfolio = portfolio.clone();
        let cancellation_owned = cancellation.clone();
        self.dispatch(fp, AnalysisKind::Optimization, cancellation, move || async move {
            let portfolio = riskcore_traits::reference::resolve_base_portfolio_cash_proxies(&portfolio, reference.as_ref())?;
            let factor_model = riskcore_factors::assemble(&portfolio, provider.as_ref(), &config, &portfolio.range).await?;
            let outcome = match kind {
                OptimizationKind::MinVar => {
                    riskcore_optimize::minvar::solve(&portfolio, &factor_model, provider.as_ref(), &config, &cancellation_owned).await?
                }
                OptimizationKind::MaxRet => {
                    riskcore_optimize::maxret::solve(&portfolio, &factor_model, provider.as_ref(), &config, &cancellation_owned).await?
                }
            };

            let mut weights = BTreeMap::new();
            for (ticker, w) in outcome.weights {
                weights.insert(ticker, FiniteF64::new(w)?);
            }

            Ok(AnalysisResultKind::Optimization {
                kind,
                weights,
                achieved_risk: FiniteF64::new(outcome.achieved_risk)?,
                achieved_return: FiniteF64::new(outcome.achieved_return)?,
                binding_constraints: outcome.binding_constraints,
            })
        })
        .await
    }

    /// Computes the composite risk score (C9, §4.9) for `portfolio`.
    ///
    /// # Errors
    ///
    /// Returns `RiskError::Cancelled` if `cancellation` fires before the
    /// result is available. Propagates any `RiskError` from factor
    /// assembly or the risk engine on a cache miss.
    pub async fn risk_score(&self, portfolio: &Portfolio, cancellation: &CancellationToken) -> RiskResult<AnalysisResult> {
        let fp = fingerprint::compute(portfolio, AnalysisKind::RiskScore, None)?;
        let provider = Arc::clone(&self.provider);
        let reference = Arc::clone(&self.reference);
        let config = self.config.clone();
        let portfolio = portfolio.clone();
        self.dispatch(fp, AnalysisKind::RiskScore, cancellation, move || async move {
            let portfolio = riskcore_traits::reference::resolve_base_portfolio_cash_proxies(&portfolio, reference.as_ref())?;
            let factor_model = riskcore_factors::assemble(&portfolio, provider.as_ref(), &config, &portfolio.range).await?;
            let output = riskcore_risk::engine::compute(&portfolio, &factor_model, &config)?;
            let (score, component_scores, category) = riskcore_risk::score::compute(&output, &portfolio.risk_limits)?;
            let rationale = riskcore_risk::score::rationale(&component_scores);
            Ok(AnalysisResultKind::RiskScore {
                score,
                component_scores,
                rationale,
                category,
            })
        })
        .await
    }

    /// Fits a standalone single-ticker factor model (C4, surfaced
    /// directly as `AnalysisResultKind::Stock`): builds a synthetic
    /// weight-1.0 portfolio for `ticker` and runs factor assembly only,
    /// never the risk engine or limit checks (there is nothing to
    /// weight or limit-check for a single instrument viewed in
    /// isolation).
    ///
    /// # Errors
    ///
    /// Returns `RiskError::Cancelled` if `cancellation` fires before the
    /// result is available, `RiskError::InputInvalid` if the synthetic
    /// portfolio fails to build. Propagates any `RiskError` from factor
    /// assembly, including `DataUnavailable`/`InsufficientData` if
    /// `ticker` has no usable history over `range`.
    pub async fn analyze_stock(
        &self,
        ticker: &Ticker,
        proxies: ProxySet,
        range: DateRange,
        cancellation: &CancellationToken,
    ) -> RiskResult<AnalysisResult> {
        let synthetic = Portfolio::builder()
            .weight(ticker.clone(), rust_decimal::Decimal::ONE)
            .proxy(ticker.clone(), proxies)
            .range(range)
            .risk_limits(stock_lookup_limits())
            .build()?;

        let fp = fingerprint::compute(&synthetic, AnalysisKind::Stock, None)?;
        let provider = Arc::clone(&self.provider);
        let config = self.config.clone();
        let ticker_owned = ticker.clone();
        self.dispatch(fp, AnalysisKind::Stock, cancellation, move || async move {
            let factor_model = riskcore_factors::assemble(&synthetic, provider.as_ref(), &config, &synthetic.range).await?;
            let beta_vector = factor_model.betas.get(&ticker_owned).ok_or_else(|| {
                RiskError::data_unavailable(ticker_owned.as_str(), synthetic.range.to_string())
            })?;

            let mut betas = BTreeMap::new();
            for (factor, beta) in &beta_vector.betas {
                betas.insert(factor.clone(), FiniteF64::new(*beta)?);
            }

            Ok(AnalysisResultKind::Stock {
                ticker: ticker_owned,
                betas,
                idiosyncratic_vol: FiniteF64::new(beta_vector.residual_vol)?,
                period: synthetic.range.to_string(),
            })
        })
        .await
    }

    /// Shared cache/disk-tier/single-flight dispatch, per §4.10 and §5:
    /// a memory-cache hit returns immediately; a memory-cache miss
    /// consults the disk tier (if configured), self-validating the
    /// stored blob's own fingerprint before trusting it and quarantining
    /// it on mismatch (§7); a total miss single-flights the actual
    /// computation and backfills both tiers.
    async fn dispatch<F, Fut>(
        &self,
        fp: String,
        kind: AnalysisKind,
        cancellation: &CancellationToken,
        build: F,
    ) -> RiskResult<AnalysisResult>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = RiskResult<AnalysisResultKind>> + Send + 'static,
    {
        if cancellation.is_cancelled() {
            return Err(RiskError::Cancelled);
        }

        if let Some(cached) = self.cache.get(&fp) {
            return Ok(cached);
        }

        if let Some(store) = self.blob_store.clone() {
            if let Some(result) = self.read_disk_tier(store.as_ref(), &fp).await {
                self.cache.put(fp.clone(), kind, result.clone())?;
                return Ok(result);
            }
        }

        let fp_for_leader = fp.clone();
        let result = self
            .single_flight
            .run(fp.clone(), move || async move {
                let payload = build().await?;
                let inputs_digest = fingerprint::inputs_digest(&payload)?;
                Ok(AnalysisResult {
                    kind: payload,
                    fingerprint: fp_for_leader,
                    as_of: current_unix_timestamp(),
                    inputs_digest,
                })
            })
            .await?;

        self.cache.put(fp.clone(), kind, result.clone())?;
        if let Some(store) = &self.blob_store {
            self.write_disk_tier(store.as_ref(), &fp, &result).await;
        }
        Ok(result)
    }

    async fn read_disk_tier(&self, store: &dyn BlobStore, fp: &str) -> Option<AnalysisResult> {
        let bytes = match store.get(fp).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(fingerprint = fp, error = %err, "disk cache tier read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_slice::<AnalysisResult>(&bytes) {
            Ok(result) if result.fingerprint == fp => Some(result),
            Ok(_) => {
                tracing::warn!(fingerprint = fp, "disk cache entry fingerprint mismatch, quarantining");
                self.quarantine(store, fp).await;
                None
            }
            Err(err) => {
                tracing::warn!(fingerprint = fp, error = %err, "disk cache entry failed to deserialize, quarantining");
                self.quarantine(store, fp).await;
                None
            }
        }
    }

    async fn quarantine(&self, store: &dyn BlobStore, fp: &str) {
        if let Err(err) = store.quarantine(fp).await {
            tracing::warn!(fingerprint = fp, error = %err, "failed to quarantine corrupt disk cache entry");
        }
    }

    async fn write_disk_tier(&self, store: &dyn BlobStore, fp: &str, result: &AnalysisResult) {
        match serde_json::to_vec(result) {
            Ok(bytes) => {
                if let Err(err) = store.put(fp, &bytes).await {
                    tracing::warn!(fingerprint = fp, error = %err, "disk cache tier write failed");
                }
            }
            Err(err) => tracing::warn!(fingerprint = fp, error = %err, "failed to serialize result for disk cache tier"),
        }
    }
}

/// Risk limits attached to the synthetic single-ticker portfolio used
/// by `analyze_stock`: never evaluated (factor assembly doesn't consult
/// them), so any valid-per-`RiskLimits::validate` values will do.
fn stock_lookup_limits() -> riskcore_core::types::RiskLimits {
    riskcore_core::types::RiskLimits {
        max_portfolio_volatility: 1.0,
        max_loss: -1.0,
        max_single_stock_weight: 1.0,
        max_factor_contribution: 1.0,
        max_market_contribution: 1.0,
        max_industry_contribution: 1.0,
        max_single_factor_loss: -1.0,
    }
}

fn current_unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
