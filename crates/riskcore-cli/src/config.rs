//! CLI-level configuration: which disk tier to wire up (if any), the
//! default exchange for auto-assigned proxies, and overrides onto
//! [`EngineConfig`]'s documented defaults (§6's "typed defaults
//! overridable by a config file" idiom — `EngineConfig::with_defaults`
//! stands in for the teacher's `EngineConfig::default()` since this
//! engine's config carries a date range with no sensible default of its
//! own).
//!
//! Grounded on `convex_server::config::ServerConfig`'s
//! serde-with-field-defaults, `from_file`/`default` shape.

use serde::{Deserialize, Serialize};

use riskcore_traits::EngineConfig;

/// Top-level CLI configuration, loadable from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Directory for the file-backed disk tier. Ignored if `redb_path`
    /// is also set; `redb_path` wins.
    pub cache_dir: Option<String>,

    /// Path to a `redb` database file for the disk tier.
    pub redb_path: Option<String>,

    /// Exchange used for auto-assigned factor proxies (§4.7) when a
    /// scenario introduces a ticker with no portfolio peer to borrow
    /// proxies from.
    #[serde(default = "default_exchange")]
    pub default_exchange: String,

    /// Scalar [`EngineConfig`] overrides. Any field left unset here keeps
    /// `EngineConfig::with_defaults`'s value; `hac_lag_formula`,
    /// `solver_tolerances`, and `cache_ttl_seconds_by_kind` are not
    /// exposed here since the command line has no per-field syntax for
    /// nested records — override those by constructing an `EngineConfig`
    /// programmatically instead.
    #[serde(default)]
    pub engine: EngineOverrides,
}

fn default_exchange() -> String {
    "NYSE".to_string()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            redb_path: None,
            default_exchange: default_exchange(),
            engine: EngineOverrides::default(),
        }
    }
}

/// Scalar overrides applied onto [`EngineConfig::with_defaults`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineOverrides {
    /// See [`EngineConfig::worst_case_lookback_years`].
    pub worst_case_lookback_years: Option<u32>,
    /// See [`EngineConfig::expected_returns_lookback_years`].
    pub expected_returns_lookback_years: Option<u32>,
    /// See [`EngineConfig::expected_returns_fallback_default`].
    pub expected_returns_fallback_default: Option<f64>,
    /// See [`EngineConfig::cash_proxy_fallback_return`].
    pub cash_proxy_fallback_return: Option<f64>,
    /// See [`EngineConfig::min_observations`].
    pub min_observations: Option<usize>,
    /// See [`EngineConfig::max_condition_number`].
    pub max_condition_number: Option<f64>,
    /// See [`EngineConfig::cache_capacity_bytes`].
    pub cache_capacity_bytes: Option<u64>,
    /// See [`EngineConfig::cache_entry_limit`].
    pub cache_entry_limit: Option<usize>,
    /// See [`EngineConfig::numeric_ridge`].
    pub numeric_ridge: Option<f64>,
}

impl EngineOverrides {
    /// Applies every set field onto `config` in place.
    pub fn apply(&self, config: &mut EngineConfig) {
        if let Some(v) = self.worst_case_lookback_years {
            config.worst_case_lookback_years = v;
        }
        if let Some(v) = self.expected_returns_lookback_years {
            config.expected_returns_lookback_years = v;
        }
        if let Some(v) = self.expected_returns_fallback_default {
            config.expected_returns_fallback_default = v;
        }
        if let Some(v) = self.cash_proxy_fallback_return {
            config.cash_proxy_fallback_return = v;
        }
        if let Some(v) = self.min_observations {
            config.min_observations = v;
        }
        if let Some(v) = self.max_condition_number {
            config.max_condition_number = v;
        }
        if let Some(v) = self.cache_capacity_bytes {
            config.cache_capacity_bytes = v;
        }
        if let Some(v) = self.cache_entry_limit {
            config.cache_entry_limit = v;
        }
        if let Some(v) = self.numeric_ridge {
            config.numeric_ridge = v;
        }
    }
}

impl CliConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not parse as
    /// valid TOML matching this shape.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_no_disk_tier() {
        let config = CliConfig::default();
        assert!(config.cache_dir.is_none());
        assert!(config.redb_path.is_none());
        assert_eq!(config.default_exchange, "NYSE");
    }

    #[test]
    fn test_from_file_parses_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("riskcore.toml");
        std::fs::write(&path, "redb_path = \"./data/cache.redb\"\n").unwrap();

        let config = CliConfig::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.redb_path.as_deref(), Some("./data/cache.redb"));
        assert_eq!(config.default_exchange, "NYSE");
    }

    #[test]
    fn test_engine_overrides_apply_only_set_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("riskcore.toml");
        std::fs::write(&path, "[engine]\nmin_observations = 36\n").unwrap();

        let cli_config = CliConfig::from_file(path.to_str().unwrap()).unwrap();
        let range = riskcore_core::types::DateRange::new(
            riskcore_core::types::Date::from_ymd(2014, 1, 31).unwrap(),
            riskcore_core::types::Date::from_ymd(2024, 1, 31).unwrap(),
        )
        .unwrap();
        let mut engine_config = EngineConfig::with_defaults(range);
        cli_config.engine.apply(&mut engine_config);

        assert_eq!(engine_config.min_observations, 36);
        assert_eq!(engine_config.worst_case_lookback_years, 10);
    }
}
