//! # Riskcore Traits
//!
//! Trait definitions for the riskcore engine.
//!
//! This crate contains only trait definitions and their concrete
//! default-table implementation ([`reference::StaticReferenceMappings`]);
//! provider/store implementations backed by a real data source live in
//! separate extension crates (`riskcore-ext-redb`, `riskcore-ext-file`).
//!
//! ## Module Structure
//!
//! - [`market_data`]: `PriceProvider` (C1) — monthly close, total
//!   return, treasury, and dividend history.
//! - [`reference`]: read-only currency/industry/exchange proxy lookups.
//! - [`storage`]: `PortfolioStore`, read-mostly portfolio persistence.
//! - [`config`]: `EngineConfig`, the engine's single immutable
//!   configuration record.
//!
//! ## Dependency Injection
//!
//! The engine builder takes these traits as trait objects:
//!
//! ```ignore
//! EngineBuilder::new()
//!     .with_price_provider(impl PriceProvider)
//!     .with_reference_mappings(impl ReferenceMappings)
//!     .with_portfolio_store(impl PortfolioStore)
//!     .with_config(EngineConfig)
//!     .build()
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod market_data;
pub mod reference;
pub mod storage;

// Re-export commonly used types
pub use config::EngineConfig;
pub use error::TraitError;
pub use market_data::PriceProvider;
pub use reference::ReferenceMappings;
pub use storage::PortfolioStore;
