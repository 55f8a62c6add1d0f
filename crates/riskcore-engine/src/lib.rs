//! # Riskcore Engine
//!
//! The entry-point pipeline (C11): one cache-backed, single-flighted
//! async method per analysis kind, tying together the Factor Model
//! Assembler (C4), Portfolio Risk Engine (C5), Risk Limit Checker (C6),
//! Scenario Engine (C7), Optimizer (C8), and Risk Score (C9) behind the
//! Analysis Cache (C10).
//!
//! Build one via [`RiskEngineBuilder`]; everything past construction is
//! a pure function of its inputs given a fixed [`riskcore_traits::PriceProvider`]
//! view, per the engine's no-shared-mutable-state design (§5).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builder;
pub mod error;
pub mod fixtures;
pub mod pipeline;

pub use builder::RiskEngineBuilder;
pub use error::EngineError;
pub use fixtures::FixturePriceProvider;
pub use pipeline::RiskEngine;
