//! Portfolio Risk Engine (C5), Risk Limit Checker (C6), and Risk Score
//! (C9).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod engine;
pub mod limits;
pub mod score;

pub use analysis::build as build_analysis;
pub use engine::{compute, effective_weights, to_result_parts, RiskEngineOutput};
pub use limits::{evaluate, recommendations};
pub use score::compute as compute_score;
