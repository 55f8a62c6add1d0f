//! Scenario Engine (C7): what-if portfolio analysis against a base
//! portfolio, never persisting the modified portfolio itself.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod apply;
pub mod spec;

pub use apply::{apply_spec, run, ScenarioOutput};
pub use spec::ScenarioSpec;
