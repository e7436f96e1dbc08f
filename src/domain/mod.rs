//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the closed set of model identifiers (`ModelKind`) and their traits
//! - validated observation sets and fit requests
//! - fit outputs (`FitResult`, `GoodnessOfFit`, `SolverSummary`, etc.)

pub mod types;

pub use types::*;
