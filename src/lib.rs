//! `gnf-fit` library crate.
//!
//! The binary (`gnf`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the fitting engine can be embedded by other front-ends
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod debug;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod report;

pub use domain::{FitResult, GoodnessOfFit, ModelKind, Observations, SolverOptions};
pub use error::{AppError, DataError, FitError};
pub use fit::{compare_models, default_guess, fit, fit_observations, fit_request};
