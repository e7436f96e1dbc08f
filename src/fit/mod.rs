//! Curve fitting orchestration.
//!
//! Responsibilities:
//!
//! - derive starting points from the data (`grid`, `seed`)
//! - run the model's bounded solver (`lm`, `minimize`)
//! - compare several models using BIC + guardrails (`selection`)

pub mod fitter;
pub mod grid;
pub mod lm;
pub mod minimize;
pub mod seed;
pub mod selection;
pub mod solver;

pub use fitter::*;
pub use seed::default_guess;
pub use selection::*;
