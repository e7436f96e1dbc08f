//! Mathematical utilities: stable kernels, linear least squares, fit statistics.

pub mod ols;
pub mod stable;
pub mod stats;

pub use ols::*;
pub use stable::*;
pub use stats::*;
