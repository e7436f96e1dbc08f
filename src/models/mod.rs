//! GNF model registry.
//!
//! Models are implemented as small, pure functions so that fitting code can
//! stay generic over the closed set of `ModelKind` variants:
//!
//! - `model`: prediction functions
//! - `params`: parameter order, names, bounds and fallback seeds

pub mod model;
pub mod params;

pub use model::*;
pub use params::*;
