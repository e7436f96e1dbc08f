//! Input/output helpers.
//!
//! - two-column data ingest (`ingest`)
//! - per-point CSV export (`export`)
//! - fit JSON read/write (`curve`)

pub mod curve;
pub mod export;
pub mod ingest;

pub use curve::*;
pub use export::*;
pub use ingest::*;
