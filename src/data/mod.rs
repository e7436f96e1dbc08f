//! Data sources that are not files.
//!
//! - seeded synthetic observations (`sample`)

pub mod sample;
