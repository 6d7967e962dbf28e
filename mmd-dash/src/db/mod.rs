//! Fact store and sample data for mmd-dash
//!
//! All reads and writes of the `leads` and `conversions` tables go through
//! this module.

pub mod facts;
pub mod seed;

pub use facts::*;
pub use seed::seed_if_empty;
