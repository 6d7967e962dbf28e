//! # MMD Common Library
//!
//! Shared code for the marketing metrics dashboard:
//! - Database connection and schema initialization
//! - Fact row models (leads, conversions)
//! - Configuration resolution
//! - Common error type

pub mod config;
pub mod db;
pub mod error;

pub use config::{DashboardConfig, KpiAssumptions};
pub use error::{Error, Result};
