//! Rust implementation of FTRL-Proximal over sparse binary features
//!
//! Based on "Ad Click Prediction: a View from the Trenches" by McMahan et al.

pub mod api;
pub mod core;
pub mod data;
pub mod inference;
pub mod optimizer;
pub mod persistence;
pub mod utils;

// Re-export main types for convenience
pub use crate::api::{EvaluationMetrics, FtrlProximal};
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::core::{FtrlError, Result};
pub use crate::data::{BinaryDataset, CsrBinaryMatrix};
pub use crate::optimizer::{Coordinate, FtrlOptimizer, ModelState};
pub use crate::utils::MatrixStats;

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
