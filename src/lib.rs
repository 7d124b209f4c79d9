//! California housing price prediction: model artifacts, validated inference
//! and the HTTP service around them.

pub mod api;
pub mod config;
pub mod core;
pub mod ml;
pub mod monitoring;

pub use crate::core::{PredictorError, PredictorResult};
