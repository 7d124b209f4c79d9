// API Module

pub mod client;
pub mod inputs;
pub mod server;

pub use client::{BackoffStrategy, PredictionClient, RetryConfiguration};
pub use inputs::{format_house_value, HousingInputs, FORM_FIELDS};
pub use server::{routes, ApiError, PredictionApiServer};
