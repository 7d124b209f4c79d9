pub mod config;
pub mod error;
pub mod types;

pub use config::{LogFormat, LoggingConfig, ModelConfig, ServerConfig, ServiceConfig};
pub use error::{PredictorError, PredictorResult};
pub use types::{
    ErrorResponse, FeatureRange, ModelInfo, PredictRequest, PredictResponse, StatusResponse,
};
