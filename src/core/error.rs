use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PredictorError {
    #[error("Model artifact not found at {}. Run the training step first.", path.display())]
    ArtifactMissing { path: PathBuf },

    #[error("Invalid model artifact: {0}")]
    ArtifactInvalid(String),

    #[error("Invalid prediction input: {0}")]
    InvalidInput(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Training error: {0}")]
    Training(String),

    #[error("Client error: {0}")]
    Client(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PredictorError {
    /// Stable, machine readable code used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            PredictorError::ArtifactMissing { .. } => "artifact_missing",
            PredictorError::ArtifactInvalid(_) => "artifact_invalid",
            PredictorError::InvalidInput(_) => "invalid_input",
            PredictorError::Config(_) => "config_error",
            PredictorError::Training(_) => "training_error",
            PredictorError::Client(_) => "client_error",
            PredictorError::Inference(_)
            | PredictorError::Io(_)
            | PredictorError::Serialization(_) => "internal_error",
        }
    }

    /// Whether the caller is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, PredictorError::InvalidInput(_))
    }
}

pub type PredictorResult<T> = Result<T, PredictorError>;
