//! Persisted model bundle: a fitted regressor plus the names of its inputs
//! and output.
//!
//! Artifacts are JSON documents written once by the training step and read
//! once when the service starts.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{FeatureRange, ModelInfo, PredictorError, PredictorResult};
use crate::ml::regressor::Regressor;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub model: Regressor,
    pub feature_names: Vec<String>,
    pub target_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_ranges: Option<Vec<FeatureRange>>,
}

impl ModelArtifact {
    /// Load and validate an artifact from disk.
    pub fn load(path: &Path) -> PredictorResult<Self> {
        if !path.exists() {
            return Err(PredictorError::ArtifactMissing {
                path: path.to_path_buf(),
            });
        }

        let reader = BufReader::new(File::open(path)?);
        let artifact: Self = serde_json::from_reader(reader)
            .map_err(|e| PredictorError::ArtifactInvalid(format!("{}: {e}", path.display())))?;
        artifact.validate()?;

        debug!(
            path = %path.display(),
            kind = artifact.model.kind(),
            n_features = artifact.n_features(),
            "Model artifact decoded"
        );
        Ok(artifact)
    }

    /// Write the artifact as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> PredictorResult<()> {
        self.validate()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    pub fn validate(&self) -> PredictorResult<()> {
        if self.feature_names.is_empty() {
            return Err(PredictorError::ArtifactInvalid(
                "artifact lists no feature names".to_string(),
            ));
        }
        if self.target_name.trim().is_empty() {
            return Err(PredictorError::ArtifactInvalid(
                "artifact has an empty target name".to_string(),
            ));
        }

        let model = self.model.as_model();
        model.validate()?;
        if model.n_features() != self.feature_names.len() {
            return Err(PredictorError::ArtifactInvalid(format!(
                "model expects {} inputs but {} feature names are listed",
                model.n_features(),
                self.feature_names.len()
            )));
        }

        if let Some(ranges) = &self.feature_ranges {
            if ranges.len() != self.feature_names.len() {
                return Err(PredictorError::ArtifactInvalid(format!(
                    "{} feature ranges for {} features",
                    ranges.len(),
                    self.feature_names.len()
                )));
            }
            if let Some(idx) = ranges
                .iter()
                .position(|r| r.min.is_nan() || r.max.is_nan() || r.min > r.max)
            {
                return Err(PredictorError::ArtifactInvalid(format!(
                    "feature range for {} is empty or undefined",
                    self.feature_names[idx]
                )));
            }
        }
        Ok(())
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            feature_names: self.feature_names.clone(),
            target_name: self.target_name.clone(),
            model_kind: self.model.kind().to_string(),
            n_features: self.n_features(),
            feature_ranges: self.feature_ranges.clone(),
        }
    }
}
