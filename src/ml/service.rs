use std::path::Path;

use tracing::info;

use crate::core::{ModelInfo, PredictorError, PredictorResult};
use crate::ml::artifact::ModelArtifact;
use crate::ml::features::FeatureVector;
use crate::monitoring::OperationTimer;

/// Holds one loaded model and answers inference calls.
///
/// Built once at startup and never mutated, so it can be shared across
/// request handlers behind an `Arc` without locking.
#[derive(Debug)]
pub struct PredictionService {
    artifact: ModelArtifact,
}

impl PredictionService {
    /// Load the artifact at `path`. Fails if it is missing or malformed.
    pub fn load(path: &Path) -> PredictorResult<Self> {
        let _timer = OperationTimer::new("model_load");
        let artifact = ModelArtifact::load(path)?;

        info!(
            path = %path.display(),
            kind = artifact.model.kind(),
            features = ?artifact.feature_names,
            target = %artifact.target_name,
            "Model loaded"
        );
        Ok(Self { artifact })
    }

    pub fn from_artifact(artifact: ModelArtifact) -> PredictorResult<Self> {
        artifact.validate()?;
        Ok(Self { artifact })
    }

    /// Predict a single point estimate from positional feature values.
    pub fn predict(&self, features: &[f64]) -> PredictorResult<f64> {
        let vector = FeatureVector::new(features.to_vec(), self.artifact.n_features())?;
        let row = vector.into_row();

        let outputs = self.artifact.model.as_model().predict(row.view())?;
        let prediction = outputs
            .get(0)
            .copied()
            .ok_or_else(|| PredictorError::Inference("model returned no output".to_string()))?;

        if !prediction.is_finite() {
            return Err(PredictorError::Inference(
                "model produced a non-finite prediction".to_string(),
            ));
        }
        Ok(prediction)
    }

    pub fn feature_names(&self) -> &[String] {
        &self.artifact.feature_names
    }

    pub fn target_name(&self) -> &str {
        &self.artifact.target_name
    }

    pub fn n_features(&self) -> usize {
        self.artifact.n_features()
    }

    pub fn info(&self) -> ModelInfo {
        self.artifact.info()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::regressor::{LinearModel, Regressor};
    use tempfile::tempdir;

    fn service() -> PredictionService {
        PredictionService::from_artifact(ModelArtifact {
            model: Regressor::Linear(LinearModel {
                intercept: 0.5,
                coefficients: vec![1.0, 2.0, 3.0],
            }),
            feature_names: vec!["a".into(), "b".into(), "c".into()],
            target_name: "target".to_string(),
            feature_ranges: None,
        })
        .unwrap()
    }

    #[test]
    fn predicts_single_value() {
        assert_eq!(service().predict(&[1.0, 1.0, 1.0]).unwrap(), 6.5);
    }

    #[test]
    fn identical_input_gives_identical_output() {
        let svc = service();
        let first = svc.predict(&[0.3, -1.2, 7.5]).unwrap();
        for _ in 0..10 {
            assert_eq!(svc.predict(&[0.3, -1.2, 7.5]).unwrap(), first);
        }
    }

    #[test]
    fn misaligned_input_is_rejected() {
        let svc = service();
        assert!(matches!(
            svc.predict(&[1.0, 2.0]),
            Err(PredictorError::InvalidInput(_))
        ));
        assert!(matches!(
            svc.predict(&[1.0, 2.0, 3.0, 4.0]),
            Err(PredictorError::InvalidInput(_))
        ));
    }

    #[test]
    fn load_fails_without_artifact() {
        let dir = tempdir().unwrap();
        let result = PredictionService::load(&dir.path().join("missing.json"));
        assert!(matches!(result, Err(PredictorError::ArtifactMissing { .. })));
    }

    #[test]
    fn exposes_metadata() {
        let svc = service();
        assert_eq!(svc.feature_names(), ["a", "b", "c"]);
        assert_eq!(svc.target_name(), "target");
        assert_eq!(svc.n_features(), 3);
    }
}
