//! Boundary validation for prediction inputs.

use ndarray::{Array1, Array2, Axis};

use crate::core::{PredictorError, PredictorResult};

/// A feature vector whose length has been checked against the model.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: Vec<f64>,
}

impl FeatureVector {
    /// Validate `values` against the expected feature count.
    pub fn new(values: Vec<f64>, expected: usize) -> PredictorResult<Self> {
        if values.len() != expected {
            return Err(PredictorError::InvalidInput(format!(
                "expected {expected} features, got {}",
                values.len()
            )));
        }

        if let Some(idx) = values.iter().position(|v| !v.is_finite()) {
            return Err(PredictorError::InvalidInput(format!(
                "feature at position {idx} is not a finite number"
            )));
        }

        Ok(Self { values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Reshape into a single-row matrix.
    pub fn into_row(self) -> Array2<f64> {
        Array1::from(self.values).insert_axis(Axis(0))
    }
}
