//! Offline training step that produces a [`ModelArtifact`].
//!
//! Fitting itself is delegated to `linfa-linear`; this module only prepares
//! the data, splits it, scores the held-out rows and records metadata.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use linfa::prelude::*;
use linfa::Dataset;
use linfa_linear::LinearRegression;
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::{FeatureRange, PredictorError, PredictorResult};
use crate::ml::artifact::ModelArtifact;
use crate::ml::regressor::{LinearModel, RegressionModel, Regressor};
use crate::monitoring::OperationTimer;

/// Tabular training data with named columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingDataset {
    pub feature_names: Vec<String>,
    pub target_name: String,
    pub records: Vec<Vec<f64>>,
    pub targets: Vec<f64>,
}

impl TrainingDataset {
    pub fn load(path: &Path) -> PredictorResult<Self> {
        let reader = BufReader::new(File::open(path)?);
        let dataset: Self = serde_json::from_reader(reader)?;
        Ok(dataset)
    }

    fn to_arrays(&self) -> PredictorResult<(Array2<f64>, Array1<f64>)> {
        let n_features = self.feature_names.len();
        if n_features == 0 {
            return Err(PredictorError::Training("dataset has no features".to_string()));
        }
        if self.records.len() != self.targets.len() {
            return Err(PredictorError::Training(format!(
                "{} records but {} targets",
                self.records.len(),
                self.targets.len()
            )));
        }
        if let Some(idx) = self.records.iter().position(|r| r.len() != n_features) {
            return Err(PredictorError::Training(format!(
                "record {idx} has {} values, expected {n_features}",
                self.records[idx].len()
            )));
        }

        let flat: Vec<f64> = self.records.iter().flatten().copied().collect();
        let records = Array2::from_shape_vec((self.records.len(), n_features), flat)
            .map_err(|e| PredictorError::Training(e.to_string()))?;
        Ok((records, Array1::from(self.targets.clone())))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingConfig {
    /// Fraction of rows held out for scoring.
    pub test_fraction: f64,
    /// Seed for the shuffle that precedes the split.
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub artifact: ModelArtifact,
    pub train_rows: usize,
    pub test_rows: usize,
    pub mse: f64,
    pub r2: f64,
}

/// Per-column min/max over every row.
pub fn feature_ranges(records: &Array2<f64>) -> Vec<FeatureRange> {
    records
        .axis_iter(Axis(1))
        .map(|column| FeatureRange {
            min: column.fold(f64::INFINITY, |acc, &v| acc.min(v)),
            max: column.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v)),
        })
        .collect()
}

pub fn mean_squared_error(truth: &Array1<f64>, predicted: &Array1<f64>) -> f64 {
    (truth - predicted).mapv(|e| e * e).mean().unwrap_or(0.0)
}

/// Coefficient of determination. A constant target scores 1.0 when predicted
/// exactly and 0.0 otherwise.
pub fn r2_score(truth: &Array1<f64>, predicted: &Array1<f64>) -> f64 {
    let mean = truth.mean().unwrap_or(0.0);
    let ss_res = (truth - predicted).mapv(|e| e * e).sum();
    let ss_tot = truth.mapv(|t| (t - mean) * (t - mean)).sum();

    if ss_tot == 0.0 {
        if ss_res == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - ss_res / ss_tot
    }
}

/// Fit an ordinary least squares model and package it as an artifact.
pub fn train_linear(
    dataset: &TrainingDataset,
    config: &TrainingConfig,
) -> PredictorResult<TrainingReport> {
    let _timer = OperationTimer::new("train_linear");

    if !(config.test_fraction > 0.0 && config.test_fraction < 1.0) {
        return Err(PredictorError::Training(format!(
            "test fraction must be in (0, 1), got {}",
            config.test_fraction
        )));
    }

    let (records, targets) = dataset.to_arrays()?;
    let n_rows = records.nrows();
    if n_rows < 2 {
        return Err(PredictorError::Training(format!(
            "need at least 2 rows to split, got {n_rows}"
        )));
    }

    let ranges = feature_ranges(&records);

    let mut indices: Vec<usize> = (0..n_rows).collect();
    let mut rng = StdRng::seed_from_u64(config.seed);
    indices.shuffle(&mut rng);

    let n_test = ((n_rows as f64) * config.test_fraction).ceil() as usize;
    let n_test = n_test.clamp(1, n_rows - 1);
    let (test_idx, train_idx) = indices.split_at(n_test);

    let train = Dataset::new(
        records.select(Axis(0), train_idx),
        targets.select(Axis(0), train_idx),
    );
    let fitted = LinearRegression::new()
        .fit(&train)
        .map_err(|e| PredictorError::Training(e.to_string()))?;

    let model = LinearModel {
        intercept: fitted.intercept(),
        coefficients: fitted.params().to_vec(),
    };

    let test_records = records.select(Axis(0), test_idx);
    let test_targets = targets.select(Axis(0), test_idx);
    let predicted = model.predict(test_records.view())?;
    let mse = mean_squared_error(&test_targets, &predicted);
    let r2 = r2_score(&test_targets, &predicted);

    info!(
        train_rows = train_idx.len(),
        test_rows = test_idx.len(),
        mse,
        r2,
        "Model fitted"
    );

    let artifact = ModelArtifact {
        model: Regressor::Linear(model),
        feature_names: dataset.feature_names.clone(),
        target_name: dataset.target_name.clone(),
        feature_ranges: Some(ranges),
    };
    artifact.validate()?;

    Ok(TrainingReport {
        artifact,
        train_rows: train_idx.len(),
        test_rows: test_idx.len(),
        mse,
        r2,
    })
}
