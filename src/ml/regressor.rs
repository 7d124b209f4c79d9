use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::core::{PredictorError, PredictorResult};

/// A fitted regression function over a fixed number of inputs.
pub trait RegressionModel: Send + Sync {
    /// Number of inputs the model was fitted on.
    fn n_features(&self) -> usize;

    /// Predict a single row. Callers guarantee `row.len() == n_features()`.
    fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64;

    /// Check internal consistency after deserialization.
    fn validate(&self) -> PredictorResult<()>;

    /// Predict every row of `records`.
    fn predict(&self, records: ArrayView2<'_, f64>) -> PredictorResult<Array1<f64>> {
        if records.ncols() != self.n_features() {
            return Err(PredictorError::Inference(format!(
                "input has {} columns but the model expects {}",
                records.ncols(),
                self.n_features()
            )));
        }

        Ok(records
            .axis_iter(Axis(0))
            .map(|row| self.predict_row(row))
            .collect())
    }
}

/// Ordinary least squares: `intercept + sum(coef_i * x_i)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl RegressionModel for LinearModel {
    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row.iter())
                .map(|(c, x)| c * x)
                .sum::<f64>()
    }

    fn validate(&self) -> PredictorResult<()> {
        if self.coefficients.is_empty() {
            return Err(PredictorError::ArtifactInvalid(
                "linear model has no coefficients".to_string(),
            ));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(PredictorError::ArtifactInvalid(
                "linear model has non-finite parameters".to_string(),
            ));
        }
        Ok(())
    }
}

/// One node of a regression tree stored in pre-order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

impl RegressionTree {
    fn evaluate(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    // Children must point strictly forward so evaluation always reaches a leaf.
    fn validate(&self, tree_idx: usize, n_features: usize) -> PredictorResult<()> {
        if self.nodes.is_empty() {
            return Err(PredictorError::ArtifactInvalid(format!(
                "tree {tree_idx} has no nodes"
            )));
        }

        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Leaf { value } if !value.is_finite() => {
                    return Err(PredictorError::ArtifactInvalid(format!(
                        "tree {tree_idx} node {idx} has a non-finite leaf value"
                    )));
                }
                TreeNode::Leaf { .. } => {}
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(PredictorError::ArtifactInvalid(format!(
                            "tree {tree_idx} node {idx} splits on feature {feature} of {n_features}"
                        )));
                    }
                    if threshold.is_nan() {
                        return Err(PredictorError::ArtifactInvalid(format!(
                            "tree {tree_idx} node {idx} has a NaN threshold"
                        )));
                    }
                    for child in [*left, *right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(PredictorError::ArtifactInvalid(format!(
                                "tree {tree_idx} node {idx} has invalid child {child}"
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Squared-error gradient boosting ensemble:
/// `init + learning_rate * sum(tree(x))`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedTrees {
    pub n_features: usize,
    pub init: f64,
    pub learning_rate: f64,
    pub trees: Vec<RegressionTree>,
}

impl RegressionModel for GradientBoostedTrees {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let boost: f64 = self.trees.iter().map(|tree| tree.evaluate(row)).sum();
        self.init + self.learning_rate * boost
    }

    fn validate(&self) -> PredictorResult<()> {
        if self.n_features == 0 {
            return Err(PredictorError::ArtifactInvalid(
                "ensemble declares zero features".to_string(),
            ));
        }
        if !self.init.is_finite() || !self.learning_rate.is_finite() {
            return Err(PredictorError::ArtifactInvalid(
                "ensemble has non-finite parameters".to_string(),
            ));
        }
        for (idx, tree) in self.trees.iter().enumerate() {
            tree.validate(idx, self.n_features)?;
        }
        Ok(())
    }
}

/// Serialized form of every supported regressor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Regressor {
    Linear(LinearModel),
    GradientBoosting(GradientBoostedTrees),
}

impl Regressor {
    pub fn kind(&self) -> &'static str {
        match self {
            Regressor::Linear(_) => "linear",
            Regressor::GradientBoosting(_) => "gradient_boosting",
        }
    }

    pub fn as_model(&self) -> &dyn RegressionModel {
        match self {
            Regressor::Linear(model) => model,
            Regressor::GradientBoosting(model) => model,
        }
    }
}
