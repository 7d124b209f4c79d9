#![allow(dead_code)]

use std::path::{Path, PathBuf};

use housing_predictor::core::FeatureRange;
use housing_predictor::ml::{
    GradientBoostedTrees, ModelArtifact, RegressionTree, Regressor, TrainingDataset, TreeNode,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const FEATURE_NAMES: [&str; 8] = [
    "MedInc",
    "HouseAge",
    "AveRooms",
    "AveBedrms",
    "Population",
    "AveOccup",
    "Latitude",
    "Longitude",
];

/// The form defaults, already in model units.
pub const DEFAULT_FEATURES: [f64; 8] = [3.87, 28.6, 5.43, 1.07, 1425.0, 3.07, 35.6, -119.6];

/// What [`california_artifact`] predicts for [`DEFAULT_FEATURES`].
pub const DEFAULT_PREDICTION: f64 = 2.0486;

fn split(feature: usize, threshold: f64, left: usize, right: usize) -> TreeNode {
    TreeNode::Split {
        feature,
        threshold,
        left,
        right,
    }
}

fn leaf(value: f64) -> TreeNode {
    TreeNode::Leaf { value }
}

/// A small boosted ensemble over the California housing features.
pub fn california_artifact() -> ModelArtifact {
    let trees = vec![
        RegressionTree {
            nodes: vec![
                split(0, 5.0, 1, 4),
                split(5, 2.5, 2, 3),
                leaf(0.5),
                leaf(-1.0),
                leaf(3.0),
            ],
        },
        RegressionTree {
            nodes: vec![split(6, 37.0, 1, 2), leaf(1.0), leaf(-0.5)],
        },
        RegressionTree {
            nodes: vec![split(7, -121.0, 1, 2), leaf(0.8), leaf(-0.2)],
        },
    ];

    ModelArtifact {
        model: Regressor::GradientBoosting(GradientBoostedTrees {
            n_features: FEATURE_NAMES.len(),
            init: 2.0686,
            learning_rate: 0.1,
            trees,
        }),
        feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        target_name: "MedHouseVal".to_string(),
        feature_ranges: Some(california_ranges()),
    }
}

pub fn california_ranges() -> Vec<FeatureRange> {
    [
        (0.4999, 15.0001),
        (1.0, 52.0),
        (0.846, 141.909),
        (0.333, 34.067),
        (3.0, 35682.0),
        (0.692, 1243.333),
        (32.54, 41.95),
        (-124.35, -114.31),
    ]
    .into_iter()
    .map(|(min, max)| FeatureRange { min, max })
    .collect()
}

pub fn write_artifact(dir: &Path) -> PathBuf {
    let path = dir.join("models").join("california_gb.json");
    california_artifact().save(&path).unwrap();
    path
}

/// Rows drawn inside the California ranges with a noiseless linear target.
pub fn linear_dataset(rows: usize, seed: u64) -> TrainingDataset {
    let ranges = california_ranges();
    let weights = [0.42, 0.01, -0.1, 0.6, 0.0, -0.004, -0.42, -0.43];
    let mut rng = StdRng::seed_from_u64(seed);

    let records: Vec<Vec<f64>> = (0..rows)
        .map(|_| {
            ranges
                .iter()
                .map(|r| rng.gen_range(r.min..r.max.min(r.min + 100.0)))
                .collect()
        })
        .collect();
    let targets = records
        .iter()
        .map(|row| -36.9 + row.iter().zip(weights).map(|(x, w)| x * w).sum::<f64>())
        .collect();

    TrainingDataset {
        feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        target_name: "MedHouseVal".to_string(),
        records,
        targets,
    }
}
