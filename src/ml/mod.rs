// Machine Learning Module

pub mod artifact;
pub mod features;
pub mod regressor;
pub mod service;
pub mod trainer;

// Expose key types and functions
pub use artifact::ModelArtifact;
pub use features::FeatureVector;
pub use regressor::{
    GradientBoostedTrees, LinearModel, RegressionModel, RegressionTree, Regressor, TreeNode,
};
pub use service::PredictionService;
pub use trainer::{train_linear, TrainingConfig, TrainingDataset, TrainingReport};
