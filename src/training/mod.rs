//! Tree-ensemble estimators and the training pipeline

pub mod boosting;
pub mod engine;
pub mod forest;
pub mod tree;

pub use boosting::{BoostingConfig, GradientBoostingRegressor};
pub use engine::{
    train_pipeline, Model, ModelArtifact, TrainedModel, TrainingConfig, TrainingOutcome,
    TrainingSummary, MIN_WINNER_POSITIVES,
};
pub use forest::{ForestConfig, RandomForestClassifier, RandomForestRegressor};
pub use tree::{RegressionTree, TreeConfig};
