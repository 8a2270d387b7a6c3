//! Race outcome prediction pipeline
//!
//! Takes a CSV of historical race results through cleaning, feature
//! synthesis, categorical encoding and numeric standardization, trains
//! tree-ensemble models for finishing position, podium, points and race
//! wins, and serves ranked grid predictions from a persisted artifact
//! bundle. Every sampling step draws from one seeded context, so a given
//! seed reproduces a run exactly.

pub mod artifacts;
pub mod data;
pub mod encoding;
pub mod error;
pub mod models;
pub mod predictor;
pub mod sampling;
pub mod training;

pub use artifacts::{ArtifactBundle, BundleMetadata, FORMAT_VERSION};
pub use error::PipelineError;
pub use models::{
    CircuitType, EnhancedFeatureRow, GridEntry, GridPrediction, RaceRecord, RaceSetting, TaskKind,
    Weather,
};
pub use predictor::RacePredictor;
pub use sampling::{RandomContext, DEFAULT_SEED};
pub use training::{train_pipeline, TrainingConfig, TrainingOutcome, TrainingSummary};
