//! Model training and selection
//!
//! For the position task, two candidate estimator families are fit and the
//! one with the lowest held-out RMSE is kept (ties go to the first
//! evaluated). The podium, points and winner tasks train one classifier
//! each; the winner model is skipped, not failed, when the corpus carries
//! too few winning examples.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::artifacts::{ArtifactBundle, BundleMetadata, FORMAT_VERSION};
use crate::data::FeatureSynthesizer;
use crate::encoding::{feature_names, scaled_feature_indices, StandardScaler, VocabularySet};
use crate::error::PipelineError;
use crate::models::{RaceRecord, TaskKind};
use crate::sampling::RandomContext;
use crate::training::boosting::{BoostingConfig, GradientBoostingRegressor};
use crate::training::forest::{ForestConfig, RandomForestClassifier, RandomForestRegressor};

/// Winner examples required before a winner classifier is trained
pub const MIN_WINNER_POSITIVES: usize = 50;

/// Fewest cleaned rows a training run will accept
const MIN_TRAINING_ROWS: usize = 10;

/// Common estimator interface; selection logic sees nothing else
pub trait Model {
    fn name(&self) -> &'static str;
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64], ctx: &mut RandomContext);
    fn predict(&self, x: &[Vec<f64>]) -> Vec<f64>;
    fn feature_importances(&self) -> Vec<f64>;
}

impl Model for RandomForestRegressor {
    fn name(&self) -> &'static str {
        "RandomForest"
    }
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64], ctx: &mut RandomContext) {
        RandomForestRegressor::fit(self, x, y, ctx);
    }
    fn predict(&self, x: &[Vec<f64>]) -> Vec<f64> {
        RandomForestRegressor::predict(self, x)
    }
    fn feature_importances(&self) -> Vec<f64> {
        RandomForestRegressor::feature_importances(self)
    }
}

impl Model for GradientBoostingRegressor {
    fn name(&self) -> &'static str {
        "GradientBoosting"
    }
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64], ctx: &mut RandomContext) {
        GradientBoostingRegressor::fit(self, x, y, ctx);
    }
    fn predict(&self, x: &[Vec<f64>]) -> Vec<f64> {
        GradientBoostingRegressor::predict(self, x)
    }
    fn feature_importances(&self) -> Vec<f64> {
        GradientBoostingRegressor::feature_importances(self)
    }
}

impl Model for RandomForestClassifier {
    fn name(&self) -> &'static str {
        "RandomForestClassifier"
    }
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64], ctx: &mut RandomContext) {
        RandomForestClassifier::fit(self, x, y, ctx);
    }
    fn predict(&self, x: &[Vec<f64>]) -> Vec<f64> {
        RandomForestClassifier::predict(self, x)
    }
    fn feature_importances(&self) -> Vec<f64> {
        RandomForestClassifier::feature_importances(self)
    }
}

/// A persisted estimator; the fixed set of concrete variants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrainedModel {
    Forest(RandomForestRegressor),
    Boosted(GradientBoostingRegressor),
    ForestClassifier(RandomForestClassifier),
}

impl TrainedModel {
    pub fn predict(&self, x: &[Vec<f64>]) -> Vec<f64> {
        match self {
            TrainedModel::Forest(m) => m.predict(x),
            TrainedModel::Boosted(m) => m.predict(x),
            TrainedModel::ForestClassifier(m) => m.predict(x),
        }
    }

    /// Class-1 probabilities; `None` for regressors
    pub fn predict_proba(&self, x: &[Vec<f64>]) -> Option<Vec<f64>> {
        match self {
            TrainedModel::ForestClassifier(m) => Some(m.predict_proba(x)),
            _ => None,
        }
    }

    pub fn feature_importances(&self) -> Vec<f64> {
        match self {
            TrainedModel::Forest(m) => m.feature_importances(),
            TrainedModel::Boosted(m) => m.feature_importances(),
            TrainedModel::ForestClassifier(m) => m.feature_importances(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TrainedModel::Forest(m) => m.name(),
            TrainedModel::Boosted(m) => m.name(),
            TrainedModel::ForestClassifier(m) => m.name(),
        }
    }
}

/// One trained estimator bound to its task and feature contract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub task: TaskKind,
    pub model: TrainedModel,
    pub feature_names: Vec<String>,
}

/// Training-run configuration
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    pub seed: u64,
    pub test_fraction: f64,
    pub forest: ForestConfig,
    pub boosting: BoostingConfig,
    pub min_winner_positives: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            seed: crate::sampling::DEFAULT_SEED,
            test_fraction: 0.2,
            forest: ForestConfig::default(),
            boosting: BoostingConfig::default(),
            min_winner_positives: MIN_WINNER_POSITIVES,
        }
    }
}

impl TrainingConfig {
    /// Shrunk ensembles for fast test runs
    pub fn fast(seed: u64) -> Self {
        Self {
            seed,
            test_fraction: 0.2,
            forest: ForestConfig {
                n_trees: 15,
                max_depth: 8,
                min_samples_split: 2,
                max_features: None,
                balanced: false,
            },
            boosting: BoostingConfig {
                n_estimators: 30,
                max_depth: 3,
                learning_rate: 0.2,
                min_samples_split: 2,
            },
            min_winner_positives: MIN_WINNER_POSITIVES,
        }
    }
}

/// Per-run metrics, also written to the training log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub dataset_size: usize,
    pub feature_count: usize,
    pub position_model: String,
    pub position_rmse: f64,
    pub position_mae: f64,
    pub podium_accuracy: f64,
    pub points_accuracy: f64,
    /// Absent when the winner model was skipped
    pub winner_accuracy: Option<f64>,
    pub winner_positives: usize,
}

/// Result of one training run
#[derive(Debug)]
pub struct TrainingOutcome {
    pub bundle: ArtifactBundle,
    pub summary: TrainingSummary,
}

/// Root mean squared error
pub fn rmse(predictions: &[f64], targets: &[f64]) -> f64 {
    let n = targets.len() as f64;
    (predictions
        .iter()
        .zip(targets)
        .map(|(p, t)| (p - t).powi(2))
        .sum::<f64>()
        / n)
        .sqrt()
}

/// Mean absolute error
pub fn mae(predictions: &[f64], targets: &[f64]) -> f64 {
    predictions
        .iter()
        .zip(targets)
        .map(|(p, t)| (p - t).abs())
        .sum::<f64>()
        / targets.len() as f64
}

/// Fraction of matching 0/1 labels
pub fn accuracy(predictions: &[f64], targets: &[f64]) -> f64 {
    let hits = predictions
        .iter()
        .zip(targets)
        .filter(|(p, t)| (*p - *t).abs() < 0.5)
        .count();
    hits as f64 / targets.len() as f64
}

/// Seeded shuffle split into (train, test) index sets
///
/// The split is drawn once per run and shared by every task, so per-task
/// metrics are comparable and the "current best" bookkeeping is
/// deterministic.
pub fn train_test_split(
    n: usize,
    test_fraction: f64,
    ctx: &mut RandomContext,
) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    ctx.shuffle(&mut indices);
    let test_len = ((n as f64) * test_fraction).ceil() as usize;
    let test = indices[..test_len].to_vec();
    let train = indices[test_len..].to_vec();
    (train, test)
}

fn select_rows(matrix: &[Vec<f64>], indices: &[usize]) -> Vec<Vec<f64>> {
    indices.iter().map(|&i| matrix[i].clone()).collect()
}

fn select_values(values: &[f64], indices: &[usize]) -> Vec<f64> {
    indices.iter().map(|&i| values[i]).collect()
}

/// Run the full pipeline: synthesize, encode, normalize, train, select
///
/// Every sampling step draws from `ctx`; callers pass the same context used
/// for cleaning so one seed governs the whole run.
pub fn train_pipeline(
    records: &[RaceRecord],
    config: &TrainingConfig,
    ctx: &mut RandomContext,
) -> Result<TrainingOutcome, PipelineError> {
    if records.len() < MIN_TRAINING_ROWS {
        return Err(PipelineError::InsufficientData {
            task: "pipeline".to_string(),
            positives: records.len(),
            required: MIN_TRAINING_ROWS,
        });
    }

    // Feature synthesis
    let mut synthesizer = FeatureSynthesizer::new();
    let rows = synthesizer.synthesize_all(records, ctx);
    info!(rows = rows.len(), "synthesized feature rows");

    // Vocabularies, fit once over the full corpus
    let strategy_candidates = FeatureSynthesizer::all_tire_strategies();
    let vocabularies = VocabularySet::fit(&rows, &strategy_candidates);

    // Encode and standardize
    let mut matrix: Vec<Vec<f64>> = Vec::with_capacity(rows.len());
    for row in &rows {
        matrix.push(vocabularies.encode_row(row)?);
    }
    let scaler = StandardScaler::fit(&matrix, &scaled_feature_indices());
    scaler.apply_matrix(&mut matrix);

    // Targets
    let positions: Vec<f64> = rows.iter().map(|r| r.record.position as f64).collect();
    let podium: Vec<f64> = rows
        .iter()
        .map(|r| if r.record.position <= 3 { 1.0 } else { 0.0 })
        .collect();
    let points: Vec<f64> = rows
        .iter()
        .map(|r| if r.record.position <= 10 { 1.0 } else { 0.0 })
        .collect();
    let winner: Vec<f64> = rows
        .iter()
        .map(|r| if r.record.position == 1 { 1.0 } else { 0.0 })
        .collect();

    let (train_idx, test_idx) = train_test_split(rows.len(), config.test_fraction, ctx);
    let x_train = select_rows(&matrix, &train_idx);
    let x_test = select_rows(&matrix, &test_idx);

    // Position: fit both candidates, keep the lowest held-out RMSE
    let y_train = select_values(&positions, &train_idx);
    let y_test = select_values(&positions, &test_idx);

    let mut candidates: Vec<TrainedModel> = vec![
        TrainedModel::Forest(RandomForestRegressor::new(config.forest.clone())),
        TrainedModel::Boosted(GradientBoostingRegressor::new(config.boosting.clone())),
    ];

    let mut best: (usize, f64, f64) = (0, f64::INFINITY, f64::INFINITY);
    for (i, candidate) in candidates.iter_mut().enumerate() {
        let model: &mut dyn Model = match candidate {
            TrainedModel::Forest(m) => m,
            TrainedModel::Boosted(m) => m,
            TrainedModel::ForestClassifier(m) => m,
        };
        model.fit(&x_train, &y_train, ctx);
        let preds = model.predict(&x_test);
        let candidate_rmse = rmse(&preds, &y_test);
        let candidate_mae = mae(&preds, &y_test);
        info!(
            model = candidate.name(),
            rmse = candidate_rmse,
            mae = candidate_mae,
            "evaluated position candidate"
        );
        // Strict comparison keeps ties with the first-evaluated model
        if candidate_rmse < best.1 {
            best = (i, candidate_rmse, candidate_mae);
        }
    }
    let (best_idx, position_rmse, position_mae) = best;
    let position_model = candidates.swap_remove(best_idx);
    info!(model = position_model.name(), rmse = position_rmse, "selected position model");

    let names = feature_names();
    let mut ranked: Vec<(usize, f64)> = position_model
        .feature_importances()
        .into_iter()
        .enumerate()
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    for (idx, weight) in ranked.into_iter().take(5) {
        info!(feature = %names[idx], weight, "top position feature");
    }

    // Podium and points classifiers
    let podium_model =
        fit_classifier(config, &x_train, &select_values(&podium, &train_idx), false, ctx);
    let podium_accuracy = accuracy(
        &podium_model.predict(&x_test),
        &select_values(&podium, &test_idx),
    );
    info!(accuracy = podium_accuracy, "trained podium model");

    let points_model =
        fit_classifier(config, &x_train, &select_values(&points, &train_idx), false, ctx);
    let points_accuracy = accuracy(
        &points_model.predict(&x_test),
        &select_values(&points, &test_idx),
    );
    info!(accuracy = points_accuracy, "trained points model");

    // Winner: degrade, not fail, on thin positives
    let winner_positives = winner.iter().filter(|&&w| w == 1.0).count();
    let (winner_model, winner_accuracy) = if winner_positives > config.min_winner_positives {
        // Winners are ~5% of rows, so the winner forest rebalances classes
        let model =
            fit_classifier(config, &x_train, &select_values(&winner, &train_idx), true, ctx);
        let acc = accuracy(&model.predict(&x_test), &select_values(&winner, &test_idx));
        info!(accuracy = acc, positives = winner_positives, "trained winner model");
        (Some(model), Some(acc))
    } else {
        warn!(
            positives = winner_positives,
            required = config.min_winner_positives,
            "skipping winner model: too few winning examples"
        );
        (None, None)
    };

    let summary = TrainingSummary {
        dataset_size: rows.len(),
        feature_count: names.len(),
        position_model: position_model.name().to_string(),
        position_rmse,
        position_mae,
        podium_accuracy,
        points_accuracy,
        winner_accuracy,
        winner_positives,
    };

    let mut scores = BTreeMap::new();
    scores.insert("position_rmse".to_string(), position_rmse);
    scores.insert("position_mae".to_string(), position_mae);
    scores.insert("podium_accuracy".to_string(), podium_accuracy);
    scores.insert("points_accuracy".to_string(), points_accuracy);
    if let Some(acc) = winner_accuracy {
        scores.insert("winner_accuracy".to_string(), acc);
    }

    let artifact = |task: TaskKind, model: TrainedModel| ModelArtifact {
        task,
        model,
        feature_names: names.clone(),
    };

    let bundle = ArtifactBundle {
        position: artifact(TaskKind::Position, position_model),
        podium: artifact(TaskKind::Podium, TrainedModel::ForestClassifier(podium_model)),
        points: artifact(TaskKind::Points, TrainedModel::ForestClassifier(points_model)),
        winner: winner_model
            .map(|m| artifact(TaskKind::Winner, TrainedModel::ForestClassifier(m))),
        vocabularies,
        scaler,
        feature_names: names,
        metadata: BundleMetadata {
            format_version: FORMAT_VERSION,
            created_at: chrono::Utc::now().to_rfc3339(),
            seed: config.seed,
            dataset_size: rows.len(),
            scores,
        },
    };

    Ok(TrainingOutcome { bundle, summary })
}

fn fit_classifier(
    config: &TrainingConfig,
    x: &[Vec<f64>],
    y: &[f64],
    balanced: bool,
    ctx: &mut RandomContext,
) -> RandomForestClassifier {
    let forest = ForestConfig {
        balanced,
        ..config.forest.clone()
    };
    let mut model = RandomForestClassifier::new(forest);
    model.fit(x, y, ctx);
    model
}

#[cfg(test)]
pub(crate) use tests::synthetic_records;
