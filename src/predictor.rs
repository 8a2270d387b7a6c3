//! Serving over a loaded artifact bundle
//!
//! Raw regressor outputs are only a relative ordering, so predicted
//! finishes are rank-normalized into a permutation of 1..=N over the grid
//! being served. Categories unseen at training time fail encoding rather
//! than being guessed at.

use std::path::Path;
use tracing::info;

use crate::artifacts::ArtifactBundle;
use crate::data::FeatureSynthesizer;
use crate::error::PipelineError;
use crate::models::{GridEntry, GridPrediction, RaceRecord, RaceSetting};
use crate::sampling::RandomContext;

pub struct RacePredictor {
    bundle: ArtifactBundle,
}

impl RacePredictor {
    pub fn from_bundle(bundle: ArtifactBundle) -> Self {
        Self { bundle }
    }

    pub fn load(dir: &Path) -> Result<Self, PipelineError> {
        Ok(Self::from_bundle(ArtifactBundle::load(dir)?))
    }

    pub fn bundle(&self) -> &ArtifactBundle {
        &self.bundle
    }

    /// Predict one race: every entry is scored, then finishes are assigned
    /// by rank. Ties in the raw output keep the entries' given order.
    pub fn predict_grid(
        &self,
        setting: &RaceSetting,
        entries: &[GridEntry],
        ctx: &mut RandomContext,
    ) -> Result<Vec<GridPrediction>, PipelineError> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        // Serve-time rows draw their synthesized conditions from `ctx`,
        // then encode through the frozen training vocabularies.
        let mut synthesizer = FeatureSynthesizer::new();
        let mut matrix: Vec<Vec<f64>> = Vec::with_capacity(entries.len());
        for entry in entries {
            let record = RaceRecord {
                driver: entry.driver.clone(),
                constructor: entry.constructor.clone(),
                circuit: setting.circuit.clone(),
                grid: entry.grid,
                position: 0,
                weather: setting.weather,
                season: None,
            };
            let row = synthesizer.synthesize(&record, ctx);
            matrix.push(self.bundle.vocabularies.encode_row(&row)?);
        }
        self.bundle.scaler.apply_matrix(&mut matrix);

        let raw = self.bundle.position.model.predict(&matrix);
        let finishes = rank_positions(&raw);

        let podium_proba = self
            .bundle
            .podium
            .model
            .predict_proba(&matrix)
            .unwrap_or_else(|| vec![0.0; entries.len()]);
        let points_proba = self
            .bundle
            .points
            .model
            .predict_proba(&matrix)
            .unwrap_or_else(|| vec![0.0; entries.len()]);
        let win_proba = self
            .bundle
            .winner
            .as_ref()
            .and_then(|w| w.model.predict_proba(&matrix))
            .map(|p| normalize_probabilities(&p));

        info!(
            circuit = %setting.circuit,
            weather = %setting.weather,
            entries = entries.len(),
            winner_model = win_proba.is_some(),
            "served grid prediction"
        );

        Ok(entries
            .iter()
            .enumerate()
            .map(|(i, entry)| GridPrediction {
                driver: entry.driver.clone(),
                constructor: entry.constructor.clone(),
                grid: entry.grid,
                predicted_position: raw[i],
                finish: finishes[i],
                podium: podium_proba[i] >= 0.5,
                points: points_proba[i] >= 0.5,
                win_probability: win_proba.as_ref().map(|p| p[i]),
            })
            .collect())
    }

    /// Position-model importances paired with feature names, highest first
    pub fn feature_importance(&self) -> Vec<(String, f64)> {
        let mut pairs: Vec<(String, f64)> = self
            .bundle
            .feature_names
            .iter()
            .cloned()
            .zip(self.bundle.position.model.feature_importances())
            .collect();
        pairs.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        pairs
    }
}

/// Map raw scores to a permutation of 1..=N, lowest score first
fn rank_positions(raw: &[f64]) -> Vec<u32> {
    let mut order: Vec<usize> = (0..raw.len()).collect();
    order.sort_by(|&a, &b| raw[a].partial_cmp(&raw[b]).unwrap_or(std::cmp::Ordering::Equal));
    let mut finishes = vec![0u32; raw.len()];
    for (rank, &idx) in order.iter().enumerate() {
        finishes[idx] = (rank + 1) as u32;
    }
    finishes
}

/// Rescale class-1 probabilities so the batch sums to one
fn normalize_probabilities(proba: &[f64]) -> Vec<f64> {
    let total: f64 = proba.iter().sum();
    if total > 0.0 {
        proba.iter().map(|p| p / total).collect()
    } else {
        let uniform = 1.0 / proba.len() as f64;
        vec![uniform; proba.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Weather;
    use crate::training::engine::{synthetic_records, train_pipeline, TrainingConfig};

    fn predictor(rows: usize, seed: u64) -> RacePredictor {
        let records = synthetic_records(rows);
        let mut ctx = RandomContext::from_seed(seed);
        let outcome = train_pipeline(&records, &TrainingConfig::fast(seed), &mut ctx).unwrap();
        RacePredictor::from_bundle(outcome.bundle)
    }

    fn full_grid() -> Vec<GridEntry> {
        let records = synthetic_records(20);
        records
            .into_iter()
            .map(|r| GridEntry {
                driver: r.driver,
                constructor: r.constructor,
                grid: r.grid,
            })
            .collect()
    }

    fn monza() -> RaceSetting {
        RaceSetting {
            circuit: "Monza Circuit".to_string(),
            weather: Weather::Dry,
        }
    }

    #[test]
    fn test_finishes_are_a_permutation() {
        let predictor = predictor(400, 5);
        let mut ctx = RandomContext::from_seed(5);
        let predictions = predictor.predict_grid(&monza(), &full_grid(), &mut ctx).unwrap();

        let mut finishes: Vec<u32> = predictions.iter().map(|p| p.finish).collect();
        finishes.sort_unstable();
        assert_eq!(finishes, (1..=20).collect::<Vec<_>>());
    }

    #[test]
    fn test_rank_follows_raw_scores() {
        let predictor = predictor(400, 5);
        let mut ctx = RandomContext::from_seed(5);
        let predictions = predictor.predict_grid(&monza(), &full_grid(), &mut ctx).unwrap();

        let mut by_finish = predictions.clone();
        by_finish.sort_by_key(|p| p.finish);
        for pair in by_finish.windows(2) {
            assert!(pair[0].predicted_position <= pair[1].predicted_position);
        }
    }

    #[test]
    fn test_unknown_driver_is_rejected() {
        let predictor = predictor(400, 5);
        let mut ctx = RandomContext::from_seed(5);
        let entries = vec![GridEntry {
            driver: "Ayrton Senna".to_string(),
            constructor: "McLaren".to_string(),
            grid: 1,
        }];

        let err = predictor.predict_grid(&monza(), &entries, &mut ctx).unwrap_err();
        match err {
            PipelineError::UnknownCategory { field, value } => {
                assert_eq!(field, "driver");
                assert_eq!(value, "Ayrton Senna");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_win_probability_absent_without_winner_model() {
        // 400 rows carry only 20 winners, so no winner model is trained
        let predictor = predictor(400, 5);
        let mut ctx = RandomContext::from_seed(5);
        let predictions = predictor.predict_grid(&monza(), &full_grid(), &mut ctx).unwrap();
        assert!(predictions.iter().all(|p| p.win_probability.is_none()));
    }

    #[test]
    fn test_win_probabilities_normalize_over_the_grid() {
        let predictor = predictor(1200, 5);
        assert!(predictor.bundle().winner.is_some());

        let mut ctx = RandomContext::from_seed(5);
        let predictions = predictor.predict_grid(&monza(), &full_grid(), &mut ctx).unwrap();
        let total: f64 = predictions.iter().filter_map(|p| p.win_probability).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_grid_yields_empty_predictions() {
        let predictor = predictor(400, 5);
        let mut ctx = RandomContext::from_seed(5);
        let predictions = predictor.predict_grid(&monza(), &[], &mut ctx).unwrap();
        assert!(predictions.is_empty());
    }

    #[test]
    fn test_importances_cover_every_feature() {
        let predictor = predictor(400, 5);
        let pairs = predictor.feature_importance();
        assert_eq!(pairs.len(), 20);
        for pair in pairs.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
        let total: f64 = pairs.iter().map(|(_, v)| v).sum();
        assert!((total - 1.0).abs() < 1e-9 || total == 0.0);
    }
}
