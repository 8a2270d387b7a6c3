//! Artifact bundle persistence
//!
//! A training run produces one directory of JSON artifacts plus an
//! append-only `training_log.csv`. Loading verifies the format version and
//! the stored feature contract before any prediction is served.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::encoding::{feature_names, StandardScaler, VocabularySet};
use crate::error::PipelineError;
use crate::training::engine::ModelArtifact;

/// Bumped whenever the serialized layout changes incompatibly
pub const FORMAT_VERSION: u32 = 1;

pub const POSITION_MODEL_FILE: &str = "position_model.json";
pub const PODIUM_MODEL_FILE: &str = "podium_model.json";
pub const POINTS_MODEL_FILE: &str = "points_model.json";
pub const WINNER_MODEL_FILE: &str = "winner_model.json";
pub const VOCABULARIES_FILE: &str = "vocabularies.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const FEATURE_NAMES_FILE: &str = "feature_names.json";
pub const METADATA_FILE: &str = "metadata.json";
pub const TRAINING_LOG_FILE: &str = "training_log.csv";

const TRAINING_LOG_HEADER: &str =
    "timestamp,dataset_size,feature_count,position_model,position_rmse,position_mae,podium_accuracy,points_accuracy,winner_accuracy";

/// Run provenance stored next to the models
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleMetadata {
    pub format_version: u32,
    pub created_at: String,
    pub seed: u64,
    pub dataset_size: usize,
    pub scores: BTreeMap<String, f64>,
}

/// Everything a predictor needs, loaded and saved as one unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactBundle {
    pub position: ModelArtifact,
    pub podium: ModelArtifact,
    pub points: ModelArtifact,
    /// Absent when training skipped the winner task
    pub winner: Option<ModelArtifact>,
    pub vocabularies: VocabularySet,
    pub scaler: StandardScaler,
    pub feature_names: Vec<String>,
    pub metadata: BundleMetadata,
}

impl ArtifactBundle {
    /// Write every artifact under `dir`, creating it if needed, then append
    /// one row to the training log.
    pub fn save(&self, dir: &Path) -> Result<(), PipelineError> {
        fs::create_dir_all(dir)?;

        write_json(&dir.join(POSITION_MODEL_FILE), &self.position)?;
        write_json(&dir.join(PODIUM_MODEL_FILE), &self.podium)?;
        write_json(&dir.join(POINTS_MODEL_FILE), &self.points)?;
        if let Some(winner) = &self.winner {
            write_json(&dir.join(WINNER_MODEL_FILE), winner)?;
        }
        write_json(&dir.join(VOCABULARIES_FILE), &self.vocabularies)?;
        write_json(&dir.join(SCALER_FILE), &self.scaler)?;
        write_json(&dir.join(FEATURE_NAMES_FILE), &self.feature_names)?;
        write_json(&dir.join(METADATA_FILE), &self.metadata)?;
        self.append_training_log(dir)?;

        info!(dir = %dir.display(), "saved artifact bundle");
        Ok(())
    }

    /// Load a bundle from `dir`, verifying version and feature contract
    pub fn load(dir: &Path) -> Result<Self, PipelineError> {
        let position: ModelArtifact = read_json(&dir.join(POSITION_MODEL_FILE))?;
        let podium: ModelArtifact = read_json(&dir.join(PODIUM_MODEL_FILE))?;
        let points: ModelArtifact = read_json(&dir.join(POINTS_MODEL_FILE))?;
        let winner_path = dir.join(WINNER_MODEL_FILE);
        let winner: Option<ModelArtifact> = if winner_path.exists() {
            Some(read_json(&winner_path)?)
        } else {
            None
        };
        let vocabularies: VocabularySet = read_json(&dir.join(VOCABULARIES_FILE))?;
        let scaler: StandardScaler = read_json(&dir.join(SCALER_FILE))?;
        let stored_names: Vec<String> = read_json(&dir.join(FEATURE_NAMES_FILE))?;
        let metadata: BundleMetadata = read_json(&dir.join(METADATA_FILE))?;

        if metadata.format_version != FORMAT_VERSION {
            return Err(PipelineError::ArtifactVersionMismatch {
                reason: format!(
                    "bundle format {} but this build reads {}",
                    metadata.format_version, FORMAT_VERSION
                ),
            });
        }
        let expected = feature_names();
        if stored_names != expected {
            return Err(PipelineError::ArtifactVersionMismatch {
                reason: format!(
                    "stored feature names ({}) do not match this build's contract ({})",
                    stored_names.len(),
                    expected.len()
                ),
            });
        }
        for artifact in [Some(&position), Some(&podium), Some(&points), winner.as_ref()]
            .into_iter()
            .flatten()
        {
            if artifact.feature_names != stored_names {
                return Err(PipelineError::ArtifactVersionMismatch {
                    reason: format!("{} model carries a different feature contract", artifact.task),
                });
            }
        }

        info!(dir = %dir.display(), winner = winner.is_some(), "loaded artifact bundle");
        Ok(Self {
            position,
            podium,
            points,
            winner,
            vocabularies,
            scaler,
            feature_names: stored_names,
            metadata,
        })
    }

    fn append_training_log(&self, dir: &Path) -> Result<(), PipelineError> {
        let path = dir.join(TRAINING_LOG_FILE);
        let is_new = !path.exists();
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        if is_new {
            writeln!(file, "{}", TRAINING_LOG_HEADER)?;
        }
        let score = |key: &str| {
            self.metadata
                .scores
                .get(key)
                .map(|v| format!("{v:.4}"))
                .unwrap_or_default()
        };
        writeln!(
            file,
            "{},{},{},{},{},{},{},{},{}",
            self.metadata.created_at,
            self.metadata.dataset_size,
            self.feature_names.len(),
            self.position.model.name(),
            score("position_rmse"),
            score("position_mae"),
            score("podium_accuracy"),
            score("points_accuracy"),
            score("winner_accuracy"),
        )?;
        Ok(())
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PipelineError> {
    let file = File::create(path)?;
    serde_json::to_writer(BufWriter::new(file), value)?;
    Ok(())
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, PipelineError> {
    if !path.exists() {
        return Err(PipelineError::ArtifactMissing(PathBuf::from(path)));
    }
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::RandomContext;
    use crate::training::engine::{train_pipeline, TrainingConfig};
    use tempfile::TempDir;

    fn trained_bundle(rows: usize, seed: u64) -> ArtifactBundle {
        let records = crate::training::engine::synthetic_records(rows);
        let mut ctx = RandomContext::from_seed(seed);
        train_pipeline(&records, &TrainingConfig::fast(seed), &mut ctx)
            .unwrap()
            .bundle
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let bundle = trained_bundle(400, 11);
        bundle.save(dir.path()).unwrap();

        let loaded = ArtifactBundle::load(dir.path()).unwrap();
        assert_eq!(loaded.feature_names, bundle.feature_names);
        assert_eq!(loaded.metadata.seed, 11);
        assert!(loaded.winner.is_none());
        assert_eq!(
            loaded.vocabularies.driver.classes(),
            bundle.vocabularies.driver.classes()
        );

        let probe = vec![vec![0.0; 20]];
        assert_eq!(bundle.position.model.predict(&probe), loaded.position.model.predict(&probe));
    }

    #[test]
    fn test_missing_artifact_is_reported_by_path() {
        let dir = TempDir::new().unwrap();
        let bundle = trained_bundle(400, 11);
        bundle.save(dir.path()).unwrap();
        fs::remove_file(dir.path().join(SCALER_FILE)).unwrap();

        let err = ArtifactBundle::load(dir.path()).unwrap_err();
        match err {
            PipelineError::ArtifactMissing(path) => {
                assert!(path.ends_with(SCALER_FILE));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_version_mismatch_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut bundle = trained_bundle(400, 11);
        bundle.metadata.format_version = FORMAT_VERSION + 1;
        bundle.save(dir.path()).unwrap();

        let err = ArtifactBundle::load(dir.path()).unwrap_err();
        assert!(matches!(err, PipelineError::ArtifactVersionMismatch { .. }));
    }

    #[test]
    fn test_training_log_appends_across_runs() {
        let dir = TempDir::new().unwrap();
        let bundle = trained_bundle(400, 11);
        bundle.save(dir.path()).unwrap();
        bundle.save(dir.path()).unwrap();

        let log = fs::read_to_string(dir.path().join(TRAINING_LOG_FILE)).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], TRAINING_LOG_HEADER);
        assert!(lines[1].contains(&bundle.metadata.created_at));
        let columns: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(columns[1], bundle.metadata.dataset_size.to_string());
        assert_eq!(columns[2], bundle.feature_names.len().to_string());
        // Winner column stays empty when the model was skipped
        assert!(lines[1].ends_with(','));
    }
}
