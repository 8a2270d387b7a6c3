//! Categorical vocabularies and numeric standardization
//!
//! Both are fit once, over the full training corpus, by the training engine,
//! then frozen inside the artifact bundle. Serving only looks values up;
//! an out-of-vocabulary category at serve time is a hard error.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::PipelineError;
use crate::models::EnhancedFeatureRow;

/// Ordered feature contract shared by every model in a bundle
pub const FEATURE_NAMES: [&str; 20] = [
    "grid",
    "constructor_encoded",
    "circuit_encoded",
    "driver_encoded",
    "weather_encoded",
    "tire_strategy_encoded",
    "temperature",
    "humidity",
    "wind_speed",
    "track_temp",
    "driver_experience",
    "recent_form",
    "quali_gap_to_teammate",
    "constructor_standing",
    "budget_efficiency",
    "circuit_type_encoded",
    "drs_zones",
    "lap_length",
    "safety_car_laps",
    "avg_pit_time",
];

/// Continuous columns standardized by the scaler
pub const SCALED_FEATURES: [&str; 10] = [
    "temperature",
    "humidity",
    "wind_speed",
    "track_temp",
    "driver_experience",
    "recent_form",
    "quali_gap_to_teammate",
    "budget_efficiency",
    "lap_length",
    "avg_pit_time",
];

/// Ordered feature names as owned strings (persisted form)
pub fn feature_names() -> Vec<String> {
    FEATURE_NAMES.iter().map(|n| n.to_string()).collect()
}

/// Indices of the scaled columns within the feature contract
pub fn scaled_feature_indices() -> Vec<usize> {
    SCALED_FEATURES
        .iter()
        .map(|name| {
            FEATURE_NAMES
                .iter()
                .position(|f| f == name)
                .unwrap_or_else(|| unreachable!("scaled feature {name} not in contract"))
        })
        .collect()
}

/// Frozen bidirectional category ↔ index mapping for one field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vocabulary {
    field: String,
    classes: Vec<String>,
    index: HashMap<String, usize>,
}

impl Vocabulary {
    /// Fit a vocabulary over a value sequence
    ///
    /// Indices are assigned in first-seen order, so the mapping is
    /// reproducible across runs given the same input ordering.
    pub fn fit<I, S>(field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut classes = Vec::new();
        let mut index = HashMap::new();
        for value in values {
            let value = value.as_ref();
            if !index.contains_key(value) {
                index.insert(value.to_string(), classes.len());
                classes.push(value.to_string());
            }
        }
        Self {
            field: field.to_string(),
            classes,
            index,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Category → index; unseen values are rejected, never defaulted
    pub fn encode(&self, value: &str) -> Result<usize, PipelineError> {
        self.index
            .get(value)
            .copied()
            .ok_or_else(|| PipelineError::UnknownCategory {
                field: self.field.clone(),
                value: value.to_string(),
            })
    }

    /// Index → category
    pub fn decode(&self, index: usize) -> Result<&str, PipelineError> {
        self.classes
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| PipelineError::IndexOutOfRange {
                field: self.field.clone(),
                index,
                len: self.classes.len(),
            })
    }
}

/// The six categorical vocabularies of the feature contract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabularySet {
    pub driver: Vocabulary,
    pub constructor: Vocabulary,
    pub circuit: Vocabulary,
    pub weather: Vocabulary,
    pub tire_strategy: Vocabulary,
    pub circuit_type: Vocabulary,
}

impl VocabularySet {
    /// Fit all six vocabularies over the full training corpus
    ///
    /// `extra_tire_strategies` appends the synthesis engine's full candidate
    /// list after the corpus values, so serve-time draws always encode.
    pub fn fit(rows: &[EnhancedFeatureRow], extra_tire_strategies: &[&str]) -> Self {
        let tire_values = rows
            .iter()
            .map(|r| r.tire_strategy.as_str())
            .chain(extra_tire_strategies.iter().copied());

        Self {
            driver: Vocabulary::fit("driver", rows.iter().map(|r| r.record.driver.as_str())),
            constructor: Vocabulary::fit(
                "constructor",
                rows.iter().map(|r| r.record.constructor.as_str()),
            ),
            circuit: Vocabulary::fit("circuit", rows.iter().map(|r| r.record.circuit.as_str())),
            weather: Vocabulary::fit("weather", rows.iter().map(|r| r.record.weather.as_str())),
            tire_strategy: Vocabulary::fit("tire_strategy", tire_values),
            circuit_type: Vocabulary::fit(
                "circuit_type",
                rows.iter().map(|r| r.circuit_type.as_str()),
            ),
        }
    }

    /// Encode one enhanced row into the ordered 20-column feature vector
    pub fn encode_row(&self, row: &EnhancedFeatureRow) -> Result<Vec<f64>, PipelineError> {
        Ok(vec![
            row.record.grid as f64,
            self.constructor.encode(&row.record.constructor)? as f64,
            self.circuit.encode(&row.record.circuit)? as f64,
            self.driver.encode(&row.record.driver)? as f64,
            self.weather.encode(row.record.weather.as_str())? as f64,
            self.tire_strategy.encode(&row.tire_strategy)? as f64,
            row.temperature,
            row.humidity,
            row.wind_speed,
            row.track_temp,
            row.driver_experience as f64,
            row.recent_form,
            row.quali_gap_to_teammate,
            row.constructor_standing as f64,
            row.budget_efficiency,
            self.circuit_type.encode(row.circuit_type.as_str())? as f64,
            row.drs_zones as f64,
            row.lap_length,
            row.safety_car_laps as f64,
            row.avg_pit_time,
        ])
    }
}

/// Per-column standardization over the continuous features
///
/// Statistics are frozen at fit time and never recomputed at serve time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    columns: Vec<usize>,
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl StandardScaler {
    /// Fit mean and (population) standard deviation per selected column
    pub fn fit(matrix: &[Vec<f64>], columns: &[usize]) -> Self {
        let n = matrix.len().max(1) as f64;
        let mut means = Vec::with_capacity(columns.len());
        let mut stds = Vec::with_capacity(columns.len());

        for &col in columns {
            let mean = matrix.iter().map(|row| row[col]).sum::<f64>() / n;
            let variance = matrix
                .iter()
                .map(|row| (row[col] - mean).powi(2))
                .sum::<f64>()
                / n;
            means.push(mean);
            stds.push(variance.sqrt());
        }

        Self {
            columns: columns.to_vec(),
            means,
            stds,
        }
    }

    /// Standardize one feature vector in place with the frozen statistics
    ///
    /// A zero-deviation column is left unscaled.
    pub fn apply(&self, row: &mut [f64]) {
        for ((&col, &mean), &std) in self.columns.iter().zip(&self.means).zip(&self.stds) {
            if std > 0.0 {
                row[col] = (row[col] - mean) / std;
            }
        }
    }

    /// Standardize a whole matrix in place
    pub fn apply_matrix(&self, matrix: &mut [Vec<f64>]) {
        for row in matrix {
            self.apply(row);
        }
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn stds(&self) -> &[f64] {
        &self.stds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_assigns_first_seen_indices() {
        let vocab = Vocabulary::fit("weather", ["Dry", "Wet", "Dry", "Mixed"]);
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.encode("Dry").unwrap(), 0);
        assert_eq!(vocab.encode("Wet").unwrap(), 1);
        assert_eq!(vocab.encode("Mixed").unwrap(), 2);
        assert_eq!(vocab.classes(), &["Dry", "Wet", "Mixed"]);
    }

    #[test]
    fn test_round_trip() {
        let values = ["Monza Circuit", "Imola", "Monaco Circuit", "Imola"];
        let vocab = Vocabulary::fit("circuit", values);
        for value in values {
            let index = vocab.encode(value).unwrap();
            assert_eq!(vocab.decode(index).unwrap(), value);
        }
    }

    #[test]
    fn test_oov_rejection() {
        let vocab = Vocabulary::fit("driver", ["A", "B"]);
        let err = vocab.encode("C").unwrap_err();
        match err {
            PipelineError::UnknownCategory { field, value } => {
                assert_eq!(field, "driver");
                assert_eq!(value, "C");
            }
            other => panic!("expected UnknownCategory, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_out_of_range() {
        let vocab = Vocabulary::fit("driver", ["A", "B"]);
        assert!(matches!(
            vocab.decode(2),
            Err(PipelineError::IndexOutOfRange { index: 2, len: 2, .. })
        ));
    }

    #[test]
    fn test_fit_is_deterministic() {
        let values = ["x", "y", "x", "z", "y"];
        let a = Vocabulary::fit("f", values);
        let b = Vocabulary::fit("f", values);
        assert_eq!(a.classes(), b.classes());
    }

    #[test]
    fn test_feature_contract_shape() {
        assert_eq!(FEATURE_NAMES.len(), 20);
        let indices = scaled_feature_indices();
        assert_eq!(indices, vec![6, 7, 8, 9, 10, 11, 12, 14, 17, 19]);
    }

    #[test]
    fn test_scaler_standardizes() {
        let matrix = vec![vec![1.0, 10.0], vec![2.0, 20.0], vec![3.0, 30.0]];
        let scaler = StandardScaler::fit(&matrix, &[0, 1]);

        let mut row = vec![2.0, 20.0];
        scaler.apply(&mut row);
        assert!(row[0].abs() < 1e-12);
        assert!(row[1].abs() < 1e-12);

        let mut high = vec![3.0, 30.0];
        scaler.apply(&mut high);
        assert!((high[0] - 1.224_744_871_391_589).abs() < 1e-9);
    }

    #[test]
    fn test_zero_variance_column_is_identity() {
        let matrix = vec![vec![5.0, 1.0], vec![5.0, 2.0], vec![5.0, 3.0]];
        let scaler = StandardScaler::fit(&matrix, &[0, 1]);
        let mut row = vec![5.0, 2.0];
        scaler.apply(&mut row);
        assert_eq!(row[0], 5.0);
        assert!(row[1].abs() < 1e-12);
    }

    #[test]
    fn test_scaler_serde_round_trip() {
        let matrix = vec![vec![1.0], vec![3.0]];
        let scaler = StandardScaler::fit(&matrix, &[0]);
        let json = serde_json::to_string(&scaler).unwrap();
        let back: StandardScaler = serde_json::from_str(&json).unwrap();
        assert_eq!(back.means(), scaler.means());
        assert_eq!(back.stds(), scaler.stds());
    }
}
