//! Pipeline error taxonomy
//!
//! Cleaning and encoding errors abort a run immediately; the winner-model
//! skip (`InsufficientData`) is the only recoverable path and is handled
//! inside the training engine rather than propagated.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the prediction pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no data source found: {0}")]
    DataSource(String),

    #[error("required column missing from input: {0}")]
    Schema(String),

    #[error("category {value:?} for field {field:?} was not part of the training data")]
    UnknownCategory { field: String, value: String },

    #[error("index {index} out of range for field {field:?} (vocabulary size {len})")]
    IndexOutOfRange {
        field: String,
        index: usize,
        len: usize,
    },

    #[error("insufficient data for {task} model: {positives} positive examples (minimum {required})")]
    InsufficientData {
        task: String,
        positives: usize,
        required: usize,
    },

    #[error("artifact file missing: {0:?}")]
    ArtifactMissing(PathBuf),

    #[error("artifact version mismatch: {reason}")]
    ArtifactVersionMismatch { reason: String },

    #[error("failed to read tabular data: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to serialize artifact: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    /// True for serve-time category rejections, which callers are expected
    /// to report distinctly from generic failures.
    pub fn is_unknown_category(&self) -> bool {
        matches!(self, PipelineError::UnknownCategory { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_category_message_names_field_and_value() {
        let err = PipelineError::UnknownCategory {
            field: "driver".to_string(),
            value: "Nobody".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("driver"));
        assert!(msg.contains("Nobody"));
        assert!(msg.contains("not part of the training data"));
        assert!(err.is_unknown_category());
    }

    #[test]
    fn test_other_errors_are_not_unknown_category() {
        let err = PipelineError::Schema("grid".to_string());
        assert!(!err.is_unknown_category());
    }
}
