//! Gradient-boosted regression
//!
//! Stagewise least-squares boosting: start from the target mean, then fit
//! shallow trees to the current residuals and add them with shrinkage.

use serde::{Deserialize, Serialize};

use crate::sampling::RandomContext;
use crate::training::forest::mean_importances;
use crate::training::tree::{RegressionTree, TreeConfig};

/// Boosting hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostingConfig {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    pub min_samples_split: usize,
}

impl Default for BoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_depth: 8,
            learning_rate: 0.1,
            min_samples_split: 2,
        }
    }
}

/// A fitted gradient-boosting regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    config: BoostingConfig,
    base_prediction: f64,
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl GradientBoostingRegressor {
    pub fn new(config: BoostingConfig) -> Self {
        Self {
            config,
            base_prediction: 0.0,
            trees: Vec::new(),
            n_features: 0,
        }
    }

    pub fn fit(&mut self, x: &[Vec<f64>], y: &[f64], ctx: &mut RandomContext) {
        self.n_features = x.first().map(Vec::len).unwrap_or(0);
        self.base_prediction = if y.is_empty() {
            0.0
        } else {
            y.iter().sum::<f64>() / y.len() as f64
        };

        let tree_config = TreeConfig {
            max_depth: self.config.max_depth,
            min_samples_split: self.config.min_samples_split,
            max_features: None,
        };

        let mut current: Vec<f64> = vec![self.base_prediction; y.len()];
        let mut residuals = vec![0.0; y.len()];
        self.trees = Vec::with_capacity(self.config.n_estimators);
        if x.is_empty() {
            return;
        }

        for _ in 0..self.config.n_estimators {
            for i in 0..y.len() {
                residuals[i] = y[i] - current[i];
            }
            let tree = RegressionTree::fit(x, &residuals, &tree_config, ctx);
            for (i, row) in x.iter().enumerate() {
                current[i] += self.config.learning_rate * tree.predict_row(row);
            }
            self.trees.push(tree);
        }
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let boost: f64 = self
            .trees
            .iter()
            .map(|tree| tree.predict_row(row))
            .sum::<f64>();
        self.base_prediction + self.config.learning_rate * boost
    }

    pub fn predict(&self, x: &[Vec<f64>]) -> Vec<f64> {
        x.iter().map(|row| self.predict_row(row)).collect()
    }

    pub fn feature_importances(&self) -> Vec<f64> {
        mean_importances(&self.trees, self.n_features)
    }

    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }
}
