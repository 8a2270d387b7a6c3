//! Random-forest ensembles
//!
//! Bagged CART trees with per-split feature subsampling. The regressor
//! averages tree outputs; the classifier fits trees over 0/1 targets and
//! reads the averaged output as a probability, thresholded at 0.5.

use serde::{Deserialize, Serialize};

use crate::sampling::RandomContext;
use crate::training::tree::{RegressionTree, TreeConfig};

/// Forest hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    /// Per-split feature subsample; `None` uses sqrt(n_features)
    pub max_features: Option<usize>,
    /// Class-balanced bootstrap for the classifier; the regressor ignores it
    #[serde(default)]
    pub balanced: bool,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 200,
            max_depth: 15,
            min_samples_split: 2,
            max_features: None,
            balanced: false,
        }
    }
}

impl ForestConfig {
    fn tree_config(&self, n_features: usize) -> TreeConfig {
        let max_features = self
            .max_features
            .or_else(|| Some((n_features as f64).sqrt().round().max(1.0) as usize));
        TreeConfig {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            max_features,
        }
    }
}

/// Averaging ensemble of regression trees
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    config: ForestConfig,
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl RandomForestRegressor {
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            n_features: 0,
        }
    }

    /// Fit bagged trees; bootstrap draws come from the shared context in
    /// tree order, so a fixed seed reproduces the ensemble.
    pub fn fit(&mut self, x: &[Vec<f64>], y: &[f64], ctx: &mut RandomContext) {
        self.n_features = x.first().map(Vec::len).unwrap_or(0);
        let tree_config = self.config.tree_config(self.n_features);
        self.trees = Vec::with_capacity(self.config.n_trees);
        if x.is_empty() {
            return;
        }

        for _ in 0..self.config.n_trees {
            let (sample_x, sample_y) = bootstrap(x, y, ctx);
            self.trees
                .push(RegressionTree::fit(&sample_x, &sample_y, &tree_config, ctx));
        }
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / self.trees.len() as f64
    }

    pub fn predict(&self, x: &[Vec<f64>]) -> Vec<f64> {
        x.iter().map(|row| self.predict_row(row)).collect()
    }

    /// Mean per-feature impurity-decrease importance across trees
    pub fn feature_importances(&self) -> Vec<f64> {
        mean_importances(&self.trees, self.n_features)
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

/// Probability forest over binary 0/1 targets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    forest: RandomForestRegressor,
}

impl RandomForestClassifier {
    pub fn new(config: ForestConfig) -> Self {
        Self {
            forest: RandomForestRegressor::new(config),
        }
    }

    /// Targets must be 0.0 or 1.0. With `balanced` set, each bootstrap draw
    /// picks a class uniformly before picking a member, so rare positives
    /// carry the same weight as the majority class.
    pub fn fit(&mut self, x: &[Vec<f64>], y: &[f64], ctx: &mut RandomContext) {
        debug_assert!(y.iter().all(|&v| v == 0.0 || v == 1.0));
        if self.forest.config.balanced {
            self.fit_balanced(x, y, ctx);
        } else {
            self.forest.fit(x, y, ctx);
        }
    }

    fn fit_balanced(&mut self, x: &[Vec<f64>], y: &[f64], ctx: &mut RandomContext) {
        let positives: Vec<usize> = (0..y.len()).filter(|&i| y[i] == 1.0).collect();
        let negatives: Vec<usize> = (0..y.len()).filter(|&i| y[i] == 0.0).collect();
        // One-class input has nothing to rebalance
        if positives.is_empty() || negatives.is_empty() {
            self.forest.fit(x, y, ctx);
            return;
        }

        let forest = &mut self.forest;
        forest.n_features = x.first().map(Vec::len).unwrap_or(0);
        let tree_config = forest.config.tree_config(forest.n_features);
        forest.trees = Vec::with_capacity(forest.config.n_trees);
        for _ in 0..forest.config.n_trees {
            let (sample_x, sample_y) = balanced_bootstrap(x, y, &positives, &negatives, ctx);
            forest
                .trees
                .push(RegressionTree::fit(&sample_x, &sample_y, &tree_config, ctx));
        }
    }

    /// P(class = 1), clamped to [0, 1]
    pub fn predict_proba_row(&self, row: &[f64]) -> f64 {
        self.forest.predict_row(row).clamp(0.0, 1.0)
    }

    pub fn predict_proba(&self, x: &[Vec<f64>]) -> Vec<f64> {
        x.iter().map(|row| self.predict_proba_row(row)).collect()
    }

    /// Predicted class labels as 0.0 / 1.0
    pub fn predict(&self, x: &[Vec<f64>]) -> Vec<f64> {
        x.iter()
            .map(|row| {
                if self.predict_proba_row(row) >= 0.5 {
                    1.0
                } else {
                    0.0
                }
            })
            .collect()
    }

    pub fn feature_importances(&self) -> Vec<f64> {
        self.forest.feature_importances()
    }
}

/// Bootstrap resample of (x, y) with replacement, same size as the input
fn bootstrap(
    x: &[Vec<f64>],
    y: &[f64],
    ctx: &mut RandomContext,
) -> (Vec<Vec<f64>>, Vec<f64>) {
    let n = x.len();
    let mut sample_x = Vec::with_capacity(n);
    let mut sample_y = Vec::with_capacity(n);
    for _ in 0..n {
        let i = ctx.uniform_int(0, n as u32 - 1) as usize;
        sample_x.push(x[i].clone());
        sample_y.push(y[i]);
    }
    (sample_x, sample_y)
}

/// Bootstrap that draws a class first, then a member of that class
fn balanced_bootstrap(
    x: &[Vec<f64>],
    y: &[f64],
    positives: &[usize],
    negatives: &[usize],
    ctx: &mut RandomContext,
) -> (Vec<Vec<f64>>, Vec<f64>) {
    let n = x.len();
    let mut sample_x = Vec::with_capacity(n);
    let mut sample_y = Vec::with_capacity(n);
    for _ in 0..n {
        let pool = if ctx.uniform_int(0, 1) == 1 {
            positives
        } else {
            negatives
        };
        let i = *ctx.choose(pool);
        sample_x.push(x[i].clone());
        sample_y.push(y[i]);
    }
    (sample_x, sample_y)
}

/// Average normalized tree importances
pub(crate) fn mean_importances(trees: &[RegressionTree], n_features: usize) -> Vec<f64> {
    let mut totals = vec![0.0; n_features];
    if trees.is_empty() {
        return totals;
    }
    for tree in trees {
        for (total, imp) in totals.iter_mut().zip(tree.importances()) {
            *total += imp;
        }
    }
    let sum: f64 = totals.iter().sum();
    if sum > 0.0 {
        for total in &mut totals {
            *total /= sum;
        }
    }
    totals
}
