//! CART regression tree
//!
//! Splits minimize sum-of-squares error. One tree implementation serves both
//! the regression ensembles and the binary classifiers, which fit trees over
//! 0/1 targets and read the mean leaf output as a probability.

use serde::{Deserialize, Serialize};

use crate::sampling::RandomContext;

/// Tree hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    pub max_depth: usize,
    pub min_samples_split: usize,
    /// Number of features considered per split; `None` considers all
    pub max_features: Option<usize>,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 15,
            min_samples_split: 2,
            max_features: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

/// A fitted regression tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    root: TreeNode,
    n_features: usize,
    /// Total squared-error reduction attributed to each feature, normalized
    /// to sum to one
    importances: Vec<f64>,
}

struct Builder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [f64],
    config: &'a TreeConfig,
    n_features: usize,
    importances: Vec<f64>,
}

/// Best split found for one node
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl RegressionTree {
    /// Fit a tree over row-major features `x` and targets `y`
    ///
    /// Feature subsampling per split draws from the shared context, so a
    /// fixed seed reproduces the tree exactly.
    pub fn fit(x: &[Vec<f64>], y: &[f64], config: &TreeConfig, ctx: &mut RandomContext) -> Self {
        debug_assert_eq!(x.len(), y.len());
        let n_features = x.first().map(Vec::len).unwrap_or(0);
        let mut builder = Builder {
            x,
            y,
            config,
            n_features,
            importances: vec![0.0; n_features],
        };

        let indices: Vec<usize> = (0..x.len()).collect();
        let root = builder.grow(indices, config.max_depth, ctx);

        let mut importances = builder.importances;
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }

        Self {
            root,
            n_features,
            importances,
        }
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }

    pub fn predict(&self, x: &[Vec<f64>]) -> Vec<f64> {
        x.iter().map(|row| self.predict_row(row)).collect()
    }

    pub fn importances(&self) -> &[f64] {
        &self.importances
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }
}

impl Builder<'_> {
    fn grow(&mut self, indices: Vec<usize>, depth_left: usize, ctx: &mut RandomContext) -> TreeNode {
        let n = indices.len();
        let (sum, sum_sq) = self.moments(&indices);
        let mean = sum / n as f64;
        let node_sse = sum_sq - sum * sum / n as f64;

        if depth_left == 0 || n < self.config.min_samples_split || node_sse <= 1e-12 {
            return TreeNode::Leaf { value: mean };
        }

        let candidate = match self.best_split(&indices, node_sse, ctx) {
            Some(c) => c,
            None => return TreeNode::Leaf { value: mean },
        };

        self.importances[candidate.feature] += candidate.gain;

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.x[i][candidate.feature] <= candidate.threshold);

        if left_idx.is_empty() || right_idx.is_empty() {
            return TreeNode::Leaf { value: mean };
        }

        let left = self.grow(left_idx, depth_left - 1, ctx);
        let right = self.grow(right_idx, depth_left - 1, ctx);

        TreeNode::Split {
            feature: candidate.feature,
            threshold: candidate.threshold,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn moments(&self, indices: &[usize]) -> (f64, f64) {
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        for &i in indices {
            sum += self.y[i];
            sum_sq += self.y[i] * self.y[i];
        }
        (sum, sum_sq)
    }

    /// Scan candidate features for the split with the largest SSE reduction
    fn best_split(
        &self,
        indices: &[usize],
        node_sse: f64,
        ctx: &mut RandomContext,
    ) -> Option<SplitCandidate> {
        let features = self.candidate_features(ctx);
        let n = indices.len() as f64;
        let (total_sum, _) = self.moments(indices);

        let mut best: Option<SplitCandidate> = None;

        for feature in features {
            let mut ordered: Vec<(f64, f64)> = indices
                .iter()
                .map(|&i| (self.x[i][feature], self.y[i]))
                .collect();
            ordered.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            let mut left_n = 0.0;
            let mut total_sq = 0.0;
            for &(_, y) in &ordered {
                total_sq += y * y;
            }

            for window in 0..ordered.len() - 1 {
                let (value, y) = ordered[window];
                left_sum += y;
                left_sq += y * y;
                left_n += 1.0;

                let next_value = ordered[window + 1].0;
                if next_value <= value {
                    continue;
                }

                let right_n = n - left_n;
                let left_sse = left_sq - left_sum * left_sum / left_n;
                let right_sum = total_sum - left_sum;
                let right_sse = (total_sq - left_sq) - right_sum * right_sum / right_n;
                let gain = node_sse - left_sse - right_sse;

                if gain > 1e-12 && best.as_ref().map(|b| gain > b.gain).unwrap_or(true) {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: (value + next_value) / 2.0,
                        gain,
                    });
                }
            }
        }

        best
    }

    /// Feature subset considered for one node, in ascending order
    fn candidate_features(&self, ctx: &mut RandomContext) -> Vec<usize> {
        match self.config.max_features {
            Some(m) if m < self.n_features => {
                let mut all: Vec<usize> = (0..self.n_features).collect();
                ctx.shuffle(&mut all);
                let mut subset: Vec<usize> = all.into_iter().take(m).collect();
                subset.sort_unstable();
                subset
            }
            _ => (0..self.n_features).collect(),
        }
    }
}
