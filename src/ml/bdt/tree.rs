//! Histogram-based gradient-boosted trees for binary classification.
//!
//! Each round fits one regression tree to the second-order expansion of the
//! weighted logistic loss:
//! - grad = (p - y) * w
//! - hess = max(p * (1 - p), 1e-16) * w
//!
//! Features are quantized into equal-width bins per column before split search,
//! so the cost of a round grows with `rows * features` rather than with the
//! number of distinct values.

use ndarray::{Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const MIN_HESSIAN: f64 = 1e-16;
const PROB_CLAMP: f64 = 1e-7;

/// Boosting hyperparameters. Defaults follow xgboost.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostOptions {
    /// Number of boosting rounds (one tree per round).
    pub n_estimators: usize,
    pub max_depth: usize,
    /// Shrinkage applied to every leaf value.
    pub learning_rate: f64,
    /// L2 regularization on leaf values.
    pub lambda: f64,
    /// Minimum hessian sum on each side of a split.
    pub min_child_weight: f64,
    /// Minimum loss reduction required to split.
    pub min_split_gain: f64,
    /// Histogram bins per feature, clamped to `2..=256`.
    pub bins: usize,
}

impl Default for BoostOptions {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 6,
            learning_rate: 0.3,
            lambda: 1.0,
            min_child_weight: 1.0,
            min_split_gain: 0.0,
            bins: 256,
        }
    }
}

impl BoostOptions {
    fn validate(&self) -> Result<(), TreeError> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(TreeError::InvalidOptions(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.lambda.is_finite() && self.lambda >= 0.0) {
            return Err(TreeError::InvalidOptions(format!(
                "lambda must be non-negative, got {}",
                self.lambda
            )));
        }
        if !(self.min_child_weight.is_finite() && self.min_child_weight >= 0.0) {
            return Err(TreeError::InvalidOptions(format!(
                "min_child_weight must be non-negative, got {}",
                self.min_child_weight
            )));
        }
        if !self.min_split_gain.is_finite() {
            return Err(TreeError::InvalidOptions(
                "min_split_gain must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Errors raised by [`TreeEnsemble::fit`] and [`TreeEnsemble::predict_proba`].
#[derive(Debug, Error, PartialEq)]
pub enum TreeError {
    #[error("Cannot fit a tree ensemble on an empty dataset")]
    Empty,
    #[error("{what} has {actual} entries but the feature matrix has {expected} rows")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("Non-finite feature value at row {row}, column {col}")]
    NonFinite { row: usize, col: usize },
    #[error("Label at row {row} is {value}; expected 0 or 1")]
    InvalidLabel { row: usize, value: f64 },
    #[error("Sample weight at row {row} is {value}; expected a finite non-negative value")]
    InvalidWeight { row: usize, value: f64 },
    #[error("Sample weights sum to zero")]
    ZeroTotalWeight,
    #[error("Ensemble was fitted on {expected} features but the input has {actual}")]
    FeatureCount { expected: usize, actual: usize },
    #[error("Invalid boosting options: {0}")]
    InvalidOptions(String),
}

/// One node of a regression tree; rows go left when `value < threshold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Regression tree stored as a flat node list rooted at index 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx) {
                Some(Node::Leaf { value }) => return *value,
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    idx = if row[*feature] < *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                None => return 0.0,
            }
        }
    }

    /// Longest root-to-leaf path, counted in splits.
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match nodes.get(idx) {
                Some(Node::Split { left, right, .. }) => {
                    1 + walk(nodes, *left).max(walk(nodes, *right))
                }
                _ => 0,
            }
        }
        walk(&self.nodes, 0)
    }
}

/// Boosted ensemble producing a logistic margin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub n_features: usize,
    /// Weighted log-odds of the training labels.
    pub base_margin: f64,
    pub trees: Vec<Tree>,
}

impl TreeEnsemble {
    /// Fit on `features` `[n, d]`, binary `labels` and non-negative weights.
    pub fn fit(
        features: ArrayView2<'_, f64>,
        labels: ArrayView1<'_, f64>,
        sample_weight: ArrayView1<'_, f64>,
        options: &BoostOptions,
    ) -> Result<Self, TreeError> {
        options.validate()?;
        let (n, d) = features.dim();
        if n == 0 {
            return Err(TreeError::Empty);
        }
        check_len("labels", n, labels.len())?;
        check_len("sample_weight", n, sample_weight.len())?;
        check_finite(features)?;
        for (row, &value) in labels.iter().enumerate() {
            if value != 0.0 && value != 1.0 {
                return Err(TreeError::InvalidLabel { row, value });
            }
        }
        for (row, &value) in sample_weight.iter().enumerate() {
            if !value.is_finite() || value < 0.0 {
                return Err(TreeError::InvalidWeight { row, value });
            }
        }
        let total_w: f64 = sample_weight.sum();
        if total_w <= 0.0 {
            return Err(TreeError::ZeroTotalWeight);
        }

        let positive_w: f64 = labels
            .iter()
            .zip(sample_weight.iter())
            .map(|(y, w)| y * w)
            .sum();
        let prior = (positive_w / total_w).clamp(PROB_CLAMP, 1.0 - PROB_CLAMP);
        let base_margin = (prior / (1.0 - prior)).ln();

        let bins = options.bins.clamp(2, 256);
        let grid = BinGrid::new(features, bins);
        let rows: Vec<usize> = (0..n).collect();
        let mut margins = vec![base_margin; n];
        let mut grad = vec![0.0; n];
        let mut hess = vec![0.0; n];
        let mut trees = Vec::with_capacity(options.n_estimators);

        for round in 0..options.n_estimators {
            for i in 0..n {
                let p = sigmoid(margins[i]);
                let w = sample_weight[i];
                grad[i] = (p - labels[i]) * w;
                hess[i] = (p * (1.0 - p)).max(MIN_HESSIAN) * w;
            }
            let mut builder = TreeBuilder {
                grid: &grid,
                grad: &grad,
                hess: &hess,
                options,
                nodes: Vec::new(),
            };
            builder.grow(&rows, 0);
            let tree = Tree {
                nodes: builder.nodes,
            };
            for (i, margin) in margins.iter_mut().enumerate() {
                *margin += tree.predict_row(features.row(i));
            }
            tracing::debug!(round, nodes = tree.nodes.len(), depth = tree.depth(), "fitted tree");
            trees.push(tree);
        }

        Ok(Self {
            n_features: d,
            base_margin,
            trees,
        })
    }

    /// Raw logistic margin per row.
    pub fn predict_margin(&self, features: ArrayView2<'_, f64>) -> Result<Vec<f64>, TreeError> {
        if features.ncols() != self.n_features {
            return Err(TreeError::FeatureCount {
                expected: self.n_features,
                actual: features.ncols(),
            });
        }
        Ok(features
            .rows()
            .into_iter()
            .map(|row| {
                self.base_margin
                    + self
                        .trees
                        .iter()
                        .map(|tree| tree.predict_row(row))
                        .sum::<f64>()
            })
            .collect())
    }

    /// Class probabilities `[n, 2]`: column 0 background, column 1 signal.
    pub fn predict_proba(&self, features: ArrayView2<'_, f64>) -> Result<Array2<f64>, TreeError> {
        let margins = self.predict_margin(features)?;
        let mut out = Array2::zeros((margins.len(), 2));
        for (i, margin) in margins.into_iter().enumerate() {
            let p = sigmoid(margin);
            out[[i, 0]] = 1.0 - p;
            out[[i, 1]] = p;
        }
        Ok(out)
    }

    /// Structural checks for a deserialized ensemble.
    pub fn validate(&self) -> Result<(), String> {
        if !self.base_margin.is_finite() {
            return Err("base_margin must be finite".to_string());
        }
        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(format!("Tree {t} has no nodes"));
            }
            for (i, node) in tree.nodes.iter().enumerate() {
                if let Node::Split {
                    feature,
                    left,
                    right,
                    ..
                } = node
                {
                    if *feature >= self.n_features {
                        return Err(format!(
                            "Tree {t} node {i} splits on feature {feature} of {}",
                            self.n_features
                        ));
                    }
                    // Children are always appended after their parent.
                    let n_nodes = tree.nodes.len();
                    if *left <= i || *right <= i || *left >= n_nodes || *right >= n_nodes {
                        return Err(format!("Tree {t} node {i} has invalid children"));
                    }
                }
            }
        }
        Ok(())
    }
}

fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<(), TreeError> {
    if expected != actual {
        return Err(TreeError::LengthMismatch {
            what,
            expected,
            actual,
        });
    }
    Ok(())
}

fn check_finite(features: ArrayView2<'_, f64>) -> Result<(), TreeError> {
    for ((row, col), value) in features.indexed_iter() {
        if !value.is_finite() {
            return Err(TreeError::NonFinite { row, col });
        }
    }
    Ok(())
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Per-feature equal-width quantization of the training matrix.
struct BinGrid {
    /// Column-major bin indices: `codes[feature][row]`.
    codes: Vec<Vec<u8>>,
    mins: Vec<f64>,
    maxs: Vec<f64>,
    bins: usize,
}

impl BinGrid {
    fn new(features: ArrayView2<'_, f64>, bins: usize) -> Self {
        let scale = (bins - 1) as f64;
        let mut codes = Vec::with_capacity(features.ncols());
        let mut mins = Vec::with_capacity(features.ncols());
        let mut maxs = Vec::with_capacity(features.ncols());
        for column in features.columns() {
            let min = column.fold(f64::INFINITY, |a, &b| a.min(b));
            let mut max = column.fold(f64::NEG_INFINITY, |a, &b| a.max(b));
            if min == max {
                max = min + 1.0;
            }
            codes.push(
                column
                    .iter()
                    .map(|&v| (((v - min) / (max - min)).clamp(0.0, 1.0) * scale).round() as u8)
                    .collect(),
            );
            mins.push(min);
            maxs.push(max);
        }
        Self {
            codes,
            mins,
            maxs,
            bins,
        }
    }

    /// Value separating bin `split_bin` from bin `split_bin + 1`.
    fn threshold(&self, feature: usize, split_bin: usize) -> f64 {
        let (min, max) = (self.mins[feature], self.maxs[feature]);
        min + (split_bin as f64 + 0.5) / (self.bins - 1) as f64 * (max - min)
    }
}

struct SplitCandidate {
    gain: f64,
    feature: usize,
    bin: usize,
}

struct TreeBuilder<'a> {
    grid: &'a BinGrid,
    grad: &'a [f64],
    hess: &'a [f64],
    options: &'a BoostOptions,
    nodes: Vec<Node>,
}

impl TreeBuilder<'_> {
    fn grow(&mut self, rows: &[usize], depth: usize) -> usize {
        let idx = self.nodes.len();
        let g: f64 = rows.iter().map(|&r| self.grad[r]).sum();
        let h: f64 = rows.iter().map(|&r| self.hess[r]).sum();
        self.nodes.push(Node::Leaf {
            value: -g / (h + self.options.lambda) * self.options.learning_rate,
        });
        if depth >= self.options.max_depth || rows.len() < 2 {
            return idx;
        }
        let Some(split) = self.best_split(rows, g, h) else {
            return idx;
        };
        let codes = &self.grid.codes[split.feature];
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .partition(|&&r| (codes[r] as usize) <= split.bin);
        let left = self.grow(&left_rows, depth + 1);
        let right = self.grow(&right_rows, depth + 1);
        self.nodes[idx] = Node::Split {
            feature: split.feature,
            threshold: self.grid.threshold(split.feature, split.bin),
            left,
            right,
        };
        idx
    }

    fn best_split(&self, rows: &[usize], g: f64, h: f64) -> Option<SplitCandidate> {
        let lambda = self.options.lambda;
        let min_child = self.options.min_child_weight;
        let parent_score = g * g / (h + lambda);
        let bins = self.grid.bins;
        let mut best: Option<SplitCandidate> = None;
        let mut hist_g = vec![0.0; bins];
        let mut hist_h = vec![0.0; bins];
        let mut hist_n = vec![0usize; bins];

        for (feature, codes) in self.grid.codes.iter().enumerate() {
            hist_g.fill(0.0);
            hist_h.fill(0.0);
            hist_n.fill(0);
            for &r in rows {
                let b = codes[r] as usize;
                hist_g[b] += self.grad[r];
                hist_h[b] += self.hess[r];
                hist_n[b] += 1;
            }
            let (mut gl, mut hl, mut nl) = (0.0, 0.0, 0usize);
            for bin in 0..bins - 1 {
                gl += hist_g[bin];
                hl += hist_h[bin];
                nl += hist_n[bin];
                let nr = rows.len() - nl;
                if nl == 0 || nr == 0 {
                    continue;
                }
                let (gr, hr) = (g - gl, h - hl);
                if hl < min_child || hr < min_child {
                    continue;
                }
                let gain = 0.5 * (gl * gl / (hl + lambda) + gr * gr / (hr + lambda) - parent_score)
                    - self.options.min_split_gain;
                if gain > best.as_ref().map_or(0.0, |b| b.gain) {
                    best = Some(SplitCandidate { gain, feature, bin });
                }
            }
        }
        best
    }
}
