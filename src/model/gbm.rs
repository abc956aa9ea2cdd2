//! Gradient-boosted regression trees with second-order splits.
//!
//! One implementation backs both model families: trees are grown either
//! level-by-level (`Depthwise`) or best-gain-first (`Lossguide`), with
//! XGBoost-style second-order gain, L1/L2 leaf regularization, and
//! per-tree row/column subsampling. Training is deterministic for a
//! fixed seed.

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How a tree allocates its splits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrowthPolicy {
    /// Split every node of a level before descending; bounded by
    /// `max_depth`.
    Depthwise,
    /// Always split the frontier leaf with the highest gain; bounded by
    /// `max_leaves` and `max_depth`.
    Lossguide,
}

/// The training objective, fixed by the task at construction time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoostObjective {
    /// Binary log-loss; predictions are class labels via a 0.5
    /// probability threshold.
    Logistic,
    /// Squared error; predictions are raw values.
    SquaredError,
}

/// Hyperparameters of one boosting run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GbmParams {
    /// Training objective.
    pub objective: BoostObjective,
    /// Tree growth policy.
    pub growth: GrowthPolicy,
    /// Number of boosting rounds.
    pub n_estimators: usize,
    /// Shrinkage applied to every leaf weight.
    pub learning_rate: f64,
    /// Maximum tree depth.
    pub max_depth: usize,
    /// Maximum leaves per tree; only enforced under lossguide growth.
    pub max_leaves: usize,
    /// Fraction of rows sampled per tree.
    pub subsample: f64,
    /// Fraction of feature columns sampled per tree.
    pub colsample: f64,
    /// L1 regularization on leaf weights (soft-thresholded gradients).
    pub reg_alpha: f64,
    /// L2 regularization on leaf weights.
    pub reg_lambda: f64,
    /// Seed for row/column subsampling.
    pub seed: u64,
}

impl Default for GbmParams {
    fn default() -> Self {
        Self {
            objective: BoostObjective::SquaredError,
            growth: GrowthPolicy::Depthwise,
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 6,
            max_leaves: 31,
            subsample: 1.0,
            colsample: 1.0,
            reg_alpha: 0.0,
            reg_lambda: 1.0,
            seed: 42,
        }
    }
}

/// One node of a fitted tree, stored in a flat vector.
#[derive(Clone, Debug, Serialize, Deserialize)]
enum Node {
    /// An internal split: rows with `feature <= threshold` go left.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// A terminal leaf carrying its regularized weight.
    Leaf { weight: f64 },
}

/// A single fitted regression tree.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { weight } => return *weight,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }
}

/// A gradient-boosted tree ensemble.
///
/// Construct via [`GradientBoosting::new`], train with
/// [`fit`](GradientBoosting::fit), then call
/// [`predict`](GradientBoosting::predict). The fitted state serializes
/// with serde for artifact persistence.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GradientBoosting {
    params: GbmParams,
    init_score: f64,
    trees: Vec<Tree>,
}

impl GradientBoosting {
    /// Create an untrained model with the given hyperparameters.
    #[must_use]
    pub fn new(params: GbmParams) -> Self {
        Self {
            params,
            init_score: 0.0,
            trees: Vec::new(),
        }
    }

    /// The hyperparameters this model was constructed with.
    #[must_use]
    pub fn params(&self) -> &GbmParams {
        &self.params
    }

    /// Number of fitted trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Whether `fit` has completed.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    /// Train the ensemble.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Evaluation`] on shape mismatches, non-binary
    /// labels under the logistic objective, or a single-class training
    /// partition (the degenerate-fold case).
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_rows = x.nrows();
        if n_rows == 0 {
            return Err(Error::Evaluation("cannot fit on zero rows".to_string()));
        }
        if n_rows != y.len() {
            return Err(Error::Evaluation(format!(
                "feature rows ({n_rows}) and target rows ({}) differ",
                y.len()
            )));
        }

        self.init_score = match self.params.objective {
            BoostObjective::Logistic => {
                if y.iter().any(|&v| v != 0.0 && v != 1.0) {
                    return Err(Error::Evaluation(
                        "logistic objective requires 0/1 labels".to_string(),
                    ));
                }
                #[allow(clippy::cast_precision_loss)]
                let p = y.iter().filter(|&&v| v == 1.0).count() as f64 / n_rows as f64;
                if p == 0.0 || p == 1.0 {
                    return Err(Error::Evaluation(
                        "training partition holds a single class".to_string(),
                    ));
                }
                (p / (1.0 - p)).ln()
            }
            BoostObjective::SquaredError => y.mean().unwrap_or(0.0),
        };

        let mut raw = vec![self.init_score; n_rows];
        let mut rng = fastrand::Rng::with_seed(self.params.seed);
        self.trees = Vec::with_capacity(self.params.n_estimators);

        for _ in 0..self.params.n_estimators {
            let (grad, hess) = self.gradients(y, &raw);

            let rows = sample_rows(n_rows, self.params.subsample, &mut rng);
            let features = sample_columns(x.ncols(), self.params.colsample, &mut rng);

            let tree = self.build_tree(x, &grad, &hess, rows, &features);

            for (i, value) in raw.iter_mut().enumerate() {
                *value += self.params.learning_rate * tree.predict_row(x.row(i));
            }
            self.trees.push(tree);
        }

        Ok(())
    }

    /// First- and second-order loss derivatives at the current raw
    /// predictions.
    fn gradients(&self, y: &Array1<f64>, raw: &[f64]) -> (Vec<f64>, Vec<f64>) {
        match self.params.objective {
            BoostObjective::Logistic => {
                let mut grad = Vec::with_capacity(raw.len());
                let mut hess = Vec::with_capacity(raw.len());
                for (&r, &t) in raw.iter().zip(y.iter()) {
                    let p = sigmoid(r);
                    grad.push(p - t);
                    hess.push((p * (1.0 - p)).max(1e-16));
                }
                (grad, hess)
            }
            BoostObjective::SquaredError => {
                let grad = raw.iter().zip(y.iter()).map(|(&r, &t)| r - t).collect();
                let hess = vec![1.0; raw.len()];
                (grad, hess)
            }
        }
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        grad: &[f64],
        hess: &[f64],
        rows: Vec<usize>,
        features: &[usize],
    ) -> Tree {
        let mut tree = Tree::default();
        match self.params.growth {
            GrowthPolicy::Depthwise => {
                self.grow_depthwise(&mut tree, x, grad, hess, rows, features, 0);
            }
            GrowthPolicy::Lossguide => {
                self.grow_lossguide(&mut tree, x, grad, hess, rows, features);
            }
        }
        tree
    }

    /// Recursive level-bounded growth.
    #[allow(clippy::too_many_arguments)]
    fn grow_depthwise(
        &self,
        tree: &mut Tree,
        x: &Array2<f64>,
        grad: &[f64],
        hess: &[f64],
        rows: Vec<usize>,
        features: &[usize],
        depth: usize,
    ) -> usize {
        if depth < self.params.max_depth {
            if let Some(split) = self.find_best_split(x, grad, hess, &rows, features) {
                let index = tree.nodes.len();
                tree.nodes.push(Node::Leaf { weight: 0.0 });
                let left =
                    self.grow_depthwise(tree, x, grad, hess, split.left_rows, features, depth + 1);
                let right =
                    self.grow_depthwise(tree, x, grad, hess, split.right_rows, features, depth + 1);
                tree.nodes[index] = Node::Split {
                    feature: split.feature,
                    threshold: split.threshold,
                    left,
                    right,
                };
                return index;
            }
        }
        let index = tree.nodes.len();
        tree.nodes.push(Node::Leaf {
            weight: self.leaf_weight(grad, hess, &rows),
        });
        index
    }

    /// Best-first growth bounded by `max_leaves` and `max_depth`.
    fn grow_lossguide(
        &self,
        tree: &mut Tree,
        x: &Array2<f64>,
        grad: &[f64],
        hess: &[f64],
        rows: Vec<usize>,
        features: &[usize],
    ) {
        struct FrontierLeaf {
            slot: usize,
            rows: Vec<usize>,
            depth: usize,
            split: Option<SplitInfo>,
        }

        tree.nodes.push(Node::Leaf {
            weight: self.leaf_weight(grad, hess, &rows),
        });
        let root_split = self.find_best_split(x, grad, hess, &rows, features);
        let mut frontier = vec![FrontierLeaf {
            slot: 0,
            rows,
            depth: 0,
            split: root_split,
        }];
        let mut n_leaves = 1;

        while n_leaves < self.params.max_leaves.max(2) {
            // Expand the frontier leaf with the highest split gain
            let best = frontier
                .iter()
                .enumerate()
                .filter(|(_, leaf)| leaf.split.is_some())
                .max_by(|(_, a), (_, b)| {
                    let ga = a.split.as_ref().map_or(0.0, |s| s.gain);
                    let gb = b.split.as_ref().map_or(0.0, |s| s.gain);
                    ga.partial_cmp(&gb).unwrap_or(core::cmp::Ordering::Equal)
                })
                .map(|(i, _)| i);
            let Some(best) = best else { break };

            let leaf = frontier.swap_remove(best);
            let split = leaf.split.expect("filtered on split presence");

            let left_slot = tree.nodes.len();
            tree.nodes.push(Node::Leaf {
                weight: self.leaf_weight(grad, hess, &split.left_rows),
            });
            let right_slot = tree.nodes.len();
            tree.nodes.push(Node::Leaf {
                weight: self.leaf_weight(grad, hess, &split.right_rows),
            });
            tree.nodes[leaf.slot] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left: left_slot,
                right: right_slot,
            };
            n_leaves += 1;

            let child_depth = leaf.depth + 1;
            for (slot, rows) in [(left_slot, split.left_rows), (right_slot, split.right_rows)] {
                let split = if child_depth < self.params.max_depth {
                    self.find_best_split(x, grad, hess, &rows, features)
                } else {
                    None
                };
                frontier.push(FrontierLeaf {
                    slot,
                    rows,
                    depth: child_depth,
                    split,
                });
            }
        }
    }

    /// Exact greedy split search over the feature subset.
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        grad: &[f64],
        hess: &[f64],
        rows: &[usize],
        features: &[usize],
    ) -> Option<SplitInfo> {
        if rows.len() < 2 {
            return None;
        }

        let total_g: f64 = rows.iter().map(|&i| grad[i]).sum();
        let total_h: f64 = rows.iter().map(|&i| hess[i]).sum();
        let parent_score = self.split_score(total_g, total_h);

        let mut best: Option<SplitInfo> = None;
        for &feature in features {
            let mut ordered: Vec<usize> = rows.to_vec();
            ordered.sort_by(|&a, &b| {
                x[[a, feature]]
                    .partial_cmp(&x[[b, feature]])
                    .unwrap_or(core::cmp::Ordering::Equal)
            });

            let mut left_g = 0.0;
            let mut left_h = 0.0;
            for cut in 0..ordered.len() - 1 {
                left_g += grad[ordered[cut]];
                left_h += hess[ordered[cut]];

                let here = x[[ordered[cut], feature]];
                let next = x[[ordered[cut + 1], feature]];
                if here == next {
                    continue;
                }

                let gain = 0.5
                    * (self.split_score(left_g, left_h)
                        + self.split_score(total_g - left_g, total_h - left_h)
                        - parent_score);
                if gain <= 1e-12 {
                    continue;
                }
                let better = match &best {
                    Some(b) => gain > b.gain,
                    None => true,
                };
                if better {
                    best = Some(SplitInfo {
                        feature,
                        threshold: 0.5 * (here + next),
                        gain,
                        left_rows: ordered[..=cut].to_vec(),
                        right_rows: ordered[cut + 1..].to_vec(),
                    });
                }
            }
        }
        best
    }

    /// Structure score G'^2 / (H + lambda) with L1 soft-thresholding.
    fn split_score(&self, g: f64, h: f64) -> f64 {
        let g = soft_threshold(g, self.params.reg_alpha);
        g * g / (h + self.params.reg_lambda)
    }

    /// Regularized leaf weight -G'/(H + lambda).
    fn leaf_weight(&self, grad: &[f64], hess: &[f64], rows: &[usize]) -> f64 {
        let g: f64 = rows.iter().map(|&i| grad[i]).sum();
        let h: f64 = rows.iter().map(|&i| hess[i]).sum();
        -soft_threshold(g, self.params.reg_alpha) / (h + self.params.reg_lambda)
    }

    /// Raw ensemble output (log-odds for logistic, value for squared
    /// error).
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFitted`] before a successful `fit`.
    pub fn predict_raw(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted() {
            return Err(Error::NotFitted);
        }
        let mut raw = Array1::from_elem(x.nrows(), self.init_score);
        for tree in &self.trees {
            for (i, value) in raw.iter_mut().enumerate() {
                *value += self.params.learning_rate * tree.predict_row(x.row(i));
            }
        }
        Ok(raw)
    }

    /// Predictions in target space: class labels (0/1) for logistic,
    /// raw values for squared error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFitted`] before a successful `fit`.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let raw = self.predict_raw(x)?;
        Ok(match self.params.objective {
            BoostObjective::Logistic => raw.mapv(|r| if sigmoid(r) >= 0.5 { 1.0 } else { 0.0 }),
            BoostObjective::SquaredError => raw,
        })
    }

    /// Positive-class probabilities under the logistic objective.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFitted`] before a successful `fit`, and
    /// [`Error::Evaluation`] under the squared-error objective.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.params.objective != BoostObjective::Logistic {
            return Err(Error::Evaluation(
                "probabilities are only defined for the logistic objective".to_string(),
            ));
        }
        Ok(self.predict_raw(x)?.mapv(sigmoid))
    }
}

/// A chosen split with its partitioned rows.
struct SplitInfo {
    feature: usize,
    threshold: f64,
    gain: f64,
    left_rows: Vec<usize>,
    right_rows: Vec<usize>,
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Shrink `g` toward zero by `alpha` (L1 soft-threshold).
fn soft_threshold(g: f64, alpha: f64) -> f64 {
    if g > alpha {
        g - alpha
    } else if g < -alpha {
        g + alpha
    } else {
        0.0
    }
}

/// Shuffle-and-take row subsample; always returns at least one row.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn sample_rows(n_rows: usize, subsample: f64, rng: &mut fastrand::Rng) -> Vec<usize> {
    if subsample >= 1.0 {
        return (0..n_rows).collect();
    }
    let take = ((n_rows as f64 * subsample).floor() as usize).max(1);
    let mut indices: Vec<usize> = (0..n_rows).collect();
    rng.shuffle(&mut indices);
    indices.truncate(take);
    indices
}

/// Shuffle-and-take column subsample; always returns at least one
/// column.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn sample_columns(n_cols: usize, colsample: f64, rng: &mut fastrand::Rng) -> Vec<usize> {
    if colsample >= 1.0 {
        return (0..n_cols).collect();
    }
    let take = ((n_cols as f64 * colsample).ceil() as usize).clamp(1, n_cols);
    let mut indices: Vec<usize> = (0..n_cols).collect();
    rng.shuffle(&mut indices);
    indices.truncate(take);
    indices
}
