//! Validation protocols: k-fold cross-validation and hold-out splits.
//!
//! The strategy fits a candidate model against a dataset and reports a
//! scalar score plus the fitted model. Classification is scored with
//! binary F1, regression with mean squared error; stratified folds keep
//! class proportions for classification.

use ndarray::Array1;

use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::metrics::{f1_score, mean_squared_error};
use crate::model::GradientBoosting;
use crate::types::Task;

/// The seed every validation split uses, so repeated runs over the same
/// data produce the same partitions.
pub const SPLIT_SEED: u64 = 42;

/// A scored, fitted candidate.
#[derive(Debug)]
pub struct Evaluated {
    /// The scalar score (mean across folds for cross-validation).
    pub score: f64,
    /// Per-fold scores; a single element for hold-out.
    pub fold_scores: Vec<f64>,
    /// The fitted model retained for persistence: the last fold's fit
    /// under cross-validation, since one model is persisted per trial.
    pub model: GradientBoosting,
}

/// How a candidate model is validated and scored.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EvaluationStrategy {
    /// k-fold cross-validation; stratified for classification. The
    /// reported score is the arithmetic mean of the k fold scores.
    CrossValidation {
        /// Number of folds.
        k: usize,
        /// Shuffle seed.
        seed: u64,
    },
    /// A single train/validation split; one fit, one score.
    HoldOut {
        /// Fraction of rows held out for validation.
        test_size: f64,
        /// Shuffle seed.
        seed: u64,
    },
}

impl EvaluationStrategy {
    /// The strategy `fast_mode` selects: 5-fold cross-validation when
    /// off, an 80/20 hold-out split when on.
    #[must_use]
    pub fn from_fast_mode(fast_mode: bool) -> Self {
        if fast_mode {
            EvaluationStrategy::HoldOut {
                test_size: 0.2,
                seed: SPLIT_SEED,
            }
        } else {
            EvaluationStrategy::CrossValidation {
                k: 5,
                seed: SPLIT_SEED,
            }
        }
    }

    /// Fit and score `model` against `dataset`.
    ///
    /// # Errors
    ///
    /// Propagates fit failures (e.g. a fold whose training partition
    /// holds a single class); the study marks the owning trial failed.
    pub fn evaluate(&self, model: &GradientBoosting, dataset: &Dataset) -> Result<Evaluated> {
        match *self {
            EvaluationStrategy::CrossValidation { k, seed } => {
                let splits = match dataset.task() {
                    Task::Classification => {
                        StratifiedKFold::new(k, seed).split(dataset.target())
                    }
                    Task::Regression => KFold::new(k, seed).split(dataset.n_rows()),
                };

                let mut fold_scores = Vec::with_capacity(k);
                let mut last_fit: Option<GradientBoosting> = None;
                for (train_idx, val_idx) in splits {
                    let (score, fitted) = fit_and_score(model, dataset, &train_idx, &val_idx)?;
                    fold_scores.push(score);
                    last_fit = Some(fitted);
                }

                let fitted = last_fit
                    .ok_or_else(|| Error::Evaluation("cross-validation produced no folds".to_string()))?;
                #[allow(clippy::cast_precision_loss)]
                let score = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
                Ok(Evaluated {
                    score,
                    fold_scores,
                    model: fitted,
                })
            }
            EvaluationStrategy::HoldOut { test_size, seed } => {
                let (train_idx, val_idx) =
                    train_validation_indices(dataset.n_rows(), test_size, seed)?;
                let (score, fitted) = fit_and_score(model, dataset, &train_idx, &val_idx)?;
                Ok(Evaluated {
                    score,
                    fold_scores: vec![score],
                    model: fitted,
                })
            }
        }
    }
}

/// Clone, fit on the training rows, and score on the held-out rows.
fn fit_and_score(
    model: &GradientBoosting,
    dataset: &Dataset,
    train_idx: &[usize],
    val_idx: &[usize],
) -> Result<(f64, GradientBoosting)> {
    let (x_train, y_train) = dataset.select_rows(train_idx);
    let (x_val, y_val) = dataset.select_rows(val_idx);

    let mut fitted = model.clone();
    fitted.fit(&x_train, &y_train)?;
    let predictions = fitted.predict(&x_val)?;
    Ok((score(dataset.task(), &predictions, &y_val), fitted))
}

/// Task-appropriate metric: binary F1 or mean squared error.
fn score(task: Task, y_pred: &Array1<f64>, y_true: &Array1<f64>) -> f64 {
    match task {
        Task::Classification => f1_score(y_pred, y_true),
        Task::Regression => mean_squared_error(y_pred, y_true),
    }
}

/// Seeded shuffled train/validation index split.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn train_validation_indices(
    n_rows: usize,
    test_size: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(0.0..1.0).contains(&test_size) || test_size == 0.0 {
        return Err(Error::Evaluation(format!(
            "test_size must be in (0, 1), got {test_size}"
        )));
    }
    let n_val = ((n_rows as f64 * test_size).round() as usize).max(1);
    let n_train = n_rows.saturating_sub(n_val);
    if n_train == 0 {
        return Err(Error::Evaluation(format!(
            "hold-out split leaves no training rows (n_rows = {n_rows})"
        )));
    }

    let mut indices: Vec<usize> = (0..n_rows).collect();
    let mut rng = fastrand::Rng::with_seed(seed);
    rng.shuffle(&mut indices);
    let val = indices.split_off(n_train);
    Ok((indices, val))
}

/// K-fold splitter with seeded shuffling.
///
/// Remainder rows are distributed across the first folds, so fold sizes
/// differ by at most one.
#[derive(Clone, Debug)]
pub struct KFold {
    n_splits: usize,
    seed: u64,
}

impl KFold {
    /// Create a splitter with `n_splits` folds.
    #[must_use]
    pub fn new(n_splits: usize, seed: u64) -> Self {
        Self { n_splits, seed }
    }

    /// Generate `(train_indices, validation_indices)` per fold.
    #[must_use]
    pub fn split(&self, n_samples: usize) -> Vec<(Vec<usize>, Vec<usize>)> {
        let mut indices: Vec<usize> = (0..n_samples).collect();
        let mut rng = fastrand::Rng::with_seed(self.seed);
        rng.shuffle(&mut indices);
        chunked_folds(&indices, n_samples, self.n_splits)
    }
}

/// Stratified k-fold splitter: each class is chunked across folds
/// separately so per-fold class proportions track the full dataset's.
#[derive(Clone, Debug)]
pub struct StratifiedKFold {
    n_splits: usize,
    seed: u64,
}

impl StratifiedKFold {
    /// Create a splitter with `n_splits` folds.
    #[must_use]
    pub fn new(n_splits: usize, seed: u64) -> Self {
        Self { n_splits, seed }
    }

    /// Generate `(train_indices, validation_indices)` per fold from the
    /// class labels in `target`.
    #[must_use]
    pub fn split(&self, target: &Array1<f64>) -> Vec<(Vec<usize>, Vec<usize>)> {
        let mut rng = fastrand::Rng::with_seed(self.seed);

        // Group row indices by class, keyed by bit pattern; BTreeMap
        // keeps class iteration order deterministic.
        let mut class_indices: std::collections::BTreeMap<u64, Vec<usize>> =
            std::collections::BTreeMap::new();
        for (i, &label) in target.iter().enumerate() {
            class_indices.entry(label.to_bits()).or_default().push(i);
        }

        // Chunk each class across folds separately
        let mut fold_members: Vec<Vec<usize>> = vec![Vec::new(); self.n_splits];
        for indices in class_indices.values_mut() {
            rng.shuffle(indices);
            let class_size = indices.len();
            let fold_size = class_size / self.n_splits;
            let remainder = class_size % self.n_splits;

            let mut start = 0;
            for (i, fold) in fold_members.iter_mut().enumerate() {
                let size = if i < remainder { fold_size + 1 } else { fold_size };
                fold.extend_from_slice(&indices[start..start + size]);
                start += size;
            }
        }

        (0..self.n_splits)
            .map(|i| {
                let val = fold_members[i].clone();
                let train = fold_members
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .flat_map(|(_, fold)| fold.iter().copied())
                    .collect();
                (train, val)
            })
            .collect()
    }
}

/// Split shuffled indices into contiguous folds, spreading the
/// remainder over the first folds.
fn chunked_folds(
    indices: &[usize],
    n_samples: usize,
    n_splits: usize,
) -> Vec<(Vec<usize>, Vec<usize>)> {
    let fold_size = n_samples / n_splits;
    let remainder = n_samples % n_splits;

    let mut result = Vec::with_capacity(n_splits);
    let mut start = 0;
    for i in 0..n_splits {
        let size = if i < remainder { fold_size + 1 } else { fold_size };
        let end = start + size;

        let val: Vec<usize> = indices[start..end].to_vec();
        let mut train = Vec::with_capacity(n_samples - size);
        train.extend_from_slice(&indices[..start]);
        train.extend_from_slice(&indices[end..]);
        result.push((train, val));

        start = end;
    }
    result
}

#[cfg(test)]
mod tests {
    use ndarray::{Array1, Array2};

    use super::*;
    use crate::model::{BoostObjective, GbmParams, GradientBoosting, GrowthPolicy};

    fn small_params(objective: BoostObjective) -> GbmParams {
        GbmParams {
            objective,
            growth: GrowthPolicy::Depthwise,
            n_estimators: 20,
            learning_rate: 0.3,
            max_depth: 3,
            ..GbmParams::default()
        }
    }

    fn binary_dataset(n: usize) -> Dataset {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..n {
            let x0 = i as f64 / n as f64;
            rows.extend_from_slice(&[x0, (i % 7) as f64]);
            labels.push(if i % 2 == 0 { 0.0 } else { 1.0 });
        }
        Dataset::new(
            Array2::from_shape_vec((n, 2), rows).unwrap(),
            Array1::from_vec(labels),
            Task::Classification,
        )
        .unwrap()
    }

    fn regression_dataset(n: usize) -> Dataset {
        let mut rows = Vec::new();
        let mut targets = Vec::new();
        for i in 0..n {
            let x0 = i as f64 / 10.0;
            rows.extend_from_slice(&[x0, -x0]);
            targets.push(3.0 * x0 - 1.0);
        }
        Dataset::new(
            Array2::from_shape_vec((n, 2), rows).unwrap(),
            Array1::from_vec(targets),
            Task::Regression,
        )
        .unwrap()
    }

    #[test]
    fn kfold_covers_every_row_once() {
        let splits = KFold::new(5, 42).split(23);
        assert_eq!(splits.len(), 5);

        let mut seen: Vec<usize> = splits.iter().flat_map(|(_, val)| val.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..23).collect::<Vec<_>>());

        for (train, val) in &splits {
            assert_eq!(train.len() + val.len(), 23);
            assert!(val.iter().all(|i| !train.contains(i)));
        }
    }

    #[test]
    fn kfold_is_reproducible() {
        assert_eq!(KFold::new(5, 42).split(30), KFold::new(5, 42).split(30));
    }

    #[test]
    fn stratified_folds_preserve_class_proportions() {
        // 60/40 class balance over 100 rows, 5 folds of 20:
        // every fold should hold 12 zeros and 8 ones exactly.
        let target = Array1::from_iter((0..100).map(|i| if i < 60 { 0.0 } else { 1.0 }));
        let splits = StratifiedKFold::new(5, 42).split(&target);
        assert_eq!(splits.len(), 5);

        for (_, val) in &splits {
            assert_eq!(val.len(), 20);
            let ones = val.iter().filter(|&&i| target[i] == 1.0).count();
            assert_eq!(ones, 8, "fold deviates from the 60/40 class balance");
        }
    }

    #[test]
    fn stratified_folds_cover_every_row_once() {
        let target = Array1::from_iter((0..37).map(|i| f64::from(u8::from(i % 3 == 0))));
        let splits = StratifiedKFold::new(5, 42).split(&target);

        let mut seen: Vec<usize> = splits.iter().flat_map(|(_, val)| val.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..37).collect::<Vec<_>>());
    }

    #[test]
    fn holdout_split_is_80_20() {
        let (train, val) = train_validation_indices(100, 0.2, 42).unwrap();
        assert_eq!(train.len(), 80);
        assert_eq!(val.len(), 20);
    }

    #[test]
    fn holdout_evaluation_is_deterministic() {
        let dataset = binary_dataset(60);
        let model = GradientBoosting::new(small_params(BoostObjective::Logistic));
        let strategy = EvaluationStrategy::from_fast_mode(true);

        let a = strategy.evaluate(&model, &dataset).unwrap();
        let b = strategy.evaluate(&model, &dataset).unwrap();
        assert_eq!(a.score, b.score);
    }

    #[test]
    fn cross_validation_score_is_mean_of_folds() {
        let dataset = regression_dataset(50);
        let model = GradientBoosting::new(small_params(BoostObjective::SquaredError));
        let strategy = EvaluationStrategy::from_fast_mode(false);

        let evaluated = strategy.evaluate(&model, &dataset).unwrap();
        assert_eq!(evaluated.fold_scores.len(), 5);
        let mean = evaluated.fold_scores.iter().sum::<f64>() / 5.0;
        assert!((evaluated.score - mean).abs() < 1e-12);
    }

    #[test]
    fn classification_scores_land_in_unit_interval() {
        let dataset = binary_dataset(50);
        let model = GradientBoosting::new(small_params(BoostObjective::Logistic));
        let strategy = EvaluationStrategy::from_fast_mode(false);

        let evaluated = strategy.evaluate(&model, &dataset).unwrap();
        for score in &evaluated.fold_scores {
            assert!((0.0..=1.0).contains(score));
        }
    }

    #[test]
    fn evaluation_returns_a_fitted_model() {
        let dataset = regression_dataset(40);
        let model = GradientBoosting::new(small_params(BoostObjective::SquaredError));
        let strategy = EvaluationStrategy::from_fast_mode(true);

        let evaluated = strategy.evaluate(&model, &dataset).unwrap();
        assert!(evaluated.model.is_fitted());
    }

    #[test]
    fn degenerate_test_size_is_rejected() {
        assert!(train_validation_indices(10, 0.0, 42).is_err());
        assert!(train_validation_indices(10, 1.5, 42).is_err());
    }
}
