//! Scoring metrics for trial evaluation.
//!
//! Classification trials are scored with binary F1 (positive class = 1),
//! regression trials with mean squared error, matching the metric each
//! task's score direction assumes.

use ndarray::Array1;

/// Compute the binary F1 score, treating label `1` as the positive class.
///
/// F1 = 2 * precision * recall / (precision + recall). Returns 0.0 when
/// the denominator is zero (no positive predictions and no positive
/// labels overlap).
///
/// # Examples
///
/// ```
/// use automl::metrics::f1_score;
/// use ndarray::array;
///
/// let y_true = array![1.0, 0.0, 1.0, 1.0];
/// let y_pred = array![1.0, 0.0, 0.0, 1.0];
/// let f1 = f1_score(&y_pred, &y_true);
/// assert!((f1 - 0.8).abs() < 1e-9);
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn f1_score(y_pred: &Array1<f64>, y_true: &Array1<f64>) -> f64 {
    debug_assert_eq!(y_pred.len(), y_true.len());

    let mut tp = 0_usize;
    let mut fp = 0_usize;
    let mut fn_ = 0_usize;
    for (&p, &t) in y_pred.iter().zip(y_true.iter()) {
        let p = p >= 0.5;
        let t = t >= 0.5;
        match (p, t) {
            (true, true) => tp += 1,
            (true, false) => fp += 1,
            (false, true) => fn_ += 1,
            (false, false) => {}
        }
    }

    let denominator = 2 * tp + fp + fn_;
    if denominator == 0 {
        return 0.0;
    }
    (2 * tp) as f64 / denominator as f64
}

/// Compute the mean squared error between predictions and targets.
///
/// # Examples
///
/// ```
/// use automl::metrics::mean_squared_error;
/// use ndarray::array;
///
/// let y_true = array![1.0, 2.0, 3.0];
/// let y_pred = array![1.0, 2.0, 4.0];
/// let mse = mean_squared_error(&y_pred, &y_true);
/// assert!((mse - 1.0 / 3.0).abs() < 1e-9);
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean_squared_error(y_pred: &Array1<f64>, y_true: &Array1<f64>) -> f64 {
    debug_assert_eq!(y_pred.len(), y_true.len());
    if y_true.is_empty() {
        return 0.0;
    }
    y_pred
        .iter()
        .zip(y_true.iter())
        .map(|(p, t)| (p - t).powi(2))
        .sum::<f64>()
        / y_true.len() as f64
}
