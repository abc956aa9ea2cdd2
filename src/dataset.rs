//! Tabular dataset loading and validation.

use std::collections::BTreeSet;
use std::path::Path;

use ndarray::{Array1, Array2};

use crate::error::{Error, Result};
use crate::types::Task;

/// An immutable tabular dataset: a feature matrix, a target vector, and
/// the task they describe.
///
/// Invariants, enforced at construction:
/// - feature and target row counts are equal and non-zero;
/// - for classification, the target holds at least two distinct classes.
#[derive(Clone, Debug)]
pub struct Dataset {
    features: Array2<f64>,
    target: Array1<f64>,
    task: Task,
}

impl Dataset {
    /// Create a dataset from pre-built arrays.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDataset`] on empty data or mismatched row
    /// counts, and [`Error::SingleClass`] when a classification target
    /// has fewer than two distinct classes.
    pub fn new(features: Array2<f64>, target: Array1<f64>, task: Task) -> Result<Self> {
        if features.nrows() == 0 {
            return Err(Error::InvalidDataset("dataset has no rows".to_string()));
        }
        if features.nrows() != target.len() {
            return Err(Error::InvalidDataset(format!(
                "feature rows ({}) and target rows ({}) differ",
                features.nrows(),
                target.len()
            )));
        }
        if task == Task::Classification {
            let classes = distinct_classes(&target);
            if classes.len() < 2 {
                return Err(Error::SingleClass(classes.len()));
            }
        }
        Ok(Self {
            features,
            target,
            task,
        })
    }

    /// Load a dataset from a CSV file with a header row.
    ///
    /// Every column except `target_column` becomes a feature; all cells
    /// must parse as `f64`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TargetColumnNotFound`] if the target column is
    /// absent, [`Error::InvalidCell`] on an unparseable cell, and the
    /// validation errors of [`Dataset::new`].
    pub fn from_csv(path: impl AsRef<Path>, target_column: &str, task: Task) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path.as_ref())?;
        let headers = reader.headers()?.clone();

        let target_idx = headers
            .iter()
            .position(|h| h == target_column)
            .ok_or_else(|| Error::TargetColumnNotFound {
                column: target_column.to_string(),
                available: headers.iter().map(ToString::to_string).collect(),
            })?;

        let feature_names: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != target_idx)
            .map(|(_, h)| h.to_string())
            .collect();
        let n_features = feature_names.len();

        let mut rows: Vec<f64> = Vec::new();
        let mut target: Vec<f64> = Vec::new();
        // Line 1 is the header
        for (row_idx, record) in reader.records().enumerate() {
            let record = record?;
            let line = row_idx + 2;
            let mut feature_col = 0;
            for (col_idx, cell) in record.iter().enumerate() {
                let column = headers
                    .get(col_idx)
                    .map_or_else(|| format!("column {col_idx}"), ToString::to_string);
                let value: f64 = cell.trim().parse().map_err(|_| Error::InvalidCell {
                    value: cell.to_string(),
                    column,
                    line,
                })?;
                if col_idx == target_idx {
                    target.push(value);
                } else {
                    rows.push(value);
                    feature_col += 1;
                }
            }
            if feature_col != n_features {
                return Err(Error::InvalidDataset(format!(
                    "line {line} has {feature_col} feature cells, expected {n_features}"
                )));
            }
        }

        let n_rows = target.len();
        let features = Array2::from_shape_vec((n_rows, n_features), rows)
            .map_err(|e| Error::InvalidDataset(e.to_string()))?;
        Self::new(features, Array1::from_vec(target), task)
    }

    /// The feature matrix, rows × columns.
    #[must_use]
    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    /// The target vector.
    #[must_use]
    pub fn target(&self) -> &Array1<f64> {
        &self.target
    }

    /// The task this dataset describes.
    #[must_use]
    pub fn task(&self) -> Task {
        self.task
    }

    /// Number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.features.nrows()
    }

    /// Number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    /// Extract the rows at `indices` into fresh arrays.
    #[must_use]
    pub(crate) fn select_rows(&self, indices: &[usize]) -> (Array2<f64>, Array1<f64>) {
        let n_features = self.n_features();
        let x = Array2::from_shape_fn((indices.len(), n_features), |(r, c)| {
            self.features[[indices[r], c]]
        });
        let y = Array1::from_iter(indices.iter().map(|&i| self.target[i]));
        (x, y)
    }
}

/// Distinct class labels of a target vector, keyed by bit pattern so
/// exact float labels compare reliably.
fn distinct_classes(target: &Array1<f64>) -> BTreeSet<u64> {
    target.iter().map(|v| v.to_bits()).collect()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write csv");
        file
    }

    #[test]
    fn loads_features_and_target_from_csv() {
        let file = write_csv("a,b,label\n1.0,2.0,0\n3.0,4.0,1\n");
        let dataset = Dataset::from_csv(file.path(), "label", Task::Classification).unwrap();
        assert_eq!(dataset.n_rows(), 2);
        assert_eq!(dataset.n_features(), 2);
        assert_eq!(dataset.target()[0], 0.0);
        assert_eq!(dataset.features()[[1, 1]], 4.0);
    }

    #[test]
    fn missing_target_column_is_fatal() {
        let file = write_csv("a,b\n1.0,2.0\n");
        let err = Dataset::from_csv(file.path(), "label", Task::Regression).unwrap_err();
        assert!(matches!(err, Error::TargetColumnNotFound { .. }));
    }

    #[test]
    fn unparseable_cell_reports_location() {
        let file = write_csv("a,label\n1.0,0\nnope,1\n");
        let err = Dataset::from_csv(file.path(), "label", Task::Classification).unwrap_err();
        match err {
            Error::InvalidCell { value, column, line } => {
                assert_eq!(value, "nope");
                assert_eq!(column, "a");
                assert_eq!(line, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn single_class_target_is_rejected() {
        let file = write_csv("a,label\n1.0,1\n2.0,1\n");
        let err = Dataset::from_csv(file.path(), "label", Task::Classification).unwrap_err();
        assert!(matches!(err, Error::SingleClass(1)));
    }

    #[test]
    fn empty_dataset_is_rejected() {
        let features = Array2::zeros((0, 2));
        let target = Array1::zeros(0);
        let err = Dataset::new(features, target, Task::Regression).unwrap_err();
        assert!(matches!(err, Error::InvalidDataset(_)));
    }

    #[test]
    fn row_count_mismatch_is_rejected() {
        let features = Array2::zeros((3, 2));
        let target = Array1::zeros(2);
        let err = Dataset::new(features, target, Task::Regression).unwrap_err();
        assert!(matches!(err, Error::InvalidDataset(_)));
    }

    #[test]
    fn select_rows_extracts_in_order() {
        let features =
            Array2::from_shape_vec((3, 2), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let target = Array1::from_vec(vec![10.0, 20.0, 30.0]);
        let dataset = Dataset::new(features, target, Task::Regression).unwrap();

        let (x, y) = dataset.select_rows(&[2, 0]);
        assert_eq!(x[[0, 0]], 5.0);
        assert_eq!(x[[1, 1]], 2.0);
        assert_eq!(y[0], 30.0);
        assert_eq!(y[1], 10.0);
    }
}
