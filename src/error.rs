#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the lower bound is greater than the upper bound.
    #[error("invalid bounds for '{name}': low ({low}) must be less than or equal to high ({high})")]
    InvalidBounds {
        /// The parameter the bounds belong to.
        name: String,
        /// The lower bound value.
        low: f64,
        /// The upper bound value.
        high: f64,
    },

    /// Returned when log scale is used with non-positive bounds.
    #[error("invalid log bounds for '{0}': low must be positive for log scale")]
    InvalidLogBounds(String),

    /// Returned when categorical choices are empty.
    #[error("categorical choices for '{0}' cannot be empty")]
    EmptyChoices(String),

    /// Returned when a model is constructed from an assignment that is
    /// missing a required parameter, or holds a value of the wrong kind.
    /// This is a programming-contract violation, not a trial failure.
    #[error("assignment contract violation for '{name}': {reason}")]
    AssignmentContract {
        /// The missing or mistyped parameter.
        name: String,
        /// Why the assignment is unusable.
        reason: String,
    },

    /// Returned when a family name has no registered model family.
    #[error("unknown model family '{0}'")]
    UnknownFamily(String),

    /// Returned when the target column is absent from the input table.
    #[error("target column '{column}' not found; available columns: {available:?}")]
    TargetColumnNotFound {
        /// The requested target column.
        column: String,
        /// The columns the table actually has.
        available: Vec<String>,
    },

    /// Returned when a CSV cell cannot be parsed as a number.
    #[error("failed to parse '{value}' in column '{column}' at line {line} as a number")]
    InvalidCell {
        /// The offending cell contents.
        value: String,
        /// The column the cell belongs to.
        column: String,
        /// The 1-based line number in the file.
        line: usize,
    },

    /// Returned when a dataset violates a structural invariant
    /// (zero rows, mismatched feature/target lengths).
    #[error("invalid dataset: {0}")]
    InvalidDataset(String),

    /// Returned when a classification target holds fewer than two classes.
    #[error("classification target must have at least 2 distinct classes, found {0}")]
    SingleClass(usize),

    /// Returned when a model fails to fit or score a candidate; the study
    /// marks the owning trial failed and continues.
    #[error("trial evaluation failed: {0}")]
    Evaluation(String),

    /// Returned when requesting the best trial but no trial completed.
    #[error("no viable model found: every trial failed")]
    NoViableModel,

    /// Returned when `predict` is called before a successful `fit`.
    #[error("model not fitted: call fit() before predict()")]
    NotFitted,

    /// Returned when `fit` is called on an engine that already ran.
    #[error("engine already fitted: fit() runs the study exactly once")]
    AlreadyFitted,

    /// Returned when an artifact cannot be written or read back.
    #[error("artifact error: {0}")]
    Artifact(String),

    /// Returned when a tracking sink rejects a report.
    #[error("tracking error: {0}")]
    Tracking(String),

    /// Returned on I/O failures outside artifact persistence.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Returned when the CSV reader itself fails.
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = core::result::Result<T, Error>;
