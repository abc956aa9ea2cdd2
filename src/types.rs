//! Core types shared across the engine.

use serde::{Deserialize, Serialize};

/// The kind of supervised-learning task a dataset describes.
///
/// The task fixes the scoring metric and, through it, the optimization
/// direction of the whole study: classification trials are scored with
/// binary F1 (higher is better), regression trials with mean squared
/// error (lower is better).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    /// Predict a discrete class label; scored with binary F1.
    Classification,
    /// Predict a continuous value; scored with mean squared error.
    Regression,
}

impl Task {
    /// Return the score direction this task optimizes under.
    ///
    /// # Examples
    ///
    /// ```
    /// use automl::{Direction, Task};
    ///
    /// assert_eq!(Task::Classification.direction(), Direction::Maximize);
    /// assert_eq!(Task::Regression.direction(), Direction::Minimize);
    /// ```
    #[must_use]
    pub fn direction(self) -> Direction {
        match self {
            Task::Classification => Direction::Maximize,
            Task::Regression => Direction::Minimize,
        }
    }
}

impl core::fmt::Display for Task {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Task::Classification => write!(f, "classification"),
            Task::Regression => write!(f, "regression"),
        }
    }
}

/// The direction of optimization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Lower scores are better.
    Minimize,
    /// Higher scores are better.
    Maximize,
}

impl Direction {
    /// Return `true` if `candidate` strictly improves on `incumbent`
    /// under this direction.
    ///
    /// Strict comparison keeps the first-seen trial on ties.
    #[must_use]
    pub fn improves(self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Direction::Minimize => candidate < incumbent,
            Direction::Maximize => candidate > incumbent,
        }
    }
}

impl core::fmt::Display for Direction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Direction::Minimize => write!(f, "minimize"),
            Direction::Maximize => write!(f, "maximize"),
        }
    }
}

/// The terminal state of a trial.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrialState {
    /// The trial evaluated successfully and its score counts.
    Complete,
    /// The trial failed during evaluation and is excluded from
    /// best-trial consideration.
    Failed,
}
