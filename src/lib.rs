#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]

//! AutoML search-and-selection engine for tabular supervised learning.
//!
//! Given a dataset and a trial budget, the engine searches over
//! gradient-boosted model families and their hyperparameters, scores
//! every candidate under a validation protocol (5-fold cross-validation
//! or a hold-out split), persists each fitted model, and retains the
//! best trial's model for inference.
//!
//! # Getting Started
//!
//! ```no_run
//! use automl::{AutoMl, AutoMlConfig, Dataset, Task};
//!
//! let dataset = Dataset::from_csv("train.csv", "label", Task::Classification)?;
//! let config = AutoMlConfig::new(Task::Classification)
//!     .with_n_trials(10)
//!     .with_fast_mode(true);
//!
//! let mut engine = AutoMl::new(dataset, config);
//! engine.fit()?;
//!
//! let best = engine.best_trial().expect("at least one trial succeeded");
//! println!("best family: {}, score: {:.4}", best.family, best.score);
//! # Ok::<(), automl::Error>(())
//! ```
//!
//! # Core Concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`AutoMl`] | Configure a search, run it once with `fit()`, predict with the best model. |
//! | [`Study`](study::Study) | Drive the trial loop: propose, construct, evaluate, persist, record, track the best. |
//! | [`ModelFamily`](model::ModelFamily) | The closed set of trainable candidates; each declares a search space and builds models from assignments. |
//! | [`EvaluationStrategy`](evaluate::EvaluationStrategy) | How a candidate is validated: k-fold cross-validation or a hold-out split. |
//! | [`Sampler`](sampler::Sampler) | Proposal strategy: [`RandomSampler`](sampler::RandomSampler) baseline or the adaptive [`TpeSampler`](sampler::TpeSampler) default. |
//! | [`ArtifactStore`](artifact::ArtifactStore) | Persists one fitted model per family under a base directory. |
//! | [`TrackingSink`](tracking::TrackingSink) | Receives per-trial parameters, score, and artifact reference. |
//!
//! # Score Directions
//!
//! The task fixes the metric and its direction: classification is
//! scored with binary F1 and maximized, regression with mean squared
//! error and minimized. A failing trial is recorded and skipped, never
//! fatal; the search only errors out when *every* trial fails.

pub mod artifact;
pub mod dataset;
pub mod distribution;
pub mod engine;
pub mod error;
pub mod evaluate;
pub mod metrics;
pub mod model;
pub mod sampler;
pub mod space;
pub mod study;
pub mod tracking;
pub mod types;

pub use dataset::Dataset;
pub use engine::{AutoMl, AutoMlConfig};
pub use error::{Error, Result};
pub use model::ModelFamily;
pub use types::{Direction, Task, TrialState};

/// Convenient wildcard import for the most common types.
///
/// ```
/// use automl::prelude::*;
/// ```
pub mod prelude {
    pub use crate::artifact::ArtifactStore;
    pub use crate::dataset::Dataset;
    pub use crate::engine::{AutoMl, AutoMlConfig};
    pub use crate::error::{Error, Result};
    pub use crate::evaluate::EvaluationStrategy;
    pub use crate::model::{GradientBoosting, ModelFamily};
    pub use crate::sampler::{RandomSampler, Sampler, TpeSampler};
    pub use crate::space::{Assignment, ParamValue, SearchSpace};
    pub use crate::study::{Study, TrialRecord};
    pub use crate::tracking::{JsonlSink, LogSink, NoopSink, TrackingSink};
    pub use crate::types::{Direction, Task, TrialState};
}
