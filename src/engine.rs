//! The AutoML engine: configuration, the fit lifecycle, and inference
//! with the best model found.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use ndarray::{Array1, Array2};

use crate::artifact::ArtifactStore;
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::evaluate::EvaluationStrategy;
use crate::model::GradientBoosting;
use crate::sampler::{Sampler, TpeSampler};
use crate::study::{Study, TrialRecord};
use crate::tracking::{JsonlSink, LogSink};
use crate::types::Task;

/// Engine configuration.
///
/// Mirrors the search's user-facing knobs: the task, the trial budget,
/// the validation protocol, and where artifacts and the trial journal
/// land.
#[derive(Clone, Debug)]
pub struct AutoMlConfig {
    /// Classification or regression; fixes metric and direction.
    pub task: Task,
    /// How many trials the study runs.
    pub n_trials: usize,
    /// Use a hold-out split instead of 5-fold cross-validation.
    pub fast_mode: bool,
    /// Experiment name reported to tracking sinks.
    pub experiment_name: String,
    /// Seed for the sampler.
    pub seed: u64,
    /// Directory for model artifacts and the trial journal.
    pub artifact_dir: PathBuf,
}

impl AutoMlConfig {
    /// Create a configuration with the defaults the CLI exposes:
    /// 10 trials, cross-validation, artifacts under `model/`.
    #[must_use]
    pub fn new(task: Task) -> Self {
        Self {
            task,
            n_trials: 10,
            fast_mode: false,
            experiment_name: "automl".to_string(),
            seed: 42,
            artifact_dir: PathBuf::from("model"),
        }
    }

    /// Set the trial budget.
    #[must_use]
    pub fn with_n_trials(mut self, n_trials: usize) -> Self {
        self.n_trials = n_trials;
        self
    }

    /// Toggle the hold-out fast mode.
    #[must_use]
    pub fn with_fast_mode(mut self, fast_mode: bool) -> Self {
        self.fast_mode = fast_mode;
        self
    }

    /// Set the experiment name.
    #[must_use]
    pub fn with_experiment_name(mut self, name: impl Into<String>) -> Self {
        self.experiment_name = name.into();
        self
    }

    /// Set the sampler seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the artifact directory.
    #[must_use]
    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = dir.into();
        self
    }
}

/// The search-and-selection engine.
///
/// Owns the dataset and configuration, runs the study once in
/// [`fit`](AutoMl::fit), and afterwards serves predictions from the best
/// fitted model.
///
/// # Examples
///
/// ```no_run
/// use automl::{AutoMl, AutoMlConfig, Dataset, Task};
///
/// let dataset = Dataset::from_csv("train.csv", "label", Task::Classification)?;
/// let config = AutoMlConfig::new(Task::Classification).with_n_trials(10);
/// let mut engine = AutoMl::new(dataset, config);
/// engine.fit()?;
/// let predictions = engine.predict(engine.dataset().features())?;
/// # Ok::<(), automl::Error>(())
/// ```
pub struct AutoMl {
    config: AutoMlConfig,
    dataset: Dataset,
    study: Option<Study>,
    best_model: Option<GradientBoosting>,
}

impl AutoMl {
    /// Create an engine over a dataset. The study is built lazily by
    /// [`fit`](Self::fit).
    #[must_use]
    pub fn new(dataset: Dataset, config: AutoMlConfig) -> Self {
        Self {
            config,
            dataset,
            study: None,
            best_model: None,
        }
    }

    /// The engine's dataset.
    #[must_use]
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// The engine's configuration.
    #[must_use]
    pub fn config(&self) -> &AutoMlConfig {
        &self.config
    }

    /// The study run by `fit`, once it has run.
    #[must_use]
    pub fn study(&self) -> Option<&Study> {
        self.study.as_ref()
    }

    /// The best trial, once `fit` has run.
    #[must_use]
    pub fn best_trial(&self) -> Option<&TrialRecord> {
        self.study.as_ref().and_then(Study::best_trial)
    }

    /// Run the search to completion. Valid exactly once.
    ///
    /// Uses the engine's default sampler (seeded TPE, matching the
    /// study direction). Use [`fit_with_sampler`](Self::fit_with_sampler)
    /// to supply a different strategy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyFitted`] on a second call,
    /// [`Error::NoViableModel`] when every trial failed, or a fatal
    /// configuration/contract error.
    pub fn fit(&mut self) -> Result<()> {
        let direction = self.config.task.direction();
        let sampler = TpeSampler::builder()
            .direction(direction)
            .seed(self.config.seed)
            .build();
        self.fit_with_sampler(sampler)
    }

    /// Run the search with a caller-provided sampler. Valid exactly
    /// once.
    ///
    /// # Errors
    ///
    /// As [`fit`](Self::fit).
    pub fn fit_with_sampler(&mut self, sampler: impl Sampler + 'static) -> Result<()> {
        if self.study.is_some() {
            return Err(Error::AlreadyFitted);
        }

        let direction = self.config.task.direction();
        let mut study = Study::new(
            self.study_name(),
            direction,
            sampler,
            EvaluationStrategy::from_fast_mode(self.config.fast_mode),
            ArtifactStore::new(&self.config.artifact_dir),
        );
        study.add_sink(LogSink);
        study.add_sink(JsonlSink::new(self.config.artifact_dir.join("trials.jsonl")));

        let outcome = study.run(&self.dataset, self.config.n_trials);
        self.best_model = study.take_best_model();
        self.study = Some(study);
        outcome
    }

    /// Predict with the best fitted model.
    ///
    /// For classification the output holds class labels (0/1); for
    /// regression, continuous values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFitted`] before a successful `fit`.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let model = self.best_model.as_ref().ok_or(Error::NotFitted)?;
        model.predict(x)
    }

    /// The best fitted model, once `fit` has succeeded.
    #[must_use]
    pub fn best_model(&self) -> Option<&GradientBoosting> {
        self.best_model.as_ref()
    }

    /// Study names are suffixed with a timestamp so journal entries
    /// from repeated runs stay distinguishable.
    fn study_name(&self) -> String {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        format!("{}_finetuning_{stamp}", self.config.experiment_name)
    }
}
