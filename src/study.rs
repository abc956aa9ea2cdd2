//! Study: the search orchestrator.
//!
//! A study drives `n_trials` iterations of propose → construct →
//! evaluate → persist → record, tracks the best trial under the task's
//! score direction, and exposes the best fitted model once the loop
//! finishes.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::artifact::ArtifactStore;
use crate::dataset::Dataset;
use crate::distribution::{CategoricalDistribution, Distribution};
use crate::error::{Error, Result};
use crate::evaluate::EvaluationStrategy;
use crate::model::{GradientBoosting, ModelFamily};
use crate::sampler::{Sampler, TrialOutcome};
use crate::space::{Assignment, ParamValue};
use crate::tracking::{TrackingSink, TrialReport};
use crate::types::{Direction, TrialState};

/// The name the outer family choice is sampled and journaled under.
const FAMILY_PARAM: &str = "model";

/// How long to wait before retrying a failed artifact write.
const PERSIST_RETRY_BACKOFF: Duration = Duration::from_millis(100);

/// One fully-recorded trial.
///
/// Created at the start of its iteration, fully populated by the end of
/// it, and never mutated afterwards. The fitted model is a first-class
/// field: completed trials hold `Some(model)`, failed trials hold the
/// error message instead.
#[derive(Debug)]
pub struct TrialRecord {
    /// The trial's position in the study, starting at 0.
    pub index: usize,
    /// The sampled model family.
    pub family: ModelFamily,
    /// The full hyperparameter assignment, including the family choice.
    pub assignment: Assignment,
    /// The evaluation score; NaN when the trial failed.
    pub score: f64,
    /// Where the fitted model was persisted, when persistence succeeded.
    pub artifact: Option<PathBuf>,
    /// The fitted model of a completed trial.
    pub model: Option<GradientBoosting>,
    /// Terminal state.
    pub state: TrialState,
    /// The evaluation error of a failed trial.
    pub error: Option<String>,
}

/// The search orchestrator.
///
/// # Examples
///
/// ```no_run
/// use automl::artifact::ArtifactStore;
/// use automl::dataset::Dataset;
/// use automl::evaluate::EvaluationStrategy;
/// use automl::sampler::RandomSampler;
/// use automl::study::Study;
/// use automl::Task;
///
/// let dataset = Dataset::from_csv("train.csv", "label", Task::Classification)?;
/// let mut study = Study::new(
///     "automl",
///     Task::Classification.direction(),
///     RandomSampler::with_seed(42),
///     EvaluationStrategy::from_fast_mode(true),
///     ArtifactStore::new("model"),
/// );
/// study.run(&dataset, 10)?;
/// let best = study.best_trial().expect("at least one trial succeeded");
/// println!("best score: {}", best.score);
/// # Ok::<(), automl::Error>(())
/// ```
pub struct Study {
    name: String,
    direction: Direction,
    sampler: Arc<dyn Sampler>,
    evaluation: EvaluationStrategy,
    artifacts: ArtifactStore,
    sinks: Vec<Box<dyn TrackingSink>>,
    /// Completed-trial history shared with the sampler.
    history: Arc<RwLock<Vec<TrialOutcome>>>,
    trials: Vec<TrialRecord>,
    best: Option<usize>,
}

impl Study {
    /// Create a study.
    ///
    /// # Arguments
    ///
    /// * `name` - The study's name, reported to tracking sinks.
    /// * `direction` - Whether higher or lower scores win.
    /// * `sampler` - The proposal strategy.
    /// * `evaluation` - The validation protocol.
    /// * `artifacts` - Where fitted models are persisted.
    pub fn new(
        name: impl Into<String>,
        direction: Direction,
        sampler: impl Sampler + 'static,
        evaluation: EvaluationStrategy,
        artifacts: ArtifactStore,
    ) -> Self {
        Self {
            name: name.into(),
            direction,
            sampler: Arc::new(sampler),
            evaluation,
            artifacts,
            sinks: Vec::new(),
            history: Arc::new(RwLock::new(Vec::new())),
            trials: Vec::new(),
            best: None,
        }
    }

    /// Attach a tracking sink. Sinks receive every trial; their errors
    /// are logged and never abort the search.
    pub fn add_sink(&mut self, sink: impl TrackingSink + 'static) {
        self.sinks.push(Box::new(sink));
    }

    /// The study's optimization direction.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// All recorded trials, in execution order.
    #[must_use]
    pub fn trials(&self) -> &[TrialRecord] {
        &self.trials
    }

    /// Number of completed trials.
    #[must_use]
    pub fn n_complete(&self) -> usize {
        self.trials
            .iter()
            .filter(|t| t.state == TrialState::Complete)
            .count()
    }

    /// Number of failed trials.
    #[must_use]
    pub fn n_failed(&self) -> usize {
        self.trials
            .iter()
            .filter(|t| t.state == TrialState::Failed)
            .count()
    }

    /// The best completed trial, if any trial completed.
    ///
    /// Updated monotonically as trials finish; ties keep the
    /// first-seen trial.
    #[must_use]
    pub fn best_trial(&self) -> Option<&TrialRecord> {
        self.best.map(|i| &self.trials[i])
    }

    /// The best trial's fitted model.
    #[must_use]
    pub fn best_model(&self) -> Option<&GradientBoosting> {
        self.best_trial().and_then(|t| t.model.as_ref())
    }

    /// Take ownership of the best trial's fitted model.
    pub(crate) fn take_best_model(&mut self) -> Option<GradientBoosting> {
        let index = self.best?;
        self.trials[index].model.take()
    }

    /// Run `n_trials` iterations against `dataset`.
    ///
    /// Every iteration is recorded, completed or failed; a failing trial
    /// never aborts the loop. Construction-contract violations and
    /// invalid search spaces are programming errors and abort
    /// immediately.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoViableModel`] when every trial failed, or a
    /// fatal configuration/contract error.
    pub fn run(&mut self, dataset: &Dataset, n_trials: usize) -> Result<()> {
        let _span = tracing::info_span!("study", name = %self.name, n_trials).entered();

        for sink in &self.sinks {
            if let Err(e) = sink.study_started(&self.name, self.direction) {
                tracing::warn!(error = %e, "tracking sink rejected study start");
            }
        }

        for index in 0..n_trials {
            let record = self.run_trial(index, dataset)?;
            self.record(record);
        }

        if self.best.is_none() {
            return Err(Error::NoViableModel);
        }
        Ok(())
    }

    /// One iteration: propose, construct, evaluate, persist.
    ///
    /// Evaluation failures are folded into the returned record;
    /// contract violations propagate as fatal errors.
    fn run_trial(&self, index: usize, dataset: &Dataset) -> Result<TrialRecord> {
        let (family, assignment) = self.propose(index, dataset)?;

        let model = family.construct(&assignment, dataset.task())?;

        match self.evaluation.evaluate(&model, dataset) {
            Ok(evaluated) if evaluated.score.is_finite() => {
                let artifact = self.persist_with_retry(&evaluated.model, family);
                Ok(TrialRecord {
                    index,
                    family,
                    assignment,
                    score: evaluated.score,
                    artifact,
                    model: Some(evaluated.model),
                    state: TrialState::Complete,
                    error: None,
                })
            }
            Ok(evaluated) => Ok(failed_record(
                index,
                family,
                assignment,
                format!("non-finite score {}", evaluated.score),
            )),
            Err(e) => Ok(failed_record(index, family, assignment, e.to_string())),
        }
    }

    /// Two-stage proposal: the family choice, then the chosen family's
    /// own space.
    fn propose(&self, index: usize, dataset: &Dataset) -> Result<(ModelFamily, Assignment)> {
        let history = self.history.read();

        let family_dist = Distribution::Categorical(CategoricalDistribution {
            choices: ModelFamily::ALL.iter().map(|f| f.name().to_string()).collect(),
        });
        let family = match self.sampler.sample(FAMILY_PARAM, &family_dist, index, &history) {
            ParamValue::Str(name) => ModelFamily::from_name(&name)?,
            other => {
                return Err(Error::AssignmentContract {
                    name: FAMILY_PARAM.to_string(),
                    reason: format!("sampler returned {other:?} for a categorical"),
                })
            }
        };

        let space = family.search_space(dataset.task());
        space.validate()?;

        let mut assignment = Assignment::new();
        assignment.insert(FAMILY_PARAM, ParamValue::Str(family.name().to_string()));
        for (name, dist) in space.iter() {
            let value = self.sampler.sample(name, dist, index, &history);
            assignment.insert(name, value);
        }

        Ok((family, assignment))
    }

    /// Persist an artifact, retrying once after a short backoff. Failure
    /// is downgraded to a warning; the trial keeps its score.
    fn persist_with_retry(
        &self,
        model: &GradientBoosting,
        family: ModelFamily,
    ) -> Option<PathBuf> {
        match self.artifacts.persist(model, Some(family)) {
            Ok(path) => Some(path),
            Err(first) => {
                std::thread::sleep(PERSIST_RETRY_BACKOFF);
                match self.artifacts.persist(model, Some(family)) {
                    Ok(path) => Some(path),
                    Err(second) => {
                        tracing::warn!(
                            first = %first,
                            second = %second,
                            "artifact persistence failed twice; trial keeps its score"
                        );
                        None
                    }
                }
            }
        }
    }

    /// Record a finished trial: update history, sinks, and the best
    /// pointer.
    fn record(&mut self, record: TrialRecord) {
        // History feeds the sampler and must be current before the next
        // proposal; failed trials are excluded.
        if record.state == TrialState::Complete {
            self.history.write().push(TrialOutcome {
                index: record.index,
                params: record.assignment.clone(),
                score: record.score,
            });
        }

        let report = TrialReport {
            index: record.index,
            family: record.family.name(),
            params: &record.assignment,
            score: record.score,
            state: record.state,
            artifact: record.artifact.as_deref(),
        };
        for sink in &self.sinks {
            if let Err(e) = sink.trial_finished(&report) {
                tracing::warn!(trial = record.index, error = %e, "tracking sink rejected trial");
            }
        }

        match record.state {
            TrialState::Complete => {
                tracing::info!(
                    trial = record.index,
                    family = record.family.name(),
                    score = record.score,
                    "trial completed"
                );
            }
            TrialState::Failed => {
                tracing::warn!(
                    trial = record.index,
                    family = record.family.name(),
                    error = record.error.as_deref().unwrap_or("unknown"),
                    "trial failed"
                );
            }
        }

        let index = self.trials.len();
        let improves = record.state == TrialState::Complete
            && match self.best {
                Some(b) => self.direction.improves(record.score, self.trials[b].score),
                None => true,
            };
        self.trials.push(record);
        if improves {
            self.best = Some(index);
            tracing::info!(trial = index, "new best trial");
        }
    }
}

fn failed_record(
    index: usize,
    family: ModelFamily,
    assignment: Assignment,
    error: String,
) -> TrialRecord {
    TrialRecord {
        index,
        family,
        assignment,
        score: f64::NAN,
        artifact: None,
        model: None,
        state: TrialState::Failed,
        error: Some(error),
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array1, Array2};

    use super::*;
    use crate::sampler::RandomSampler;
    use crate::types::Task;

    fn tiny_dataset(task: Task) -> Dataset {
        let n = 40;
        let mut rows = Vec::new();
        let mut target = Vec::new();
        for i in 0..n {
            let x0 = i as f64 / n as f64;
            rows.extend_from_slice(&[x0, (i % 5) as f64]);
            target.push(match task {
                Task::Classification => {
                    if i % 2 == 0 {
                        0.0
                    } else {
                        1.0
                    }
                }
                Task::Regression => 2.0 * x0,
            });
        }
        Dataset::new(
            Array2::from_shape_vec((n, 2), rows).unwrap(),
            Array1::from_vec(target),
            task,
        )
        .unwrap()
    }

    fn fast_study(dir: &std::path::Path, task: Task) -> Study {
        Study::new(
            "test",
            task.direction(),
            RandomSampler::with_seed(7),
            EvaluationStrategy::from_fast_mode(true),
            ArtifactStore::new(dir),
        )
    }

    #[test]
    fn family_proposal_is_part_of_the_assignment() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = tiny_dataset(Task::Classification);
        let mut study = fast_study(dir.path(), Task::Classification);
        study.run(&dataset, 2).unwrap();

        for trial in study.trials() {
            assert_eq!(trial.assignment.str("model").unwrap(), trial.family.name());
        }
    }

    #[test]
    fn history_only_holds_completed_trials() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = tiny_dataset(Task::Regression);
        let mut study = fast_study(dir.path(), Task::Regression);
        study.run(&dataset, 3).unwrap();

        assert_eq!(study.history.read().len(), study.n_complete());
    }

    #[test]
    fn best_model_is_exposed_after_run() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = tiny_dataset(Task::Classification);
        let mut study = fast_study(dir.path(), Task::Classification);
        study.run(&dataset, 2).unwrap();

        assert!(study.best_model().is_some());
        assert!(study.best_model().unwrap().is_fitted());
    }
}
