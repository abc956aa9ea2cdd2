//! Model families: the closed set of trainable candidates the search
//! chooses between.
//!
//! Each family declares a hyperparameter search space and constructs an
//! untrained model from a sampled assignment. The family itself is the
//! outer categorical choice of the search: the sampler first picks a
//! family, then samples that family's space.

pub mod gbm;

pub use gbm::{BoostObjective, GbmParams, GradientBoosting, GrowthPolicy};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::space::{Assignment, SearchSpace};
use crate::types::Task;

/// The registered model families.
///
/// Both are gradient-boosted tree ensembles differing in leaf-growth
/// strategy and parameterization: `Depthwise` grows level-by-level and
/// additionally samples a `grow_policy` switch; `Leafwise` always grows
/// best-gain-first under a `num_leaves` budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    /// Level-wise boosted trees with a sampled growth-policy switch.
    Depthwise,
    /// Best-first (leaf-wise) boosted trees.
    Leafwise,
}

impl ModelFamily {
    /// Every registered family, in the order the outer categorical
    /// choice exposes them.
    pub const ALL: [ModelFamily; 2] = [ModelFamily::Depthwise, ModelFamily::Leafwise];

    /// The family's stable name, used as the outer categorical choice
    /// and as the artifact key.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ModelFamily::Depthwise => "depthwise",
            ModelFamily::Leafwise => "leafwise",
        }
    }

    /// Resolve a sampled family name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownFamily`] for names outside
    /// [`ModelFamily::ALL`].
    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.name() == name)
            .ok_or_else(|| Error::UnknownFamily(name.to_string()))
    }

    /// The family's hyperparameter search space.
    ///
    /// Spaces are task-independent; task-conditional defaults (the
    /// training objective) are baked into [`construct`](Self::construct)
    /// instead.
    #[must_use]
    pub fn search_space(self, _task: Task) -> SearchSpace {
        match self {
            ModelFamily::Depthwise => SearchSpace::new()
                .int("n_estimators", 100, 1000)
                .int("max_depth", 2, 10)
                .float_log("learning_rate", 5e-5, 0.1)
                .float("subsample", 0.5, 1.0)
                .float("colsample_bytree", 0.5, 1.0)
                .float_log("reg_alpha", 1e-5, 1.0)
                .float_log("reg_lambda", 1e-5, 1.0)
                .int("max_leaves", 9, 81)
                .categorical("grow_policy", &["depthwise", "lossguide"]),
            ModelFamily::Leafwise => SearchSpace::new()
                .int("num_leaves", 9, 81)
                .int("max_depth", 2, 10)
                .float_log("learning_rate", 5e-5, 0.1)
                .int("n_estimators", 100, 1000)
                .float("subsample", 0.5, 1.0)
                .float_log("reg_alpha", 1e-5, 1.0)
                .float_log("reg_lambda", 1e-5, 1.0)
                .float("colsample_bytree", 0.5, 1.0),
        }
    }

    /// Build an untrained model from a sampled assignment.
    ///
    /// The task picks the training objective: logistic log-loss for
    /// classification, squared error for regression.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AssignmentContract`] when a required parameter is
    /// missing or mistyped: a fatal programming error, not a trial
    /// failure.
    pub fn construct(self, assignment: &Assignment, task: Task) -> Result<GradientBoosting> {
        let objective = match task {
            Task::Classification => BoostObjective::Logistic,
            Task::Regression => BoostObjective::SquaredError,
        };

        let params = match self {
            ModelFamily::Depthwise => GbmParams {
                objective,
                growth: match assignment.str("grow_policy")? {
                    "lossguide" => GrowthPolicy::Lossguide,
                    _ => GrowthPolicy::Depthwise,
                },
                n_estimators: assignment.usize("n_estimators")?,
                learning_rate: assignment.float("learning_rate")?,
                max_depth: assignment.usize("max_depth")?,
                max_leaves: assignment.usize("max_leaves")?,
                subsample: assignment.float("subsample")?,
                colsample: assignment.float("colsample_bytree")?,
                reg_alpha: assignment.float("reg_alpha")?,
                reg_lambda: assignment.float("reg_lambda")?,
                ..GbmParams::default()
            },
            ModelFamily::Leafwise => GbmParams {
                objective,
                growth: GrowthPolicy::Lossguide,
                n_estimators: assignment.usize("n_estimators")?,
                learning_rate: assignment.float("learning_rate")?,
                max_depth: assignment.usize("max_depth")?,
                max_leaves: assignment.usize("num_leaves")?,
                subsample: assignment.float("subsample")?,
                colsample: assignment.float("colsample_bytree")?,
                reg_alpha: assignment.float("reg_alpha")?,
                reg_lambda: assignment.float("reg_lambda")?,
                ..GbmParams::default()
            },
        };

        Ok(GradientBoosting::new(params))
    }
}

impl core::fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::ParamValue;

    fn full_assignment(family: ModelFamily) -> Assignment {
        let mut assignment = Assignment::new();
        for (name, dist) in family.search_space(Task::Classification).iter() {
            let value = match dist {
                crate::distribution::Distribution::Float(d) => ParamValue::Float(d.low),
                crate::distribution::Distribution::Int(d) => ParamValue::Int(d.low),
                crate::distribution::Distribution::Categorical(d) => {
                    ParamValue::Str(d.choices[0].clone())
                }
            };
            assignment.insert(name, value);
        }
        assignment
    }

    #[test]
    fn family_names_round_trip() {
        for family in ModelFamily::ALL {
            assert_eq!(ModelFamily::from_name(family.name()).unwrap(), family);
        }
        assert!(matches!(
            ModelFamily::from_name("linear"),
            Err(Error::UnknownFamily(_))
        ));
    }

    #[test]
    fn spaces_validate() {
        for family in ModelFamily::ALL {
            for task in [Task::Classification, Task::Regression] {
                family.search_space(task).validate().unwrap();
            }
        }
    }

    #[test]
    fn task_selects_objective() {
        let assignment = full_assignment(ModelFamily::Leafwise);
        let classifier = ModelFamily::Leafwise
            .construct(&assignment, Task::Classification)
            .unwrap();
        let regressor = ModelFamily::Leafwise
            .construct(&assignment, Task::Regression)
            .unwrap();
        assert_eq!(classifier.params().objective, BoostObjective::Logistic);
        assert_eq!(regressor.params().objective, BoostObjective::SquaredError);
    }

    #[test]
    fn leafwise_always_grows_best_first() {
        let assignment = full_assignment(ModelFamily::Leafwise);
        let model = ModelFamily::Leafwise
            .construct(&assignment, Task::Regression)
            .unwrap();
        assert_eq!(model.params().growth, GrowthPolicy::Lossguide);
    }

    #[test]
    fn depthwise_honors_sampled_grow_policy() {
        let mut assignment = full_assignment(ModelFamily::Depthwise);
        assignment.insert("grow_policy", ParamValue::Str("lossguide".to_string()));
        let model = ModelFamily::Depthwise
            .construct(&assignment, Task::Regression)
            .unwrap();
        assert_eq!(model.params().growth, GrowthPolicy::Lossguide);
    }

    #[test]
    fn missing_parameter_is_a_contract_violation() {
        let assignment = Assignment::new();
        let err = ModelFamily::Depthwise
            .construct(&assignment, Task::Classification)
            .unwrap_err();
        assert!(matches!(err, Error::AssignmentContract { .. }));
    }
}
