//! Search-space definition and sampled-assignment types.
//!
//! A [`SearchSpace`] is an ordered mapping from parameter name to a
//! [`Distribution`], declared once by a model family and immutable
//! afterwards. An [`Assignment`] is the concrete set of values sampled
//! from a space for one trial; it is consumed exactly once to construct
//! a model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::distribution::{
    CategoricalDistribution, Distribution, FloatDistribution, IntDistribution,
};
use crate::error::{Error, Result};

/// A concrete sampled hyperparameter value.
///
/// Categorical samples are stored as the resolved choice string, not the
/// index, so assignments stay readable in tracking journals. Untagged
/// variants are tried in order, so `Int` must precede `Float` for whole
/// numbers to round-trip.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// An integer value.
    Int(i64),
    /// A floating-point value.
    Float(f64),
    /// A resolved categorical choice.
    Str(String),
}

impl core::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Str(v) => write!(f, "{v}"),
        }
    }
}

/// An ordered hyperparameter search space.
///
/// Parameters keep declaration order so that sampling is deterministic
/// for a fixed sampler seed.
///
/// # Examples
///
/// ```
/// use automl::space::SearchSpace;
///
/// let space = SearchSpace::new()
///     .int("max_depth", 2, 10)
///     .float_log("learning_rate", 5e-5, 0.1)
///     .categorical("grow_policy", &["depthwise", "lossguide"]);
/// assert_eq!(space.len(), 3);
/// ```
#[derive(Clone, Debug, Default)]
pub struct SearchSpace {
    params: Vec<(&'static str, Distribution)>,
}

impl SearchSpace {
    /// Create an empty search space.
    #[must_use]
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Add a uniform floating-point range.
    #[must_use]
    pub fn float(mut self, name: &'static str, low: f64, high: f64) -> Self {
        self.params.push((
            name,
            Distribution::Float(FloatDistribution {
                low,
                high,
                log_scale: false,
            }),
        ));
        self
    }

    /// Add a log-uniform floating-point range.
    #[must_use]
    pub fn float_log(mut self, name: &'static str, low: f64, high: f64) -> Self {
        self.params.push((
            name,
            Distribution::Float(FloatDistribution {
                low,
                high,
                log_scale: true,
            }),
        ));
        self
    }

    /// Add a uniform integer range (inclusive bounds).
    #[must_use]
    pub fn int(mut self, name: &'static str, low: i64, high: i64) -> Self {
        self.params.push((
            name,
            Distribution::Int(IntDistribution {
                low,
                high,
                log_scale: false,
            }),
        ));
        self
    }

    /// Add a categorical choice over a fixed string set.
    #[must_use]
    pub fn categorical(mut self, name: &'static str, choices: &[&str]) -> Self {
        self.params.push((
            name,
            Distribution::Categorical(CategoricalDistribution {
                choices: choices.iter().map(ToString::to_string).collect(),
            }),
        ));
        self
    }

    /// Iterate parameters in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Distribution)> {
        self.params.iter().map(|(name, dist)| (*name, dist))
    }

    /// Number of parameters in the space.
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether the space holds no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Check every distribution's bounds.
    ///
    /// # Errors
    ///
    /// Returns an error for inverted bounds, non-positive log-scale lower
    /// bounds, or empty categorical choice sets.
    pub fn validate(&self) -> Result<()> {
        for (name, dist) in self.iter() {
            match dist {
                Distribution::Float(d) => {
                    if d.low > d.high {
                        return Err(Error::InvalidBounds {
                            name: name.to_string(),
                            low: d.low,
                            high: d.high,
                        });
                    }
                    if d.log_scale && d.low <= 0.0 {
                        return Err(Error::InvalidLogBounds(name.to_string()));
                    }
                }
                Distribution::Int(d) => {
                    if d.low > d.high {
                        return Err(Error::InvalidBounds {
                            name: name.to_string(),
                            low: d.low as f64,
                            high: d.high as f64,
                        });
                    }
                    if d.log_scale && d.low <= 0 {
                        return Err(Error::InvalidLogBounds(name.to_string()));
                    }
                }
                Distribution::Categorical(d) => {
                    if d.choices.is_empty() {
                        return Err(Error::EmptyChoices(name.to_string()));
                    }
                }
            }
        }
        Ok(())
    }
}

/// The concrete hyperparameter values sampled for one trial.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    values: BTreeMap<String, ParamValue>,
}

impl Assignment {
    /// Create an empty assignment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a sampled value under a parameter name.
    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) {
        self.values.insert(name.into(), value);
    }

    /// Look up a raw value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    /// Iterate name/value pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of sampled parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the assignment holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Fetch a float parameter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AssignmentContract`] if the key is absent or not
    /// a float, a programming error in the owning family's space, fatal
    /// to the study.
    pub fn float(&self, name: &str) -> Result<f64> {
        match self.values.get(name) {
            Some(ParamValue::Float(v)) => Ok(*v),
            Some(other) => Err(contract(name, format!("expected float, got {other:?}"))),
            None => Err(contract(name, "required parameter missing".to_string())),
        }
    }

    /// Fetch an integer parameter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AssignmentContract`] if the key is absent or not
    /// an integer.
    pub fn int(&self, name: &str) -> Result<i64> {
        match self.values.get(name) {
            Some(ParamValue::Int(v)) => Ok(*v),
            Some(other) => Err(contract(name, format!("expected int, got {other:?}"))),
            None => Err(contract(name, "required parameter missing".to_string())),
        }
    }

    /// Fetch an integer parameter as `usize`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AssignmentContract`] if the key is absent, not an
    /// integer, or negative.
    pub fn usize(&self, name: &str) -> Result<usize> {
        let v = self.int(name)?;
        usize::try_from(v).map_err(|_| contract(name, format!("expected non-negative int, got {v}")))
    }

    /// Fetch a categorical parameter's resolved choice.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AssignmentContract`] if the key is absent or not
    /// a categorical choice.
    pub fn str(&self, name: &str) -> Result<&str> {
        match self.values.get(name) {
            Some(ParamValue::Str(v)) => Ok(v),
            Some(other) => Err(contract(name, format!("expected categorical, got {other:?}"))),
            None => Err(contract(name, "required parameter missing".to_string())),
        }
    }
}

fn contract(name: &str, reason: String) -> Error {
    Error::AssignmentContract {
        name: name.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn space_keeps_declaration_order() {
        let space = SearchSpace::new()
            .int("b", 1, 2)
            .float("a", 0.0, 1.0)
            .categorical("c", &["x", "y"]);
        let names: Vec<_> = space.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["b", "a", "c"]);
    }

    #[test]
    fn validate_rejects_inverted_bounds() {
        let space = SearchSpace::new().float("x", 1.0, 0.0);
        assert!(matches!(
            space.validate(),
            Err(Error::InvalidBounds { .. })
        ));
    }

    #[test]
    fn validate_rejects_non_positive_log_low() {
        let space = SearchSpace::new().float_log("lr", 0.0, 0.1);
        assert!(matches!(space.validate(), Err(Error::InvalidLogBounds(_))));
    }

    #[test]
    fn validate_rejects_empty_choices() {
        let space = SearchSpace::new().categorical("policy", &[]);
        assert!(matches!(space.validate(), Err(Error::EmptyChoices(_))));
    }

    #[test]
    fn missing_key_is_contract_violation() {
        let assignment = Assignment::new();
        assert!(matches!(
            assignment.float("learning_rate"),
            Err(Error::AssignmentContract { .. })
        ));
    }

    #[test]
    fn mistyped_key_is_contract_violation() {
        let mut assignment = Assignment::new();
        assignment.insert("max_depth", ParamValue::Float(3.0));
        assert!(matches!(
            assignment.int("max_depth"),
            Err(Error::AssignmentContract { .. })
        ));
    }

    #[test]
    fn typed_getters_round_trip() {
        let mut assignment = Assignment::new();
        assignment.insert("learning_rate", ParamValue::Float(0.05));
        assignment.insert("max_depth", ParamValue::Int(6));
        assignment.insert("grow_policy", ParamValue::Str("lossguide".to_string()));

        assert!((assignment.float("learning_rate").unwrap() - 0.05).abs() < f64::EPSILON);
        assert_eq!(assignment.usize("max_depth").unwrap(), 6);
        assert_eq!(assignment.str("grow_policy").unwrap(), "lossguide");
    }
}
