//! Hyperparameter distribution descriptors.

use serde::{Deserialize, Serialize};

/// Distribution for floating-point hyperparameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FloatDistribution {
    /// Lower bound (inclusive).
    pub low: f64,
    /// Upper bound (inclusive).
    pub high: f64,
    /// Whether to sample in log space.
    pub log_scale: bool,
}

/// Distribution for integer hyperparameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntDistribution {
    /// Lower bound (inclusive).
    pub low: i64,
    /// Upper bound (inclusive).
    pub high: i64,
    /// Whether to sample in log space.
    pub log_scale: bool,
}

/// Distribution for categorical hyperparameters over a fixed string set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoricalDistribution {
    /// The choices a sampler picks from; the sampled value is an index
    /// into this vector.
    pub choices: Vec<String>,
}

/// Enum wrapping all hyperparameter distribution kinds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Distribution {
    /// A floating-point range.
    Float(FloatDistribution),
    /// An integer range.
    Int(IntDistribution),
    /// A categorical choice set.
    Categorical(CategoricalDistribution),
}
