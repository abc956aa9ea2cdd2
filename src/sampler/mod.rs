//! Sampler trait and implementations for hyperparameter proposal.
//!
//! A sampler proposes one value per parameter per trial. The study hands
//! it the distribution to draw from, the index of the trial being
//! proposed, and the history of completed trials so adaptive samplers
//! can bias later proposals toward promising regions.

pub mod random;
pub mod tpe;

pub use random::RandomSampler;
pub use tpe::{TpeSampler, TpeSamplerBuilder};

use serde::{Deserialize, Serialize};

use crate::distribution::Distribution;
use crate::space::{Assignment, ParamValue};

/// The outcome of a completed trial, as seen by a sampler.
///
/// Only successful trials are appended to the history; failed trials
/// carry no usable score and would poison density estimates.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrialOutcome {
    /// The index of the trial within its study.
    pub index: usize,
    /// The full sampled assignment, including the family choice.
    pub params: Assignment,
    /// The scalar score the evaluation produced.
    pub score: f64,
}

/// Trait for pluggable hyperparameter proposal strategies.
///
/// Implementations must be `Send + Sync`: the study shares the sampler
/// behind an `Arc`. A sampler may ignore `history` (uniform random) or
/// use it to adapt (TPE).
pub trait Sampler: Send + Sync {
    /// Propose a value for the named parameter.
    ///
    /// # Arguments
    ///
    /// * `name` - The parameter's name, the key under which previous
    ///   trials stored their sampled values.
    /// * `distribution` - The distribution to draw from.
    /// * `trial_index` - The index of the trial being proposed.
    /// * `history` - Completed trials, oldest first.
    fn sample(
        &self,
        name: &str,
        distribution: &Distribution,
        trial_index: usize,
        history: &[TrialOutcome],
    ) -> ParamValue;
}

/// Generate a random `f64` in the range `[low, high)`.
#[inline]
pub(crate) fn f64_range(rng: &mut fastrand::Rng, low: f64, high: f64) -> f64 {
    low + rng.f64() * (high - low)
}
