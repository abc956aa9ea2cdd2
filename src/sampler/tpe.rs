//! Tree-Parzen Estimator (TPE) sampler implementation.
//!
//! TPE models the objective with two densities: one fitted to the
//! parameter values of promising trials, one to the rest. New proposals
//! are candidates drawn near promising values and ranked by the density
//! ratio l(x)/g(x).

use parking_lot::Mutex;

use crate::distribution::Distribution;
use crate::sampler::{f64_range, Sampler, TrialOutcome};
use crate::space::ParamValue;
use crate::types::Direction;

/// An adaptive sampler using the Tree-Parzen Estimator.
///
/// Completed trials are split at the gamma quantile of their scores
/// (under the study direction) into a "good" and a "bad" group. For each
/// parameter, univariate Parzen estimators are fitted to both groups and
/// the candidate maximizing the good/bad density ratio is proposed.
///
/// During the startup phase (fewer than `n_startup_trials` completed),
/// the sampler falls back to uniform random proposals to gather data.
///
/// # Examples
///
/// ```
/// use automl::sampler::TpeSampler;
/// use automl::Direction;
///
/// let sampler = TpeSampler::builder()
///     .direction(Direction::Maximize)
///     .gamma(0.25)
///     .n_startup_trials(5)
///     .seed(42)
///     .build();
/// ```
pub struct TpeSampler {
    /// Which end of the score scale counts as "good".
    direction: Direction,
    /// Fraction of trials considered good (gamma quantile).
    gamma: f64,
    /// Trials to sample uniformly before TPE kicks in.
    n_startup_trials: usize,
    /// Candidates drawn and ranked per proposal.
    n_candidates: usize,
    rng: Mutex<fastrand::Rng>,
}

impl TpeSampler {
    /// Create a TPE sampler with default settings.
    ///
    /// Defaults: minimize, gamma 0.25, 10 startup trials, 24 candidates.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Return a builder for configuring a TPE sampler.
    #[must_use]
    pub fn builder() -> TpeSamplerBuilder {
        TpeSamplerBuilder::new()
    }

    /// Split history into (good, bad) groups at the gamma quantile.
    ///
    /// Both groups are non-empty whenever the history holds at least two
    /// trials.
    fn split_outcomes<'a>(
        &self,
        history: &'a [TrialOutcome],
    ) -> (Vec<&'a TrialOutcome>, Vec<&'a TrialOutcome>) {
        let mut sorted: Vec<&TrialOutcome> = history.iter().collect();
        sorted.sort_by(|a, b| {
            let ordering = a
                .score
                .partial_cmp(&b.score)
                .unwrap_or(core::cmp::Ordering::Equal);
            match self.direction {
                Direction::Minimize => ordering,
                Direction::Maximize => ordering.reverse(),
            }
        });

        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let n_good = ((sorted.len() as f64 * self.gamma).ceil() as usize)
            .max(1)
            .min(sorted.len().saturating_sub(1));

        let bad = sorted.split_off(n_good);
        (sorted, bad)
    }

    /// Uniform draw, used during startup and as the degenerate-history
    /// fallback.
    fn sample_uniform(&self, distribution: &Distribution, rng: &mut fastrand::Rng) -> ParamValue {
        match distribution {
            Distribution::Float(d) => {
                let value = if d.log_scale {
                    f64_range(rng, d.low.ln(), d.high.ln()).exp()
                } else {
                    f64_range(rng, d.low, d.high)
                };
                ParamValue::Float(value)
            }
            #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
            Distribution::Int(d) => {
                let value = if d.log_scale {
                    let raw = f64_range(rng, (d.low as f64).ln(), (d.high as f64).ln())
                        .exp()
                        .round() as i64;
                    raw.clamp(d.low, d.high)
                } else {
                    rng.i64(d.low..=d.high)
                };
                ParamValue::Int(value)
            }
            Distribution::Categorical(d) => {
                let index = rng.usize(0..d.choices.len());
                ParamValue::Str(d.choices[index].clone())
            }
        }
    }

    /// Propose a continuous value by ranking candidates drawn from the
    /// good-group Parzen estimator. Operates in ln-space for log-scale
    /// distributions.
    fn sample_parzen(
        &self,
        low: f64,
        high: f64,
        log_scale: bool,
        good: &[f64],
        bad: &[f64],
        rng: &mut fastrand::Rng,
    ) -> f64 {
        let to_internal = |v: f64| if log_scale { v.ln() } else { v };
        let from_internal = |v: f64| if log_scale { v.exp() } else { v };

        let (lo, hi) = (to_internal(low), to_internal(high));
        let good: Vec<f64> = good.iter().map(|&v| to_internal(v)).collect();
        let bad: Vec<f64> = bad.iter().map(|&v| to_internal(v)).collect();

        let good_bw = bandwidth(&good, hi - lo);
        let bad_bw = bandwidth(&bad, hi - lo);

        let mut best_candidate = f64_range(rng, lo, hi);
        let mut best_ratio = f64::NEG_INFINITY;
        for _ in 0..self.n_candidates {
            // Draw near a random good value
            let center = good[rng.usize(0..good.len())];
            let candidate = (center + gaussian(rng) * good_bw).clamp(lo, hi);

            let ratio = log_density(candidate, &good, good_bw) - log_density(candidate, &bad, bad_bw);
            if ratio > best_ratio {
                best_ratio = ratio;
                best_candidate = candidate;
            }
        }

        from_internal(best_candidate).clamp(low, high)
    }

    /// Propose a categorical index from Laplace-smoothed good/bad counts.
    fn sample_weighted_choice(
        &self,
        n_choices: usize,
        good: &[usize],
        bad: &[usize],
        rng: &mut fastrand::Rng,
    ) -> usize {
        let mut weights = vec![0.0_f64; n_choices];
        #[allow(clippy::cast_precision_loss)]
        for (index, weight) in weights.iter_mut().enumerate() {
            let n_good = good.iter().filter(|&&i| i == index).count() as f64;
            let n_bad = bad.iter().filter(|&&i| i == index).count() as f64;
            *weight = (n_good + 1.0) / (n_bad + 1.0);
        }

        let total: f64 = weights.iter().sum();
        let mut threshold = rng.f64() * total;
        for (index, &weight) in weights.iter().enumerate() {
            threshold -= weight;
            if threshold <= 0.0 {
                return index;
            }
        }
        n_choices - 1
    }
}

impl Default for TpeSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for TpeSampler {
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn sample(
        &self,
        name: &str,
        distribution: &Distribution,
        _trial_index: usize,
        history: &[TrialOutcome],
    ) -> ParamValue {
        let mut rng = self.rng.lock();

        if history.len() < self.n_startup_trials {
            return self.sample_uniform(distribution, &mut rng);
        }

        let (good_outcomes, bad_outcomes) = self.split_outcomes(history);
        if good_outcomes.is_empty() || bad_outcomes.is_empty() {
            return self.sample_uniform(distribution, &mut rng);
        }

        match distribution {
            Distribution::Float(d) => {
                let good = float_values(&good_outcomes, name, d.low, d.high);
                let bad = float_values(&bad_outcomes, name, d.low, d.high);
                if good.is_empty() || bad.is_empty() {
                    return self.sample_uniform(distribution, &mut rng);
                }
                ParamValue::Float(self.sample_parzen(d.low, d.high, d.log_scale, &good, &bad, &mut rng))
            }
            Distribution::Int(d) => {
                let good = int_values(&good_outcomes, name, d.low, d.high);
                let bad = int_values(&bad_outcomes, name, d.low, d.high);
                if good.is_empty() || bad.is_empty() {
                    return self.sample_uniform(distribution, &mut rng);
                }
                let value = self
                    .sample_parzen(d.low as f64, d.high as f64, d.log_scale, &good, &bad, &mut rng)
                    .round() as i64;
                ParamValue::Int(value.clamp(d.low, d.high))
            }
            Distribution::Categorical(d) => {
                let good = choice_indices(&good_outcomes, name, &d.choices);
                let bad = choice_indices(&bad_outcomes, name, &d.choices);
                if good.is_empty() && bad.is_empty() {
                    return self.sample_uniform(distribution, &mut rng);
                }
                let index = self.sample_weighted_choice(d.choices.len(), &good, &bad, &mut rng);
                ParamValue::Str(d.choices[index].clone())
            }
        }
    }
}

/// Collect in-bounds float values stored under `name`.
fn float_values(outcomes: &[&TrialOutcome], name: &str, low: f64, high: f64) -> Vec<f64> {
    outcomes
        .iter()
        .filter_map(|t| match t.params.get(name) {
            Some(ParamValue::Float(v)) if (low..=high).contains(v) => Some(*v),
            _ => None,
        })
        .collect()
}

/// Collect in-bounds integer values stored under `name`, widened to f64.
#[allow(clippy::cast_precision_loss)]
fn int_values(outcomes: &[&TrialOutcome], name: &str, low: i64, high: i64) -> Vec<f64> {
    outcomes
        .iter()
        .filter_map(|t| match t.params.get(name) {
            Some(ParamValue::Int(v)) if (low..=high).contains(v) => Some(*v as f64),
            _ => None,
        })
        .collect()
}

/// Collect choice indices stored under `name`.
fn choice_indices(outcomes: &[&TrialOutcome], name: &str, choices: &[String]) -> Vec<usize> {
    outcomes
        .iter()
        .filter_map(|t| match t.params.get(name) {
            Some(ParamValue::Str(s)) => choices.iter().position(|c| c == s),
            _ => None,
        })
        .collect()
}

/// Scott's-rule bandwidth with a floor so degenerate samples stay usable.
#[allow(clippy::cast_precision_loss)]
fn bandwidth(values: &[f64], range: f64) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let scott = variance.sqrt() * n.powf(-0.2);
    scott.max(range.abs() * 1e-3).max(1e-12)
}

/// Log-density of a Gaussian Parzen estimator at `x`.
#[allow(clippy::cast_precision_loss)]
fn log_density(x: f64, centers: &[f64], bw: f64) -> f64 {
    let sum: f64 = centers
        .iter()
        .map(|&c| (-0.5 * ((x - c) / bw).powi(2)).exp())
        .sum();
    (sum / (centers.len() as f64 * bw)).max(f64::MIN_POSITIVE).ln()
}

/// Standard-normal draw via Box-Muller.
fn gaussian(rng: &mut fastrand::Rng) -> f64 {
    let u1 = rng.f64().max(f64::MIN_POSITIVE);
    let u2 = rng.f64();
    (-2.0 * u1.ln()).sqrt() * (core::f64::consts::TAU * u2).cos()
}

/// A builder for configuring a [`TpeSampler`].
pub struct TpeSamplerBuilder {
    direction: Direction,
    gamma: f64,
    n_startup_trials: usize,
    n_candidates: usize,
    seed: Option<u64>,
}

impl TpeSamplerBuilder {
    /// Create a builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            direction: Direction::Minimize,
            gamma: 0.25,
            n_startup_trials: 10,
            n_candidates: 24,
            seed: None,
        }
    }

    /// Set which end of the score scale counts as good.
    #[must_use]
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Set the fraction of trials considered good. Must be in (0, 1).
    #[must_use]
    pub fn gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    /// Set the number of uniform trials before TPE kicks in.
    #[must_use]
    pub fn n_startup_trials(mut self, n: usize) -> Self {
        self.n_startup_trials = n;
        self
    }

    /// Set the number of candidates ranked per proposal.
    #[must_use]
    pub fn n_candidates(mut self, n: usize) -> Self {
        self.n_candidates = n.max(1);
        self
    }

    /// Fix the RNG seed for reproducible proposals.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Build the sampler.
    ///
    /// # Panics
    ///
    /// Panics if gamma is not in (0.0, 1.0).
    #[must_use]
    pub fn build(self) -> TpeSampler {
        assert!(
            self.gamma > 0.0 && self.gamma < 1.0,
            "gamma must be in (0.0, 1.0), got {}",
            self.gamma
        );
        let rng = match self.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        TpeSampler {
            direction: self.direction,
            gamma: self.gamma,
            n_startup_trials: self.n_startup_trials,
            n_candidates: self.n_candidates,
            rng: Mutex::new(rng),
        }
    }
}

impl Default for TpeSamplerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
