//! Random sampler implementation.

use parking_lot::Mutex;

use crate::distribution::Distribution;
use crate::sampler::{f64_range, Sampler, TrialOutcome};
use crate::space::ParamValue;

/// A sampler that draws uniformly from each distribution.
///
/// The trial history is ignored: every proposal is independent. This is
/// the baseline strategy and the fallback other samplers use before they
/// have enough history to model.
///
/// # Examples
///
/// ```
/// use automl::sampler::RandomSampler;
///
/// // Fresh seed per run
/// let sampler = RandomSampler::new();
///
/// // Fixed seed for reproducibility
/// let sampler = RandomSampler::with_seed(42);
/// ```
pub struct RandomSampler {
    rng: Mutex<fastrand::Rng>,
}

impl RandomSampler {
    /// Create a sampler seeded from the thread-local generator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::new()),
        }
    }

    /// Create a sampler with a fixed seed.
    ///
    /// The same seed produces the same sequence of proposals.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::with_seed(seed)),
        }
    }
}

impl Default for RandomSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for RandomSampler {
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn sample(
        &self,
        _name: &str,
        distribution: &Distribution,
        _trial_index: usize,
        _history: &[TrialOutcome],
    ) -> ParamValue {
        let mut rng = self.rng.lock();

        match distribution {
            Distribution::Float(d) => {
                let value = if d.log_scale {
                    // Sample uniformly in log space
                    f64_range(&mut rng, d.low.ln(), d.high.ln()).exp()
                } else {
                    f64_range(&mut rng, d.low, d.high)
                };
                ParamValue::Float(value)
            }
            Distribution::Int(d) => {
                let value = if d.log_scale {
                    // Sample uniformly in log space, then round and clamp
                    // since rounding can push outside the bounds
                    let raw = f64_range(&mut rng, (d.low as f64).ln(), (d.high as f64).ln())
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::{CategoricalDistribution, FloatDistribution, IntDistribution};

    #[test]
    fn float_samples_stay_in_range() {
        let sampler = RandomSampler::with_seed(42);
        let dist = Distribution::Float(FloatDistribution {
            low: 0.0,
            high: 1.0,
            log_scale: false,
        });

        for _ in 0..100 {
            let value = sampler.sample("x", &dist, 0, &[]);
            if let ParamValue::Float(v) = value {
                assert!((0.0..=1.0).contains(&v));
            } else {
                panic!("expected Float value");
            }
        }
    }

    #[test]
    fn log_float_samples_stay_in_range() {
        let sampler = RandomSampler::with_seed(42);
        let dist = Distribution::Float(FloatDistribution {
            low: 1e-5,
            high: 1.0,
            log_scale: true,
        });

        for _ in 0..100 {
            let value = sampler.sample("lr", &dist, 0, &[]);
            if let ParamValue::Float(v) = value {
                assert!((1e-5..=1.0).contains(&v));
            } else {
                panic!("expected Float value");
            }
        }
    }

    #[test]
    fn int_samples_stay_in_range() {
        let sampler = RandomSampler::with_seed(42);
        let dist = Distribution::Int(IntDistribution {
            low: 2,
            high: 10,
            log_scale: false,
        });

        for _ in 0..100 {
            let value = sampler.sample("depth", &dist, 0, &[]);
            if let ParamValue::Int(v) = value {
                assert!((2..=10).contains(&v));
            } else {
                panic!("expected Int value");
            }
        }
    }

    #[test]
    fn log_int_samples_stay_in_range() {
        let sampler = RandomSampler::with_seed(42);
        let dist = Distribution::Int(IntDistribution {
            low: 1,
            high: 1000,
            log_scale: true,
        });

        for _ in 0..100 {
            let value = sampler.sample("n", &dist, 0, &[]);
            if let ParamValue::Int(v) = value {
                assert!((1..=1000).contains(&v));
            } else {
                panic!("expected Int value");
            }
        }
    }

    #[test]
    fn categorical_samples_resolve_to_choices() {
        let sampler = RandomSampler::with_seed(42);
        let dist = Distribution::Categorical(CategoricalDistribution {
            choices: vec!["depthwise".to_string(), "lossguide".to_string()],
        });

        for _ in 0..50 {
            let value = sampler.sample("grow_policy", &dist, 0, &[]);
            if let ParamValue::Str(s) = value {
                assert!(s == "depthwise" || s == "lossguide");
            } else {
                panic!("expected Str value");
            }
        }
    }

    #[test]
    fn same_seed_reproduces_sequence() {
        let a = RandomSampler::with_seed(42);
        let b = RandomSampler::with_seed(42);
        let dist = Distribution::Float(FloatDistribution {
            low: 0.0,
            high: 1.0,
            log_scale: false,
        });

        for _ in 0..10 {
            assert_eq!(a.sample("x", &dist, 0, &[]), b.sample("x", &dist, 0, &[]));
        }
    }
}
