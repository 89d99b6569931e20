//! Seeded random chronology.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use timewarp_env::TimeError;

/// Infinite chronology of uniformly distributed steps.
///
/// Steps are drawn from `[min, max]` with a ChaCha8 RNG seeded from a
/// single `u64`, so any failing run can be replayed from its seed.
#[derive(Debug, Clone)]
pub struct Jitter {
    seed: u64,
    min: f64,
    max: f64,
    rng: ChaCha8Rng,
}

impl Jitter {
    /// Creates a jittered chronology.
    ///
    /// # Errors
    /// `TimeError::InvalidStep` if a bound is negative, not finite, or
    /// `max < min`.
    pub fn new(seed: u64, min: f64, max: f64) -> Result<Self, TimeError> {
        for bound in [min, max] {
            if !bound.is_finite() || bound < 0.0 {
                return Err(TimeError::InvalidStep { step: bound });
            }
        }
        if max < min {
            return Err(TimeError::InvalidStep { step: max });
        }

        Ok(Self {
            seed,
            min,
            max,
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    /// Returns the seed this chronology was built from.
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl Iterator for Jitter {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        Some(self.rng.gen_range(self.min..=self.max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_steps() {
        assert_eq!(Jitter::new(42, 0.1, 2.0).unwrap().seed(), 42);
        let a: Vec<f64> = Jitter::new(42, 0.1, 2.0).unwrap().take(16).collect();
        let b: Vec<f64> = Jitter::new(42, 0.1, 2.0).unwrap().take(16).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seed_different_steps() {
        let a: Vec<f64> = Jitter::new(1, 0.1, 2.0).unwrap().take(16).collect();
        let b: Vec<f64> = Jitter::new(2, 0.1, 2.0).unwrap().take(16).collect();
        assert_ne!(a, b);
    }

    #[test]
    fn test_steps_within_bounds() {
        let jitter = Jitter::new(7, 0.5, 1.5).unwrap();
        for step in jitter.take(1000) {
            assert!((0.5..=1.5).contains(&step));
        }
    }

    #[test]
    fn test_rejects_bad_bounds() {
        assert!(Jitter::new(0, -1.0, 1.0).is_err());
        assert!(Jitter::new(0, 2.0, 1.0).is_err());
        assert!(Jitter::new(0, 0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_degenerate_range_is_constant() {
        let steps: Vec<f64> = Jitter::new(9, 0.25, 0.25).unwrap().take(3).collect();
        assert_eq!(steps, vec![0.25, 0.25, 0.25]);
    }
}
