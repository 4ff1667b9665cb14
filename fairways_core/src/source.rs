use crate::error::{CoreError, CoreResult};

// Capability interface shared by every RNG backend.
//
// SecureRng (OS entropy) mints secrets, StreamRng replays a round's fair
// randomness in call order. The simulation backend lives behind the
// `simulation` feature and never implements `CryptoGrade`.

/// Retry budget for rejection sampling.
pub const MAX_REJECTION_ATTEMPTS: u32 = 100;

/// Number of values at the bottom of `[0, 2^64)` that would bias `v % n`.
pub(crate) fn rejection_threshold(n: u64) -> u64 {
    n.wrapping_neg() % n
}

pub(crate) mod private {
    pub trait Sealed {}
}

pub trait RandomSource {
    /// Uniform integer in `[0, max)`.
    fn int(&mut self, max: u64) -> CoreResult<u64>;

    /// Uniform float in `[0, 1)` with 53 bits of precision.
    fn float64(&mut self) -> CoreResult<f64>;

    fn fill_bytes(&mut self, buf: &mut [u8]) -> CoreResult<()>;

    /// Uniform integer in `[min, max]`.
    fn int_range(&mut self, min: i64, max: i64) -> CoreResult<i64> {
        if min > max {
            return Err(CoreError::InvalidRange { min, max });
        }
        let span = max as i128 - min as i128 + 1;
        if span > u64::MAX as i128 {
            let mut raw = [0u8; 8];
            self.fill_bytes(&mut raw)?;
            return Ok(i64::from_be_bytes(raw));
        }
        let offset = self.int(span as u64)?;
        Ok((min as i128 + offset as i128) as i64)
    }

    /// Fisher-Yates from the highest index down, one `swap(i, j)` per step.
    ///
    /// Every index is drawn before the first swap runs, so a failed draw
    /// leaves the caller's data untouched.
    fn shuffle_with<F>(&mut self, n: usize, mut swap: F) -> CoreResult<()>
    where
        Self: Sized,
        F: FnMut(usize, usize),
    {
        let mut steps = Vec::with_capacity(n.saturating_sub(1));
        for i in (1..n).rev() {
            let j = self.int(i as u64 + 1)? as usize;
            steps.push((i, j));
        }
        for (i, j) in steps {
            swap(i, j);
        }
        Ok(())
    }

    fn shuffle<T>(&mut self, items: &mut [T]) -> CoreResult<()>
    where
        Self: Sized,
    {
        let n = items.len();
        self.shuffle_with(n, |i, j| items.swap(i, j))
    }

    /// Index of the first entry whose cumulative weight exceeds a uniform draw.
    fn weighted_choice(&mut self, weights: &[u64]) -> CoreResult<usize>
    where
        Self: Sized,
    {
        if weights.is_empty() {
            return Err(CoreError::EmptyWeights);
        }
        let total = weights.iter().try_fold(0u64, |acc, &w| acc.checked_add(w)).ok_or_else(|| {
            CoreError::InvalidWeights("total weight overflows u64".to_string())
        })?;
        if total == 0 {
            return Err(CoreError::ZeroTotalWeight);
        }
        let draw = self.int(total)?;
        let mut cumulative = 0u64;
        for (i, &w) in weights.iter().enumerate() {
            cumulative += w;
            if cumulative > draw {
                return Ok(i);
            }
        }
        Err(CoreError::ZeroTotalWeight)
    }
}

/// Marker for backends allowed on production paths (strip shuffles, seed minting).
pub trait CryptoGrade: RandomSource + private::Sealed {}

#[cfg(test)]
mod tests {
    use super::*;

    /// Replays a fixed list of `int` results.
    struct Scripted(Vec<u64>);

    impl RandomSource for Scripted {
        fn int(&mut self, max: u64) -> CoreResult<u64> {
            if max == 0 {
                return Err(CoreError::InvalidMax);
            }
            Ok(self.0.remove(0) % max)
        }
        fn float64(&mut self) -> CoreResult<f64> {
            Ok(0.0)
        }
        fn fill_bytes(&mut self, buf: &mut [u8]) -> CoreResult<()> {
            buf.fill(0xab);
            Ok(())
        }
    }

    #[test]
    fn threshold_is_zero_for_powers_of_two() {
        assert_eq!(rejection_threshold(1), 0);
        assert_eq!(rejection_threshold(64), 0);
        assert_eq!(rejection_threshold(1 << 40), 0);
        assert_eq!(rejection_threshold(3), (u64::MAX % 3 + 1) % 3);
    }

    #[test]
    fn weighted_choice_scans_cumulative_weights() {
        let mut rng = Scripted(vec![0, 2, 3, 9]);
        let weights = [3, 0, 7];
        assert_eq!(rng.weighted_choice(&weights).unwrap(), 0);
        assert_eq!(rng.weighted_choice(&weights).unwrap(), 0);
        assert_eq!(rng.weighted_choice(&weights).unwrap(), 2);
        assert_eq!(rng.weighted_choice(&weights).unwrap(), 2);
    }

    #[test]
    fn weighted_choice_rejects_bad_tables() {
        let mut rng = Scripted(vec![]);
        assert!(matches!(rng.weighted_choice(&[]), Err(CoreError::EmptyWeights)));
        assert!(matches!(rng.weighted_choice(&[0, 0]), Err(CoreError::ZeroTotalWeight)));
        assert!(matches!(
            rng.weighted_choice(&[u64::MAX, 1]),
            Err(CoreError::InvalidWeights(_))
        ));
    }

    #[test]
    fn shuffle_walks_high_to_low() {
        let mut rng = Scripted(vec![0, 0, 0]);
        let mut seen = Vec::new();
        rng.shuffle_with(4, |i, j| seen.push((i, j))).unwrap();
        assert_eq!(seen, vec![(3, 0), (2, 0), (1, 0)]);
    }

    #[test]
    fn int_range_is_inclusive() {
        let mut rng = Scripted(vec![0, 10]);
        assert_eq!(rng.int_range(-5, 5).unwrap(), -5);
        assert_eq!(rng.int_range(-5, 5).unwrap(), 5);
        assert!(matches!(
            rng.int_range(2, 1),
            Err(CoreError::InvalidRange { min: 2, max: 1 })
        ));
    }
}
