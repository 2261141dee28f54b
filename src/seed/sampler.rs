use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::Rng;

use crate::error::SeedError;

/// Relative sales likelihood per hour of day, 0h..23h.
///
/// Quiet overnight, a lunch peak around 12h and a larger dinner peak
/// around 19h-20h.
pub const HOUR_WEIGHTS: [f64; 24] = [
    0.3, 0.2, 0.1, 0.1, 0.1, 0.2, // 0h-5h
    0.5, 1.0, 1.5, 2.0, 3.0, 6.0, // 6h-11h
    9.0, 8.0, 4.0, 2.5, 2.5, 4.0, // 12h-17h
    8.0, 10.0, 10.0, 8.0, 4.0, 1.5, // 18h-23h
];

/// Draws an hour of day with probability `weight[h] / sum(weights)`.
#[derive(Debug, Clone)]
pub struct HourSampler {
    weights: [f64; 24],
    index: WeightedIndex<f64>,
}

impl HourSampler {
    /// Fails on negative or non-finite weights, or when every weight is zero.
    pub fn new(weights: [f64; 24]) -> Result<Self, SeedError> {
        if let Some((hour, w)) = weights
            .iter()
            .enumerate()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(SeedError::Sampling(format!(
                "weight for hour {} is {}",
                hour, w
            )));
        }
        if weights.iter().all(|w| *w == 0.0) {
            return Err(SeedError::Sampling("all hour weights are zero".to_string()));
        }

        let index =
            WeightedIndex::new(weights.iter()).map_err(|e| SeedError::Sampling(e.to_string()))?;
        Ok(Self { weights, index })
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        self.index.sample(rng) as u32
    }

    /// Expected probability of each hour.
    pub fn probabilities(&self) -> [f64; 24] {
        let total: f64 = self.weights.iter().sum();
        let mut out = [0.0; 24];
        for (p, w) in out.iter_mut().zip(self.weights.iter()) {
            *p = w / total;
        }
        out
    }
}

impl Default for HourSampler {
    fn default() -> Self {
        Self {
            weights: HOUR_WEIGHTS,
            index: WeightedIndex::new(HOUR_WEIGHTS.iter())
                .expect("HOUR_WEIGHTS has positive entries"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_all_zero_weights_fail_fast() {
        let err = HourSampler::new([0.0; 24]).unwrap_err();
        assert!(matches!(err, SeedError::Sampling(_)));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut weights = HOUR_WEIGHTS;
        weights[3] = -1.0;
        assert!(HourSampler::new(weights).is_err());

        weights[3] = f64::NAN;
        assert!(HourSampler::new(weights).is_err());
    }

    #[test]
    fn test_single_hour_table_always_returns_that_hour() {
        let mut weights = [0.0; 24];
        weights[19] = 2.0;
        let sampler = HourSampler::new(weights).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!((0..1_000).all(|_| sampler.sample(&mut rng) == 19));
    }

    #[test]
    fn test_empirical_distribution_matches_weights() {
        let sampler = HourSampler::default();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let draws = 50_000usize;
        let mut counts = [0usize; 24];
        for _ in 0..draws {
            let hour = sampler.sample(&mut rng);
            assert!(hour < 24);
            counts[hour as usize] += 1;
        }

        for (hour, p) in sampler.probabilities().iter().enumerate() {
            let observed = counts[hour] as f64 / draws as f64;
            // five standard errors of a binomial proportion
            let tolerance = 5.0 * (p * (1.0 - p) / draws as f64).sqrt() + 1e-3;
            assert!(
                (observed - p).abs() <= tolerance,
                "hour {}: observed {:.4}, expected {:.4}",
                hour,
                observed,
                p
            );
        }
    }

    #[test]
    fn test_zero_weight_hour_never_drawn() {
        let mut weights = HOUR_WEIGHTS;
        weights[4] = 0.0;
        let sampler = HourSampler::new(weights).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        assert!((0..20_000).all(|_| sampler.sample(&mut rng) != 4));
    }
}
