use chrono::{Datelike, NaiveDate};
use rand::Rng;

/// Daily volume multiplier by weekday, Sunday = 0 .. Saturday = 6.
pub const WEEKDAY_MULTIPLIERS: [f64; 7] = [0.8, 0.9, 0.95, 1.0, 1.3, 1.5, 1.4];

/// Scales a uniform base range of daily sales by a weekday multiplier.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeModulator {
    multipliers: Vec<f64>,
    min_base: f64,
    max_base: f64,
}

impl Default for VolumeModulator {
    fn default() -> Self {
        Self::new(20.0, 70.0)
    }
}

impl VolumeModulator {
    /// Base range is `[min_base, max_base)`; callers validate it is non-empty.
    pub fn new(min_base: f64, max_base: f64) -> Self {
        Self {
            multipliers: WEEKDAY_MULTIPLIERS.to_vec(),
            min_base,
            max_base,
        }
    }

    /// Table value for `index`, 1.0 outside the table.
    pub fn multiplier_for_index(&self, index: usize) -> f64 {
        self.multipliers.get(index).copied().unwrap_or(1.0)
    }

    pub fn multiplier(&self, date: NaiveDate) -> f64 {
        self.multiplier_for_index(date.weekday().num_days_from_sunday() as usize)
    }

    /// `max(1, floor(uniform[min, max) * multiplier))`
    pub fn daily_sales<R: Rng + ?Sized>(&self, date: NaiveDate, rng: &mut R) -> usize {
        let base = rng.random_range(self.min_base..self.max_base);
        ((base * self.multiplier(date)).floor() as usize).max(1)
    }

    /// Inclusive upper bound of `daily_sales` across all weekdays.
    pub fn max_daily_sales(&self) -> usize {
        let peak = self.multipliers.iter().copied().fold(1.0_f64, f64::max);
        ((self.max_base * peak).ceil() as usize).max(1)
    }
}
