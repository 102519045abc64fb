//! Smoothed frame-rate estimate for the overlay.

use std::time::Instant;

/// Weight of the previous estimate in each update.
pub const SMOOTHING: f64 = 0.9;

/// Single-pole exponential moving average of iteration frequency.
///
/// Display-only; nothing schedules off this value.
#[derive(Clone, Copy, Debug)]
pub struct FpsEstimator {
    estimate: f64,
    previous: Instant,
}

impl FpsEstimator {
    /// Start with a zero estimate, measuring from `start`.
    pub fn new(start: Instant) -> Self {
        Self {
            estimate: 0.0,
            previous: start,
        }
    }

    pub fn estimate(&self) -> f64 {
        self.estimate
    }

    /// Fold in an iteration that completed at `now`.
    ///
    /// A zero (or negative) delta leaves both the estimate and the reference
    /// timestamp untouched.
    pub fn update(&mut self, now: Instant) -> f64 {
        let delta = now.saturating_duration_since(self.previous).as_secs_f64();
        if delta <= 0.0 {
            return self.estimate;
        }
        let instantaneous = 1.0 / delta;
        self.estimate = SMOOTHING * self.estimate + (1.0 - SMOOTHING) * instantaneous;
        self.previous = now;
        self.estimate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn run(samples: usize, delta: Duration) -> f64 {
        let start = Instant::now();
        let mut fps = FpsEstimator::new(start);
        let mut t = start;
        for _ in 0..samples {
            t += delta;
            fps.update(t);
        }
        fps.estimate()
    }

    #[test]
    fn starts_at_zero() {
        assert_eq!(FpsEstimator::new(Instant::now()).estimate(), 0.0);
    }

    #[test]
    fn first_update_is_a_tenth_of_the_instantaneous_rate() {
        let est = run(1, Duration::from_millis(100));
        assert!((est - 1.0).abs() < 1e-9);
    }

    #[test]
    fn follows_the_closed_form_after_twenty_samples() {
        let est = run(20, Duration::from_millis(100));
        let expected = 10.0 * (1.0 - SMOOTHING.powi(20));
        assert!((est - expected).abs() < 1e-6, "{est} vs {expected}");
    }

    #[test]
    fn converges_toward_the_true_rate() {
        let delta = Duration::from_millis(100);
        let mut previous_error = f64::INFINITY;
        for samples in [5, 10, 20, 29, 60] {
            let error = (10.0 - run(samples, delta)).abs();
            assert!(error < previous_error);
            previous_error = error;
        }
        assert!((run(29, delta) - 10.0).abs() < 0.5);
        assert!((run(60, delta) - 10.0).abs() < 0.05);
    }

    #[test]
    fn zero_delta_is_skipped() {
        let start = Instant::now();
        let mut fps = FpsEstimator::new(start);
        let t = start + Duration::from_millis(50);
        let first = fps.update(t);
        assert_eq!(fps.update(t), first);
        assert!(fps.estimate().is_finite());

        // The skipped sample did not move the reference point.
        let second = fps.update(t + Duration::from_millis(50));
        assert!((second - (0.9 * first + 0.1 * 20.0)).abs() < 1e-9);
    }
}
