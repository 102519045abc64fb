//! Loop pacing against a target processing frequency.

use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};

/// Caps loop iterations at a target frequency. A ceiling only: slow
/// iterations are never sped up.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RateLimiter {
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(target_frequency_hz: f64) -> Result<Self> {
        if !target_frequency_hz.is_finite() || target_frequency_hz <= 0.0 {
            return Err(anyhow!(
                "target frequency must be a positive number of hertz, got {}",
                target_frequency_hz
            ));
        }
        let min_interval = Duration::try_from_secs_f64(1.0 / target_frequency_hz)
            .map_err(|e| anyhow!("target frequency {} out of range: {}", target_frequency_hz, e))?;
        Ok(Self { min_interval })
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// `max(0, min_interval - elapsed)`.
    pub fn sleep_for_elapsed(&self, elapsed: Duration) -> Duration {
        self.min_interval.saturating_sub(elapsed)
    }

    /// Sleep owed for an iteration that ran from `start` to `end`. An `end`
    /// earlier than `start` counts as zero elapsed time.
    pub fn sleep_duration(&self, start: Instant, end: Instant) -> Duration {
        self.sleep_for_elapsed(end.saturating_duration_since(start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_frequency() {
        assert!(RateLimiter::new(0.0).is_err());
        assert!(RateLimiter::new(-3.0).is_err());
        assert!(RateLimiter::new(f64::NAN).is_err());
        assert!(RateLimiter::new(f64::INFINITY).is_err());
    }

    #[test]
    fn min_interval_is_reciprocal() -> Result<()> {
        let limiter = RateLimiter::new(8.0)?;
        assert_eq!(limiter.min_interval(), Duration::from_millis(125));
        Ok(())
    }

    #[test]
    fn sleeps_off_the_remainder_of_the_interval() -> Result<()> {
        let limiter = RateLimiter::new(10.0)?;
        let min = limiter.min_interval();
        for ms in [0u64, 1, 40, 99, 100] {
            let elapsed = Duration::from_millis(ms);
            assert_eq!(limiter.sleep_for_elapsed(elapsed), min - elapsed);
        }
        Ok(())
    }

    #[test]
    fn never_requests_negative_sleep() -> Result<()> {
        let limiter = RateLimiter::new(10.0)?;
        for ms in [101u64, 250, 10_000] {
            assert_eq!(
                limiter.sleep_for_elapsed(Duration::from_millis(ms)),
                Duration::ZERO
            );
        }
        Ok(())
    }

    #[test]
    fn instants_out_of_order_count_as_zero_elapsed() -> Result<()> {
        let limiter = RateLimiter::new(4.0)?;
        let start = Instant::now();
        let end = start + Duration::from_millis(50);
        assert_eq!(limiter.sleep_duration(start, end), Duration::from_millis(200));
        assert_eq!(limiter.sleep_duration(end, start), Duration::from_millis(250));
        // Same inputs, same output.
        assert_eq!(
            limiter.sleep_duration(start, end),
            limiter.sleep_duration(start, end)
        );
        Ok(())
    }
}
