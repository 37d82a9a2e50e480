//! Pacing policies applied by a simulated user between task executions.
//!
//! Three policies are available, mirroring the pacing helpers Locust users are
//! familiar with:
//!  - [`WaitTime::Between`]: sleep a uniformly random time inclusively between a
//!    minimum and a maximum after each task completes.
//!  - [`WaitTime::Constant`]: sleep the same time after each task completes.
//!  - [`WaitTime::ConstantPacing`]: aim for a fixed period between the *start*
//!    of successive tasks, subtracting however long the task itself took.
//!
//! The default policy sleeps between 1 and 2 seconds.

use rand::Rng;
use std::fmt;
use std::time::Duration;

use crate::util;
use crate::DemoError;

/// How long a simulated user pauses after each task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitTime {
    /// Uniformly random over the closed interval `[min, max]`.
    Between { min: Duration, max: Duration },
    /// Always the same delay after a task completes.
    Constant(Duration),
    /// A fixed period between task starts.
    ConstantPacing(Duration),
}

impl WaitTime {
    /// Build a uniformly random wait time between `min` and `max`, inclusive.
    ///
    /// # Example
    /// ```rust
    /// use std::time::Duration;
    /// use telemetry_demo::WaitTime;
    ///
    /// let wait_time = WaitTime::between(Duration::from_secs(1), Duration::from_secs(2)).unwrap();
    /// let delay = wait_time.delay(Duration::ZERO);
    /// assert!(delay >= Duration::from_secs(1) && delay <= Duration::from_secs(2));
    /// ```
    pub fn between(min: Duration, max: Duration) -> Result<Self, DemoError> {
        if min > max {
            return Err(DemoError::InvalidWaitTime {
                min_wait: min.as_millis(),
                max_wait: max.as_millis(),
                detail: format!(
                    "min_wait ({:?}) can't be larger than max_wait ({:?})",
                    min, max
                ),
            });
        }
        Ok(WaitTime::Between { min, max })
    }

    /// Always wait `delay` after a task completes.
    pub fn constant(delay: Duration) -> Self {
        WaitTime::Constant(delay)
    }

    /// Start a task every `period`, regardless of how long each task takes.
    pub fn constant_pacing(period: Duration) -> Self {
        WaitTime::ConstantPacing(period)
    }

    /// Returns how long to wait after a task that took `task_elapsed`.
    pub fn delay(&self, task_elapsed: Duration) -> Duration {
        match *self {
            WaitTime::Between { min, max } => rand::rng().random_range(min..=max),
            WaitTime::Constant(delay) => delay,
            WaitTime::ConstantPacing(period) => period.saturating_sub(task_elapsed),
        }
    }

    /// Sleep according to this policy, given the instant the task started.
    pub async fn pause(&self, started: tokio::time::Instant) {
        match *self {
            WaitTime::ConstantPacing(period) => {
                util::sleep_minus_drift(period, started).await;
            }
            _ => {
                let delay = self.delay(started.elapsed());
                trace!("{} sleeping {:?}", self, delay);
                tokio::time::sleep(delay).await;
            }
        }
    }
}

impl Default for WaitTime {
    fn default() -> Self {
        WaitTime::Between {
            min: Duration::from_secs(1),
            max: Duration::from_secs(2),
        }
    }
}

impl fmt::Display for WaitTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            WaitTime::Between { min, max } => write!(f, "between({:?}, {:?})", min, max),
            WaitTime::Constant(delay) => write!(f, "constant({:?})", delay),
            WaitTime::ConstantPacing(period) => write!(f, "constant_pacing({:?})", period),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const SAMPLES: usize = 20_000;
    const BUCKETS: usize = 10;

    #[test]
    fn default_is_between_one_and_two_seconds() {
        assert_eq!(
            WaitTime::default(),
            WaitTime::Between {
                min: Duration::from_secs(1),
                max: Duration::from_secs(2)
            }
        );
    }

    #[test]
    fn between_samples_stay_in_bounds() {
        let wait_time = WaitTime::default();
        for _ in 0..SAMPLES {
            let delay = wait_time.delay(Duration::from_millis(500));
            assert!(delay >= Duration::from_secs(1), "{:?} below minimum", delay);
            assert!(delay <= Duration::from_secs(2), "{:?} above maximum", delay);
        }
    }

    #[test]
    fn between_samples_are_uniform() {
        let wait_time = WaitTime::default();
        let mut buckets = [0usize; BUCKETS];
        for _ in 0..SAMPLES {
            let offset = wait_time.delay(Duration::ZERO) - Duration::from_secs(1);
            let bucket = ((offset.as_secs_f64() * BUCKETS as f64) as usize).min(BUCKETS - 1);
            buckets[bucket] += 1;
        }
        // Each bucket expects 2,000 samples; allow a generous margin.
        let expected = SAMPLES / BUCKETS;
        for (bucket, count) in buckets.iter().enumerate() {
            assert!(
                *count > expected * 8 / 10 && *count < expected * 12 / 10,
                "bucket {} has {} samples, expected about {}",
                bucket,
                count,
                expected
            );
        }
    }

    #[test]
    fn between_equal_bounds_is_constant() {
        let wait_time = WaitTime::between(Duration::from_secs(1), Duration::from_secs(1)).unwrap();
        assert_eq!(wait_time.delay(Duration::ZERO), Duration::from_secs(1));
    }

    #[test]
    fn between_rejects_inverted_bounds() {
        let result = WaitTime::between(Duration::from_secs(2), Duration::from_secs(1));
        match result {
            Err(DemoError::InvalidWaitTime {
                min_wait, max_wait, ..
            }) => {
                assert_eq!(min_wait, 2_000);
                assert_eq!(max_wait, 1_000);
            }
            other => panic!("expected InvalidWaitTime, got {:?}", other),
        }
    }

    #[test]
    fn constant_ignores_task_duration() {
        let wait_time = WaitTime::constant(Duration::from_secs(1));
        assert_eq!(wait_time.delay(Duration::ZERO), Duration::from_secs(1));
        assert_eq!(wait_time.delay(Duration::from_secs(5)), Duration::from_secs(1));
    }

    #[test]
    fn constant_pacing_subtracts_task_duration() {
        let wait_time = WaitTime::constant_pacing(Duration::from_secs(1));
        assert_eq!(
            wait_time.delay(Duration::from_millis(300)),
            Duration::from_millis(700)
        );
        assert_eq!(wait_time.delay(Duration::from_secs(3)), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn constant_pacing_holds_the_period() {
        let wait_time = WaitTime::constant_pacing(Duration::from_secs(1));
        let started = tokio::time::Instant::now();
        tokio::time::sleep(Duration::from_millis(250)).await;
        wait_time.pause(started).await;
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(1));
        assert!(elapsed < Duration::from_millis(1010));
    }

    #[tokio::test(start_paused = true)]
    async fn constant_waits_after_the_task() {
        let wait_time = WaitTime::constant(Duration::from_secs(1));
        let started = tokio::time::Instant::now();
        tokio::time::sleep(Duration::from_millis(250)).await;
        wait_time.pause(started).await;
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(1250));
        assert!(elapsed < Duration::from_millis(1260));
    }
}
