//! Poll interval for the log tailer: linear growth, then a flat cap.

use std::time::Duration;

pub const MIN_POLL_INTERVAL_MS: u64 = 1_000;
pub const POLL_INTERVAL_STEP_MS: u64 = 100;
pub const MAX_POLL_INTERVAL_MS: u64 = 5_000;

/// `min(1000 + 100 * iteration, 5000)` milliseconds
pub fn poll_interval(iteration: u32) -> Duration {
    let millis = MIN_POLL_INTERVAL_MS
        .saturating_add(POLL_INTERVAL_STEP_MS.saturating_mul(u64::from(iteration)))
        .min(MAX_POLL_INTERVAL_MS);
    Duration::from_millis(millis)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Backoff {
    iteration: u32,
}

impl Backoff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interval to sleep now
    pub fn current(&self) -> Duration {
        poll_interval(self.iteration)
    }

    /// Return the interval to sleep now and bump the counter.
    pub fn next_interval(&mut self) -> Duration {
        let interval = self.current();
        self.iteration = self.iteration.saturating_add(1);
        interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_grows_linearly_then_caps() {
        for iteration in 0..=50u32 {
            let expected = (1_000 + 100 * u64::from(iteration)).min(5_000);
            assert_eq!(poll_interval(iteration), Duration::from_millis(expected));
        }
        assert_eq!(poll_interval(0), Duration::from_secs(1));
        assert_eq!(poll_interval(40), Duration::from_secs(5));
        assert_eq!(poll_interval(u32::MAX), Duration::from_secs(5));
    }

    #[test]
    fn backoff_advances_after_each_interval() {
        let mut backoff = Backoff::new();
        let taken: Vec<u64> = (0..4).map(|_| backoff.next_interval().as_millis() as u64).collect();
        assert_eq!(taken, vec![1_000, 1_100, 1_200, 1_300]);
        assert_eq!(backoff.current(), Duration::from_millis(1_400));
    }
}
