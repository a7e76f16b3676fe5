//! Absolute-deadline ticker.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{SchedulerError, SchedulerResult};

/// Returned by each [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickInfo {
    /// 1 for the first tick
    pub index: u64,
    /// Deadlines dropped because the previous tick overran
    pub skipped: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickMetrics {
    pub ticks: u64,
    pub overruns: u64,
    pub skipped: u64,
}

/// If `now` is past `deadline`, move it to the first multiple of `period`
/// after `now` and report how many deadlines were passed over.
///
/// A deadline exactly at `now` is still on time.
pub fn skip_missed(deadline: Instant, period: Duration, now: Instant) -> (Instant, u64) {
    if now <= deadline || period.is_zero() {
        return (deadline, 0);
    }
    let late = now.duration_since(deadline).as_nanos();
    let missed = late / period.as_nanos() + 1;
    let advance = period.as_nanos().saturating_mul(missed);
    let advance = Duration::from_nanos(u64::try_from(advance).unwrap_or(u64::MAX));
    (deadline + advance, u64::try_from(missed).unwrap_or(u64::MAX))
}

pub struct TickScheduler {
    period: Duration,
    next_deadline: Instant,
    metrics: TickMetrics,
}

impl TickScheduler {
    /// The first deadline is one period from now.
    pub fn new(period: Duration) -> SchedulerResult<Self> {
        if period.is_zero() {
            return Err(SchedulerError::ZeroPeriod);
        }
        Ok(Self {
            period,
            next_deadline: Instant::now() + period,
            metrics: TickMetrics::default(),
        })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn metrics(&self) -> TickMetrics {
        self.metrics
    }

    /// Sleep until the next deadline, skipping any already missed.
    pub fn wait_for_tick(&mut self) -> TickInfo {
        let (deadline, skipped) = skip_missed(self.next_deadline, self.period, Instant::now());
        if skipped > 0 {
            self.metrics.overruns += 1;
            self.metrics.skipped += skipped;
            debug!(skipped, "tick overrun, skipping missed deadlines");
        }

        let now = Instant::now();
        if deadline > now {
            std::thread::sleep(deadline - now);
        }

        self.next_deadline = deadline + self.period;
        self.metrics.ticks += 1;
        TickInfo {
            index: self.metrics.ticks,
            skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const P: Duration = Duration::from_millis(10);

    #[test]
    fn test_on_time_deadline_untouched() {
        let t0 = Instant::now();
        assert_eq!(skip_missed(t0 + P, P, t0), (t0 + P, 0));
        assert_eq!(skip_missed(t0, P, t0), (t0, 0));
    }

    #[test]
    fn test_skips_to_first_future_multiple() {
        let t0 = Instant::now();
        let (next, skipped) = skip_missed(t0, P, t0 + Duration::from_millis(25));
        assert_eq!(skipped, 3);
        assert_eq!(next, t0 + Duration::from_millis(30));

        let (next, skipped) = skip_missed(t0, P, t0 + P);
        assert_eq!(skipped, 2);
        assert_eq!(next, t0 + 2 * P);
    }

    #[test]
    fn test_zero_period_rejected() {
        assert_eq!(
            TickScheduler::new(Duration::ZERO).err(),
            Some(SchedulerError::ZeroPeriod)
        );
    }
}
