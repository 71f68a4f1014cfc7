//! Per-client call statistics.
//!
//! Each provider client owns one [`StatsTracker`]. Batch analysis may call a
//! single client from several tasks, so the counters sit behind a mutex and
//! are only touched through the tracker's methods.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Snapshot of a client's call counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApiStats {
    pub total_calls: u64,
    pub successful_calls: u64,
    pub failed_calls: u64,
    /// Cumulative wall time across all finished calls.
    pub total_time: Duration,
    pub rate_limit_hits: u64,
}

impl ApiStats {
    /// `total_time / successful_calls`, or zero before the first success.
    pub fn average_response_time(&self) -> Duration {
        if self.successful_calls == 0 {
            return Duration::ZERO;
        }
        let calls = u32::try_from(self.successful_calls).unwrap_or(u32::MAX);
        self.total_time / calls
    }

    /// Calls started but not yet finished.
    pub fn in_flight(&self) -> u64 {
        self.total_calls
            .saturating_sub(self.successful_calls + self.failed_calls)
    }
}

/// Handed out by [`StatsTracker::begin_call`] and redeemed by
/// [`StatsTracker::finish_call`].
#[derive(Clone, Copy, Debug)]
#[must_use = "pass the ticket to finish_call"]
pub struct CallTicket {
    generation: u64,
}

#[derive(Debug, Default)]
struct TrackerState {
    stats: ApiStats,
    /// Bumped by every reset; tickets from an older generation are dropped.
    generation: u64,
}

/// Mutex-guarded [`ApiStats`].
#[derive(Debug, Default)]
pub struct StatsTracker {
    inner: Mutex<TrackerState>,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count a call before its first attempt.
    pub fn begin_call(&self) -> CallTicket {
        let mut state = self.lock();
        state.stats.total_calls += 1;
        CallTicket {
            generation: state.generation,
        }
    }

    /// Record how a call ended and how long it took. Calls that began before
    /// the last [`reset`](Self::reset) are not counted.
    pub fn finish_call(&self, ticket: CallTicket, success: bool, elapsed: Duration) {
        let mut state = self.lock();
        if ticket.generation != state.generation {
            return;
        }
        let stats = &mut state.stats;
        if success {
            stats.successful_calls += 1;
        } else {
            stats.failed_calls += 1;
        }
        stats.total_time += elapsed;
    }

    pub fn record_rate_limit(&self) {
        self.lock().stats.rate_limit_hits += 1;
    }

    pub fn snapshot(&self) -> ApiStats {
        self.lock().stats.clone()
    }

    /// Zero every counter in one step.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.stats = ApiStats::default();
        state.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_average_excludes_zero_successes() {
        let stats = ApiStats {
            total_calls: 2,
            failed_calls: 2,
            total_time: Duration::from_secs(4),
            ..Default::default()
        };
        assert_eq!(stats.average_response_time(), Duration::ZERO);
    }

    #[test]
    fn test_average_is_total_over_successes() {
        let tracker = StatsTracker::new();
        let call = tracker.begin_call();
        tracker.finish_call(call, true, Duration::from_secs(2));
        let call = tracker.begin_call();
        tracker.finish_call(call, true, Duration::from_secs(4));
        let call = tracker.begin_call();
        tracker.finish_call(call, false, Duration::from_secs(3));

        let s = tracker.snapshot();
        assert_eq!(s.total_calls, 3);
        assert_eq!(s.successful_calls, 2);
        assert_eq!(s.failed_calls, 1);
        assert_eq!(s.total_time, Duration::from_secs(9));
        assert_eq!(s.average_response_time(), Duration::from_millis(4500));
    }

    #[test]
    fn test_in_flight_calls() {
        let tracker = StatsTracker::new();
        let _pending = tracker.begin_call();
        let call = tracker.begin_call();
        tracker.finish_call(call, true, Duration::ZERO);
        let s = tracker.snapshot();
        assert!(s.successful_calls + s.failed_calls <= s.total_calls);
        assert_eq!(s.in_flight(), 1);
    }

    #[test]
    fn test_reset_zeroes_everything() {
        let tracker = StatsTracker::new();
        let call = tracker.begin_call();
        tracker.record_rate_limit();
        tracker.finish_call(call, false, Duration::from_secs(1));
        tracker.reset();
        assert_eq!(tracker.snapshot(), ApiStats::default());
    }

    #[test]
    fn test_call_spanning_reset_is_not_counted() {
        let tracker = StatsTracker::new();
        let before = tracker.begin_call();
        tracker.reset();
        tracker.finish_call(before, true, Duration::from_secs(1));
        assert_eq!(tracker.snapshot(), ApiStats::default());

        let after = tracker.begin_call();
        tracker.finish_call(after, true, Duration::from_secs(2));
        let s = tracker.snapshot();
        assert_eq!(s.total_calls, 1);
        assert_eq!(s.successful_calls, 1);
        assert!(s.successful_calls + s.failed_calls <= s.total_calls);
    }

    #[test]
    fn test_concurrent_updates() {
        let tracker = Arc::new(StatsTracker::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let t = Arc::clone(&tracker);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let call = t.begin_call();
                        t.record_rate_limit();
                        t.finish_call(call, true, Duration::from_millis(1));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let s = tracker.snapshot();
        assert_eq!(s.total_calls, 800);
        assert_eq!(s.successful_calls, 800);
        assert_eq!(s.rate_limit_hits, 800);
        assert_eq!(s.total_time, Duration::from_millis(800));
    }
}
