//! Clock rollback detection.
//!
//! Short license windows are commonly stretched by winding the system clock
//! back. The guard remembers the latest wall-clock reading it has seen and
//! refuses any reading strictly earlier than that.

use crate::clock::{Clock, SystemClock};
use crate::errors::TamperSignal;
use crate::KeywardError;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use std::sync::{Arc, Mutex};

static SHARED: Lazy<Arc<TimeGuard>> = Lazy::new(|| Arc::new(TimeGuard::new(Arc::new(SystemClock))));

/// Monotonic wall-clock checkpoint, safe to share across threads.
pub struct TimeGuard {
    clock: Arc<dyn Clock>,
    last_observed: Mutex<Option<DateTime<Utc>>>,
}

impl TimeGuard {
    /// Create a guard with its own checkpoint.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            last_observed: Mutex::new(None),
        }
    }

    /// The process-wide guard on the system clock, shared by every session
    /// that does not inject its own.
    pub fn shared() -> Arc<TimeGuard> {
        Arc::clone(&SHARED)
    }

    /// Read the clock and compare against the checkpoint.
    ///
    /// Passes (and advances the checkpoint) when there is no previous reading
    /// or the new reading is not earlier. A rollback leaves the checkpoint
    /// untouched.
    pub fn check(&self) -> Result<(), KeywardError> {
        let mut last = self
            .last_observed
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let now = self.clock.now_utc();

        if let Some(previous) = *last {
            if now < previous {
                tracing::warn!(
                    previous = %previous.to_rfc3339(),
                    observed = %now.to_rfc3339(),
                    "clock rollback detected"
                );
                return Err(KeywardError::TamperDetected(TamperSignal::ClockRollback {
                    previous,
                    observed: now,
                }));
            }
        }

        *last = Some(now);
        Ok(())
    }

    /// The latest accepted reading, if any.
    pub fn last_observed(&self) -> Option<DateTime<Utc>> {
        *self
            .last_observed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for TimeGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeGuard")
            .field("last_observed", &self.last_observed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use chrono::Duration;
    use std::thread;

    fn guard_at(rfc3339: &str) -> (Arc<MockClock>, TimeGuard) {
        let clock = Arc::new(MockClock::from_rfc3339(rfc3339));
        let guard = TimeGuard::new(clock.clone());
        (clock, guard)
    }

    #[test]
    fn first_check_passes() {
        let (_, guard) = guard_at("2025-01-15T12:00:00Z");
        assert!(guard.last_observed().is_none());
        assert!(guard.check().is_ok());
        assert!(guard.last_observed().is_some());
    }

    #[test]
    fn same_instant_passes() {
        let (_, guard) = guard_at("2025-01-15T12:00:00Z");
        guard.check().unwrap();
        assert!(guard.check().is_ok());
    }

    #[test]
    fn forward_time_passes_and_moves_checkpoint() {
        let (clock, guard) = guard_at("2025-01-15T12:00:00Z");
        guard.check().unwrap();
        clock.advance(Duration::minutes(5));
        assert!(guard.check().is_ok());
        assert_eq!(
            guard.last_observed().unwrap().to_rfc3339(),
            "2025-01-15T12:05:00+00:00"
        );
    }

    #[test]
    fn rollback_fails_and_keeps_checkpoint() {
        let (clock, guard) = guard_at("2025-01-15T12:00:00Z");
        guard.check().unwrap();
        clock.advance(Duration::seconds(-1));

        let result = guard.check();
        assert!(matches!(
            result,
            Err(KeywardError::TamperDetected(TamperSignal::ClockRollback { .. }))
        ));
        assert_eq!(
            guard.last_observed().unwrap().to_rfc3339(),
            "2025-01-15T12:00:00+00:00"
        );

        // Still rejected until the clock catches up again.
        assert!(guard.check().is_err());
        clock.advance(Duration::seconds(1));
        assert!(guard.check().is_ok());
    }

    #[test]
    fn concurrent_checks_on_steady_clock_all_pass() {
        let (_, guard) = guard_at("2025-01-15T12:00:00Z");
        let guard = Arc::new(guard);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let guard = Arc::clone(&guard);
                thread::spawn(move || (0..50).all(|_| guard.check().is_ok()))
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }

    #[test]
    fn shared_guard_is_a_singleton() {
        assert!(Arc::ptr_eq(&TimeGuard::shared(), &TimeGuard::shared()));
    }
}
