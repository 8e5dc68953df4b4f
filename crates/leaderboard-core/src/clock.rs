//! Clock abstraction for determinism.
//!
//! Event timestamps and outbox scheduling both read time through [`Clock`],
//! so tests can pin or advance it explicitly.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

/// Abstraction over system time for deterministic behavior.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock that delegates to the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Returns `at + delay`, saturating at the maximum representable timestamp.
#[must_use]
pub fn after(at: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(delay)
        .ok()
        .and_then(|delta| at.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_after_adds_delay() {
        let at = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();

        let later = after(at, Duration::from_millis(1500));

        assert_eq!((later - at).num_milliseconds(), 1500);
    }

    #[test]
    fn test_after_saturates_on_overflow() {
        let at = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();

        assert_eq!(after(at, Duration::MAX), DateTime::<Utc>::MAX_UTC);
    }
}
