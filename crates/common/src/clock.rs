//! Wall-clock abstraction so generated data can be pinned in tests.

use chrono::{NaiveDate, NaiveDateTime};

pub trait Clock: Send + Sync {
    /// Current local date and time.
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Reads the host clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl FixedClock {
    /// Midday on the given date. Returns `None` for an invalid date.
    pub fn on(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .map(Self)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// ISO-8601 timestamp in the same shape the dashboard expects.
pub fn iso_timestamp(clock: &dyn Clock) -> String {
    clock.now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_is_stable() {
        let clock = FixedClock::on(2025, 3, 14).unwrap();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 3, 14).unwrap());
    }

    #[test]
    fn test_fixed_clock_rejects_invalid_dates() {
        assert!(FixedClock::on(2025, 2, 30).is_none());
    }

    #[test]
    fn test_iso_timestamp_format() {
        let clock = FixedClock::on(2025, 1, 2).unwrap();
        assert_eq!(iso_timestamp(&clock), "2025-01-02T12:00:00.000000");
    }
}
