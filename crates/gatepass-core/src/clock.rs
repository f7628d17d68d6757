//! Time source and calendar-day helpers.

use crate::Interface;
use chrono::{DateTime, FixedOffset, NaiveTime, TimeZone, Utc};

/// Source of the current time.
pub trait Clock: Interface {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Returns true when both instants fall on the same calendar date in `offset`.
#[must_use]
pub fn same_calendar_day(a: DateTime<Utc>, b: DateTime<Utc>, offset: FixedOffset) -> bool {
    a.with_timezone(&offset).date_naive() == b.with_timezone(&offset).date_naive()
}

/// Returns the instant at which the calendar day containing `now` began in `offset`.
#[must_use]
pub fn start_of_day(now: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
    let local_midnight = now
        .with_timezone(&offset)
        .date_naive()
        .and_time(NaiveTime::MIN);
    // A fixed offset has no gaps or folds, so the mapping is always single.
    offset
        .from_local_datetime(&local_midnight)
        .single()
        .map_or(now, |dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offset(hours: i32) -> FixedOffset {
        FixedOffset::east_opt(hours * 3600).unwrap()
    }

    #[test]
    fn test_same_calendar_day_in_offset() {
        let a = Utc.with_ymd_and_hms(2025, 6, 1, 17, 30, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap();
        // Both are 2025-06-02 at +07:00
        assert!(same_calendar_day(a, b, offset(7)));
        // But different days in UTC
        assert!(!same_calendar_day(a, b, offset(0)));
    }

    #[test]
    fn test_start_of_day() {
        let now = Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap();
        assert_eq!(
            start_of_day(now, offset(7)),
            Utc.with_ymd_and_hms(2025, 6, 1, 17, 0, 0).unwrap()
        );
        assert_eq!(
            start_of_day(now, offset(0)),
            Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_system_clock_advances() {
        let clock = SystemClock;
        let first = clock.now();
        assert!(clock.now() >= first);
    }
}
