//! Calendar arithmetic for the day → week → month rollup.
//!
//! All functions are pure; the current date always comes from a `Clock`.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Maintenance only runs on the first day of each 7-day cycle.
pub const TRIGGER_WEEKDAY: Weekday = Weekday::Mon;

/// Monthly archiving is evaluated only within this many days of a month's start.
pub const ARCHIVE_WINDOW_DAYS: u32 = 7;

/// An inclusive [Monday, Sunday] range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekRange {
    pub monday: NaiveDate,
    pub sunday: NaiveDate,
}

impl WeekRange {
    pub fn containing(date: NaiveDate) -> Self {
        let monday = date - Duration::days(date.weekday().num_days_from_monday() as i64);
        Self {
            monday,
            sunday: monday + Duration::days(6),
        }
    }

    /// The last complete week strictly before the week containing `today`.
    pub fn previous(today: NaiveDate) -> Self {
        Self::containing(today - Duration::days(7))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.monday <= date && date <= self.sunday
    }
}

pub fn is_trigger_day(today: NaiveDate) -> bool {
    today.weekday() == TRIGGER_WEEKDAY
}

/// `(year, month)` of the month that concluded most recently, but only while
/// `today` is inside the archive window.
pub fn concluded_month(today: NaiveDate) -> Option<(i32, u32)> {
    if today.day() > ARCHIVE_WINDOW_DAYS {
        return None;
    }
    let last_of_previous = today.with_day(1)? - Duration::days(1);
    Some((last_of_previous.year(), last_of_previous.month()))
}

pub fn month_key(year: i32, month: u32) -> String {
    format!("{year:04}-{month:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[rstest]
    #[case::monday(d(2026, 10, 19), d(2026, 10, 12))]
    #[case::sunday(d(2026, 10, 18), d(2026, 10, 5))]
    #[case::across_year(d(2026, 1, 5), d(2025, 12, 29))]
    fn previous_week_starts_on_monday(#[case] today: NaiveDate, #[case] monday: NaiveDate) {
        let week = WeekRange::previous(today);
        assert_eq!(week.monday, monday);
        assert_eq!(week.sunday, monday + Duration::days(6));
        assert_eq!(week.monday.weekday(), Weekday::Mon);
        assert!(!week.contains(today));
    }

    #[test]
    fn trigger_day_is_monday() {
        assert!(is_trigger_day(d(2026, 10, 19)));
        assert!(!is_trigger_day(d(2026, 10, 18)));
    }

    #[rstest]
    #[case::first(d(2026, 11, 2), Some((2026, 10)))]
    #[case::seventh(d(2026, 11, 7), Some((2026, 10)))]
    #[case::eighth(d(2026, 11, 8), None)]
    #[case::january(d(2027, 1, 4), Some((2026, 12)))]
    fn concluded_month_only_in_window(#[case] today: NaiveDate, #[case] expected: Option<(i32, u32)>) {
        assert_eq!(concluded_month(today), expected);
    }

    #[test]
    fn month_key_is_zero_padded() {
        assert_eq!(month_key(2026, 3), "2026-03");
    }
}
