use chrono::{Datelike, Duration, NaiveDate, Weekday};

fn is_working_day(day: NaiveDate) -> bool {
    !matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Counts Monday–Friday days between `start` and `end` inclusive.
/// Returns 0.0 when `start > end` (that case is itself a validation error
/// upstream).
pub fn working_days(start: NaiveDate, end: NaiveDate) -> f64 {
    if start > end {
        return 0.0;
    }
    let mut count = 0u32;
    let mut day = start;
    loop {
        if is_working_day(day) {
            count += 1;
        }
        if day == end {
            break;
        }
        day = match day.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }
    count as f64
}

/// Working days of [start, end] that fall inside the given calendar month.
/// Used to prorate the monthly annual-leave cap when a request spans months.
pub fn working_days_in_month(start: NaiveDate, end: NaiveDate, year: i32, month: u32) -> f64 {
    let Some(month_start) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return 0.0;
    };
    let month_end = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .map(|d| d - Duration::days(1));
    let Some(month_end) = month_end else {
        return 0.0;
    };
    working_days(start.max(month_start), end.min(month_end))
}

/// Inclusive calendar-day span; 0 when `start > end`.
pub fn calendar_days(start: NaiveDate, end: NaiveDate) -> i64 {
    if start > end {
        return 0;
    }
    (end - start).num_days() + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn single_weekday_counts_one() {
        // 2026-01-05 is a Monday
        assert_eq!(working_days(date(2026, 1, 5), date(2026, 1, 5)), 1.0);
    }

    #[test]
    fn weekend_days_are_excluded() {
        // Mon 2026-01-05 .. Sun 2026-01-11 covers one full week
        assert_eq!(working_days(date(2026, 1, 5), date(2026, 1, 11)), 5.0);
        // Sat..Sun only
        assert_eq!(working_days(date(2026, 1, 10), date(2026, 1, 11)), 0.0);
    }

    #[test]
    fn range_spanning_a_weekend() {
        // Fri 2026-01-09 .. Mon 2026-01-12
        assert_eq!(working_days(date(2026, 1, 9), date(2026, 1, 12)), 2.0);
    }

    #[test]
    fn inverted_range_counts_zero() {
        assert_eq!(working_days(date(2026, 1, 12), date(2026, 1, 9)), 0.0);
    }

    #[test]
    fn month_clipping() {
        // Thu 2026-01-29 .. Tue 2026-02-03: Jan part = Thu+Fri, Feb part = Mon+Tue
        let (s, e) = (date(2026, 1, 29), date(2026, 2, 3));
        assert_eq!(working_days_in_month(s, e, 2026, 1), 2.0);
        assert_eq!(working_days_in_month(s, e, 2026, 2), 2.0);
        assert_eq!(working_days_in_month(s, e, 2026, 3), 0.0);
    }

    #[test]
    fn december_clipping_does_not_overflow() {
        let (s, e) = (date(2026, 12, 30), date(2027, 1, 4));
        // Wed 2026-12-30, Thu 2026-12-31
        assert_eq!(working_days_in_month(s, e, 2026, 12), 2.0);
    }

    #[test]
    fn calendar_span_is_inclusive() {
        assert_eq!(calendar_days(date(2026, 1, 1), date(2026, 3, 31)), 90);
        assert_eq!(calendar_days(date(2026, 1, 1), date(2026, 1, 1)), 1);
    }
}
