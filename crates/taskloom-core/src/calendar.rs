//! Business-day calendar arithmetic.
//!
//! Only Monday through Friday are working days; holidays and
//! per-person vacation calendars are not modeled (see GLOSSARY).

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// True if `date` falls on a Monday through Friday.
pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Number of business days between `from` (inclusive) and `to` (exclusive),
/// following `numpy.busday_count` semantics: negative when `to < from`.
pub fn busdays_between(from: NaiveDate, to: NaiveDate) -> i64 {
    if to == from {
        return 0;
    }
    if to > from {
        count_forward(from, to)
    } else {
        -count_forward(to, from)
    }
}

fn count_forward(from: NaiveDate, to: NaiveDate) -> i64 {
    let mut count = 0i64;
    let mut d = from;
    while d < to {
        if is_business_day(d) {
            count += 1;
        }
        d += Duration::days(1);
    }
    count
}

/// Offsets `date` by `days` business days, rolling forward to the next
/// business day first if `date` itself lands on a weekend (matching
/// `numpy.busday_offset(date, days, roll='forward')`).
pub fn busdays_offset(date: NaiveDate, days: i64) -> NaiveDate {
    let mut d = roll_forward(date);
    if days >= 0 {
        let mut remaining = days;
        while remaining > 0 {
            d += Duration::days(1);
            d = roll_forward(d);
            remaining -= 1;
        }
    } else {
        let mut remaining = -days;
        while remaining > 0 {
            d -= Duration::days(1);
            d = roll_backward(d);
            remaining -= 1;
        }
    }
    d
}

fn roll_forward(mut date: NaiveDate) -> NaiveDate {
    while !is_business_day(date) {
        date += Duration::days(1);
    }
    date
}

fn roll_backward(mut date: NaiveDate) -> NaiveDate {
    while !is_business_day(date) {
        date -= Duration::days(1);
    }
    date
}

/// Parses an ISO-8601 `YYYY-MM-DD` date, the only date format the input
/// grammar accepts.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn business_day_excludes_weekends() {
        assert!(is_business_day(d("2026-07-27"))); // Monday
        assert!(!is_business_day(d("2026-07-25"))); // Saturday
        assert!(!is_business_day(d("2026-07-26"))); // Sunday
    }

    #[test]
    fn busdays_between_same_week() {
        // Mon -> Fri is 4 business days.
        assert_eq!(busdays_between(d("2026-07-27"), d("2026-07-31")), 4);
    }

    #[test]
    fn busdays_between_spans_weekend() {
        // Fri -> Mon is 1 business day.
        assert_eq!(busdays_between(d("2026-07-31"), d("2026-08-03")), 1);
    }

    #[test]
    fn busdays_between_negative_when_reversed() {
        assert_eq!(
            busdays_between(d("2026-07-31"), d("2026-07-27")),
            -busdays_between(d("2026-07-27"), d("2026-07-31"))
        );
    }

    #[test]
    fn busdays_offset_skips_weekend() {
        // Friday + 1 business day = Monday.
        assert_eq!(busdays_offset(d("2026-07-31"), 1), d("2026-08-03"));
    }

    #[test]
    fn busdays_offset_rolls_weekend_start_forward() {
        // Saturday rolled forward to Monday before offsetting.
        assert_eq!(busdays_offset(d("2026-07-25"), 0), d("2026-07-27"));
    }

    #[test]
    fn busdays_offset_negative_steps_backward() {
        assert_eq!(busdays_offset(d("2026-08-03"), -1), d("2026-07-31"));
    }
}
