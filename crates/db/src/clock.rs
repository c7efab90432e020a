//! Time source and ISO date helpers.

use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime,
    Time,
};

/// Source of "now" for date stamping and expiry calculations.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;

    fn today(&self) -> Date {
        self.now().date()
    }
}

/// Wall clock in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Clock pinned to a single instant, used to make expiry deterministic.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub OffsetDateTime);

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}

/// Formats a date the way the catalog stores it (`YYYY-MM-DD`).
pub fn format_date(date: Date) -> String {
    let format = format_description!("[year]-[month]-[day]");
    date.format(&format).unwrap_or_else(|_| date.to_string())
}

/// Parses a stored date into an instant.
///
/// Accepts `YYYY-MM-DD` (taken as midnight UTC) or a full RFC 3339 timestamp.
pub fn parse_instant(value: &str) -> Option<OffsetDateTime> {
    let value = value.trim();
    let format = format_description!("[year]-[month]-[day]");
    if let Ok(date) = Date::parse(value, &format) {
        return Some(date.with_time(Time::MIDNIGHT).assume_utc());
    }
    OffsetDateTime::parse(value, &Rfc3339).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn plain_dates_parse_as_utc_midnight() {
        let parsed = parse_instant("2024-03-05").unwrap();
        assert_eq!(parsed, datetime!(2024-03-05 00:00 UTC));
    }

    #[test]
    fn rfc3339_timestamps_are_accepted() {
        let parsed = parse_instant("2024-03-05T10:30:00Z").unwrap();
        assert_eq!(parsed, datetime!(2024-03-05 10:30 UTC));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_instant("next tuesday").is_none());
        assert!(parse_instant("").is_none());
    }

    #[test]
    fn format_pads_month_and_day() {
        assert_eq!(format_date(date!(2024 - 01 - 09)), "2024-01-09");
    }

    #[test]
    fn fixed_clock_reports_its_date() {
        let clock = FixedClock(datetime!(2030-06-15 18:45 UTC));
        assert_eq!(clock.today(), date!(2030 - 06 - 15));
    }
}
