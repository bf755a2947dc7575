//! Clock abstraction and date/time helpers
//!
//! Every "today" decision in the crate goes through a [`Clock`], which carries
//! both the current instant and the branch's UTC offset. Naive timestamps
//! from the remote API are interpreted in that same offset, so the client and
//! the remote always agree on which calendar day a check-in belongs to.

use chrono::{
    DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, Offset, SecondsFormat, TimeZone, Utc,
};
use std::sync::RwLock;

/// Source of the current time and the branch timezone
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;

    /// UTC offset of the branch
    fn offset(&self) -> FixedOffset;

    /// Current calendar date in the branch offset
    fn today(&self) -> NaiveDate {
        self.now().with_timezone(&self.offset()).date_naive()
    }
}

/// Wall clock backed by the system time
#[derive(Debug, Clone)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    /// Create a system clock; `None` uses the host's current local offset
    pub fn new(offset: Option<FixedOffset>) -> Self {
        Self {
            offset: offset.unwrap_or_else(|| Local::now().offset().fix()),
        }
    }

    /// Create a system clock from an offset expressed in minutes east of UTC
    pub fn with_offset_minutes(minutes: Option<i32>) -> Self {
        Self::new(minutes.and_then(offset_from_minutes))
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn offset(&self) -> FixedOffset {
        self.offset
    }
}

/// Manually driven clock for tests and replays
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
    offset: FixedOffset,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self {
            now: RwLock::new(now),
            offset,
        }
    }

    /// Fixed clock in UTC
    pub fn at(now: DateTime<Utc>) -> Self {
        Self::new(now, utc_offset())
    }

    /// Move the clock to a new instant
    pub fn set(&self, now: DateTime<Utc>) {
        match self.now.write() {
            Ok(mut guard) => *guard = now,
            Err(poisoned) => *poisoned.into_inner() = now,
        }
    }

    /// Advance the clock
    pub fn advance(&self, by: chrono::Duration) {
        let now = self.now();
        self.set(now + by);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn offset(&self) -> FixedOffset {
        self.offset
    }
}

/// The zero offset
pub fn utc_offset() -> FixedOffset {
    Utc.fix()
}

/// Build an offset from minutes east of UTC, `None` when out of range
pub fn offset_from_minutes(minutes: i32) -> Option<FixedOffset> {
    FixedOffset::east_opt(minutes.checked_mul(60)?)
}

/// Check whether a timestamp falls on the clock's current calendar date
pub fn is_today(timestamp: &DateTime<Utc>, clock: &dyn Clock) -> bool {
    timestamp.with_timezone(&clock.offset()).date_naive() == clock.today()
}

/// Like [`is_today`] for raw input; unparseable input is never today
pub fn is_today_str(input: &str, clock: &dyn Clock) -> bool {
    parse_timestamp(input, clock.offset()).is_some_and(|ts| is_today(&ts, clock))
}

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a timestamp string as sent by the remote API
///
/// Accepts RFC 3339 (any offset) and naive ISO-8601 date-times, which are
/// interpreted in `offset`. A bare date is taken as local midnight.
pub fn parse_timestamp(input: &str, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Some(ts.with_timezone(&Utc));
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(input, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;

    offset
        .from_local_datetime(&naive)
        .single()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Format a timestamp for the wire (RFC 3339, UTC)
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Fractional minutes from `from` to `to`
pub fn minutes_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 60_000.0
}

/// Format a duration in minutes for display: "45 min", "1h 5m"
pub fn format_duration(minutes: i64) -> String {
    let minutes = minutes.max(0);
    if minutes < 60 {
        return format!("{} min", minutes);
    }
    format!("{}h {}m", minutes / 60, minutes % 60)
}

/// Format a timestamp as HH:MM in the clock's offset
pub fn format_clock_time(timestamp: &DateTime<Utc>, clock: &dyn Clock) -> String {
    timestamp
        .with_timezone(&clock.offset())
        .format("%H:%M")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn kigali() -> FixedOffset {
        offset_from_minutes(120).unwrap()
    }

    fn clock_at(rfc3339: &str) -> FixedClock {
        let now = DateTime::parse_from_rfc3339(rfc3339)
            .unwrap()
            .with_timezone(&Utc);
        FixedClock::new(now, kigali())
    }

    #[test]
    fn test_is_today_ignores_time_of_day() {
        let clock = clock_at("2025-03-10T12:00:00+02:00");

        let early = parse_timestamp("2025-03-10T00:00:01", kigali()).unwrap();
        let late = parse_timestamp("2025-03-10T23:59:59", kigali()).unwrap();
        let yesterday = parse_timestamp("2025-03-09T23:59:59", kigali()).unwrap();
        let tomorrow = parse_timestamp("2025-03-11T00:00:00", kigali()).unwrap();

        assert!(is_today(&early, &clock));
        assert!(is_today(&late, &clock));
        assert!(!is_today(&yesterday, &clock));
        assert!(!is_today(&tomorrow, &clock));
    }

    #[test]
    fn test_is_today_uses_branch_offset() {
        // 23:30 UTC on the 9th is already the 10th in UTC+2
        let clock = clock_at("2025-03-10T08:00:00+02:00");
        let ts = DateTime::parse_from_rfc3339("2025-03-09T23:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert!(is_today(&ts, &clock));
    }

    #[test]
    fn test_is_today_str_rejects_garbage() {
        let clock = clock_at("2025-03-10T12:00:00+02:00");
        assert!(!is_today_str("", &clock));
        assert!(!is_today_str("not a date", &clock));
        assert!(!is_today_str("2025-13-45T99:00:00", &clock));
        assert!(is_today_str("2025-03-10 09:15:00.123456", &clock));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let offset = kigali();
        let expected = DateTime::parse_from_rfc3339("2025-03-10T07:15:00Z")
            .unwrap()
            .with_timezone(&Utc);

        assert_eq!(parse_timestamp("2025-03-10T09:15:00", offset), Some(expected));
        assert_eq!(parse_timestamp("2025-03-10 09:15:00", offset), Some(expected));
        assert_eq!(parse_timestamp("2025-03-10T09:15", offset), Some(expected));
        assert_eq!(parse_timestamp("2025-03-10T07:15:00Z", offset), Some(expected));
        assert_eq!(
            parse_timestamp("2025-03-10T09:15:00+02:00", offset),
            Some(expected)
        );
        assert_eq!(
            parse_timestamp("2025-03-10", offset),
            parse_timestamp("2025-03-10T00:00:00", offset)
        );
    }

    #[test]
    fn test_format_timestamp_round_trips() {
        let ts = Utc::now();
        let text = format_timestamp(&ts);
        assert_eq!(parse_timestamp(&text, kigali()), Some(ts));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0 min");
        assert_eq!(format_duration(45), "45 min");
        assert_eq!(format_duration(60), "1h 0m");
        assert_eq!(format_duration(125), "2h 5m");
        assert_eq!(format_duration(-3), "0 min");
    }

    #[test]
    fn test_format_clock_time() {
        let clock = clock_at("2025-03-10T12:00:00+02:00");
        let ts = parse_timestamp("2025-03-10T07:05:00Z", utc_offset()).unwrap();
        assert_eq!(format_clock_time(&ts, &clock), "09:05");
    }

    #[test]
    fn test_fixed_clock_advance() {
        let clock = clock_at("2025-03-10T23:30:00+02:00");
        let day = clock.today();
        clock.advance(Duration::minutes(45));
        assert_eq!(clock.today(), day.succ_opt().unwrap());
    }
}
