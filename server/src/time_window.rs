//! Timestamp parsing and scheduling rules for events and ticket issuance.
//!
//! Inbound timestamps use the fixed UTC wall-clock form `YYYY-MM-DD HH:MM:SS`
//! with no offset. Timestamps read back from the store carry a trailing
//! numeric offset (`2025-12-09 18:05:00+00`) and are only ever rendered for
//! display.

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

/// Wall-clock format accepted on every inbound timestamp.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DISPLAY_FORMAT: &str = "%-d %b, %Y %l:%M %p UTC";

/// Which end of an event window a violation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowBound {
    Start,
    End,
}

impl std::fmt::Display for WindowBound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WindowBound::Start => write!(f, "start"),
            WindowBound::End => write!(f, "end"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimeWindowError {
    #[error("Invalid date format: {0}")]
    MalformedTimestamp(String),

    #[error("Event {0} date/time has already passed")]
    AlreadyPassed(WindowBound),

    #[error("Event end date/time cannot be before start date/time")]
    InvalidOrder,

    #[error("Event expiry date/time must be after the event ends")]
    ExpiryTooEarly,

    #[error("Event has expired, ticket cannot be created")]
    EventExpired,
}

/// A validated event schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventWindow {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Parses a `YYYY-MM-DD HH:MM:SS` UTC timestamp.
///
/// The shape is checked byte by byte before chrono sees it, since chrono
/// tolerates single-digit fields that this format does not allow.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, TimeWindowError> {
    let malformed = || TimeWindowError::MalformedTimestamp(value.to_string());

    if !has_canonical_shape(value) {
        return Err(malformed());
    }

    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| malformed())
}

fn has_canonical_shape(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() != 19 {
        return false;
    }
    bytes.iter().enumerate().all(|(i, b)| match i {
        4 | 7 => *b == b'-',
        10 => *b == b' ',
        13 | 16 => *b == b':',
        _ => b.is_ascii_digit(),
    })
}

/// Renders an instant in the canonical inbound form.
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.format(TIMESTAMP_FORMAT).to_string()
}

/// Validates an event schedule against `now`.
///
/// Checks run in a fixed order: start in the past, end in the past, end
/// before start, expiry before end. Equal instants pass every ordering check.
pub fn validate_event_window(
    starts_at: &str,
    ends_at: &str,
    expires_at: &str,
    now: DateTime<Utc>,
) -> Result<EventWindow, TimeWindowError> {
    let window = EventWindow {
        starts_at: parse_timestamp(starts_at)?,
        ends_at: parse_timestamp(ends_at)?,
        expires_at: parse_timestamp(expires_at)?,
    };

    if window.starts_at < now {
        return Err(TimeWindowError::AlreadyPassed(WindowBound::Start));
    }
    if window.ends_at < now {
        return Err(TimeWindowError::AlreadyPassed(WindowBound::End));
    }
    if window.ends_at < window.starts_at {
        return Err(TimeWindowError::InvalidOrder);
    }
    if window.expires_at < window.ends_at {
        return Err(TimeWindowError::ExpiryTooEarly);
    }

    Ok(window)
}

/// Rejects issuance once the event's expiry has passed.
pub fn validate_ticket_issuance(
    event_expiry: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), TimeWindowError> {
    if now > event_expiry {
        return Err(TimeWindowError::EventExpired);
    }
    Ok(())
}

/// Parses a store timestamp, with or without a trailing numeric offset.
///
/// The offset is discarded: the store always returns UTC.
pub fn parse_store_timestamp(value: &str) -> Result<DateTime<Utc>, TimeWindowError> {
    NaiveDateTime::parse_from_str(strip_offset(value.trim()), "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| TimeWindowError::MalformedTimestamp(value.to_string()))
}

fn strip_offset(value: &str) -> &str {
    // The date part contains '-', so only look past it.
    match value.get(10..).and_then(|time| time.find(|c: char| c == '+' || c == '-')) {
        Some(pos) => &value[..10 + pos],
        None => value,
    }
}

/// Renders a store timestamp as e.g. `9 Dec, 2025  6:05 PM UTC`.
///
/// Never fails: anything unparseable renders as an empty string.
pub fn format_display(value: &str) -> String {
    match parse_store_timestamp(value) {
        Ok(instant) => display_instant(instant),
        Err(_) => String::new(),
    }
}

/// Renders an instant in the 12-hour display form.
fn display_instant(instant: DateTime<Utc>) -> String {
    instant.format(DISPLAY_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn at(value: &str) -> DateTime<Utc> {
        parse_timestamp(value).unwrap()
    }

    #[test]
    fn test_parse_timestamp_accepts_canonical_form() {
        let parsed = at("2099-01-01 10:00:00");
        assert_eq!(format_timestamp(parsed), "2099-01-01 10:00:00");
    }

    #[test]
    fn test_parse_timestamp_rejects_other_shapes() {
        for bad in [
            "",
            "2099-01-01",
            "2099-1-01 10:00:00",
            "2099-01-01T10:00:00",
            "2099-01-01 10:00:00+00",
            "2099-13-01 10:00:00",
            "2099-02-30 10:00:00",
            "tomorrow at ten",
        ] {
            assert_eq!(
                parse_timestamp(bad),
                Err(TimeWindowError::MalformedTimestamp(bad.to_string())),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_window_boundaries_are_inclusive() {
        let now = at("2030-01-01 00:00:00");
        let window = validate_event_window(
            "2030-01-01 00:00:00",
            "2030-01-01 00:00:00",
            "2030-01-01 00:00:00",
            now,
        )
        .unwrap();
        assert_eq!(window.starts_at, now);
        assert_eq!(window.expires_at, now);
    }

    #[test]
    fn test_window_violations_fire_specific_errors() {
        let now = at("2030-06-01 12:00:00");

        assert_eq!(
            validate_event_window("2030-05-01 10:00:00", "2030-07-01 10:00:00", "2030-07-02 10:00:00", now),
            Err(TimeWindowError::AlreadyPassed(WindowBound::Start))
        );
        assert_eq!(
            validate_event_window("2030-07-01 10:00:00", "2030-05-01 10:00:00", "2030-07-02 10:00:00", now),
            Err(TimeWindowError::AlreadyPassed(WindowBound::End))
        );
        assert_eq!(
            validate_event_window("2030-07-01 10:00:00", "2030-07-01 09:00:00", "2030-07-02 10:00:00", now),
            Err(TimeWindowError::InvalidOrder)
        );
        assert_eq!(
            validate_event_window("2030-07-01 10:00:00", "2030-07-01 18:00:00", "2030-07-01 17:59:59", now),
            Err(TimeWindowError::ExpiryTooEarly)
        );
    }

    #[test]
    fn test_malformed_expiry_is_reported_before_ordering() {
        let now = at("2030-06-01 12:00:00");
        assert_eq!(
            validate_event_window("2030-05-01 10:00:00", "2030-07-01 10:00:00", "soon", now),
            Err(TimeWindowError::MalformedTimestamp("soon".to_string()))
        );
    }

    #[test]
    fn test_ticket_issuance_until_expiry() {
        let expiry = at("2030-01-02 00:00:00");
        assert!(validate_ticket_issuance(expiry, expiry).is_ok());
        assert_eq!(
            validate_ticket_issuance(expiry, expiry + Duration::seconds(1)),
            Err(TimeWindowError::EventExpired)
        );
    }

    #[test]
    fn test_format_display() {
        assert_eq!(format_display("2025-12-09 18:05:00+00"), "9 Dec, 2025  6:05 PM UTC");
        assert_eq!(format_display("2025-12-19 22:30:00+00"), "19 Dec, 2025 10:30 PM UTC");
        assert_eq!(format_display("2025-12-09 00:15:00.25+00"), "9 Dec, 2025 12:15 AM UTC");
        assert_eq!(format_display("2025-12-09 18:05:00"), "9 Dec, 2025  6:05 PM UTC");
        assert_eq!(format_display("not a date"), "");
        assert_eq!(format_display(""), "");
    }

    #[test]
    fn test_parse_store_timestamp_drops_offset() {
        assert_eq!(
            parse_store_timestamp("2099-01-02 00:00:00+00").unwrap(),
            at("2099-01-02 00:00:00")
        );
    }

    fn instant() -> impl Strategy<Value = DateTime<Utc>> {
        // 2030-01-01 .. 2040-01-01, whole seconds
        (1_893_456_000i64..2_208_988_800i64)
            .prop_map(|secs| DateTime::from_timestamp(secs, 0).unwrap())
    }

    proptest! {
        #[test]
        fn prop_ordered_future_windows_validate(
            start in instant(),
            to_end in 0i64..1_000_000,
            to_expiry in 0i64..1_000_000,
        ) {
            let end = start + Duration::seconds(to_end);
            let expiry = end + Duration::seconds(to_expiry);
            let now = start - Duration::seconds(1);

            let result = validate_event_window(
                &format_timestamp(start),
                &format_timestamp(end),
                &format_timestamp(expiry),
                now,
            );
            prop_assert!(result.is_ok());
        }

        #[test]
        fn prop_end_before_start_is_invalid_order(
            start in instant(),
            gap in 1i64..1_000_000,
        ) {
            let end = start - Duration::seconds(gap);
            let now = end - Duration::seconds(1);

            let result = validate_event_window(
                &format_timestamp(start),
                &format_timestamp(end),
                &format_timestamp(start),
                now,
            );
            prop_assert_eq!(result, Err(TimeWindowError::InvalidOrder));
        }

        #[test]
        fn prop_expiry_before_end_is_too_early(
            start in instant(),
            to_end in 1i64..1_000_000,
            short in 1i64..1_000_000,
        ) {
            let end = start + Duration::seconds(to_end);
            let expiry = end - Duration::seconds(short.min(to_end));
            let now = start - Duration::seconds(1);

            let result = validate_event_window(
                &format_timestamp(start),
                &format_timestamp(end),
                &format_timestamp(expiry),
                now,
            );
            prop_assert_eq!(result, Err(TimeWindowError::ExpiryTooEarly));
        }
    }
}
