//! Calendar-day normalisation for shipment dates.
//!
//! The backend stores delivery and processing dates as plain days. Edited
//! rows may carry either a `YYYY-MM-DD` string or a full timestamp with an
//! offset; a timestamp is reduced to the day it names in its own offset,
//! never to the UTC day.

use chrono::{DateTime, NaiveDate};

use crate::error::CoreError;
use crate::types::CalendarDay;

/// Canonical wire format for calendar days.
pub const CANONICAL_FORMAT: &str = "%Y-%m-%d";

/// Parse a calendar day from either `YYYY-MM-DD` or an RFC 3339 timestamp.
pub fn parse_calendar_day(raw: &str) -> Result<CalendarDay, CoreError> {
    let raw = raw.trim();
    if let Ok(day) = NaiveDate::parse_from_str(raw, CANONICAL_FORMAT) {
        return Ok(day);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.date_naive());
    }
    Err(CoreError::Validation(format!(
        "'{raw}' is not a calendar day (expected YYYY-MM-DD)"
    )))
}

/// Render a day in the canonical wire format.
pub fn format_calendar_day(day: CalendarDay) -> String {
    day.format(CANONICAL_FORMAT).to_string()
}

/// Serde adapter for `Option<CalendarDay>` fields.
///
/// Serializes `None` as `null`; accepts `null`, an empty string, a plain
/// day or a timestamp on input.
pub mod optional_day {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::types::CalendarDay;

    pub fn serialize<S: Serializer>(
        value: &Option<CalendarDay>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(day) => serializer.serialize_str(&super::format_calendar_day(*day)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<CalendarDay>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => super::parse_calendar_day(text)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde::{Deserialize, Serialize};

    fn day(y: i32, m: u32, d: u32) -> CalendarDay {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_plain_day() {
        assert_eq!(parse_calendar_day("2024-03-10").unwrap(), day(2024, 3, 10));
    }

    #[test]
    fn trims_whitespace() {
        assert_eq!(parse_calendar_day("  2024-03-10 ").unwrap(), day(2024, 3, 10));
    }

    #[test]
    fn timestamp_keeps_local_day_for_positive_offset() {
        // 00:30 at +02:00 is still the 9th in UTC.
        let parsed = parse_calendar_day("2024-03-10T00:30:00+02:00").unwrap();
        assert_eq!(parsed, day(2024, 3, 10));
    }

    #[test]
    fn timestamp_keeps_local_day_for_negative_offset() {
        // 23:30 at -05:00 is already the 11th in UTC.
        let parsed = parse_calendar_day("2024-03-10T23:30:00-05:00").unwrap();
        assert_eq!(parsed, day(2024, 3, 10));
    }

    #[test]
    fn rejects_garbage() {
        assert_matches!(parse_calendar_day("10/03/2024"), Err(CoreError::Validation(_)));
        assert_matches!(parse_calendar_day(""), Err(CoreError::Validation(_)));
    }

    #[test]
    fn formats_canonically() {
        assert_eq!(format_calendar_day(day(2024, 1, 5)), "2024-01-05");
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Holder {
        #[serde(default, with = "optional_day")]
        day: Option<CalendarDay>,
    }

    #[test]
    fn serde_adapter_accepts_timestamps_and_blanks() {
        let h: Holder = serde_json::from_str(r#"{"day":"2024-06-01T22:00:00+01:00"}"#).unwrap();
        assert_eq!(h.day, Some(day(2024, 6, 1)));

        let h: Holder = serde_json::from_str(r#"{"day":""}"#).unwrap();
        assert_eq!(h.day, None);

        let h: Holder = serde_json::from_str(r#"{"day":null}"#).unwrap();
        assert_eq!(h.day, None);

        let h: Holder = serde_json::from_str("{}").unwrap();
        assert_eq!(h.day, None);
    }

    #[test]
    fn serde_adapter_writes_null_and_canonical_day() {
        let json = serde_json::to_value(Holder { day: None }).unwrap();
        assert_eq!(json, serde_json::json!({ "day": null }));

        let json = serde_json::to_value(Holder { day: Some(day(2023, 12, 31)) }).unwrap();
        assert_eq!(json, serde_json::json!({ "day": "2023-12-31" }));
    }

    #[test]
    fn serde_adapter_rejects_invalid_text() {
        let result: Result<Holder, _> = serde_json::from_str(r#"{"day":"tomorrow"}"#);
        assert!(result.is_err());
    }
}
