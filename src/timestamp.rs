//! Parsing of the fixed `YYYY-MM-DD HH:MM:SS UTC` timestamp text.

use crate::errors::MeasurementError;
use chrono::{DateTime, NaiveDateTime, TimeZone, Timelike, Utc};

/// Absolute point in time. Measurements only ever carry UTC instants.
pub type Instant = DateTime<Utc>;

/// The textual shape every timestamp handed to the core must have.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const ZONE_SUFFIX: &str = " UTC";

// Byte offsets of the fixed separators in "2025-04-16 19:23:00".
const SEPARATORS: [(usize, u8); 5] = [(4, b'-'), (7, b'-'), (10, b' '), (13, b':'), (16, b':')];
const BODY_LEN: usize = 19;

/// Parses `"2025-04-16 19:23:00 UTC"` into a UTC instant.
///
/// The calendar fields are taken as UTC with no local-zone inference. Any
/// deviation from the fixed shape, or a field outside its calendar range
/// (month 13, day 32, 30 February, second 60), is an `InvalidTimestamp`.
pub fn parse_timestamp(text: &str) -> Result<Instant, MeasurementError> {
    let body = text
        .strip_suffix(ZONE_SUFFIX)
        .ok_or_else(|| MeasurementError::invalid_timestamp(text, "missing trailing ' UTC' zone marker"))?;

    check_shape(body).map_err(|message| MeasurementError::invalid_timestamp(text, message))?;

    let naive = NaiveDateTime::parse_from_str(body, TIMESTAMP_FORMAT)
        .map_err(|e| MeasurementError::invalid_timestamp(text, e.to_string()))?;

    // chrono accepts ":60" as a leap second; the source format never emits one.
    if naive.nanosecond() >= 1_000_000_000 {
        return Err(MeasurementError::invalid_timestamp(text, "second out of range"));
    }

    Ok(Utc.from_utc_datetime(&naive))
}

/// Formats an instant back into the canonical timestamp text.
pub fn format_timestamp(instant: &Instant) -> String {
    format!("{}{}", instant.format(TIMESTAMP_FORMAT), ZONE_SUFFIX)
}

fn check_shape(body: &str) -> Result<(), &'static str> {
    let bytes = body.as_bytes();
    if bytes.len() != BODY_LEN {
        return Err("expected 'YYYY-MM-DD HH:MM:SS'");
    }
    for (i, b) in bytes.iter().enumerate() {
        match SEPARATORS.iter().find(|(pos, _)| *pos == i) {
            Some((_, sep)) if b != sep => return Err("unexpected separator"),
            Some(_) => {}
            None if !b.is_ascii_digit() => return Err("non-digit in date or time field"),
            None => {}
        }
    }
    Ok(())
}
