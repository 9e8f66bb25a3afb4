use crate::errors::ParseError;
use crate::models::{RawRecord, ReadingValue};
use crate::timestamp::{format_timestamp, parse_timestamp};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

// Field spellings differ between the exporter and the raw sensor documents.
// The first non-null spelling found wins.
const TIMESTAMP_KEYS: &[&str] = &["timestamp", "Timestamp"];
const PM25_KEYS: &[&str] = &["pm25", "PM25", "pm2_5"];
const PM10_KEYS: &[&str] = &["pm10", "PM10"];
// Raw sensor documents nest readings as PM.PPM."25" / PM.PPM."10"
const NESTED_KEYS: &[&str] = &["PM", "pm"];
const PPM_KEYS: &[&str] = &["PPM", "ppm"];

fn first_present<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|key| object.get(*key)).find(|value| !value.is_null())
}

fn nested_readings(index: usize, object: &Map<String, Value>) -> Option<&Map<String, Value>> {
    let pm = first_present(object, NESTED_KEYS)?;
    let ppm = pm.as_object().and_then(|pm| first_present(pm, PPM_KEYS));
    match ppm.and_then(Value::as_object) {
        Some(readings) => Some(readings),
        None => {
            debug!("Record {} has a nested PM key without PPM readings, ignoring it", index);
            None
        }
    }
}

/// Reads one reading; a value of the wrong shape only blanks this field.
fn read_reading(index: usize, field: &str, object: &Map<String, Value>, keys: &[&str]) -> ReadingValue {
    match first_present(object, keys) {
        Some(value) => ReadingValue::deserialize(value).unwrap_or_else(|e| {
            warn!("Record {} has an unreadable {} value: {}", index, field, e);
            ReadingValue::Empty
        }),
        None => ReadingValue::Empty,
    }
}

fn read_field(
    index: usize,
    field: &str,
    object: &Map<String, Value>,
    flat_keys: &[&str],
    nested: Option<&Map<String, Value>>,
    nested_key: &str,
) -> ReadingValue {
    match (read_reading(index, field, object, flat_keys), nested) {
        (ReadingValue::Empty, Some(ppm)) => read_reading(index, field, ppm, &[nested_key]),
        (flat, _) => flat,
    }
}

/// Re-expresses RFC 3339 timestamps (as written by the history exporter) in
/// the canonical `YYYY-MM-DD HH:MM:SS UTC` text. Anything else is passed
/// through untouched and left for validation to reject.
///
/// The canonical text has whole-second resolution, so fractional seconds are
/// truncated. Readings taken within the same second then share an instant and
/// keep their batch order.
pub fn normalize_timestamp(value: Value) -> String {
    let text = match value {
        Value::String(s) => s,
        other => return other.to_string(),
    };

    if parse_timestamp(&text).is_ok() {
        return text;
    }
    match DateTime::parse_from_rfc3339(text.trim()) {
        Ok(dt) => format_timestamp(&dt.with_timezone(&Utc)),
        Err(_) => text,
    }
}

/// Normalises one JSON element into a `RawRecord`.
///
/// Each field is read on its own, so a malformed key blanks only that field
/// and validation reports it by name. Elements that are not objects become an
/// empty record, which the pipeline counts as dropped.
pub fn normalize_record(index: usize, value: Value) -> RawRecord {
    let Value::Object(object) = value else {
        warn!("Record {} is not a JSON object", index);
        return RawRecord::default();
    };

    let nested = nested_readings(index, &object);
    RawRecord {
        timestamp: first_present(&object, TIMESTAMP_KEYS).cloned().map(normalize_timestamp),
        pm25: read_field(index, "pm25", &object, PM25_KEYS, nested, "25"),
        pm10: read_field(index, "pm10", &object, PM10_KEYS, nested, "10"),
    }
}

pub fn parse_batch_value(value: Value, origin: &Path) -> Result<Vec<RawRecord>, ParseError> {
    let elements = match value {
        Value::Array(elements) => elements,
        _ => return Err(ParseError::NotAnArray { path: origin.to_path_buf() }),
    };

    Ok(elements
        .into_iter()
        .enumerate()
        .map(|(index, element)| normalize_record(index, element))
        .collect())
}

/// Reads a JSON array of records. `origin` is only used in error messages.
pub fn parse_batch_reader<R: Read>(reader: R, origin: &Path) -> Result<Vec<RawRecord>, ParseError> {
    let value: Value = serde_json::from_reader(reader).map_err(|e| ParseError::JsonParseError {
        path: origin.to_path_buf(),
        source: e,
    })?;
    parse_batch_value(value, origin)
}

pub fn parse_batch_file(file_path: &Path) -> Result<Vec<RawRecord>, ParseError> {
    debug!("Reading batch file {}", file_path.display());
    let file = File::open(file_path).map_err(|e| ParseError::IoError {
        path: file_path.to_path_buf(),
        source: e,
    })?;
    let records = parse_batch_reader(BufReader::new(file), file_path)?;
    debug!("Read {} records from {}", records.len(), file_path.display());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Vec<RawRecord> {
        parse_batch_reader(json.as_bytes(), Path::new("test.json")).unwrap()
    }

    #[test]
    fn test_frontend_field_names() {
        let records = parse(r#"[{ "Timestamp": "2025-04-16 19:23:00 UTC", "PM25": 12.0, "PM10": 20 }]"#);
        assert_eq!(records, vec![RawRecord::new("2025-04-16 19:23:00 UTC", 12.0, 20.0)]);
    }

    #[test]
    fn test_exporter_field_names_and_rfc3339() {
        let records = parse(r#"[{ "timestamp": "2025-04-16T19:23:00Z", "pm25": 8.5, "pm10": "11,5" }]"#);
        assert_eq!(records, vec![RawRecord::new("2025-04-16 19:23:00 UTC", 8.5, 11.5)]);
    }

    #[test]
    fn test_rfc3339_offset_converted_to_utc() {
        assert_eq!(
            normalize_timestamp(Value::String("2025-04-17T02:23:00+07:00".to_string())),
            "2025-04-16 19:23:00 UTC"
        );
    }

    #[test]
    fn test_nested_sensor_document() {
        let records = parse(
            r#"[{ "Timestamp": "2025-04-16 19:23:00 UTC", "PM": { "PPM": { "25": 14, "10": 22.5 } } }]"#,
        );
        assert_eq!(records, vec![RawRecord::new("2025-04-16 19:23:00 UTC", 14.0, 22.5)]);
    }

    #[test]
    fn test_missing_values_left_empty() {
        let records = parse(r#"[{ "timestamp": "2025-04-16 19:23:00 UTC", "pm25": null }]"#);
        assert_eq!(records[0].pm25, ReadingValue::Empty);
        assert_eq!(records[0].pm10, ReadingValue::Empty);
    }

    #[test]
    fn test_unreadable_element_becomes_empty_record() {
        let records = parse(r#"[42, { "pm25": { "bad": true } }, { "timestamp": 1700000000, "pm25": 1, "pm10": 1 }]"#);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0], RawRecord::default());
        assert_eq!(records[1], RawRecord::default());
        assert_eq!(records[2].timestamp.as_deref(), Some("1700000000"));
    }

    #[test]
    fn test_bad_key_only_blanks_its_own_field() {
        let records = parse(
            r#"[
                { "Timestamp": "2025-04-16 19:23:00 UTC", "timestamp": "2025-04-16 19:23:00 UTC", "PM25": 9, "PM10": 14 },
                { "Timestamp": "2025-04-16 19:24:00 UTC", "PM25": 10, "PM10": 15, "PM": "legacy" },
                { "Timestamp": "2025-04-16 19:25:00 UTC", "PM25": [1, 2], "PM10": 16 }
            ]"#,
        );
        assert_eq!(records[0], RawRecord::new("2025-04-16 19:23:00 UTC", 9.0, 14.0));
        assert_eq!(records[1], RawRecord::new("2025-04-16 19:24:00 UTC", 10.0, 15.0));
        assert_eq!(records[2].timestamp.as_deref(), Some("2025-04-16 19:25:00 UTC"));
        assert_eq!(records[2].pm25, ReadingValue::Empty);
        assert_eq!(records[2].pm10, ReadingValue::Number(16.0));
    }

    #[test]
    fn test_null_spelling_falls_through_to_next() {
        let records = parse(r#"[{ "timestamp": null, "Timestamp": "2025-04-16 19:23:00 UTC", "pm25": 3, "pm10": 4 }]"#);
        assert_eq!(records[0], RawRecord::new("2025-04-16 19:23:00 UTC", 3.0, 4.0));
    }

    #[test]
    fn test_fractional_seconds_truncated() {
        assert_eq!(
            normalize_timestamp(Value::String("2025-04-16T19:23:00.987654321Z".to_string())),
            "2025-04-16 19:23:00 UTC"
        );
    }

    #[test]
    fn test_non_array_rejected() {
        let result = parse_batch_reader(r#"{ "data": [] }"#.as_bytes(), Path::new("x.json"));
        assert!(matches!(result, Err(ParseError::NotAnArray { .. })));

        let result = parse_batch_reader("[".as_bytes(), Path::new("x.json"));
        assert!(matches!(result, Err(ParseError::JsonParseError { .. })));
    }

    #[test]
    fn test_missing_file() {
        let result = parse_batch_file(Path::new("/nonexistent/history24h.json"));
        assert!(matches!(result, Err(ParseError::IoError { .. })));
    }
}
