//! Module for record validation logic.

use crate::errors::MeasurementError;
use crate::models::{Measurement, RawRecord, ReadingValue};
use crate::timestamp::{parse_timestamp, Instant};

/// Validates a raw record and turns it into a `Measurement`.
///
/// Checks, in order:
/// - timestamp is present and parses as `YYYY-MM-DD HH:MM:SS UTC`;
/// - PM2.5 is present, numeric, finite and non-negative;
/// - PM10 likewise.
///
/// The first failing check is returned.
pub fn validate_record(record: &RawRecord) -> Result<Measurement, MeasurementError> {
    let instant = validate_timestamp(record.timestamp.as_deref())?;
    let pm25 = validate_concentration("pm25", &record.pm25)?;
    let pm10 = validate_concentration("pm10", &record.pm10)?;

    Ok(Measurement { instant, pm25, pm10 })
}

pub fn validate_timestamp(timestamp: Option<&str>) -> Result<Instant, MeasurementError> {
    match timestamp {
        Some(text) => parse_timestamp(text),
        None => Err(MeasurementError::MissingField { field: "timestamp" }),
    }
}

/// Concentrations must be real numbers in µg/m³; negative readings are
/// physically invalid and are never clamped.
pub fn validate_concentration(field: &'static str, value: &ReadingValue) -> Result<f64, MeasurementError> {
    let number = value
        .as_number()
        .filter(|n| n.is_finite())
        .ok_or(MeasurementError::MissingField { field })?;

    if number < 0.0 {
        return Err(MeasurementError::OutOfDomain { field, value: number });
    }
    Ok(number)
}
