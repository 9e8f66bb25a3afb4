use crate::timestamp::Instant;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// Helper function to parse comma-decimal strings
// Sensor exports sometimes write "12,5" instead of "12.5"
pub fn parse_comma_decimal(s: &str) -> Result<f64, std::num::ParseFloatError> {
    s.replace(',', ".").parse::<f64>()
}

/// A concentration value as it arrived from the source, before validation.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ReadingValue {
    Number(f64),
    #[default]
    Empty,
    Text(String),
}

impl ReadingValue {
    /// The numeric value, if the source provided one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ReadingValue::Number(n) => Some(*n),
            ReadingValue::Empty | ReadingValue::Text(_) => None,
        }
    }
}

impl From<f64> for ReadingValue {
    fn from(value: f64) -> Self {
        ReadingValue::Number(value)
    }
}

// Handles quoted numbers, comma decimals, nulls and empty strings
impl<'de> Deserialize<'de> for ReadingValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ReadingValueVisitor;

        impl<'de> Visitor<'de> for ReadingValueVisitor {
            type Value = ReadingValue;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a number, numeric string, or null representing a concentration")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                let trimmed = value.trim().trim_matches('"');
                if trimmed.is_empty() {
                    Ok(ReadingValue::Empty)
                } else {
                    match parse_comma_decimal(trimmed) {
                        Ok(num) => Ok(ReadingValue::Number(num)),
                        Err(_) => Ok(ReadingValue::Text(trimmed.to_string())),
                    }
                }
            }

            fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(ReadingValue::Number(value))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(ReadingValue::Number(value as f64))
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(ReadingValue::Number(value as f64))
            }

            fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(ReadingValue::Text(value.to_string()))
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(ReadingValue::Empty)
            }

            fn visit_none<E>(self) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(ReadingValue::Empty)
            }

            fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                deserializer.deserialize_any(self)
            }
        }

        deserializer.deserialize_any(ReadingValueVisitor)
    }
}

/// One record as handed to the core by the boundary adapter, with field names
/// already normalised. Nothing here has been validated yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    pub timestamp: Option<String>,
    pub pm25: ReadingValue,
    pub pm10: ReadingValue,
}

impl RawRecord {
    pub fn new(timestamp: impl Into<String>, pm25: f64, pm10: f64) -> Self {
        Self {
            timestamp: Some(timestamp.into()),
            pm25: ReadingValue::Number(pm25),
            pm10: ReadingValue::Number(pm10),
        }
    }
}

/// A validated reading. `pm25` and `pm10` are finite and non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Measurement {
    pub instant: Instant,
    pub pm25: f64,
    pub pm10: f64,
}
