use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading config file {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse JSON configuration in {path}: {source}")]
    JsonParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Configuration file not found at {path}")]
    NotFound { path: PathBuf },
    #[error("Invalid value '{value}' for {field}: {message}")]
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration parsing failed: {0}")]
    ConfigParse(#[from] ConfigError),
    #[error("Parsing failed: {0}")]
    Parse(#[from] ParseError),
    #[error("No batch files found under {path}")]
    NoInput { path: PathBuf },
    #[error("Failed to write CSV output: {0}")]
    CsvWrite(#[from] csv::Error),
    #[error("Failed to write JSON output: {0}")]
    JsonWrite(#[from] serde_json::Error),
    #[error("Failed to write output: {0}")]
    Io(#[from] io::Error),
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error reading data file {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("JSON parsing error in {path}: {source}")]
    JsonParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Expected a JSON array of records in {path}")]
    NotAnArray { path: PathBuf },
}

/// Reasons a single raw record is rejected, or a concentration is refused by
/// the AQI calculator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeasurementError {
    #[error("invalid timestamp '{value}': {message}")]
    InvalidTimestamp { value: String, message: String },
    #[error("{field} concentration {value} is outside the valid domain")]
    OutOfDomain { field: &'static str, value: f64 },
    #[error("missing or non-numeric field '{field}'")]
    MissingField { field: &'static str },
}

impl MeasurementError {
    pub(crate) fn invalid_timestamp(value: &str, message: impl Into<String>) -> Self {
        MeasurementError::InvalidTimestamp {
            value: value.to_string(),
            message: message.into(),
        }
    }
}
