use crate::errors::ConfigError;
use crate::window::DEFAULT_MAX_POINTS;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::num::NonZeroUsize;
use std::path::Path;
use std::str::FromStr;

/// How the render-ready view is written out.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(ConfigError::InvalidValue {
                field: "output_format".to_string(),
                value: other.to_string(),
                message: "expected 'json' or 'csv'".to_string(),
            }),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Capacity of the recent-history window.
    #[serde(default = "default_max_points")]
    pub max_points: NonZeroUsize,
    /// chrono strftime pattern for the rendered time labels.
    #[serde(default = "default_time_label_format")]
    pub time_label_format: String,
    #[serde(default)]
    pub output_format: OutputFormat,
}

fn default_max_points() -> NonZeroUsize {
    DEFAULT_MAX_POINTS
}

fn default_time_label_format() -> String {
    "%Y-%m-%d %H:%M:%S".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_points: default_max_points(),
            time_label_format: default_time_label_format(),
            output_format: OutputFormat::default(),
        }
    }
}

impl PipelineConfig {
    /// Default configuration with `AQ_*` environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup` (keyed by environment variable name).
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("AQ_MAX_POINTS") {
            self.max_points = parse_max_points(&value)?;
        }
        if let Some(value) = lookup("AQ_TIME_LABEL_FORMAT") {
            self.time_label_format = value;
        }
        if let Some(value) = lookup("AQ_OUTPUT_FORMAT") {
            self.output_format = value.parse()?;
        }
        Ok(self)
    }
}

pub fn parse_max_points(value: &str) -> Result<NonZeroUsize, ConfigError> {
    value
        .trim()
        .parse::<NonZeroUsize>()
        .map_err(|e| ConfigError::InvalidValue {
            field: "max_points".to_string(),
            value: value.to_string(),
            message: e.to_string(),
        })
}

/// Loads the configuration from a JSON file. Missing keys take their defaults.
pub fn load_config(path: &Path) -> Result<PipelineConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound { path: path.to_path_buf() });
    }

    let file = File::open(path).map_err(|e| ConfigError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let reader = BufReader::new(file);

    let config: PipelineConfig = serde_json::from_reader(reader).map_err(|e| ConfigError::JsonParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    debug!("Loaded configuration from {}: {:?}", path.display(), config);

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;

    fn temp_config(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("aq_pipeline_{}_{}.json", name, std::process::id()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_points.get(), 10);
        assert_eq!(config.output_format, OutputFormat::Json);
    }

    #[test]
    fn test_load_partial_config() {
        let path = temp_config("partial", r#"{ "max_points": 24, "output_format": "csv" }"#);
        let config = load_config(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config.max_points.get(), 24);
        assert_eq!(config.output_format, OutputFormat::Csv);
        assert_eq!(config.time_label_format, "%Y-%m-%d %H:%M:%S");
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let path = temp_config("zero", r#"{ "max_points": 0 }"#);
        let result = load_config(&path);
        fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(ConfigError::JsonParseError { .. })));
    }

    #[test]
    fn test_missing_file() {
        let result = load_config(Path::new("/nonexistent/aq_pipeline.json"));
        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("AQ_MAX_POINTS", "5"),
            ("AQ_TIME_LABEL_FORMAT", "%H:%M"),
            ("AQ_OUTPUT_FORMAT", "CSV"),
        ]
        .into_iter()
        .collect();
        let config = PipelineConfig::default()
            .with_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.max_points.get(), 5);
        assert_eq!(config.time_label_format, "%H:%M");
        assert_eq!(config.output_format, OutputFormat::Csv);
    }

    #[test]
    fn test_from_env_reads_process_environment() {
        std::env::set_var("AQ_TIME_LABEL_FORMAT", "%d/%m %H:%M");
        let config = PipelineConfig::from_env();
        std::env::remove_var("AQ_TIME_LABEL_FORMAT");

        let config = config.unwrap();
        assert_eq!(config.time_label_format, "%d/%m %H:%M");
    }

    #[test]
    fn test_invalid_override() {
        let result = PipelineConfig::default().with_overrides(|key| (key == "AQ_MAX_POINTS").then(|| "0".to_string()));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));

        let result =
            PipelineConfig::default().with_overrides(|key| (key == "AQ_OUTPUT_FORMAT").then(|| "xml".to_string()));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }
}
