//! Render-ready projection of a pipeline run, for charts and tables.

use crate::aqi::AqiResult;
use crate::errors::{ConfigError, PipelineError};
use crate::models::Measurement;
use crate::pipeline::PipelineOutput;
use crate::timestamp::TIMESTAMP_FORMAT;
use chrono::format::{Item, StrftimeItems};
use chrono::TimeZone;
use serde::Serialize;
use std::fmt::{Display, Write as _};
use std::io::Write;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderRow {
    pub time_label: String,
    pub pm25: f64,
    pub pm10: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentView {
    pub index: u16,
    pub label: &'static str,
    pub color: &'static str,
}

impl From<AqiResult> for CurrentView {
    fn from(result: AqiResult) -> Self {
        Self {
            index: result.index,
            label: result.label(),
            color: result.category.color().hex(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticsView {
    pub dropped_count: usize,
    pub first_failure_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub rows: Vec<RenderRow>,
    pub current: Option<CurrentView>,
    pub diagnostics: DiagnosticsView,
}

/// Rejects strftime patterns chrono cannot format.
pub fn validate_time_format(format: &str) -> Result<(), ConfigError> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(ConfigError::InvalidValue {
            field: "time_label_format".to_string(),
            value: format.to_string(),
            message: "not a valid strftime pattern".to_string(),
        });
    }
    Ok(())
}

fn time_label<Tz>(measurement: &Measurement, tz: &Tz, format: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let local = measurement.instant.with_timezone(tz);
    let mut label = String::new();
    if write!(label, "{}", local.format(format)).is_err() {
        label.clear();
        let _ = write!(label, "{}", local.format(TIMESTAMP_FORMAT));
    }
    label
}

/// Projects a run into rows labelled in `tz` using the strftime `format`.
pub fn project<Tz>(output: &PipelineOutput, tz: &Tz, format: &str) -> RenderView
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    RenderView {
        source: None,
        rows: output
            .window
            .iter()
            .map(|m| RenderRow {
                time_label: time_label(m, tz, format),
                pm25: m.pm25,
                pm10: m.pm10,
            })
            .collect(),
        current: output.current.map(CurrentView::from),
        diagnostics: DiagnosticsView {
            dropped_count: output.diagnostics.dropped_count,
            first_failure_reason: output.diagnostics.first_failure_reason(),
        },
    }
}

/// Writes the views as a JSON array, one element per batch file.
pub fn write_json<W: Write>(views: &[RenderView], writer: W) -> Result<(), PipelineError> {
    serde_json::to_writer_pretty(writer, views)?;
    Ok(())
}

#[derive(Serialize)]
struct CsvRow<'a> {
    source: &'a str,
    time_label: &'a str,
    pm25: f64,
    pm10: f64,
}

/// Writes the history tables of all views as one CSV.
pub fn write_csv<W: Write>(views: &[RenderView], writer: W) -> Result<(), PipelineError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for view in views {
        for row in &view.rows {
            csv_writer.serialize(CsvRow {
                source: view.source.as_deref().unwrap_or(""),
                time_label: &row.time_label,
                pm25: row.pm25,
                pm10: row.pm10,
            })?;
        }
    }
    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawRecord;
    use crate::pipeline::IngestionPipeline;
    use chrono::{FixedOffset, Utc};

    fn sample_output() -> PipelineOutput {
        IngestionPipeline::default().run(&[
            RawRecord::new("2025-04-16 19:23:00 UTC", 12.0, 18.0),
            RawRecord::new("2025-04-16 19:13:00 UTC", 40.5, 52.0),
            RawRecord::new("2025-04-16 19:33:00 UTC", -3.0, 18.0),
        ])
    }

    #[test]
    fn test_project_in_utc() {
        let view = project(&sample_output(), &Utc, "%H:%M");
        let labels: Vec<&str> = view.rows.iter().map(|r| r.time_label.as_str()).collect();
        assert_eq!(labels, vec!["19:13", "19:23"]);
        assert_eq!(view.rows[1].pm25, 12.0);
        assert_eq!(
            view.current,
            Some(CurrentView {
                index: 50,
                label: "Moderate",
                color: "#FFFF00"
            })
        );
        assert_eq!(view.diagnostics.dropped_count, 1);
        assert!(view.diagnostics.first_failure_reason.is_some());
    }

    #[test]
    fn test_project_in_offset_zone() {
        let bangkok = FixedOffset::east_opt(7 * 3600).unwrap();
        let view = project(&sample_output(), &bangkok, "%Y-%m-%d %H:%M");
        assert_eq!(view.rows[1].time_label, "2025-04-17 02:23");
    }

    #[test]
    fn test_validate_time_format() {
        assert!(validate_time_format("%d/%m %H:%M").is_ok());
        assert!(validate_time_format("%Q").is_err());
    }

    #[test]
    fn test_write_csv() {
        let mut view = project(&sample_output(), &Utc, "%H:%M");
        view.source = Some("history24h.json".to_string());

        let mut buffer = Vec::new();
        write_csv(&[view], &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(
            text,
            "source,time_label,pm25,pm10\nhistory24h.json,19:13,40.5,52.0\nhistory24h.json,19:23,12.0,18.0\n"
        );
    }

    #[test]
    fn test_write_json_single_view_is_still_an_array() {
        let view = project(&sample_output(), &Utc, "%H:%M");
        let mut buffer = Vec::new();
        write_json(&[view], &mut buffer).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        let views = value.as_array().unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0]["current"]["label"], "Moderate");
        assert_eq!(views[0]["rows"].as_array().map(|rows| rows.len()), Some(2));
        assert!(views[0].get("source").is_none());
    }

    #[test]
    fn test_write_json_empty_is_empty_array() {
        let mut buffer = Vec::new();
        write_json(&[], &mut buffer).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "[]");
    }
}
