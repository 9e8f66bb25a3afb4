//! Batch ingestion: raw records in, bounded window and current AQI out.

use crate::aqi::{self, AqiResult};
use crate::errors::MeasurementError;
use crate::models::{Measurement, RawRecord};
use crate::validation::validate_record;
use crate::window::{TimeSeriesWindow, DEFAULT_MAX_POINTS};
use log::{debug, info, warn};
use serde::Serialize;
use std::num::NonZeroUsize;

/// A record that failed validation, identified by its position in the batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordFailure {
    pub record_index: usize,
    #[serde(serialize_with = "serialize_reason")]
    pub error: MeasurementError,
}

fn serialize_reason<S: serde::Serializer>(error: &MeasurementError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// Summary of the records dropped from a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestDiagnostics {
    pub accepted_count: usize,
    pub dropped_count: usize,
    pub first_failure: Option<RecordFailure>,
}

impl IngestDiagnostics {
    fn record_drop(&mut self, record_index: usize, error: MeasurementError) {
        self.dropped_count += 1;
        if self.first_failure.is_none() {
            self.first_failure = Some(RecordFailure { record_index, error });
        }
    }

    pub fn first_failure_reason(&self) -> Option<String> {
        self.first_failure.as_ref().map(|f| f.error.to_string())
    }

    pub fn has_drops(&self) -> bool {
        self.dropped_count > 0
    }
}

/// What one pipeline run hands to the presentation boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutput {
    /// Up to `max_points` measurements, oldest first.
    pub window: Vec<Measurement>,
    /// AQI of the latest measurement in `window`; `None` when the window is empty.
    pub current: Option<AqiResult>,
    pub diagnostics: IngestDiagnostics,
}

impl PipelineOutput {
    /// No valid data and nothing dropped: the batch was simply empty.
    pub fn is_no_data(&self) -> bool {
        self.window.is_empty() && !self.diagnostics.has_drops()
    }
}

#[derive(Debug, Clone)]
pub struct IngestionPipeline {
    max_points: NonZeroUsize,
}

impl IngestionPipeline {
    pub fn new(max_points: NonZeroUsize) -> Self {
        Self { max_points }
    }

    pub fn max_points(&self) -> usize {
        self.max_points.get()
    }

    /// Runs one batch through validation, ordering, windowing and AQI.
    ///
    /// Never fails: invalid records are dropped and counted in the
    /// diagnostics. Every call builds its own window, so identical input
    /// always yields identical output.
    pub fn run(&self, records: &[RawRecord]) -> PipelineOutput {
        debug!("Ingesting batch of {} raw records", records.len());

        let mut diagnostics = IngestDiagnostics::default();
        let mut measurements: Vec<Measurement> = Vec::with_capacity(records.len());

        for (record_index, record) in records.iter().enumerate() {
            match validate_record(record) {
                Ok(measurement) => measurements.push(measurement),
                Err(error) => {
                    warn!("Dropping record {}: {}", record_index, error);
                    diagnostics.record_drop(record_index, error);
                }
            }
        }
        diagnostics.accepted_count = measurements.len();

        // Source order is not guaranteed; stable so equal instants keep batch order.
        measurements.sort_by_key(|m| m.instant);

        let mut window = TimeSeriesWindow::new(self.max_points);
        for measurement in measurements {
            window.append(measurement);
        }

        let current = window.latest().and_then(|latest| match aqi::compute(latest.pm25) {
            Ok(result) => Some(result),
            Err(error) => {
                warn!("Could not compute AQI for latest measurement: {}", error);
                None
            }
        });

        info!(
            "Ingested {} records ({} dropped), window holds {}/{} points, current AQI: {}",
            diagnostics.accepted_count,
            diagnostics.dropped_count,
            window.len(),
            window.max_points(),
            current
                .map(|c| format!("{} ({})", c.index, c.label()))
                .unwrap_or_else(|| "n/a".to_string())
        );

        PipelineOutput {
            window: window.snapshot(),
            current,
            diagnostics,
        }
    }
}

impl Default for IngestionPipeline {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_POINTS)
    }
}
