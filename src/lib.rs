pub mod aqi;
pub mod config;
pub mod errors;
pub mod file_processor;
pub mod metrics;
pub mod models;
pub mod parallel;
pub mod parsers;
pub mod pipeline;
pub mod render;
pub mod timestamp;
pub mod validation;
pub mod window;

pub use aqi::{compute, AqiCategory, AqiResult};
pub use models::{Measurement, RawRecord, ReadingValue};
pub use pipeline::{IngestionPipeline, PipelineOutput};
pub use window::TimeSeriesWindow;
