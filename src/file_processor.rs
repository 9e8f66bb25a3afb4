use crate::errors::PipelineError;
use crate::parsers::json_parser;
use crate::pipeline::{IngestionPipeline, PipelineOutput};
use log::info;
use std::path::Path;

/// Reads one batch file and runs it through a fresh pipeline run.
pub fn process_file(file_path: &Path, pipeline: &IngestionPipeline) -> Result<PipelineOutput, PipelineError> {
    info!("Processing batch file: {}", file_path.display());

    let records = json_parser::parse_batch_file(file_path)?;
    Ok(pipeline.run(&records))
}
