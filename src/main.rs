use aq_pipeline::config::{load_config, OutputFormat, PipelineConfig};
use aq_pipeline::errors::PipelineError;
use aq_pipeline::metrics::RunMetrics;
use aq_pipeline::parallel::{discover_batch_files, ParallelProcessor};
use aq_pipeline::pipeline::IngestionPipeline;
use aq_pipeline::render::{self, RenderView};
use chrono::{Local, Utc};
use clap::Parser;
use log::{error, info, warn};
use std::error::Error;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::num::NonZeroUsize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "aq_pipeline")]
#[command(
    about = "Builds the recent PM2.5/PM10 history and current AQI from air-quality batch files",
    long_about = None
)]
struct Args {
    /// Batch JSON file, directory of batch files, or glob pattern
    input: PathBuf,

    /// JSON configuration file
    #[arg(long, env = "AQ_CONFIG")]
    config: Option<PathBuf>,

    /// Number of recent points to keep
    #[arg(long)]
    max_points: Option<NonZeroUsize>,

    /// Output format. JSON is always an array with one view per batch file
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// strftime pattern for time labels
    #[arg(long)]
    time_format: Option<String>,

    /// Label times in UTC instead of the local timezone
    #[arg(long)]
    utc: bool,

    /// Write output here instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Worker threads for processing several files
    #[arg(long)]
    workers: Option<usize>,
}

fn resolve_config(args: &Args) -> Result<PipelineConfig, PipelineError> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?.with_env_overrides()?,
        None => PipelineConfig::from_env()?,
    };

    if let Some(max_points) = args.max_points {
        config.max_points = max_points;
    }
    if let Some(format) = args.format {
        config.output_format = format;
    }
    if let Some(time_format) = &args.time_format {
        config.time_label_format = time_format.clone();
    }
    render::validate_time_format(&config.time_label_format)?;

    Ok(config)
}

fn write_views(views: &[RenderView], config: &PipelineConfig, output: Option<&PathBuf>) -> Result<(), PipelineError> {
    let mut writer: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    match config.output_format {
        OutputFormat::Json => {
            render::write_json(views, &mut writer)?;
            writeln!(writer)?;
        }
        OutputFormat::Csv => render::write_csv(views, &mut writer)?,
    }
    writer.flush()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut metrics = RunMetrics::new();

    let config = resolve_config(&args)?;
    info!(
        "Window capacity {}, output format {:?}, time labels '{}'",
        config.max_points, config.output_format, config.time_label_format
    );

    let files = discover_batch_files(&args.input);
    if files.is_empty() {
        return Err(PipelineError::NoInput { path: args.input.clone() }.into());
    }

    let processor = match args.workers {
        Some(workers) => ParallelProcessor::with_workers(workers),
        None => ParallelProcessor::new(),
    };
    let pipeline = IngestionPipeline::new(config.max_points);
    let results = processor.process_files(files, &pipeline);

    let mut views = Vec::with_capacity(results.len());
    for result in results {
        let Some(output) = result.output else {
            metrics.record_file_failure();
            continue;
        };
        metrics.record_file_success(output.diagnostics.accepted_count, output.diagnostics.dropped_count);

        if output.is_no_data() {
            warn!("No data in {}", result.file_path.display());
        } else if output.diagnostics.has_drops() {
            warn!(
                "{}: dropped {} record(s), first reason: {}",
                result.file_path.display(),
                output.diagnostics.dropped_count,
                output.diagnostics.first_failure_reason().unwrap_or_default()
            );
        }

        let mut view = if args.utc {
            render::project(&output, &Utc, &config.time_label_format)
        } else {
            render::project(&output, &Local, &config.time_label_format)
        };
        view.source = Some(result.file_path.display().to_string());
        views.push(view);
    }

    write_views(&views, &config, args.output.as_ref())?;
    metrics.log_summary();

    if metrics.all_failed() {
        error!("Every batch file failed to load");
        std::process::exit(1);
    }
    Ok(())
}
