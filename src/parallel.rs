use crate::file_processor;
use crate::pipeline::{IngestionPipeline, PipelineOutput};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

/// Result of processing a single batch file
#[derive(Debug)]
pub struct FileRunResult {
    pub file_path: PathBuf,
    pub output: Option<PipelineOutput>,
    pub error: Option<String>,
}

/// Runs independent pipelines over several batch files on a rayon pool.
/// Every file gets its own run and therefore its own window.
pub struct ParallelProcessor {
    num_workers: usize,
}

impl ParallelProcessor {
    pub fn new() -> Self {
        Self::with_workers(num_cpus::get())
    }

    pub fn with_workers(num_workers: usize) -> Self {
        let num_workers = num_workers.max(1);
        info!("Initializing ParallelProcessor with {} workers", num_workers);
        Self { num_workers }
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Process multiple batch files in parallel. Results keep the input order.
    pub fn process_files(&self, paths: Vec<PathBuf>, pipeline: &IngestionPipeline) -> Vec<FileRunResult> {
        let total_files = paths.len();
        info!("Starting parallel processing of {} files", total_files);

        let progress = ProgressBar::new(total_files as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        {
            progress.set_style(style.progress_chars("#>-"));
        }

        let run_all = || -> Vec<FileRunResult> {
            paths
                .into_par_iter()
                .map(|file_path| {
                    let start = Instant::now();
                    let result = match file_processor::process_file(&file_path, pipeline) {
                        Ok(output) => {
                            let processing_time = start.elapsed().as_millis();
                            info!(
                                "Processed {} ({} accepted, {} dropped) in {}ms",
                                file_path.display(),
                                output.diagnostics.accepted_count,
                                output.diagnostics.dropped_count,
                                processing_time
                            );
                            FileRunResult {
                                file_path,
                                output: Some(output),
                                error: None,
                            }
                        }
                        Err(e) => {
                            error!(
                                "Failed to process {} after {}ms: {}",
                                file_path.display(),
                                start.elapsed().as_millis(),
                                e
                            );
                            FileRunResult {
                                file_path,
                                output: None,
                                error: Some(e.to_string()),
                            }
                        }
                    };

                    progress.inc(1);
                    result
                })
                .collect()
        };

        let results = match rayon::ThreadPoolBuilder::new().num_threads(self.num_workers).build() {
            Ok(pool) => pool.install(run_all),
            Err(e) => {
                warn!("Could not build a dedicated thread pool ({}), using the global pool", e);
                run_all()
            }
        };

        progress.finish_with_message("File processing completed");
        results
    }
}

impl Default for ParallelProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Expands the CLI input into batch files: a directory is walked for `*.json`
/// files, a pattern containing `*` or `?` is globbed, anything else is taken
/// as a single file. Output is sorted for a stable processing order.
pub fn discover_batch_files(input: &Path) -> Vec<PathBuf> {
    let input_str = input.to_string_lossy();
    let mut files: Vec<PathBuf> = if input.is_dir() {
        WalkDir::new(input)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "json"))
            .map(|e| e.into_path())
            .collect()
    } else if input_str.contains('*') || input_str.contains('?') {
        match glob::glob(&input_str) {
            Ok(paths) => paths.filter_map(|entry| entry.ok()).filter(|p| p.is_file()).collect(),
            Err(e) => {
                error!("Invalid glob pattern {}: {}", input_str, e);
                Vec::new()
            }
        }
    } else {
        vec![input.to_path_buf()]
    };

    files.sort();
    info!("Discovered {} batch file(s) from {}", files.len(), input_str);
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("aq_pipeline_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_parallel_processor_creation() {
        let processor = ParallelProcessor::new();
        assert!(processor.num_workers() > 0);
        assert_eq!(ParallelProcessor::with_workers(0).num_workers(), 1);
    }

    #[test]
    fn test_discover_batch_files() {
        let dir = temp_dir("discover");
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::write(dir.join("b.json"), "[]").unwrap();
        fs::write(dir.join("nested/a.json"), "[]").unwrap();
        fs::write(dir.join("notes.txt"), "").unwrap();

        let files = discover_batch_files(&dir);
        let pattern = discover_batch_files(&dir.join("*.json"));
        fs::remove_dir_all(&dir).unwrap();

        assert_eq!(files, vec![dir.join("b.json"), dir.join("nested/a.json")]);
        assert_eq!(pattern, vec![dir.join("b.json")]);
    }

    #[test]
    fn test_each_file_gets_its_own_window() {
        let dir = temp_dir("parallel");
        let first = dir.join("first.json");
        let second = dir.join("second.json");
        let missing = dir.join("missing.json");
        fs::write(&first, r#"[{ "Timestamp": "2025-04-16 19:23:00 UTC", "PM25": 12.0, "PM10": 1 }]"#).unwrap();
        fs::write(&second, r#"[{ "Timestamp": "2025-04-16 19:24:00 UTC", "PM25": 600, "PM10": 1 }]"#).unwrap();

        let results = ParallelProcessor::with_workers(2).process_files(
            vec![first.clone(), second.clone(), missing.clone()],
            &IngestionPipeline::default(),
        );
        fs::remove_dir_all(&dir).unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].file_path, first);
        let first_output = results[0].output.as_ref().unwrap();
        assert_eq!(first_output.window.len(), 1);
        assert_eq!(first_output.current.map(|c| c.index), Some(50));

        let second_output = results[1].output.as_ref().unwrap();
        assert_eq!(second_output.window.len(), 1);
        assert_eq!(second_output.current.map(|c| c.label()), Some("Hazardous"));

        assert!(results[2].output.is_none());
        assert!(results[2].error.is_some());
    }
}
