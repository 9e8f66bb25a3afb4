use log::info;
use std::time::{Duration, Instant};

/// Counters for one CLI invocation. Each run owns its own instance.
#[derive(Debug, Default)]
pub struct RunMetrics {
    pub total_files_attempted: u64,
    pub total_files_successful: u64,
    pub total_files_failed: u64,
    pub total_records_accepted: u64,
    pub total_records_dropped: u64,
    pub start_time: Option<Instant>,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    pub fn record_file_success(&mut self, accepted: usize, dropped: usize) {
        self.total_files_attempted += 1;
        self.total_files_successful += 1;
        self.total_records_accepted += accepted as u64;
        self.total_records_dropped += dropped as u64;
    }

    pub fn record_file_failure(&mut self) {
        self.total_files_attempted += 1;
        self.total_files_failed += 1;
    }

    pub fn all_failed(&self) -> bool {
        self.total_files_attempted > 0 && self.total_files_successful == 0
    }

    pub fn get_total_duration(&self) -> Duration {
        self.start_time.map(|start| start.elapsed()).unwrap_or_default()
    }

    pub fn get_throughput(&self) -> f64 {
        let duration_secs = self.get_total_duration().as_secs_f64();
        if duration_secs > 0.0 {
            (self.total_records_accepted + self.total_records_dropped) as f64 / duration_secs
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        info!("========== Ingestion Summary ==========");
        info!("Total Duration: {:.2?}", self.get_total_duration());
        info!("Files Attempted: {}", self.total_files_attempted);
        info!("Files Successful: {}", self.total_files_successful);
        info!("Files Failed: {}", self.total_files_failed);
        info!("Records Accepted: {}", self.total_records_accepted);
        info!("Records Dropped: {}", self.total_records_dropped);
        info!("Throughput: {:.2} records/sec", self.get_throughput());
        info!("=======================================");
    }
}
