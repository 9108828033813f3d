//! Run results: the summary that the orchestrator accumulates and the report
//! writer serialises.
//!
//! Field names are part of the report format and must stay stable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// One successfully processed candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingRecord {
    /// Remote display name.
    pub original_file: String,
    /// Final output path.
    pub output_path: String,
    /// Remote byte size as listed.
    pub file_size: u64,
    /// Wall time from download start to record, e.g. `1.204s`.
    pub process_time: String,
}

impl ProcessingRecord {
    pub fn new(original_file: &str, output_path: &Path, file_size: u64, elapsed: Duration) -> Self {
        Self {
            original_file: original_file.to_string(),
            output_path: output_path.display().to_string(),
            file_size,
            process_time: format_elapsed(elapsed),
        }
    }
}

/// Aggregate outcome of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingSummary {
    pub total_files: usize,
    pub successful: usize,
    pub failed: usize,
    /// One message per failed candidate, in processing order.
    pub errors: Vec<String>,
    /// One record per successful candidate, in processing order.
    pub processed_files: Vec<ProcessingRecord>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Serialised as whole nanoseconds.
    #[serde(with = "duration_ns")]
    pub duration: Duration,
}

impl ProcessingSummary {
    /// Start an empty summary for `total_files` candidates.
    pub fn start(total_files: usize) -> Self {
        let now = Utc::now();
        Self {
            total_files,
            successful: 0,
            failed: 0,
            errors: Vec::new(),
            processed_files: Vec::new(),
            start_time: now,
            end_time: now,
            duration: Duration::ZERO,
        }
    }

    pub fn record_success(&mut self, record: ProcessingRecord) {
        self.successful += 1;
        self.processed_files.push(record);
    }

    pub fn record_failure(&mut self, message: impl Into<String>) {
        self.failed += 1;
        self.errors.push(message.into());
    }

    /// Stamp the end time and duration.
    pub fn finish(&mut self) {
        self.end_time = Utc::now();
        self.duration = (self.end_time - self.start_time).to_std().unwrap_or_default();
    }

    /// Every candidate accounted for exactly once.
    pub fn is_consistent(&self) -> bool {
        self.successful + self.failed == self.total_files
            && self.processed_files.len() == self.successful
            && self.errors.len() == self.failed
    }
}

/// Human-readable duration with millisecond precision (`850ms`, `1.204s`, `2m03.5s`).
///
/// Rounded to whole milliseconds first, so a value just under a unit
/// boundary is printed in the next unit up (`59.9996s` → `1m00.0s`).
pub fn format_elapsed(d: Duration) -> String {
    let ms = (d.as_nanos() + 500_000) / 1_000_000;
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{}.{:03}s", ms / 1000, ms % 1000)
    } else {
        let tenths = (ms + 50) / 100;
        let (minutes, rest) = (tenths / 600, tenths % 600);
        format!("{}m{:02}.{}s", minutes, rest / 10, rest % 10)
    }
}

mod duration_ns {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_nanos)
    }
}
