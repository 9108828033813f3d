//! JSON processing report.
//!
//! One report per run, named after the run's completion time
//! (`processing_report_20240506_070809.json`, local time). A run finishing in
//! the same second as an earlier one gets a numeric suffix instead of
//! overwriting it. The file is written to a `.tmp` sibling first and renamed
//! into place, so a reader never sees a half-written report.

use crate::error::BatchError;
use crate::output::ProcessingSummary;
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::info;

/// Give up looking for a free report name after this many suffixes.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// `processing_report_<YYYYMMDD_HHMMSS>.json` for the summary's end time.
pub fn report_file_name(summary: &ProcessingSummary) -> String {
    let stamp = summary.end_time.with_timezone(&Local).format("%Y%m%d_%H%M%S");
    format!("processing_report_{}.json", stamp)
}

/// Serialise `summary` into `output_dir` and return the report path.
pub async fn write_report(
    summary: &ProcessingSummary,
    output_dir: &Path,
) -> Result<PathBuf, BatchError> {
    let json = serde_json::to_vec_pretty(summary)?;
    let path = unused_path(output_dir, &report_file_name(summary)).await?;

    let write_err = |source| BatchError::ReportWriteFailed {
        path: path.clone(),
        source,
    };

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, &json).await.map_err(write_err)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }

    info!("Generated processing report: {}", path.display());
    Ok(path)
}

/// First of `name`, `name_1`, `name_2`, … that does not exist yet.
async fn unused_path(dir: &Path, name: &str) -> Result<PathBuf, BatchError> {
    let candidate = dir.join(name);
    if !exists(&candidate).await? {
        return Ok(candidate);
    }

    let stem = name.trim_end_matches(".json");
    for i in 1..=MAX_NAME_ATTEMPTS {
        let candidate = dir.join(format!("{}_{}.json", stem, i));
        if !exists(&candidate).await? {
            return Ok(candidate);
        }
    }

    Err(BatchError::ReportWriteFailed {
        path: dir.join(name),
        source: std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("no free report name after {} attempts", MAX_NAME_ATTEMPTS),
        ),
    })
}

async fn exists(path: &Path) -> Result<bool, BatchError> {
    tokio::fs::try_exists(path)
        .await
        .map_err(|source| BatchError::ReportWriteFailed {
            path: path.to_path_buf(),
            source,
        })
}
