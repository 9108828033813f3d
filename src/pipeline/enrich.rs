//! Provenance header for text output.
//!
//! Text extracted from a document loses track of where it came from. Each
//! text file therefore starts with a fixed block describing the remote
//! original:
//!
//! ```text
//! # Extracted from: Report.pages
//! # File ID: 123456
//! # Size: 1024 bytes
//! # Modified: 2024-01-02T03:04:05Z
//! # Extracted: 2024-05-06T07:08:09Z
//! # Extension: .pages
//! --------------------------------------------------
//!
//! <converted text>
//! ```
//!
//! HTML output is left byte-for-byte as the converter wrote it.

use crate::config::OutputFormat;
use crate::filter::CandidateFile;
use chrono::{DateTime, SecondsFormat, Utc};
use std::io;
use std::path::Path;
use tracing::debug;

/// Width of the separator line under the header.
pub const SEPARATOR_WIDTH: usize = 50;

/// Render the header block, including the separator line and the blank
/// line that precedes the content.
pub fn render_header(candidate: &CandidateFile, extracted_at: DateTime<Utc>) -> String {
    let entry = &candidate.entry;
    let modified = entry
        .modified_at
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| "unknown".to_string());

    let mut header = String::new();
    header.push_str(&format!("# Extracted from: {}\n", entry.name));
    header.push_str(&format!("# File ID: {}\n", entry.id));
    header.push_str(&format!("# Size: {} bytes\n", entry.size));
    header.push_str(&format!("# Modified: {}\n", modified));
    header.push_str(&format!(
        "# Extracted: {}\n",
        extracted_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    ));
    header.push_str(&format!("# Extension: {}\n", candidate.extension));
    header.push_str(&"-".repeat(SEPARATOR_WIDTH));
    header.push_str("\n\n");
    header
}

/// Prepend the provenance header to the converted file at `path`, in place.
///
/// A no-op for [`OutputFormat::Html`]. Returns the final output path.
pub async fn enrich<'a>(
    path: &'a Path,
    candidate: &CandidateFile,
    format: OutputFormat,
) -> io::Result<&'a Path> {
    if format != OutputFormat::Text {
        return Ok(path);
    }

    let content = tokio::fs::read(path).await?;
    let header = render_header(candidate, Utc::now());

    let mut enriched = Vec::with_capacity(header.len() + content.len());
    enriched.extend_from_slice(header.as_bytes());
    enriched.extend_from_slice(&content);
    tokio::fs::write(path, enriched).await?;

    debug!("Enhanced {} with metadata", path.display());
    Ok(path)
}
