//! # iwork-box
//!
//! Batch-convert iWork documents (Pages, Numbers, Keynote) stored in a Box
//! folder to plain text or HTML, with a JSON report of what happened.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Box folder
//!  │
//!  ├─ 1. List     GET /folders/{id}/items (all pages)
//!  ├─ 2. Filter   keep .pages / .numbers / .nmbrs / .keynote / .key files
//!  │
//!  │   for each candidate, strictly in order:
//!  ├─ 3. Download stream /files/{id}/content into a scratch file
//!  ├─ 4. Convert  external converter chosen by output format
//!  ├─ 5. Enrich   provenance header (text output only)
//!  ├─ 6. Record   success record or one error message
//!  ├─ 7. Cleanup  scratch file deleted, whatever the outcome
//!  │
//!  └─ 8. Report   processing_report_<timestamp>.json
//! ```
//!
//! A failing file never stops the run. Only setup (creating directories,
//! listing the folder) can, and then no report is written.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use iwork_box::{
//!     write_report, BatchConfig, BatchOrchestrator, CommandConverter, ConversionInvoker,
//!     OutputFormat,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BatchConfig::builder()
//!         .access_token(std::env::var("BOX_ACCESS_TOKEN")?)
//!         .folder_id("123456")
//!         .output_format(OutputFormat::Text)
//!         .build()?;
//!
//!     let invoker = ConversionInvoker::new(
//!         Arc::new(CommandConverter::new("iwork2text")),
//!         Arc::new(CommandConverter::new("iwork2html")),
//!     );
//!
//!     let orchestrator = BatchOrchestrator::with_box_client(config, invoker)?;
//!     let summary = orchestrator.run().await?;
//!     let report = write_report(&summary, &orchestrator.config().output_dir).await?;
//!     println!("{}/{} converted, report: {}", summary.successful, summary.total_files, report.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `iwork-box` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod error;
pub mod filter;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod remote;
pub mod report;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{convert_file, BatchOrchestrator};
pub use config::{BatchConfig, BatchConfigBuilder, OutputFormat, DEFAULT_BASE_URL};
pub use error::{BatchError, ConversionError, FileError, RemoteError};
pub use filter::{is_supported, select_candidates, CandidateFile, SUPPORTED_EXTENSIONS};
pub use output::{ProcessingRecord, ProcessingSummary};
pub use pipeline::convert::{
    CommandConverter, ConversionContext, ConversionInvoker, DocumentConverter, TextRecognizer,
};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use remote::{BoxClient, EntryKind, RemoteEntry, RemoteStore};
pub use report::write_report;
