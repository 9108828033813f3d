//! Batch orchestration: list → filter → (download → convert → enrich →
//! record) per candidate → summary.
//!
//! Candidates are processed strictly one after another in listing order.
//! Each candidate ends in exactly one of two ways: a [`ProcessingRecord`] on
//! success or one error message on failure, never both. A failure only ever
//! ends that candidate; the loop moves on to the next one.
//!
//! Only setup can abort a run: creating the scratch/output directories and
//! listing the remote folder. Both happen before the first candidate.

use crate::config::{BatchConfig, OutputFormat};
use crate::error::{BatchError, FileError, RemoteError};
use crate::filter::{select_candidates, CandidateFile};
use crate::output::{ProcessingRecord, ProcessingSummary};
use crate::pipeline::convert::ConversionInvoker;
use crate::pipeline::enrich::enrich;
use crate::pipeline::naming::{sanitize_file_name, OutputNamer};
use crate::pipeline::scratch::ScratchFile;
use crate::remote::{BoxClient, RemoteStore};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// Drives one batch run.
pub struct BatchOrchestrator {
    store: Arc<dyn RemoteStore>,
    invoker: ConversionInvoker,
    config: BatchConfig,
}

impl BatchOrchestrator {
    pub fn new(store: Arc<dyn RemoteStore>, invoker: ConversionInvoker, config: BatchConfig) -> Self {
        Self {
            store,
            invoker,
            config,
        }
    }

    /// Orchestrator talking to Box with the settings in `config`.
    pub fn with_box_client(config: BatchConfig, invoker: ConversionInvoker) -> Result<Self, BatchError> {
        let client = BoxClient::from_config(&config)
            .map_err(|e| BatchError::InvalidConfig(format!("cannot build HTTP client: {e}")))?;
        Ok(Self::new(Arc::new(client), invoker, config))
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Create the scratch and output directories.
    pub async fn prepare(&self) -> Result<(), BatchError> {
        for dir in [&self.config.scratch_dir, &self.config.output_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| BatchError::DirectoryCreateFailed {
                    path: dir.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    /// [`prepare`](Self::prepare) then [`process_folder`](Self::process_folder).
    pub async fn run(&self) -> Result<ProcessingSummary, BatchError> {
        self.prepare().await?;
        self.process_folder().await
    }

    /// Process every candidate in the configured folder.
    ///
    /// # Errors
    /// Only [`BatchError::ListingFailed`]; per-file failures are recorded in
    /// the returned summary.
    pub async fn process_folder(&self) -> Result<ProcessingSummary, BatchError> {
        let mut summary = ProcessingSummary::start(0);
        let folder_id = &self.config.folder_id;

        let entries = self
            .store
            .list_children(folder_id)
            .await
            .map_err(|source| BatchError::ListingFailed {
                folder_id: folder_id.clone(),
                source,
            })?;
        let candidates = select_candidates(entries);
        let total = candidates.len();
        summary.total_files = total;
        info!("Found {} iWork files in Box folder {}", total, folder_id);

        let cb = self.config.progress_callback.as_ref();
        if let Some(cb) = cb {
            cb.on_batch_start(total);
        }
        if total == 0 {
            info!("No iWork files found to process");
        }

        let mut namer = OutputNamer::new(&self.config.output_dir, self.config.output_format);

        for (i, candidate) in candidates.iter().enumerate() {
            let index = i + 1;
            info!("Processing {} ({}/{})", candidate.name(), index, total);
            if let Some(cb) = cb {
                cb.on_file_start(index, total, candidate.name());
            }

            match self.process_candidate(candidate, &mut namer).await {
                Ok(record) => {
                    if let Some(cb) = cb {
                        cb.on_file_complete(index, total, candidate.name(), Path::new(&record.output_path));
                    }
                    summary.record_success(record);
                }
                Err(e) => {
                    let message = e.to_string();
                    warn!("{}", message);
                    if let Some(cb) = cb {
                        cb.on_file_error(index, total, &message);
                    }
                    summary.record_failure(message);
                }
            }
        }

        summary.finish();
        debug_assert!(summary.is_consistent());

        if let Some(cb) = cb {
            cb.on_batch_complete(total, summary.successful);
        }
        info!(
            "Batch complete: {}/{} succeeded in {:?}",
            summary.successful, total, summary.duration
        );

        Ok(summary)
    }

    /// Download, convert, enrich, and record a single candidate.
    ///
    /// Once downloaded, the scratch file is dropped (and deleted) on every
    /// return path.
    async fn process_candidate(
        &self,
        candidate: &CandidateFile,
        namer: &mut OutputNamer,
    ) -> Result<ProcessingRecord, FileError> {
        let started = Instant::now();
        let format = self.config.output_format;
        let name = candidate.name();

        // pending → downloaded
        let scratch_path = self.config.scratch_dir.join(sanitize_file_name(name));
        self.download_with_retry(candidate, &scratch_path)
            .await
            .map_err(|source| FileError::Download {
                name: name.to_string(),
                source,
            })?;
        let scratch = ScratchFile::adopt(scratch_path);

        // downloaded → converted
        let output = namer.output_path(candidate);
        self.invoker
            .invoke(scratch.path(), &output, format)
            .await
            .map_err(|source| FileError::Convert {
                name: name.to_string(),
                source,
            })?;

        // converted → enriched
        let final_path = enrich(&output, candidate, format)
            .await
            .map_err(|source| FileError::Enrich {
                name: name.to_string(),
                source,
            })?;

        // enriched → recorded
        let record = ProcessingRecord::new(name, final_path, candidate.entry.size, started.elapsed());
        if let Err(e) = scratch.remove() {
            warn!("Failed to remove scratch file for {}: {}", name, e);
        }
        debug!("{} → {} in {}", name, record.output_path, record.process_time);
        Ok(record)
    }

    async fn download_with_retry(&self, candidate: &CandidateFile, dest: &Path) -> Result<u64, RemoteError> {
        let mut attempt: u32 = 0;
        loop {
            match self.store.download(&candidate.entry.id, dest).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) if attempt < self.config.download_retries && e.is_transient() => {
                    attempt += 1;
                    let backoff = self
                        .config
                        .retry_backoff_ms
                        .saturating_mul(2u64.saturating_pow(attempt - 1));
                    warn!(
                        "{}: retry {}/{} after {}ms: {}",
                        candidate.name(),
                        attempt,
                        self.config.download_retries,
                        backoff,
                        e
                    );
                    sleep(Duration::from_millis(backoff)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Convert one local file, inferring the format from `output`'s extension
/// (`.txt` → text, anything else → HTML). No provenance header is added.
pub async fn convert_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    invoker: &ConversionInvoker,
) -> Result<OutputFormat, BatchError> {
    let (input, output) = (input.as_ref(), output.as_ref());
    let format = OutputFormat::from_output_path(output);

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| BatchError::DirectoryCreateFailed {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    invoker.invoke(input, output, format).await?;
    info!("Converted {} → {} ({})", input.display(), output.display(), format);
    Ok(format)
}
