//! Configuration types for a batch run.
//!
//! All run behaviour is controlled through [`BatchConfig`], built via its
//! [`BatchConfigBuilder`]. Every knob lives in one struct so a run can be
//! logged, cloned into tests, and compared against another run.

use crate::error::{BatchError, RemoteError};
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default Box REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.box.com/2.0";

/// Which delegated converter to run, and how output files are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Plain text with a provenance header. (default)
    #[default]
    Text,
    /// Structured HTML markup, written exactly as the converter produced it.
    Html,
}

impl OutputFormat {
    /// Suffix appended to the document's base name in the output directory.
    pub fn output_suffix(self) -> &'static str {
        match self {
            OutputFormat::Text => "_extracted.txt",
            OutputFormat::Html => "_converted.html",
        }
    }

    /// Infer the format from a destination file name: `.txt` is text,
    /// anything else is HTML.
    pub fn from_output_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("txt") => OutputFormat::Text,
            _ => OutputFormat::Html,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => f.write_str("txt"),
            OutputFormat::Html => f.write_str("html"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = BatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "txt" | "text" => Ok(OutputFormat::Text),
            "html" => Ok(OutputFormat::Html),
            _ => Err(BatchError::OutputFormatUnknown(s.to_string())),
        }
    }
}

/// Configuration for one batch run over a Box folder.
///
/// # Example
/// ```rust
/// use iwork_box::{BatchConfig, OutputFormat};
///
/// let config = BatchConfig::builder()
///     .access_token("dev-token")
///     .folder_id("123456")
///     .output_format(OutputFormat::Html)
///     .build()
///     .unwrap();
/// assert_eq!(config.request_timeout_secs, 30);
/// ```
#[derive(Clone)]
pub struct BatchConfig {
    /// Box folder to list. Default: `"0"` (the account root).
    pub folder_id: String,

    /// Output format for every candidate. Default: [`OutputFormat::Text`].
    pub output_format: OutputFormat,

    /// Where converted files and the report are written. Default: `./extracted`.
    pub output_dir: PathBuf,

    /// Where downloads live while they are converted. Default: `./temp`.
    ///
    /// Every file placed here is removed before the next candidate starts.
    pub scratch_dir: PathBuf,

    /// Bearer token sent with every request. An empty token fails the
    /// listing call as unauthorized.
    pub access_token: String,

    /// REST base URL. Default: [`DEFAULT_BASE_URL`].
    pub base_url: String,

    /// Per-request timeout in seconds. Default: 30.
    ///
    /// A timeout is handled like any other transport failure.
    pub request_timeout_secs: u64,

    /// Entries requested per listing page. Default: 1000 (the Box maximum).
    pub page_size: u32,

    /// Extra download attempts for transient failures. Default: 0.
    ///
    /// Unauthorized and non-transient errors are never retried.
    pub download_retries: u32,

    /// Initial retry delay in milliseconds, doubled after each attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Optional per-file progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            folder_id: "0".to_string(),
            output_format: OutputFormat::default(),
            output_dir: PathBuf::from("./extracted"),
            scratch_dir: PathBuf::from("./temp"),
            access_token: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 30,
            page_size: 1000,
            download_retries: 0,
            retry_backoff_ms: 500,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for BatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = if self.access_token.is_empty() {
            "<empty>"
        } else {
            "<redacted>"
        };
        f.debug_struct("BatchConfig")
            .field("folder_id", &self.folder_id)
            .field("output_format", &self.output_format)
            .field("output_dir", &self.output_dir)
            .field("scratch_dir", &self.scratch_dir)
            .field("access_token", &token)
            .field("base_url", &self.base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("page_size", &self.page_size)
            .field("download_retries", &self.download_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl BatchConfig {
    /// Create a new builder for `BatchConfig`.
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder {
            config: Self::default(),
        }
    }

    /// Fail fast when no access token is set.
    ///
    /// Returns the same error a run aborts with at listing time, so callers
    /// can check the credential before doing any other setup.
    pub fn require_token(&self) -> Result<(), BatchError> {
        if self.access_token.trim().is_empty() {
            return Err(BatchError::ListingFailed {
                folder_id: self.folder_id.clone(),
                source: RemoteError::missing_token(),
            });
        }
        Ok(())
    }
}

/// Builder for [`BatchConfig`].
#[derive(Debug)]
pub struct BatchConfigBuilder {
    config: BatchConfig,
}

impl BatchConfigBuilder {
    pub fn folder_id(mut self, id: impl Into<String>) -> Self {
        self.config.folder_id = id.into();
        self
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_dir = dir.into();
        self
    }

    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.config.access_token = token.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn page_size(mut self, n: u32) -> Self {
        self.config.page_size = n.clamp(1, 1000);
        self
    }

    pub fn download_retries(mut self, n: u32) -> Self {
        self.config.download_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BatchConfig, BatchError> {
        let c = &self.config;
        if c.folder_id.trim().is_empty() {
            return Err(BatchError::InvalidConfig(
                "folder id must not be empty".into(),
            ));
        }
        if c.request_timeout_secs == 0 {
            return Err(BatchError::InvalidConfig(
                "request timeout must be ≥ 1 second".into(),
            ));
        }
        if c.base_url.is_empty() {
            return Err(BatchError::InvalidConfig("base URL must not be empty".into()));
        }
        if c.scratch_dir == c.output_dir {
            return Err(BatchError::InvalidConfig(format!(
                "scratch and output directory must differ (both are '{}')",
                c.output_dir.display()
            )));
        }
        Ok(self.config)
    }
}
