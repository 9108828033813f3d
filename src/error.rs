//! Error types for the iwork-box library.
//!
//! Two distinct error families reflect two distinct failure modes:
//!
//! * [`BatchError`] (**fatal**): the run cannot start or cannot finish its
//!   setup (remote folder not listable, scratch/output directory not
//!   creatable). Returned as `Err(BatchError)` and no report is produced.
//!
//! * [`FileError`] (**non-fatal**): a single candidate failed to download,
//!   convert, or enrich. Its `Display` text is appended to
//!   [`crate::output::ProcessingSummary::errors`] and the run moves on to the
//!   next candidate.
//!
//! [`RemoteError`] and [`ConversionError`] are the causes underneath both.
//! A `RemoteError` raised while listing becomes fatal; the same error raised
//! while downloading one file is wrapped in a `FileError` instead.

use std::path::PathBuf;
use thiserror::Error;

/// Shown with every unauthorized error so the user knows where to look.
pub const UNAUTHORIZED_HINT: &str = "Check that the Box access token (--token or BOX_ACCESS_TOKEN) \
is set and still valid. Developer tokens expire after 60 minutes.";

/// All fatal errors returned by the iwork-box library.
#[derive(Debug, Error)]
pub enum BatchError {
    // ── Setup errors ──────────────────────────────────────────────────────
    /// Listing the remote folder failed; nothing was processed.
    #[error("Failed to list Box folder '{folder_id}': {source}{}", listing_hint(.source))]
    ListingFailed {
        folder_id: String,
        #[source]
        source: RemoteError,
    },

    /// The scratch or output directory could not be created.
    #[error("Failed to create directory '{path}': {source}")]
    DirectoryCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Report errors ─────────────────────────────────────────────────────
    /// The report artifact could not be written.
    #[error("Failed to write report '{path}': {source}")]
    ReportWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The summary could not be serialised to JSON.
    #[error("Failed to serialise processing report: {0}")]
    ReportSerializeFailed(#[from] serde_json::Error),

    // ── Single-file mode ──────────────────────────────────────────────────
    /// Single-file conversion failed.
    #[error("Conversion failed: {0}")]
    ConversionFailed(#[from] ConversionError),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Output format string was neither `txt` nor `html`.
    #[error("Invalid format '{0}'. Must be 'txt' or 'html'.")]
    OutputFormatUnknown(String),
}

impl BatchError {
    /// True when the run aborted because the credential was rejected.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, BatchError::ListingFailed { source, .. } if source.is_unauthorized())
    }
}

/// Troubleshooting text appended to a fatal listing error.
fn listing_hint(source: &RemoteError) -> String {
    if source.is_unauthorized() {
        format!("\n{}", UNAUTHORIZED_HINT)
    } else {
        String::new()
    }
}

/// Failures talking to the remote file store.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Credential missing, invalid, or expired (HTTP 401).
    #[error("unauthorized: {detail}")]
    Unauthorized { detail: String },

    /// Any other non-2xx response.
    #[error("Box API error: HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    /// The request exceeded the client timeout.
    #[error("request to {url} timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    /// Connection refused, DNS failure, reset mid-body, etc.
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    /// The response body was not the JSON we expected.
    #[error("malformed response from {url}: {reason}")]
    MalformedResponse { url: String, reason: String },

    /// Downloaded bytes could not be written locally.
    #[error("failed to write '{path}': {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RemoteError {
    /// The error for a request that was never sent because no token is set.
    pub fn missing_token() -> Self {
        RemoteError::Unauthorized {
            detail: "no access token configured".to_string(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, RemoteError::Unauthorized { .. })
    }

    /// Whether a retry could plausibly succeed.
    ///
    /// Timeouts, transport failures, 429 and 5xx are transient; auth failures,
    /// other 4xx, malformed bodies and local write errors are not.
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::Timeout { .. } | RemoteError::Transport { .. } => true,
            RemoteError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Failures of the delegated document converter.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The converter program could not be started.
    #[error("failed to run converter '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The converter ran and reported failure.
    #[error("converter '{program}' exited with {status}: {stderr}")]
    ToolFailed {
        program: String,
        status: String,
        stderr: String,
    },

    /// The converter reported success but produced nothing.
    #[error("converter '{program}' did not produce '{path}'")]
    MissingOutput { program: String, path: PathBuf },

    /// In-process decoder failure (unsupported compression, bad container...).
    #[error("{0}")]
    Decoder(String),

    /// The OCR engine failed on an embedded image.
    #[error("text recognition failed: {0}")]
    Recognition(String),
}

/// A non-fatal error for a single candidate file.
///
/// The `Display` output is exactly the message recorded in the summary.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("Failed to download {name}: {source}")]
    Download {
        name: String,
        #[source]
        source: RemoteError,
    },

    #[error("Failed to convert {name}: {source}")]
    Convert {
        name: String,
        #[source]
        source: ConversionError,
    },

    #[error("Failed to save enhanced file for {name}: {source}")]
    Enrich {
        name: String,
        #[source]
        source: std::io::Error,
    },
}
