//! Conversion dispatch: hand a downloaded document to the external decoder.
//!
//! This crate does not parse iWork containers. [`DocumentConverter`] is the
//! boundary to whatever does (an in-process decoder, or an external program
//! through [`CommandConverter`]). [`ConversionInvoker`] holds one converter per
//! [`OutputFormat`] and its only logic is picking the right one.
//!
//! ## Shared OCR engine
//!
//! Converters that recognise text in embedded images need an OCR engine that
//! is expensive to initialise. Instead of a process-wide global, the caller
//! builds the engine once, puts it into a [`ConversionContext`] and passes the
//! context to [`ConversionInvoker::with_context`]. The invoker hands the same
//! context to every call for the rest of the run; it never rebuilds it.

use crate::config::OutputFormat;
use crate::error::ConversionError;
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::Command;
use tracing::debug;

/// Image-text recognition, consumed as an opaque collaborator.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image: &[u8]) -> Result<String, ConversionError>;
}

/// Run-wide conversion settings, fixed at construction time.
#[derive(Clone, Default)]
pub struct ConversionContext {
    /// OCR engine shared by every conversion in the run.
    pub recognizer: Option<Arc<dyn TextRecognizer>>,
}

impl ConversionContext {
    pub fn with_recognizer(recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self {
            recognizer: Some(recognizer),
        }
    }
}

impl fmt::Debug for ConversionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionContext")
            .field("recognizer", &self.recognizer.as_ref().map(|_| "<dyn TextRecognizer>"))
            .finish()
    }
}

/// Decode the document at `input` and write the result to `output`.
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    async fn convert(
        &self,
        input: &Path,
        output: &Path,
        ctx: &ConversionContext,
    ) -> Result<(), ConversionError>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

/// Format-to-converter dispatch.
#[derive(Clone)]
pub struct ConversionInvoker {
    text: Arc<dyn DocumentConverter>,
    html: Arc<dyn DocumentConverter>,
    ctx: ConversionContext,
}

impl ConversionInvoker {
    pub fn new(text: Arc<dyn DocumentConverter>, html: Arc<dyn DocumentConverter>) -> Self {
        Self {
            text,
            html,
            ctx: ConversionContext::default(),
        }
    }

    /// Attach the run-wide context (OCR engine etc.).
    pub fn with_context(mut self, ctx: ConversionContext) -> Self {
        self.ctx = ctx;
        self
    }

    /// The converter that handles `format`.
    pub fn converter_for(&self, format: OutputFormat) -> &Arc<dyn DocumentConverter> {
        match format {
            OutputFormat::Text => &self.text,
            OutputFormat::Html => &self.html,
        }
    }

    /// Convert `input` into `output` using the converter for `format`.
    pub async fn invoke(
        &self,
        input: &Path,
        output: &Path,
        format: OutputFormat,
    ) -> Result<(), ConversionError> {
        let converter = self.converter_for(format);
        debug!(
            "Converting {} → {} via {}",
            input.display(),
            output.display(),
            converter.name()
        );
        converter.convert(input, output, &self.ctx).await
    }
}

impl fmt::Debug for ConversionInvoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionInvoker")
            .field("text", &self.text.name())
            .field("html", &self.html.name())
            .field("ctx", &self.ctx)
            .finish()
    }
}

/// Converter backed by an external program.
///
/// Runs `program [args…] <input> <output>` and treats a non-zero exit as a
/// conversion failure. The iwork-converter tools (`iwork2text`,
/// `iwork2html`) follow this calling convention. External programs run
/// their own OCR, so the context's recognizer is not forwarded.
#[derive(Debug, Clone)]
pub struct CommandConverter {
    program: PathBuf,
    args: Vec<String>,
    label: String,
}

impl CommandConverter {
    /// Create a converter with an explicit program path.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        let label = program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.display().to_string());
        Self {
            program,
            args: Vec::new(),
            label,
        }
    }

    /// Look `program` up on `PATH` (or accept it as-is if it is a path).
    ///
    /// Returns `None` when it cannot be found.
    pub fn from_path(program: &str) -> Option<Self> {
        which::which(program).ok().map(Self::new)
    }

    /// Arguments placed before the input and output paths.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

#[async_trait]
impl DocumentConverter for CommandConverter {
    async fn convert(
        &self,
        input: &Path,
        output: &Path,
        _ctx: &ConversionContext,
    ) -> Result<(), ConversionError> {
        let result = Command::new(&self.program)
            .args(&self.args)
            .arg(input)
            .arg(output)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ConversionError::Spawn {
                program: self.label.clone(),
                source,
            })?;

        if !result.status.success() {
            return Err(ConversionError::ToolFailed {
                program: self.label.clone(),
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        if !tokio::fs::try_exists(output).await.unwrap_or(false) {
            return Err(ConversionError::MissingOutput {
                program: self.label.clone(),
                path: output.to_path_buf(),
            });
        }

        Ok(())
    }

    fn name(&self) -> &str {
        &self.label
    }
}
