//! CLI binary for iwork-box.
//!
//! A thin shim over the library crate that maps CLI flags and environment
//! variables to `BatchConfig`, runs the batch, and prints the summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use iwork_box::output::format_elapsed;
use iwork_box::{
    convert_file, write_report, BatchConfig, BatchOrchestrator, BatchProgressCallback,
    CommandConverter, ConversionInvoker, OutputFormat, ProcessingSummary, ProgressCallback,
    DEFAULT_BASE_URL,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress bar with one log line per file.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Listing");
        bar.set_message("Reading Box folder…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_files: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");

        self.bar.set_length(total_files as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Converting");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Found {total_files} iWork files"))
        ));
    }

    fn on_file_start(&self, _index: usize, _total: usize, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn on_file_complete(&self, index: usize, total: usize, name: &str, output: &Path) {
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  →  {}",
            green("✓"),
            index,
            total,
            name,
            output.display()
        ));
        self.bar.inc(1);
    }

    fn on_file_error(&self, index: usize, total: usize, error: &str) {
        let msg = if error.chars().count() > 100 {
            let cut: String = error.chars().take(99).collect();
            format!("{cut}\u{2026}")
        } else {
            error.to_string()
        };
        self.bar.println(format!("  {} {:>3}/{:<3}  {}", red("✗"), index, total, red(&msg)));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, _total: usize, _success_count: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert a single file (format follows the destination suffix)
  iwork-box document.pages document.txt
  iwork-box document.pages document.html

  # Process the root folder of a Box account
  iwork-box --box --token your_token

  # Process one folder to HTML
  iwork-box --box --token your_token --folder 123456 --format html

ENVIRONMENT VARIABLES:
  BOX_ACCESS_TOKEN        Box API access token
  BOX_FOLDER_ID           Box folder ID
  OUTPUT_DIR              Output directory
  TEMP_DIR                Scratch directory for downloads
  BOX_API_BASE_URL        Override the Box API endpoint
  IWORK_TEXT_CONVERTER    Program used for text output (default: iwork2text)
  IWORK_HTML_CONVERTER    Program used for HTML output (default: iwork2html)

CONVERTERS:
  Conversion is delegated to external programs invoked as
  `<program> <input> <output>`. The iwork-converter tools iwork2text and
  iwork2html follow this convention and are looked up on PATH.
"#;

/// Convert iWork documents stored in Box to text or HTML.
#[derive(Parser, Debug)]
#[command(
    name = "iwork-box",
    version,
    about = "Convert iWork files (Pages, Numbers, Keynote) to text or HTML, one at a time or a whole Box folder",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input iWork file (single-file mode).
    #[arg(required_unless_present = "box_mode")]
    input: Option<PathBuf>,

    /// Destination file; `.txt` selects text output, anything else HTML.
    #[arg(value_name = "OUTPUT", required_unless_present = "box_mode")]
    output_file: Option<PathBuf>,

    /// Enable Box processing mode.
    #[arg(long = "box")]
    box_mode: bool,

    /// Box API access token.
    #[arg(long, env = "BOX_ACCESS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Box folder ID ("0" is the root folder).
    #[arg(long, env = "BOX_FOLDER_ID", default_value = "0")]
    folder: String,

    /// Output format for Box mode.
    #[arg(long, value_enum, default_value = "txt")]
    format: FormatArg,

    /// Output directory for converted files and the report.
    #[arg(long, env = "OUTPUT_DIR", default_value = "./extracted")]
    output: PathBuf,

    /// Scratch directory for downloads.
    #[arg(long, env = "TEMP_DIR", default_value = "./temp")]
    temp: PathBuf,

    /// Box API base URL.
    #[arg(long, env = "BOX_API_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Extra attempts for transiently failing downloads.
    #[arg(long, default_value_t = 0)]
    retries: u32,

    /// Program used for text output.
    #[arg(long, env = "IWORK_TEXT_CONVERTER", default_value = "iwork2text")]
    text_converter: String,

    /// Program used for HTML output.
    #[arg(long, env = "IWORK_HTML_CONVERTER", default_value = "iwork2html")]
    html_converter: String,

    /// Disable progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Txt,
    Html,
}

impl From<FormatArg> for OutputFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Txt => OutputFormat::Text,
            FormatArg::Html => OutputFormat::Html,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs while it is visible.
    let show_progress = cli.box_mode && !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    if cli.box_mode {
        run_box(&cli, show_progress).await
    } else {
        run_single(&cli).await
    }
}

/// Single-file conversion: `iwork-box input.pages output.txt`.
async fn run_single(cli: &Cli) -> Result<()> {
    let (Some(input), Some(output)) = (&cli.input, &cli.output_file) else {
        anyhow::bail!("single-file mode needs <INPUT> and <OUTPUT>");
    };

    let format = OutputFormat::from_output_path(output);
    let invoker = build_invoker(cli, format)?;
    convert_file(input, output, &invoker)
        .await
        .context("Conversion failed")?;

    if !cli.quiet {
        eprintln!("{} {} → {}", green("✔"), input.display(), bold(&output.display().to_string()));
    }
    Ok(())
}

/// Batch mode: process a whole Box folder.
async fn run_box(cli: &Cli, show_progress: bool) -> Result<()> {
    let format: OutputFormat = cli.format.into();
    let mut config = build_config(cli, format)?;

    // A missing token aborts the run before anything else is checked.
    config.require_token().context("Processing failed")?;
    let invoker = build_invoker(cli, format)?;

    if show_progress {
        config.progress_callback = Some(CliProgressCallback::new() as ProgressCallback);
    }

    if !cli.quiet {
        println!("Starting Box iWork processing...");
        println!("Folder ID: {}", config.folder_id);
        println!("Output format: {}", config.output_format);
        println!("Output directory: {}", config.output_dir.display());
    }

    let orchestrator = BatchOrchestrator::with_box_client(config, invoker)?;
    let summary = orchestrator.run().await.context("Processing failed")?;

    let report_path = match write_report(&summary, &cli.output).await {
        Ok(path) => Some(path),
        Err(e) => {
            tracing::error!("Failed to generate report: {}", e);
            eprintln!("{} Failed to generate report: {}", red("✘"), e);
            None
        }
    };

    if !cli.quiet {
        print_summary(&summary, report_path.as_deref(), &cli.output);
    }
    Ok(())
}

/// Map CLI args to `BatchConfig`.
fn build_config(cli: &Cli, format: OutputFormat) -> Result<BatchConfig> {
    BatchConfig::builder()
        .folder_id(cli.folder.clone())
        .output_format(format)
        .output_dir(cli.output.clone())
        .scratch_dir(cli.temp.clone())
        .access_token(cli.token.clone().unwrap_or_default())
        .base_url(cli.base_url.clone())
        .request_timeout_secs(cli.timeout)
        .download_retries(cli.retries)
        .build()
        .context("Invalid configuration")
}

/// Resolve the converter needed for `format` on PATH; the other one is only
/// constructed, never checked.
fn build_invoker(cli: &Cli, format: OutputFormat) -> Result<ConversionInvoker> {
    let resolve = |program: &str, needed: bool| -> Result<CommandConverter> {
        match CommandConverter::from_path(program) {
            Some(conv) => Ok(conv),
            None if needed => anyhow::bail!(
                "converter '{program}' not found on PATH\n\
                 Install the iwork-converter tools or pass --text-converter / --html-converter."
            ),
            None => Ok(CommandConverter::new(program)),
        }
    };

    let text = resolve(&cli.text_converter, format == OutputFormat::Text)?;
    let html = resolve(&cli.html_converter, format == OutputFormat::Html)?;
    tracing::debug!(
        "Converters: text={}, html={}",
        text.program().display(),
        html.program().display()
    );
    Ok(ConversionInvoker::new(Arc::new(text), Arc::new(html)))
}

fn print_summary(summary: &ProcessingSummary, report_path: Option<&Path>, output_dir: &Path) {
    let rule = "=".repeat(50);
    println!("\n{rule}");
    println!("PROCESSING SUMMARY");
    println!("{rule}");
    println!("Total files found: {}", summary.total_files);
    println!("Successfully processed: {}", summary.successful);
    println!("Failed: {}", summary.failed);
    println!("Processing time: {}", format_elapsed(summary.duration));

    if !summary.errors.is_empty() {
        println!("\nErrors:");
        for err in &summary.errors {
            println!("  - {}", err);
        }
    }

    if let Some(path) = report_path {
        println!("\nDetailed report: {}", path.display());
    }
    println!("Output files: {}", output_dir.display());
}
