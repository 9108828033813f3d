//! Integration tests for the full batch pipeline.
//!
//! Box is played by a wiremock server; conversion is done in-process by a
//! fake converter so no iwork-converter install is needed.
//!
//! Run with:
//!   cargo test --test batch -- --nocapture

use async_trait::async_trait;
use iwork_box::{
    write_report, BatchConfig, BatchError, BatchOrchestrator, BatchProgressCallback,
    ConversionError, ConversionContext, ConversionInvoker, DocumentConverter, OutputFormat,
    RemoteError,
};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Route library logs through the test harness (`RUST_LOG=debug` to see them).
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Writes fixed content for every input, except inputs whose file name
/// contains `broken` (conversion error) or `silent` (claims success but
/// writes nothing).
struct FakeConverter {
    content: &'static [u8],
}

#[async_trait]
impl DocumentConverter for FakeConverter {
    async fn convert(
        &self,
        input: &Path,
        output: &Path,
        _ctx: &ConversionContext,
    ) -> Result<(), ConversionError> {
        let name = input.file_name().unwrap().to_string_lossy().into_owned();
        assert!(input.exists(), "scratch copy of {name} must exist during conversion");
        if name.contains("broken") {
            return Err(ConversionError::Decoder("not a valid iWork archive".into()));
        }
        if name.contains("silent") {
            return Ok(());
        }
        tokio::fs::write(output, self.content)
            .await
            .map_err(|e| ConversionError::Decoder(e.to_string()))
    }

    fn name(&self) -> &str {
        "fake"
    }
}

fn invoker(content: &'static [u8]) -> ConversionInvoker {
    let conv = Arc::new(FakeConverter { content });
    ConversionInvoker::new(conv.clone(), conv)
}

fn file(id: &str, name: &str, size: u64) -> Value {
    json!({
        "type": "file",
        "id": id,
        "name": name,
        "size": size,
        "modified_at": "2024-03-01T10:15:00-08:00"
    })
}

async fn mount_listing(server: &MockServer, folder: &str, entries: Vec<Value>) {
    let total = entries.len();
    Mock::given(method("GET"))
        .and(path(format!("/folders/{folder}/items")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": total,
            "offset": 0,
            "limit": 1000,
            "entries": entries,
        })))
        .mount(server)
        .await;
}

async fn mount_download(server: &MockServer, id: &str, status: u16, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/files/{id}/content")))
        .respond_with(ResponseTemplate::new(status).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

fn config(server: &MockServer, dir: &TempDir, format: OutputFormat) -> BatchConfig {
    BatchConfig::builder()
        .access_token("test-token")
        .base_url(server.uri())
        .folder_id("100")
        .output_format(format)
        .output_dir(dir.path().join("extracted"))
        .scratch_dir(dir.path().join("temp"))
        .request_timeout_secs(5)
        .build()
        .unwrap()
}

fn scratch_entries(dir: &TempDir) -> Vec<PathBuf> {
    std::fs::read_dir(dir.path().join("temp"))
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect()
}

#[derive(Default)]
struct EventLog(Mutex<Vec<String>>);

impl BatchProgressCallback for EventLog {
    fn on_batch_start(&self, total_files: usize) {
        self.0.lock().unwrap().push(format!("start {total_files}"));
    }
    fn on_file_start(&self, index: usize, total_files: usize, name: &str) {
        self.0.lock().unwrap().push(format!("file {index}/{total_files} {name}"));
    }
    fn on_file_complete(&self, index: usize, _total: usize, _name: &str, output: &Path) {
        let out = output.file_name().unwrap().to_string_lossy().into_owned();
        self.0.lock().unwrap().push(format!("ok {index} {out}"));
    }
    fn on_file_error(&self, index: usize, _total: usize, _error: &str) {
        self.0.lock().unwrap().push(format!("err {index}"));
    }
    fn on_batch_complete(&self, total_files: usize, success_count: usize) {
        self.0.lock().unwrap().push(format!("done {success_count}/{total_files}"));
    }
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn mixed_folder_counts_one_success_and_one_download_failure() {
    init_tracing();
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_listing(
        &server,
        "100",
        vec![
            file("1", "Doc1.pages", 1024),
            file("2", "Doc2.numbers", 2048),
            file("3", "Image.png", 512),
        ],
    )
    .await;
    mount_download(&server, "1", 200, b"PK\x03\x04doc1").await;
    mount_download(&server, "2", 500, b"").await;

    let orch = BatchOrchestrator::with_box_client(config(&server, &dir, OutputFormat::Text), invoker(b"Hello"))
        .unwrap();
    let summary = orch.run().await.unwrap();

    assert_eq!(summary.total_files, 2);
    assert_eq!(summary.successful, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.errors.len(), 1);
    assert!(
        summary.errors[0].starts_with("Failed to download Doc2.numbers: "),
        "got: {}",
        summary.errors[0]
    );
    assert!(summary.is_consistent());

    let record = &summary.processed_files[0];
    assert_eq!(record.original_file, "Doc1.pages");
    assert_eq!(record.file_size, 1024);
    assert!(record.output_path.ends_with("Doc1_extracted.txt"));

    // The image was never requested.
    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.url.path() != "/files/3/content"));

    assert!(scratch_entries(&dir).is_empty());
}

#[tokio::test]
async fn text_output_carries_provenance_header() {
    init_tracing();
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_listing(&server, "100", vec![file("77", "Report.pages", 4096)]).await;
    mount_download(&server, "77", 200, b"zip").await;

    let orch = BatchOrchestrator::with_box_client(config(&server, &dir, OutputFormat::Text), invoker(b"Hello"))
        .unwrap();
    let summary = orch.run().await.unwrap();
    assert_eq!(summary.successful, 1);

    let out = dir.path().join("extracted/Report_extracted.txt");
    let text = std::fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = text.split('\n').collect();

    assert_eq!(lines[0], "# Extracted from: Report.pages");
    assert_eq!(lines[1], "# File ID: 77");
    assert_eq!(lines[2], "# Size: 4096 bytes");
    assert_eq!(lines[3], "# Modified: 2024-03-01T10:15:00-08:00");
    assert!(lines[4].starts_with("# Extracted: "));
    assert_eq!(lines[5], "# Extension: .pages");
    assert_eq!(lines[6], "-".repeat(50));
    assert_eq!(lines[7], "");
    assert_eq!(lines[8], "Hello");
    assert_eq!(lines.len(), 9);
}

#[tokio::test]
async fn html_output_is_converter_output_verbatim() {
    init_tracing();
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_listing(&server, "100", vec![file("5", "Deck.key", 10)]).await;
    mount_download(&server, "5", 200, b"zip").await;

    let html: &'static [u8] = b"<html><body><p>Slide 1</p></body></html>\n";
    let orch = BatchOrchestrator::with_box_client(config(&server, &dir, OutputFormat::Html), invoker(html))
        .unwrap();
    let summary = orch.run().await.unwrap();

    assert_eq!(summary.successful, 1);
    let out = dir.path().join("extracted/Deck_converted.html");
    assert_eq!(std::fs::read(out).unwrap(), html);
}

#[tokio::test]
async fn every_failure_stage_is_isolated_and_cleaned_up() {
    init_tracing();
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_listing(
        &server,
        "100",
        vec![
            file("1", "broken.pages", 1),
            file("2", "missing.numbers", 1),
            file("3", "silent.key", 1),
            file("4", "Good.keynote", 1),
        ],
    )
    .await;
    mount_download(&server, "1", 200, b"zip").await;
    mount_download(&server, "2", 404, b"").await;
    mount_download(&server, "3", 200, b"zip").await;
    mount_download(&server, "4", 200, b"zip").await;

    let orch = BatchOrchestrator::with_box_client(config(&server, &dir, OutputFormat::Text), invoker(b"ok"))
        .unwrap();
    let summary = orch.run().await.unwrap();

    assert_eq!(summary.total_files, 4);
    assert_eq!(summary.successful, 1);
    assert_eq!(summary.failed, 3);
    assert!(summary.is_consistent());
    assert!(summary.errors[0].starts_with("Failed to convert broken.pages: "));
    assert!(summary.errors[1].starts_with("Failed to download missing.numbers: "));
    assert!(summary.errors[2].starts_with("Failed to save enhanced file for silent.key: "));
    assert_eq!(summary.processed_files[0].original_file, "Good.keynote");

    assert!(scratch_entries(&dir).is_empty(), "scratch: {:?}", scratch_entries(&dir));
}

#[tokio::test]
async fn failed_download_leaves_existing_scratch_file_alone() {
    init_tracing();
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_listing(&server, "100", vec![file("1", "Doc.pages", 10)]).await;
    mount_download(&server, "1", 404, b"").await;

    let existing = dir.path().join("temp/Doc.pages");
    std::fs::create_dir_all(existing.parent().unwrap()).unwrap();
    std::fs::write(&existing, "user's own file").unwrap();

    let orch = BatchOrchestrator::with_box_client(config(&server, &dir, OutputFormat::Text), invoker(b"x"))
        .unwrap();
    let summary = orch.run().await.unwrap();

    assert_eq!(summary.failed, 1);
    assert!(summary.errors[0].starts_with("Failed to download Doc.pages: "));
    assert_eq!(std::fs::read_to_string(&existing).unwrap(), "user's own file");
}

#[tokio::test]
async fn rejected_download_is_a_single_line_error() {
    init_tracing();
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_listing(&server, "100", vec![file("1", "Locked.key", 10)]).await;
    mount_download(&server, "1", 401, b"").await;

    let orch = BatchOrchestrator::with_box_client(config(&server, &dir, OutputFormat::Text), invoker(b"x"))
        .unwrap();
    let summary = orch.run().await.unwrap();

    assert_eq!(summary.failed, 1);
    assert!(summary.errors[0].starts_with("Failed to download Locked.key: unauthorized: "));
    assert!(!summary.errors[0].contains('\n'), "got: {:?}", summary.errors[0]);
}

#[tokio::test]
async fn empty_token_aborts_before_any_report() {
    init_tracing();
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = BatchConfig::builder()
        .base_url(server.uri())
        .output_dir(dir.path().join("extracted"))
        .scratch_dir(dir.path().join("temp"))
        .build()
        .unwrap();
    let orch = BatchOrchestrator::with_box_client(config, invoker(b"x")).unwrap();
    let err = orch.run().await.unwrap_err();

    assert!(err.is_unauthorized(), "got: {err}");
    assert!(matches!(
        err,
        BatchError::ListingFailed {
            source: RemoteError::Unauthorized { .. },
            ..
        }
    ));
    let reports = std::fs::read_dir(dir.path().join("extracted")).unwrap().count();
    assert_eq!(reports, 0);
}

#[tokio::test]
async fn rejected_token_aborts_the_run() {
    init_tracing();
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .and(path("/folders/100/items"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let orch = BatchOrchestrator::with_box_client(config(&server, &dir, OutputFormat::Text), invoker(b"x"))
        .unwrap();
    let err = orch.run().await.unwrap_err();
    assert!(err.is_unauthorized(), "got: {err}");
}

#[tokio::test]
async fn empty_folder_still_produces_a_report() {
    init_tracing();
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_listing(&server, "100", vec![json!({"type": "folder", "id": "9", "name": "Sub.pages"})]).await;

    let orch = BatchOrchestrator::with_box_client(config(&server, &dir, OutputFormat::Text), invoker(b"x"))
        .unwrap();
    let summary = orch.run().await.unwrap();
    assert_eq!(summary.total_files, 0);
    assert_eq!(summary.successful + summary.failed, 0);
    assert!(summary.end_time >= summary.start_time);

    let report = write_report(&summary, &orch.config().output_dir).await.unwrap();
    let v: Value = serde_json::from_str(&std::fs::read_to_string(report).unwrap()).unwrap();
    assert_eq!(v["total_files"], 0);
    assert_eq!(v["errors"], json!([]));
    assert_eq!(v["processed_files"], json!([]));
}

#[tokio::test]
async fn same_base_name_gets_distinct_outputs() {
    init_tracing();
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_listing(
        &server,
        "100",
        vec![file("1", "Plan.pages", 1), file("2", "Plan.key", 1)],
    )
    .await;
    mount_download(&server, "1", 200, b"zip").await;
    mount_download(&server, "2", 200, b"zip").await;

    let orch = BatchOrchestrator::with_box_client(config(&server, &dir, OutputFormat::Html), invoker(b"<p/>"))
        .unwrap();
    let summary = orch.run().await.unwrap();

    assert_eq!(summary.successful, 2);
    assert!(dir.path().join("extracted/Plan_converted.html").exists());
    assert!(dir.path().join("extracted/Plan_key_converted.html").exists());
}

#[tokio::test]
async fn progress_events_follow_listing_order() {
    init_tracing();
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_listing(
        &server,
        "100",
        vec![file("1", "A.pages", 1), file("2", "B.numbers", 1)],
    )
    .await;
    mount_download(&server, "1", 200, b"zip").await;
    mount_download(&server, "2", 503, b"").await;

    let log = Arc::new(EventLog::default());
    let config = BatchConfig::builder()
        .access_token("test-token")
        .base_url(server.uri())
        .folder_id("100")
        .output_dir(dir.path().join("extracted"))
        .scratch_dir(dir.path().join("temp"))
        .progress_callback(log.clone())
        .build()
        .unwrap();
    let orch = BatchOrchestrator::with_box_client(config, invoker(b"x")).unwrap();
    orch.run().await.unwrap();

    assert_eq!(
        *log.0.lock().unwrap(),
        vec![
            "start 2",
            "file 1/2 A.pages",
            "ok 1 A_extracted.txt",
            "file 2/2 B.numbers",
            "err 2",
            "done 1/2",
        ]
    );
}
