//! Upload loop scenarios against a mock service and an in-memory store

#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use ragup_cli::api::{ApiClient, UploadRequest};
use ragup_cli::config::{Config, StateDir};
use ragup_cli::cursor::CursorFile;
use ragup_cli::failures::FailureLog;
use ragup_cli::naming::upload_name;
use ragup_cli::orchestrator::{Orchestrator, ParseOutcome, RunReport};
use ragup_cli::store::{Document, DocumentBackend, DocumentFilter, MetadataStore};
use ragup_cli::{CliError, Result};
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// In-memory metadata store
// ============================================================================

/// Store fake: documents by name, plus a scripted progress sequence per id.
/// The last progress value of a script repeats once the rest is consumed.
#[derive(Default)]
struct FakeBackend {
    by_name: Mutex<HashMap<String, Document>>,
    progress: Mutex<HashMap<String, VecDeque<f64>>>,
    queries: Mutex<Vec<DocumentFilter>>,
    unreachable: AtomicBool,
}

impl FakeBackend {
    fn with_document(self, name: &str, id: &str, progress: f64) -> Self {
        self.by_name.lock().unwrap().insert(
            name.to_string(),
            Document {
                id: id.to_string(),
                name: name.to_string(),
                progress,
            },
        );
        self
    }

    fn with_progress(self, id: &str, script: &[f64]) -> Self {
        self.progress
            .lock()
            .unwrap()
            .insert(id.to_string(), script.iter().copied().collect());
        self
    }

    fn unreachable(self) -> Self {
        self.unreachable.store(true, Ordering::SeqCst);
        self
    }

    fn queries(&self) -> Vec<DocumentFilter> {
        self.queries.lock().unwrap().clone()
    }

    fn name_queries(&self) -> Vec<String> {
        self.queries()
            .into_iter()
            .filter_map(|f| match f {
                DocumentFilter::Name { name, .. } => Some(name),
                _ => None,
            })
            .collect()
    }

    fn id_queries(&self) -> usize {
        self.queries()
            .iter()
            .filter(|f| matches!(f, DocumentFilter::Id(_)))
            .count()
    }
}

#[async_trait]
impl DocumentBackend for FakeBackend {
    async fn fetch(&self, filter: &DocumentFilter) -> Result<Vec<Document>> {
        self.queries.lock().unwrap().push(filter.clone());

        let found = match filter {
            DocumentFilter::Name { name, .. } => self.by_name.lock().unwrap().get(name).cloned(),
            DocumentFilter::Id(id) => {
                let mut scripts = self.progress.lock().unwrap();
                scripts.get_mut(id).and_then(|script| {
                    let progress = if script.len() > 1 {
                        script.pop_front()
                    } else {
                        script.front().copied()
                    };
                    progress.map(|progress| Document {
                        id: id.clone(),
                        name: String::new(),
                        progress,
                    })
                })
            },
            DocumentFilter::KnowledgeBase(_) => None,
        };

        Ok(found.into_iter().collect())
    }

    async fn ping(&self) -> Result<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(CliError::connectivity("connection refused"));
        }
        Ok(())
    }

    async fn reset(&self) {}
}

// ============================================================================
// Fixtures
// ============================================================================

struct Harness {
    server: MockServer,
    docs: TempDir,
    state: TempDir,
    config: Config,
}

impl Harness {
    async fn new() -> Self {
        let server = MockServer::start().await;
        let docs = TempDir::new().unwrap();
        let state = TempDir::new().unwrap();

        let mut config = Config::default();
        config.api.url = format!("{}/v1", server.uri());
        config.api.authorization = "test-token".to_string();
        config.knowledge_base.id = "kb1".to_string();
        config.knowledge_base.name = "docs".to_string();
        config.documents.dir = docs.path().to_path_buf();
        config.store.retry_interval_secs = 0;
        config.upload.poll_interval_secs = 0;
        config.state_dir = StateDir(state.path().to_path_buf());

        Self {
            server,
            docs,
            state,
            config,
        }
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.docs.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn cursor(&self) -> CursorFile {
        CursorFile::for_knowledge_base(self.state.path(), "kb1", "docs")
    }

    fn failure_log(&self) -> String {
        fs::read_to_string(FailureLog::in_dir(self.state.path()).path()).unwrap_or_default()
    }

    async fn healthy(&self) {
        Mock::given(method("GET"))
            .and(path("/v1/system/version"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"code": 0, "data": "v0.17.2", "message": "success"})),
            )
            .mount(&self.server)
            .await;
    }

    async fn upload_returns(&self, response: ResponseTemplate, expected: u64) {
        Mock::given(method("POST"))
            .and(path("/v1/document/upload"))
            .respond_with(response)
            .expect(expected)
            .mount(&self.server)
            .await;
    }

    async fn parse_accepts(&self, expected: u64) {
        Mock::given(method("POST"))
            .and(path("/v1/document/run"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0, "data": true})))
            .expect(expected)
            .mount(&self.server)
            .await;
    }

    fn orchestrator(&self, backend: FakeBackend, cancel: CancellationToken) -> Orchestrator<FakeBackend> {
        let store = MetadataStore::new(backend, Some("kb1".to_string())).with_cancellation(cancel.clone());
        Orchestrator::new(
            self.config.clone(),
            ApiClient::new(&self.config.api).unwrap(),
            store,
            self.cursor(),
            FailureLog::in_dir(self.state.path()),
            cancel,
        )
    }

    async fn run(&self, backend: FakeBackend) -> (Result<RunReport>, Orchestrator<FakeBackend>) {
        let orchestrator = self.orchestrator(backend, CancellationToken::new());
        let result = orchestrator.run().await;
        (result, orchestrator)
    }
}

fn uploaded_as(id: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"code": 0, "data": [{"id": id}], "message": "success"}))
}

// ============================================================================
// Classification
// ============================================================================

#[tokio::test]
async fn test_short_text_file_is_skipped_without_calls() {
    let mut h = Harness::new().await;
    h.config.documents.min_lines = 5;
    h.write("short.md", "just one line\n");
    h.healthy().await;
    h.upload_returns(uploaded_as("doc-1"), 0).await;
    h.parse_accepts(0).await;

    let (result, orchestrator) = h.run(FakeBackend::default()).await;
    let report = result.unwrap();

    assert_eq!(report.skipped_short, 1);
    assert_eq!(report.processed, 1);
    assert!(orchestrator.store().backend().queries().is_empty());
    assert_eq!(h.cursor().load().unwrap(), 1);
}

#[tokio::test]
async fn test_short_file_skipped_while_long_file_goes_to_dedup() {
    let mut h = Harness::new().await;
    h.config.documents.min_lines = 1;
    let a = h.write("a.md", "1\n2\n3\n4\n5\n");
    h.write("b.md", "");
    h.healthy().await;
    h.upload_returns(uploaded_as("doc-1"), 0).await;
    h.parse_accepts(0).await;

    let backend = FakeBackend::default().with_document(&upload_name(&a), "doc-a", 1.0);
    let (result, orchestrator) = h.run(backend).await;
    let report = result.unwrap();

    assert_eq!(report.processed, 2);
    assert_eq!(report.skipped_short, 1);
    assert_eq!(report.already_parsed, 1);

    let backend = orchestrator.store().backend();
    assert_eq!(backend.queries().len(), 1);
    assert_eq!(backend.name_queries(), vec![upload_name(&a)]);
}

#[tokio::test]
async fn test_line_check_ignores_binary_formats() {
    let mut h = Harness::new().await;
    h.config.documents.min_lines = 100;
    let pdf = h.write("paper.pdf", "%PDF-1.4");
    h.healthy().await;
    h.upload_returns(uploaded_as("doc-1"), 0).await;

    let backend = FakeBackend::default().with_document(&upload_name(&pdf), "doc-1", 1.0);
    let (result, _) = h.run(backend).await;

    assert_eq!(result.unwrap().already_parsed, 1);
}

#[tokio::test]
async fn test_complete_duplicates_are_not_uploaded() {
    let h = Harness::new().await;
    let a = h.write("a.md", "alpha\n");
    let b = h.write("b.md", "beta\n");
    h.healthy().await;
    h.upload_returns(uploaded_as("doc-1"), 0).await;
    h.parse_accepts(0).await;

    let backend = FakeBackend::default()
        .with_document(&upload_name(&a), "doc-a", 1.0)
        .with_document(&upload_name(&b), "doc-b", 1.0);
    let (result, orchestrator) = h.run(backend).await;
    let report = result.unwrap();

    assert_eq!(report.already_parsed, 2);
    assert_eq!(report.uploaded, 0);
    assert_eq!(h.cursor().load().unwrap(), 2);
    // Dedup is a single lookup per file
    assert_eq!(orchestrator.store().backend().name_queries().len(), 2);
}

#[tokio::test]
async fn test_pending_duplicate_is_parsed_without_upload() {
    let h = Harness::new().await;
    let a = h.write("a.md", "alpha\n");
    h.healthy().await;
    h.upload_returns(uploaded_as("doc-1"), 0).await;
    Mock::given(method("POST"))
        .and(path("/v1/document/run"))
        .and(body_json(json!({"doc_ids": ["doc-9"], "run": 1})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"retcode": 0})))
        .expect(1)
        .mount(&h.server)
        .await;

    let backend = FakeBackend::default()
        .with_document(&upload_name(&a), "doc-9", 0.0)
        .with_progress("doc-9", &[1.0]);
    let (result, _) = h.run(backend).await;
    let report = result.unwrap();

    assert_eq!(report.completed, 1);
    assert_eq!(report.uploaded, 0);
}

#[tokio::test]
async fn test_pending_duplicate_left_alone_in_upload_only_mode() {
    let mut h = Harness::new().await;
    h.config.upload.only_upload = true;
    let a = h.write("a.md", "alpha\n");
    h.healthy().await;
    h.upload_returns(uploaded_as("doc-1"), 0).await;
    h.parse_accepts(0).await;

    let backend = FakeBackend::default().with_document(&upload_name(&a), "doc-9", 0.4);
    let (result, _) = h.run(backend).await;

    assert_eq!(result.unwrap().already_uploaded, 1);
}

// ============================================================================
// Upload
// ============================================================================

#[tokio::test]
async fn test_upload_failure_skips_parse_and_continues() {
    let h = Harness::new().await;
    h.write("a.md", "alpha\n");
    h.write("b.md", "beta\n");
    h.healthy().await;
    h.upload_returns(ResponseTemplate::new(500), 2).await;
    h.parse_accepts(0).await;

    let (result, _) = h.run(FakeBackend::default()).await;
    let report = result.unwrap();

    assert_eq!(report.upload_failed, 2);
    assert_eq!(report.processed, 2);
    assert!(!report.cancelled);
    assert_eq!(h.cursor().load().unwrap(), 2);
}

#[tokio::test]
async fn test_rejected_envelope_counts_as_upload_failure() {
    let h = Harness::new().await;
    h.write("a.md", "alpha\n");
    h.healthy().await;
    h.upload_returns(
        ResponseTemplate::new(200).set_body_json(json!({"code": 101, "message": "Duplicated name"})),
        1,
    )
    .await;
    h.parse_accepts(0).await;

    let (result, _) = h.run(FakeBackend::default()).await;
    assert_eq!(result.unwrap().upload_failed, 1);
}

#[tokio::test]
async fn test_upload_request_sends_form_fields() {
    let h = Harness::new().await;
    Mock::given(method("POST"))
        .and(path("/v1/document/upload"))
        .and(wiremock::matchers::body_string_contains("guides_intro_098f6bcd.md"))
        .and(wiremock::matchers::body_string_contains("naive"))
        .respond_with(uploaded_as("doc-7"))
        .expect(1)
        .mount(&h.server)
        .await;

    let api = ApiClient::new(&h.config.api).unwrap();
    let request = UploadRequest {
        file_name: "guides_intro_098f6bcd.md",
        kb_name: "docs",
        kb_id: "kb1",
        parser_id: Some("naive"),
        run: Some("1"),
    };
    let response = api.upload_document(b"test".to_vec(), &request).await;

    assert!(response.is_success());
    assert_eq!(response.first_document_id().as_deref(), Some("doc-7"));
}

#[tokio::test]
async fn test_upload_only_mode_never_parses() {
    let mut h = Harness::new().await;
    h.config.upload.only_upload = true;
    h.write("a.md", "alpha\n");
    h.healthy().await;
    h.upload_returns(uploaded_as("doc-1"), 1).await;
    h.parse_accepts(0).await;

    let (result, _) = h.run(FakeBackend::default()).await;
    let report = result.unwrap();

    assert_eq!(report.uploaded, 1);
    assert_eq!(report.completed, 0);
}

// ============================================================================
// Parse and wait
// ============================================================================

#[tokio::test]
async fn test_progress_polled_until_complete() {
    let h = Harness::new().await;
    h.write("a.md", "alpha\n");
    h.healthy().await;
    h.upload_returns(uploaded_as("doc-1"), 1).await;
    h.parse_accepts(1).await;

    let backend = FakeBackend::default().with_progress("doc-1", &[0.3, 0.7, 1.0]);
    let (result, orchestrator) = h.run(backend).await;
    let report = result.unwrap();

    assert_eq!(report.uploaded, 1);
    assert_eq!(report.completed, 1);
    assert_eq!(orchestrator.store().backend().id_queries(), 3);
    assert!(h.failure_log().is_empty());
}

#[tokio::test]
async fn test_negative_progress_is_recorded_as_failure() {
    let h = Harness::new().await;
    h.write("a.md", "alpha\n");
    h.write("b.md", "beta\n");
    h.healthy().await;
    h.upload_returns(uploaded_as("doc-1"), 2).await;
    h.parse_accepts(2).await;

    let backend = FakeBackend::default().with_progress("doc-1", &[0.2, -1.0]);
    let (result, _) = h.run(backend).await;
    let report = result.unwrap();

    // The failed file does not stop the run
    assert_eq!(report.parse_failed, 2);
    assert_eq!(report.processed, 2);

    let log = h.failure_log();
    assert_eq!(log.lines().count(), 2);
    assert!(log.contains("parse failed"));
    assert!(log.contains("progress=-1"));
}

#[tokio::test]
async fn test_poll_ceiling_times_out() {
    let mut h = Harness::new().await;
    h.config.upload.max_polls = Some(3);
    h.write("a.md", "alpha\n");
    h.healthy().await;
    h.upload_returns(uploaded_as("doc-1"), 1).await;
    h.parse_accepts(1).await;

    let backend = FakeBackend::default().with_progress("doc-1", &[0.5]);
    let (result, orchestrator) = h.run(backend).await;
    let report = result.unwrap();

    assert_eq!(report.timed_out, 1);
    assert_eq!(report.parse_failed, 0);
    assert_eq!(orchestrator.store().backend().id_queries(), 3);
    assert!(h.failure_log().contains("timed out after 3 polls"));
}

#[tokio::test]
async fn test_missing_document_id_is_looked_up_with_retries() {
    let mut h = Harness::new().await;
    h.config.store.retries = 2;
    h.write("a.md", "alpha\n");
    h.healthy().await;
    h.upload_returns(
        ResponseTemplate::new(200).set_body_json(json!({"code": 0, "data": []})),
        1,
    )
    .await;
    h.parse_accepts(0).await;

    let (result, orchestrator) = h.run(FakeBackend::default()).await;
    let report = result.unwrap();

    assert_eq!(report.not_found, 1);
    // One dedup lookup, then 1 + 2 retries resolving the id
    assert_eq!(orchestrator.store().backend().name_queries().len(), 4);
}

#[tokio::test]
async fn test_trigger_failure_is_reported() {
    let h = Harness::new().await;
    h.write("a.md", "alpha\n");
    h.healthy().await;
    h.upload_returns(uploaded_as("doc-1"), 1).await;
    Mock::given(method("POST"))
        .and(path("/v1/document/run"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"code": 102, "message": "Document not found"})),
        )
        .mount(&h.server)
        .await;

    let (result, _) = h.run(FakeBackend::default().with_progress("doc-1", &[1.0])).await;
    assert_eq!(result.unwrap().trigger_failed, 1);
}

#[tokio::test]
async fn test_parse_and_wait_direct() {
    let h = Harness::new().await;
    h.parse_accepts(1).await;

    let orchestrator = h.orchestrator(
        FakeBackend::default().with_progress("doc-7", &[0.1, 1.0]),
        CancellationToken::new(),
    );
    let outcome = orchestrator.parse_and_wait("x_a_1234abcd.md", Some("doc-7".to_string())).await;
    assert_eq!(outcome, ParseOutcome::Completed);
}

// ============================================================================
// Cursor
// ============================================================================

#[tokio::test]
async fn test_resume_processes_only_remaining_files() {
    let h = Harness::new().await;
    let files: Vec<PathBuf> = ["a.md", "b.md", "c.md", "d.md"]
        .iter()
        .map(|name| h.write(name, name))
        .collect();
    h.cursor().save(3).unwrap();
    h.healthy().await;
    h.upload_returns(uploaded_as("doc-1"), 0).await;

    let mut backend = FakeBackend::default();
    for (i, file) in files.iter().enumerate() {
        backend = backend.with_document(&upload_name(file), &format!("doc-{}", i), 1.0);
    }

    let (result, orchestrator) = h.run(backend).await;
    let report = result.unwrap();

    assert_eq!(report.start_index, 3);
    assert_eq!(report.total, 4);
    assert_eq!(report.processed, 2);
    assert_eq!(
        orchestrator.store().backend().name_queries(),
        vec![upload_name(&files[2]), upload_name(&files[3])]
    );
    assert_eq!(h.cursor().load().unwrap(), 4);
}

#[tokio::test]
async fn test_cursor_past_end_is_rejected() {
    let h = Harness::new().await;
    h.write("a.md", "alpha\n");
    h.write("b.md", "beta\n");
    h.cursor().save(5).unwrap();
    h.healthy().await;

    let (result, _) = h.run(FakeBackend::default()).await;
    match result {
        Err(CliError::StartIndexOutOfRange { start, total, cursor }) => {
            assert_eq!((start, total), (5, 2));
            assert_eq!(cursor, h.cursor().path());
        },
        other => panic!("expected StartIndexOutOfRange, got {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_directory_is_rejected() {
    let h = Harness::new().await;
    h.write("notes.rs", "fn main() {}");
    h.healthy().await;

    let (result, _) = h.run(FakeBackend::default()).await;
    assert!(matches!(result, Err(CliError::NoDocuments(_))));
}

// ============================================================================
// Preflight
// ============================================================================

#[tokio::test]
async fn test_unreachable_store_aborts_before_health_check() {
    let h = Harness::new().await;
    h.write("a.md", "alpha\n");
    Mock::given(method("GET"))
        .and(path("/v1/system/version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0})))
        .expect(0)
        .mount(&h.server)
        .await;

    let (result, _) = h.run(FakeBackend::default().unreachable()).await;
    assert!(matches!(result, Err(CliError::Connectivity(_))));
    assert!(!h.cursor().path().exists());
}

#[tokio::test]
async fn test_unauthorized_service_aborts_run() {
    let h = Harness::new().await;
    h.write("a.md", "alpha\n");
    Mock::given(method("GET"))
        .and(path("/v1/system/version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 401, "message": "Unauthorized"})))
        .mount(&h.server)
        .await;
    h.upload_returns(uploaded_as("doc-1"), 0).await;

    let (result, _) = h.run(FakeBackend::default()).await;
    let err = result.unwrap_err();
    assert!(matches!(err, CliError::Connectivity(_)));
    assert!(err.to_string().contains("authorization"));
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn test_cancelled_before_first_file() {
    let h = Harness::new().await;
    h.write("a.md", "alpha\n");
    h.healthy().await;
    h.upload_returns(uploaded_as("doc-1"), 0).await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let report = h.orchestrator(FakeBackend::default(), cancel).run().await.unwrap();

    assert!(report.cancelled);
    assert_eq!(report.processed, 0);
}

#[tokio::test]
async fn test_cancel_interrupts_polling() {
    let mut h = Harness::new().await;
    h.config.upload.poll_interval_secs = 3600;
    h.write("a.md", "alpha\n");
    h.write("b.md", "beta\n");
    h.healthy().await;
    h.upload_returns(uploaded_as("doc-1"), 1).await;
    h.parse_accepts(1).await;

    let cancel = CancellationToken::new();
    let orchestrator = h.orchestrator(FakeBackend::default().with_progress("doc-1", &[0.5]), cancel.clone());

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let report = tokio::time::timeout(Duration::from_secs(10), orchestrator.run())
        .await
        .expect("cancellation should end the run promptly")
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.processed, 1);
    // The interrupted file is retried on the next run
    assert_eq!(h.cursor().load().unwrap(), 1);
}

#[tokio::test]
async fn test_first_parse_wait_is_cancellable() {
    let mut h = Harness::new().await;
    h.config.upload.first_parse_wait_secs = 3600;
    h.write("a.md", "alpha\n");
    h.healthy().await;
    h.upload_returns(uploaded_as("doc-1"), 1).await;
    h.parse_accepts(0).await;

    let cancel = CancellationToken::new();
    let orchestrator = h.orchestrator(FakeBackend::default(), cancel.clone());

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let report = tokio::time::timeout(Duration::from_secs(10), orchestrator.run())
        .await
        .expect("cancellation should end the wait promptly")
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.uploaded, 1);
}

#[tokio::test]
async fn test_first_parse_wait_happens_once_per_run() {
    let mut h = Harness::new().await;
    h.config.upload.first_parse_wait_secs = 1;
    h.write("a.md", "alpha\n");
    h.write("b.md", "beta\n");
    h.healthy().await;
    h.upload_returns(uploaded_as("doc-1"), 2).await;
    h.parse_accepts(2).await;

    let started = Instant::now();
    let (result, _) = h.run(FakeBackend::default().with_progress("doc-1", &[1.0])).await;
    let elapsed = started.elapsed();
    let report = result.unwrap();

    assert_eq!(report.uploaded, 2);
    assert_eq!(report.completed, 2);
    assert!(elapsed >= Duration::from_secs(1));
    // A second wait would push the run past two seconds
    assert!(elapsed < Duration::from_secs(2), "waited {:?}", elapsed);
}
