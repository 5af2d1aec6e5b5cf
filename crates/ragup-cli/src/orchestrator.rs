//! Upload-and-wait loop
//!
//! Files are processed strictly one at a time: a document is uploaded, its
//! parse is triggered and polled until it reaches a terminal state before
//! the next file is touched. The cursor is written before each file so an
//! interrupted run resumes at the file it was working on.

use crate::api::{ApiClient, UploadRequest};
use crate::config::Config;
use crate::cursor::CursorFile;
use crate::discovery::discover;
use crate::error::{CliError, Result};
use crate::failures::FailureLog;
use crate::naming::{count_lines, needs_line_count, upload_name};
use crate::store::{Document, DocumentBackend, MetadataStore};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// `run` value asking the service to start parsing
const RUN_PARSE: i32 = 1;

/// `run` form field sent with uploads
const UPLOAD_RUN_FLAG: &str = "1";

/// What to do with a discovered file
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// Text-like file below the minimum line count
    Skip { lines: usize, min_lines: usize },
    /// Already uploaded and fully parsed
    DuplicateComplete(Document),
    /// Already uploaded, parse not finished (or failed)
    DuplicatePending(Document),
    New,
}

/// Terminal state of the parse-and-wait sub-loop
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Completed,
    Failed { progress: f64 },
    /// No document id could be resolved, or the record disappeared while polling
    NotFound,
    TriggerFailed(String),
    TimedOut { polls: u64 },
    Cancelled,
}

impl ParseOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ParseOutcome::Completed)
    }
}

/// Result of processing one file
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    SkippedShort,
    AlreadyParsed,
    /// Existing document left alone in upload-only mode
    AlreadyUploaded,
    /// Uploaded in upload-only mode
    Uploaded,
    UploadFailed(String),
    Parsed(ParseOutcome),
}

/// Per-run counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub start_index: usize,
    pub total: usize,
    /// Files dispatched this run
    pub processed: usize,
    pub skipped_short: usize,
    pub already_parsed: usize,
    pub already_uploaded: usize,
    /// Successful uploads, whether or not a parse followed
    pub uploaded: usize,
    pub upload_failed: usize,
    pub completed: usize,
    pub parse_failed: usize,
    pub not_found: usize,
    pub trigger_failed: usize,
    pub timed_out: usize,
    pub cancelled: bool,
}

impl RunReport {
    fn record(&mut self, outcome: &FileOutcome) {
        self.processed += 1;
        match outcome {
            FileOutcome::SkippedShort => self.skipped_short += 1,
            FileOutcome::AlreadyParsed => self.already_parsed += 1,
            FileOutcome::AlreadyUploaded => self.already_uploaded += 1,
            FileOutcome::Uploaded => {},
            FileOutcome::UploadFailed(_) => self.upload_failed += 1,
            FileOutcome::Parsed(parse) => match parse {
                ParseOutcome::Completed => self.completed += 1,
                ParseOutcome::Failed { .. } => self.parse_failed += 1,
                ParseOutcome::NotFound => self.not_found += 1,
                ParseOutcome::TriggerFailed(_) => self.trigger_failed += 1,
                ParseOutcome::TimedOut { .. } => self.timed_out += 1,
                ParseOutcome::Cancelled => self.cancelled = true,
            },
        }
    }

    /// Files that ended in an error state
    pub fn failures(&self) -> usize {
        self.upload_failed + self.parse_failed + self.not_found + self.trigger_failed + self.timed_out
    }
}

/// Drives one upload run
pub struct Orchestrator<B> {
    config: Config,
    api: ApiClient,
    store: MetadataStore<B>,
    cursor: CursorFile,
    failures: FailureLog,
    cancel: CancellationToken,
}

impl<B: DocumentBackend> Orchestrator<B> {
    pub fn new(
        config: Config,
        api: ApiClient,
        store: MetadataStore<B>,
        cursor: CursorFile,
        failures: FailureLog,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            api,
            store,
            cursor,
            failures,
            cancel,
        }
    }

    pub fn store(&self) -> &MetadataStore<B> {
        &self.store
    }

    /// Process every document from the persisted cursor to the end
    pub async fn run(&self) -> Result<RunReport> {
        self.preflight().await?;

        let dir = &self.config.documents.dir;
        let files = discover(dir, &self.config.documents.normalized_extensions())?;
        if files.is_empty() {
            return Err(CliError::NoDocuments(dir.display().to_string()));
        }

        let total = files.len();
        let start = self.cursor.load()?;
        if start > total {
            return Err(CliError::StartIndexOutOfRange {
                start,
                total,
                cursor: self.cursor.path().to_path_buf(),
            });
        }

        info!(start, total, dir = %dir.display(), "Starting upload run");

        let mut report = RunReport {
            start_index: start,
            total,
            ..Default::default()
        };

        for (offset, path) in files.iter().enumerate().skip(start - 1) {
            let index = offset + 1;

            if self.cancel.is_cancelled() {
                info!(index, "Run cancelled");
                report.cancelled = true;
                break;
            }

            self.cursor.save(index)?;
            info!(index, total, file = %path.display(), "Processing document");

            let outcome = self.process_file(path, &mut report).await;
            info!(index, total, file = %path.display(), outcome = ?outcome, "Document done");

            report.record(&outcome);
            if report.cancelled {
                info!(index, "Run cancelled");
                break;
            }
        }

        info!(
            processed = report.processed,
            uploaded = report.uploaded,
            completed = report.completed,
            skipped_short = report.skipped_short,
            already_parsed = report.already_parsed,
            already_uploaded = report.already_uploaded,
            failures = report.failures(),
            cancelled = report.cancelled,
            "Upload run finished"
        );

        Ok(report)
    }

    /// Both backends must answer before any file is touched
    async fn preflight(&self) -> Result<()> {
        self.store
            .check_connection()
            .await
            .map_err(|e| CliError::connectivity(format!("metadata store unreachable: {}", e)))?;

        let health = self.api.check_health().await;
        if !health.is_ok() {
            return Err(CliError::connectivity(health.message()));
        }
        info!("{}", health);
        Ok(())
    }

    /// Decide what to do with `path`, uploaded as `name`
    ///
    /// The line-count pre-check makes no network or store call.
    pub async fn classify(&self, path: &Path, name: &str) -> Classification {
        let min_lines = self.config.documents.min_lines;
        if needs_line_count(path) {
            let lines = count_lines(path);
            if lines < min_lines {
                return Classification::Skip { lines, min_lines };
            }
        }

        match self.store.find_by_name(name, 0, Duration::ZERO).await {
            Some(doc) if doc.is_parsed() => Classification::DuplicateComplete(doc),
            Some(doc) => Classification::DuplicatePending(doc),
            None => Classification::New,
        }
    }

    async fn process_file(&self, path: &Path, report: &mut RunReport) -> FileOutcome {
        let name = upload_name(path);
        let only_upload = self.config.upload.only_upload;

        match self.classify(path, &name).await {
            Classification::Skip { lines, min_lines } => {
                info!(file = %path.display(), lines, min_lines, "Too few lines, skipping");
                FileOutcome::SkippedShort
            },
            Classification::DuplicateComplete(doc) => {
                info!(file = %path.display(), doc_id = %doc.id, "Already parsed, skipping");
                FileOutcome::AlreadyParsed
            },
            Classification::DuplicatePending(doc) if only_upload => {
                info!(file = %path.display(), doc_id = %doc.id, "Already uploaded, skipping");
                FileOutcome::AlreadyUploaded
            },
            Classification::DuplicatePending(doc) => {
                info!(
                    file = %path.display(),
                    doc_id = %doc.id,
                    progress = doc.progress,
                    "Already uploaded but not parsed, parsing"
                );
                FileOutcome::Parsed(self.parse_and_wait(&name, Some(doc.id)).await)
            },
            Classification::New => self.upload(path, &name, report).await,
        }
    }

    async fn upload(&self, path: &Path, name: &str, report: &mut RunReport) -> FileOutcome {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Failed to read file for upload");
                return FileOutcome::UploadFailed(format!("failed to read {}: {}", path.display(), e));
            },
        };

        let kb = &self.config.knowledge_base;
        let request = UploadRequest {
            file_name: name,
            kb_name: &kb.name,
            kb_id: &kb.id,
            parser_id: kb.parser(),
            run: Some(UPLOAD_RUN_FLAG),
        };

        let response = self.api.upload_document(bytes, &request).await;
        if !response.is_success() {
            warn!(
                file = %path.display(),
                code = ?response.status_code(),
                message = response.message_text(),
                "Upload failed, skipping"
            );
            return FileOutcome::UploadFailed(response.message_text().to_string());
        }

        let first_upload = report.uploaded == 0;
        report.uploaded += 1;
        info!(file = %path.display(), upload_name = name, "Uploaded");

        if self.config.upload.only_upload {
            return FileOutcome::Uploaded;
        }

        let wait = self.config.upload.first_parse_wait();
        if first_upload && !wait.is_zero() {
            info!(wait_secs = wait.as_secs(), "First upload of the run, waiting before parsing");
            if !self.pause(wait).await {
                return FileOutcome::Parsed(ParseOutcome::Cancelled);
            }
        }

        FileOutcome::Parsed(self.parse_and_wait(name, response.first_document_id()).await)
    }

    /// Trigger parsing of `name` and poll until it settles
    pub async fn parse_and_wait(&self, name: &str, doc_id: Option<String>) -> ParseOutcome {
        let retries = self.config.store.retries;
        let retry_interval = self.config.store.retry_interval();

        let doc_id = match doc_id {
            Some(id) => id,
            None => {
                debug!(upload_name = name, "Resolving document id by name");
                match self.store.find_by_name(name, retries, retry_interval).await {
                    Some(doc) => doc.id,
                    None if self.cancel.is_cancelled() => return ParseOutcome::Cancelled,
                    None => {
                        warn!(upload_name = name, "No metadata record for document, skipping");
                        return ParseOutcome::NotFound;
                    },
                }
            },
        };

        let response = self.api.trigger_parse(std::slice::from_ref(&doc_id), RUN_PARSE).await;
        if !response.is_success() {
            warn!(
                doc_id = %doc_id,
                code = ?response.status_code(),
                message = response.message_text(),
                "Failed to trigger parse"
            );
            return ParseOutcome::TriggerFailed(response.message_text().to_string());
        }

        let upload = &self.config.upload;
        let mut polls: u64 = 0;

        loop {
            if self.cancel.is_cancelled() {
                return ParseOutcome::Cancelled;
            }

            let doc = match self.store.find_by_id(&doc_id, retries, retry_interval).await {
                Some(doc) => doc,
                None if self.cancel.is_cancelled() => return ParseOutcome::Cancelled,
                None => {
                    warn!(doc_id = %doc_id, "Document record disappeared while polling");
                    return ParseOutcome::NotFound;
                },
            };

            if doc.is_failed() {
                let message = format!("[{}] parse failed, progress={}", name, doc.progress);
                warn!(doc_id = %doc_id, progress = doc.progress, "{}", message);
                self.failures.record(&message);
                return ParseOutcome::Failed {
                    progress: doc.progress,
                };
            }

            if upload.progress_log {
                let percent = (doc.progress * 10000.0).round() / 100.0;
                info!(doc_id = %doc_id, progress = doc.progress, "{} parse progress: {}%", name, percent);
            }

            if doc.is_parsed() {
                return ParseOutcome::Completed;
            }

            polls += 1;
            if upload.max_polls.is_some_and(|max| polls >= max) {
                let message = format!(
                    "[{}] parse timed out after {} polls, progress={}",
                    name, polls, doc.progress
                );
                warn!(doc_id = %doc_id, polls, "{}", message);
                self.failures.record(&message);
                return ParseOutcome::TimedOut { polls };
            }

            if !self.pause(upload.poll_interval()).await {
                return ParseOutcome::Cancelled;
            }
        }
    }

    /// Sleep unless cancelled first; returns `false` on cancellation
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}
