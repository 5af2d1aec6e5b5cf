//! Metadata store access
//!
//! The service records every uploaded document, with its parse progress, in
//! a relational `document` table. This module reads that table.
//!
//! - [`DocumentBackend`] is the driver seam; [`MySqlBackend`] is the
//!   production implementation.
//! - [`MetadataStore`] is what the rest of the crate talks to. It turns
//!   driver failures into empty results and retries empty lookups, because
//!   the service may commit a row only after acknowledging the upload.
//!
//! A failed query and a query with no rows look the same to callers. A
//! transient outage during a duplicate check can therefore cause a re-upload.

pub mod mysql;

pub use mysql::MySqlBackend;

use crate::error::Result;
use async_trait::async_trait;
use ragup_common::timing::timed;
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// A row of the `document` table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub id: String,
    pub name: String,

    /// Fraction parsed in `[0, 1]`; negative when parsing failed
    pub progress: f64,
}

impl Document {
    pub fn is_parsed(&self) -> bool {
        self.progress >= 1.0
    }

    pub fn is_failed(&self) -> bool {
        self.progress < 0.0
    }
}

/// Which rows to read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentFilter {
    Id(String),
    Name { name: String, kb_id: Option<String> },
    KnowledgeBase(String),
}

impl std::fmt::Display for DocumentFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentFilter::Id(id) => write!(f, "id = '{}'", id),
            DocumentFilter::Name {
                name,
                kb_id: Some(kb_id),
            } => write!(f, "kb_id = '{}' and name = '{}'", kb_id, name),
            DocumentFilter::Name { name, kb_id: None } => write!(f, "name = '{}'", name),
            DocumentFilter::KnowledgeBase(kb_id) => write!(f, "kb_id = '{}'", kb_id),
        }
    }
}

/// Driver seam for the metadata store (dependency injection)
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Run a read; errors are returned, not swallowed
    async fn fetch(&self, filter: &DocumentFilter) -> Result<Vec<Document>>;

    /// Verify the store is reachable
    async fn ping(&self) -> Result<()>;

    /// Drop any open connection so the next call starts fresh
    async fn reset(&self);
}

/// Metadata store client with retry-with-delay lookups
pub struct MetadataStore<B> {
    backend: B,
    kb_id: Option<String>,
    cancel: CancellationToken,
}

impl<B: DocumentBackend> MetadataStore<B> {
    /// Create a store; name lookups are scoped to `kb_id` when given
    pub fn new(backend: B, kb_id: Option<String>) -> Self {
        Self {
            backend,
            kb_id: kb_id.filter(|id| !id.trim().is_empty()),
            cancel: CancellationToken::new(),
        }
    }

    /// Abort retry delays when `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run a read, logging and swallowing any failure
    pub async fn query(&self, filter: &DocumentFilter) -> Vec<Document> {
        match self.backend.fetch(filter).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, filter = %filter, "Metadata query failed, treating as no rows");
                Vec::new()
            },
        }
    }

    /// Look a document up by exact name, retrying empty results
    pub async fn find_by_name(
        &self,
        name: &str,
        max_retries: u32,
        retry_interval: Duration,
    ) -> Option<Document> {
        let filter = DocumentFilter::Name {
            name: name.to_string(),
            kb_id: self.kb_id.clone(),
        };
        self.find_with_retry(&filter, max_retries, retry_interval).await
    }

    /// Look a document up by id, retrying empty results
    pub async fn find_by_id(
        &self,
        id: &str,
        max_retries: u32,
        retry_interval: Duration,
    ) -> Option<Document> {
        let filter = DocumentFilter::Id(id.to_string());
        self.find_with_retry(&filter, max_retries, retry_interval).await
    }

    pub async fn exists_by_name(&self, name: &str) -> bool {
        self.find_by_name(name, 0, Duration::ZERO).await.is_some()
    }

    pub async fn exists_by_id(&self, id: &str) -> bool {
        self.find_by_id(id, 0, Duration::ZERO).await.is_some()
    }

    /// Every document of a knowledge base
    pub async fn list_by_kb(&self, kb_id: &str) -> Vec<Document> {
        let filter = DocumentFilter::KnowledgeBase(kb_id.to_string());
        timed("list_by_kb", self.query(&filter)).await
    }

    /// Connectivity probe; unlike queries, the error is returned
    pub async fn check_connection(&self) -> Result<()> {
        self.backend.ping().await
    }

    /// Force a fresh connection on the next query
    pub async fn reset(&self) {
        self.backend.reset().await;
    }

    /// At most `1 + max_retries` queries; the first non-empty result wins
    async fn find_with_retry(
        &self,
        filter: &DocumentFilter,
        max_retries: u32,
        retry_interval: Duration,
    ) -> Option<Document> {
        if let Some(doc) = self.query(filter).await.into_iter().next() {
            return Some(doc);
        }

        for attempt in 1..=max_retries {
            info!(filter = %filter, attempt, "Query returned no rows, retrying");

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return None,
                _ = tokio::time::sleep(retry_interval) => {}
            }

            if let Some(doc) = self.query(filter).await.into_iter().next() {
                return Some(doc);
            }
        }

        None
    }
}
