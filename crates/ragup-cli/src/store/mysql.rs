//! MySQL backend for the metadata store
//!
//! One connection, opened lazily and reused. Before every use the connection
//! is pinged and replaced if it went away; each new connection runs at
//! READ COMMITTED so that progress written by the service's parser is
//! visible to the next poll.

use super::{Document, DocumentBackend, DocumentFilter};
use crate::config::StoreConfig;
use crate::error::{CliError, Result};
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Connection, Row};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Upper bound on establishing a connection
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const SET_ISOLATION: &str = "SET SESSION TRANSACTION ISOLATION LEVEL READ COMMITTED";

/// Metadata store backed by a single MySQL connection
pub struct MySqlBackend {
    options: MySqlConnectOptions,
    target: String,
    conn: Mutex<Option<MySqlConnection>>,
}

impl MySqlBackend {
    /// Build a backend; nothing is opened until the first call
    pub fn from_config(config: &StoreConfig) -> Self {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database);

        Self {
            options,
            target: format!(
                "{}@{}:{}/{}",
                config.user, config.host, config.port, config.database
            ),
            conn: Mutex::new(None),
        }
    }

    /// `user@host:port/database`, for logs and status output
    pub fn target(&self) -> &str {
        &self.target
    }

    async fn connect(&self) -> Result<MySqlConnection> {
        let mut conn = tokio::time::timeout(CONNECT_TIMEOUT, MySqlConnection::connect_with(&self.options))
            .await
            .map_err(|_| {
                CliError::connectivity(format!(
                    "Timed out after {}s connecting to {}",
                    CONNECT_TIMEOUT.as_secs(),
                    self.target
                ))
            })??;

        if let Err(e) = sqlx::query(SET_ISOLATION).execute(&mut conn).await {
            warn!(error = %e, "Failed to set READ COMMITTED isolation, progress reads may be stale");
        }

        info!(target_db = %self.target, "Connected to metadata store");
        Ok(conn)
    }

    /// Live connection from `slot`, reconnecting when missing or dead
    async fn ensure_connected<'a>(
        &self,
        slot: &'a mut Option<MySqlConnection>,
    ) -> Result<&'a mut MySqlConnection> {
        let alive = match slot.as_mut() {
            Some(conn) => match conn.ping().await {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "Metadata store connection lost, reconnecting");
                    false
                },
            },
            None => false,
        };

        if !alive {
            *slot = None;
            let conn = self.connect().await?;
            return Ok(slot.insert(conn));
        }

        slot.as_mut()
            .ok_or_else(|| CliError::connectivity("Metadata store connection missing"))
    }
}

fn document_from_row(row: &MySqlRow) -> Result<Document> {
    // `progress` is FLOAT on most deployments; accept DOUBLE as well.
    let progress = match row.try_get::<f64, _>("progress") {
        Ok(value) => value,
        Err(_) => f64::from(row.try_get::<f32, _>("progress")?),
    };

    Ok(document(row.try_get("id")?, row.try_get("name")?, progress))
}

/// `name` is nullable in the service schema; one NULL must not sink the
/// whole result set.
fn document(id: String, name: Option<String>, progress: f64) -> Document {
    Document {
        id,
        name: name.unwrap_or_default(),
        progress,
    }
}

#[async_trait]
impl DocumentBackend for MySqlBackend {
    async fn fetch(&self, filter: &DocumentFilter) -> Result<Vec<Document>> {
        let mut slot = self.conn.lock().await;
        let conn = self.ensure_connected(&mut slot).await?;

        debug!(filter = %filter, "Querying document table");

        let rows = match filter {
            DocumentFilter::Id(id) => {
                sqlx::query("SELECT id, name, progress FROM document WHERE id = ?")
                    .bind(id)
                    .fetch_all(&mut *conn)
                    .await?
            },
            DocumentFilter::Name {
                name,
                kb_id: Some(kb_id),
            } => {
                sqlx::query("SELECT id, name, progress FROM document WHERE kb_id = ? AND name = ?")
                    .bind(kb_id)
                    .bind(name)
                    .fetch_all(&mut *conn)
                    .await?
            },
            DocumentFilter::Name { name, kb_id: None } => {
                sqlx::query("SELECT id, name, progress FROM document WHERE name = ?")
                    .bind(name)
                    .fetch_all(&mut *conn)
                    .await?
            },
            DocumentFilter::KnowledgeBase(kb_id) => {
                sqlx::query(
                    "SELECT id, name, progress FROM document WHERE kb_id = ? ORDER BY create_time",
                )
                .bind(kb_id)
                .fetch_all(&mut *conn)
                .await?
            },
        };

        rows.iter().map(document_from_row).collect()
    }

    async fn ping(&self) -> Result<()> {
        let mut slot = self.conn.lock().await;
        self.ensure_connected(&mut slot).await.map(|_| ())
    }

    async fn reset(&self) {
        let mut slot = self.conn.lock().await;
        if let Some(conn) = slot.take() {
            if let Err(e) = conn.close().await {
                debug!(error = %e, "Error closing metadata store connection");
            }
        }
    }
}
