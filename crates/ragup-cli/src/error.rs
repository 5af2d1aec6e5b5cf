//! Error types for ragup
//!
//! Only run-aborting conditions become errors. Per-file problems (a rejected
//! upload, a failed parse) are reported as outcomes and never surface here.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Error type for ragup operations
///
/// Messages are user-facing and say what to check next.
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check the config file (see 'ragup config show') or RAGUP_* environment variables.")]
    Config(String),

    /// Remote service or metadata store unreachable before the run started
    #[error("Connectivity check failed: {0}")]
    Connectivity(String),

    /// Persisted cursor points past the end of the document list
    #[error("Start index {start} is greater than the number of documents ({total}). Set a valid index with 'ragup cursor set' or delete the cursor file: {}", cursor.display())]
    StartIndexOutOfRange {
        start: usize,
        total: usize,
        cursor: PathBuf,
    },

    /// Document directory contains nothing matching the extension allowlist
    #[error("No matching documents found under '{0}'. Check documents.dir and documents.extensions.")]
    NoDocuments(String),

    /// Metadata store operation failed (SQLx)
    #[error("Database error: {0}. Check the store settings (host, port, user, password, database).")]
    Database(#[from] sqlx::Error),

    /// File system operation failed
    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    /// HTTP client failed
    #[error("Network request failed: {0}. Check api.url and your network connection.")]
    Http(#[from] reqwest::Error),

    /// TOML config parsing failed
    #[error("Failed to parse config file: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl CliError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a connectivity error
    pub fn connectivity(msg: impl Into<String>) -> Self {
        Self::Connectivity(msg.into())
    }

    /// Whether the error was raised before any document was touched
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::Connectivity(_)
                | Self::StartIndexOutOfRange { .. }
                | Self::NoDocuments(_)
                | Self::TomlParse(_)
        )
    }
}
