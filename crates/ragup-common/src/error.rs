//! Error types shared across ragup crates

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, RagupError>;

/// Error type for the shared utilities
#[derive(Error, Debug)]
pub enum RagupError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
