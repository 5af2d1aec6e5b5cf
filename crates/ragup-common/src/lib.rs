//! ragup common library
//!
//! Shared plumbing for the ragup workspace members.
//!
//! # Overview
//!
//! - **Error Handling**: the [`RagupError`] type and [`Result`] alias
//! - **Checksums**: streaming MD5 used to derive upload names
//! - **Logging**: `tracing` subscriber setup (console, rolling file, JSON)
//! - **Timing**: duration logging around awaited operations
//!
//! # Example
//!
//! ```no_run
//! use ragup_common::checksum::compute_file_md5;
//!
//! fn hash(path: &str) -> ragup_common::Result<()> {
//!     let digest = compute_file_md5(path)?;
//!     tracing::info!(%digest, "hashed");
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod checksum;
pub mod error;
pub mod logging;
pub mod timing;

// Re-export commonly used types
pub use error::{RagupError, Result};
