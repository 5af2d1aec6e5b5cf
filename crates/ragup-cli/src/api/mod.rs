//! API client module
//!
//! HTTP client for the document service: health, upload, list and parse.

pub mod client;
pub mod endpoints;
pub mod types;

pub use client::{ApiClient, HealthStatus, UploadRequest};
pub use types::*;
