//! HTTP API client for the document service
//!
//! No method here returns an error for a failed call. Service-side
//! rejections and transport failures come back as values (a failure
//! envelope, an empty list, a [`HealthStatus`] variant) so that the caller
//! decides whether a file is skipped or the run stops.

use crate::api::{endpoints, types::*};
use crate::config::ApiConfig;
use crate::error::{CliError, Result};
use ragup_common::timing::timed;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Code used in synthesized envelopes when no HTTP status exists
pub const TRANSPORT_FAILURE_CODE: i64 = -1;

/// Outcome of the service health check
#[derive(Debug, Clone, PartialEq)]
pub enum HealthStatus {
    /// Service answered with a success envelope
    Healthy { version: String },
    /// Request never got a response (DNS, refused connection, timeout)
    Unreachable(String),
    /// Service answered with a non-200 status
    HttpStatus(u16),
    /// Envelope code 401 or 403
    Unauthorized,
    /// Envelope code 100 or a "404" message: the base URL points at the wrong place
    WrongEndpoint,
    /// Anything else, including a body that is not an envelope
    Failed(String),
}

impl HealthStatus {
    fn classify(envelope: &ApiEnvelope) -> Self {
        if envelope.is_success() {
            let version = envelope.data.as_str().unwrap_or_default().to_string();
            return HealthStatus::Healthy { version };
        }

        match envelope.status_code() {
            Some(401) | Some(403) => HealthStatus::Unauthorized,
            Some(100) => HealthStatus::WrongEndpoint,
            _ if envelope.message_text().contains("404") => HealthStatus::WrongEndpoint,
            _ => HealthStatus::Failed(envelope.message_text().to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, HealthStatus::Healthy { .. })
    }

    /// What the operator should check next
    pub fn message(&self) -> String {
        match self {
            HealthStatus::Healthy { version } if version.is_empty() => {
                "API address is configured correctly".to_string()
            },
            HealthStatus::Healthy { version } => {
                format!("API address is configured correctly (service {})", version)
            },
            HealthStatus::Unreachable(error) => format!(
                "Request failed, check the API settings and retry. Request error: {}",
                error
            ),
            HealthStatus::HttpStatus(status) => format!(
                "Request failed, check the API settings and retry. HTTP status: {}",
                status
            ),
            HealthStatus::Unauthorized => {
                "Authentication failed / unauthorized: check the authorization token (api.authorization)"
                    .to_string()
            },
            HealthStatus::WrongEndpoint => {
                "API address is wrong: check api.url (it normally ends with /v1)".to_string()
            },
            HealthStatus::Failed(detail) if detail.is_empty() => {
                "Request failed, check the API settings and retry".to_string()
            },
            HealthStatus::Failed(detail) => {
                format!("Request failed, check the API settings and retry: {}", detail)
            },
        }
    }

    /// `(ok, message)` pair
    pub fn into_parts(self) -> (bool, String) {
        (self.is_ok(), self.message())
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Form fields of a document upload
#[derive(Debug, Clone)]
pub struct UploadRequest<'a> {
    /// File name the service stores (the upload name)
    pub file_name: &'a str,
    pub kb_name: &'a str,
    pub kb_id: &'a str,
    pub parser_id: Option<&'a str>,
    pub run: Option<&'a str>,
}

/// API client for the document service
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client sending the configured `authorization` header on every call
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut token = HeaderValue::from_str(config.authorization.trim()).map_err(|_| {
            CliError::config("api.authorization contains characters that cannot be sent in an HTTP header")
        })?;
        token.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, token);

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim().trim_end_matches('/').to_string(),
        })
    }

    /// Probe `GET /system/version` and classify the answer
    pub async fn check_health(&self) -> HealthStatus {
        let url = endpoints::version_url(&self.base_url);

        timed("check_health", async {
            let response = match self.client.get(&url).send().await {
                Ok(response) => response,
                Err(e) => return HealthStatus::Unreachable(e.to_string()),
            };

            if response.status() != StatusCode::OK {
                return HealthStatus::HttpStatus(response.status().as_u16());
            }

            match response.json::<ApiEnvelope>().await {
                Ok(envelope) => HealthStatus::classify(&envelope),
                Err(e) => HealthStatus::Failed(format!("unexpected response body: {}", e)),
            }
        })
        .await
    }

    /// Upload one document as multipart form data
    pub async fn upload_document(&self, bytes: Vec<u8>, request: &UploadRequest<'_>) -> ApiEnvelope {
        let url = endpoints::upload_url(&self.base_url);

        let mut form = Form::new()
            .part("file", Part::bytes(bytes).file_name(request.file_name.to_string()))
            .text("kb_name", request.kb_name.to_string())
            .text("kb_id", request.kb_id.to_string());
        if let Some(parser_id) = request.parser_id {
            form = form.text("parser_id", parser_id.to_string());
        }
        if let Some(run) = request.run {
            form = form.text("run", run.to_string());
        }

        timed("upload_document", async {
            match self.client.post(&url).multipart(form).send().await {
                Ok(response) if response.status() == StatusCode::OK => {
                    read_envelope(response, "upload").await
                },
                Ok(response) => ApiEnvelope::failure(
                    i64::from(response.status().as_u16()),
                    "Failed to upload file",
                ),
                Err(e) => {
                    warn!(error = %e, file = request.file_name, "Upload request failed");
                    ApiEnvelope::failure(TRANSPORT_FAILURE_CODE, format!("Upload request failed: {}", e))
                },
            }
        })
        .await
    }

    /// List one page of documents in a knowledge base
    ///
    /// Any failure yields an empty list.
    pub async fn list_documents(&self, kb_id: &str, page: u32, page_size: u32) -> Vec<RemoteDocument> {
        let url = endpoints::list_url(&self.base_url);
        let page = page.to_string();
        let page_size = page_size.to_string();

        timed("list_documents", async {
            let response = match self
                .client
                .get(&url)
                .query(&[("kb_id", kb_id), ("page", page.as_str()), ("page_size", page_size.as_str())])
                .send()
                .await
            {
                Ok(response) if response.status() == StatusCode::OK => response,
                Ok(response) => {
                    warn!(status = response.status().as_u16(), "Document list request rejected");
                    return Vec::new();
                },
                Err(e) => {
                    warn!(error = %e, "Document list request failed");
                    return Vec::new();
                },
            };

            let envelope = read_envelope(response, "list").await;
            match serde_json::from_value::<DocumentList>(envelope.data) {
                Ok(list) => list.docs,
                Err(e) => {
                    warn!(error = %e, "Document list response has an unexpected shape");
                    Vec::new()
                },
            }
        })
        .await
    }

    /// Ask the service to parse documents asynchronously
    pub async fn trigger_parse(&self, doc_ids: &[String], run: i32) -> ApiEnvelope {
        let url = endpoints::run_url(&self.base_url);
        let body = ParseRequest {
            doc_ids: doc_ids.to_vec(),
            run,
        };

        timed("trigger_parse", async {
            match self.client.post(&url).json(&body).send().await {
                Ok(response) if response.status() == StatusCode::OK => {
                    read_envelope(response, "parse").await
                },
                Ok(response) => ApiEnvelope::failure(
                    i64::from(response.status().as_u16()),
                    format!("Failed to trigger parse for {:?}", doc_ids),
                ),
                Err(e) => {
                    warn!(error = %e, "Parse request failed");
                    ApiEnvelope::failure(TRANSPORT_FAILURE_CODE, format!("Parse request failed: {}", e))
                },
            }
        })
        .await
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

async fn read_envelope(response: reqwest::Response, operation: &str) -> ApiEnvelope {
    let text = match response.text().await {
        Ok(text) => text,
        Err(e) => {
            return ApiEnvelope::failure(
                TRANSPORT_FAILURE_CODE,
                format!("Failed to read {} response: {}", operation, e),
            )
        },
    };
    debug!(operation, body = %text, "Service response");

    serde_json::from_str(&text).unwrap_or_else(|e| {
        ApiEnvelope::failure(
            TRANSPORT_FAILURE_CODE,
            format!("Unreadable {} response: {}", operation, e),
        )
    })
}
