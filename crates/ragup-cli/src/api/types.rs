//! API request and response types
//!
//! The service has shipped two envelope schemas: older releases answer with
//! `retcode`/`retmsg`, newer ones with `code`/`message`. [`ApiEnvelope`]
//! accepts both.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Standard response envelope, either schema version
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retcode: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retmsg: Option<String>,

    #[serde(default)]
    pub data: Value,
}

impl ApiEnvelope {
    /// Failure envelope synthesized on the client side
    pub fn failure(retcode: i64, retmsg: impl Into<String>) -> Self {
        Self {
            retcode: Some(retcode),
            retmsg: Some(retmsg.into()),
            ..Default::default()
        }
    }

    /// `retcode == 0` (legacy) or `code == 0`
    pub fn is_success(&self) -> bool {
        self.retcode == Some(0) || self.code == Some(0)
    }

    /// Status code from whichever field is present
    pub fn status_code(&self) -> Option<i64> {
        self.code.or(self.retcode)
    }

    /// Human-readable message from whichever field is present
    pub fn message_text(&self) -> &str {
        self.message
            .as_deref()
            .or(self.retmsg.as_deref())
            .unwrap_or("")
    }

    /// `data[0].id` of an upload response
    pub fn first_document_id(&self) -> Option<String> {
        self.data
            .as_array()?
            .first()?
            .get("id")?
            .as_str()
            .map(str::to_string)
    }
}

/// Free-function form of [`ApiEnvelope::is_success`]
pub fn is_success(response: &ApiEnvelope) -> bool {
    response.is_success()
}

/// Body of `POST /document/run`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseRequest {
    pub doc_ids: Vec<String>,
    pub run: i32,
}

/// A document as listed by `GET /document/list`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteDocument {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub progress: f64,

    /// Parse run state as reported by the service ("0".."4" on current releases)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_num: Option<i64>,
}

/// `data` payload of `GET /document/list`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentList {
    #[serde(default)]
    pub docs: Vec<RemoteDocument>,

    #[serde(default)]
    pub total: Option<i64>,
}
