//! Configuration management for ragup
//!
//! A single [`Config`] is loaded once per command and passed down explicitly.
//! Values come from, in increasing precedence: built-in defaults, the TOML
//! config file, then `.env` / `RAGUP_*` environment variables.

use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

// ============================================================================
// Configuration Constants
// ============================================================================

/// Default service API base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:80/v1";

/// Default timeout for API requests in seconds. Large uploads need headroom.
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 300;

/// Default document parser on the service side.
pub const DEFAULT_PARSER_ID: &str = "naive";

/// Default extension allowlist.
pub const DEFAULT_EXTENSIONS: &[&str] = &["md", "txt", "pdf", "docx"];

/// Default minimum line count for text-like documents.
pub const DEFAULT_MIN_LINES: usize = 1;

pub const DEFAULT_MYSQL_HOST: &str = "localhost";
pub const DEFAULT_MYSQL_PORT: u16 = 5455;
pub const DEFAULT_MYSQL_USER: &str = "root";
pub const DEFAULT_MYSQL_PASSWORD: &str = "infini_rag_flow";
pub const DEFAULT_MYSQL_DATABASE: &str = "rag_flow";

/// Default delay between metadata store retries in seconds.
pub const DEFAULT_RETRY_INTERVAL_SECS: u64 = 1;

/// Default delay between parse progress checks in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 1;

/// Name of the per-user state directory under the home directory.
pub const STATE_DIR_NAME: &str = ".ragflow_upload";

/// Config file name inside the state directory.
pub const CONFIG_FILE_NAME: &str = "ragup.toml";

/// ragup configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub knowledge_base: KnowledgeBaseConfig,
    pub documents: DocumentsConfig,
    pub store: StoreConfig,
    pub upload: UploadConfig,

    /// Directory holding the cursor files, the failure log and rolling logs
    pub state_dir: StateDir,
}

/// Remote service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL, e.g. `http://localhost:80/v1`
    pub url: String,

    /// Static token sent as the `authorization` header
    pub authorization: String,

    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_API_URL.to_string(),
            authorization: String::new(),
            timeout_secs: DEFAULT_API_TIMEOUT_SECS,
        }
    }
}

/// Target knowledge base
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeBaseConfig {
    pub id: String,
    pub name: String,

    /// Parser requested on upload; empty means "service default"
    pub parser_id: String,
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            parser_id: DEFAULT_PARSER_ID.to_string(),
        }
    }
}

impl KnowledgeBaseConfig {
    pub fn parser(&self) -> Option<&str> {
        let parser = self.parser_id.trim();
        (!parser.is_empty()).then_some(parser)
    }
}

/// Local document source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentsConfig {
    pub dir: PathBuf,
    pub extensions: Vec<String>,

    /// Text-like documents with fewer lines are skipped
    pub min_lines: usize,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::new(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            min_lines: DEFAULT_MIN_LINES,
        }
    }
}

impl DocumentsConfig {
    /// Extensions trimmed, without a leading dot, empties dropped
    pub fn normalized_extensions(&self) -> Vec<String> {
        self.extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_string())
            .filter(|e| !e.is_empty())
            .collect()
    }
}

/// Metadata store (MySQL) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,

    /// Extra attempts when a lookup comes back empty
    pub retries: u32,
    pub retry_interval_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_MYSQL_HOST.to_string(),
            port: DEFAULT_MYSQL_PORT,
            user: DEFAULT_MYSQL_USER.to_string(),
            password: DEFAULT_MYSQL_PASSWORD.to_string(),
            database: DEFAULT_MYSQL_DATABASE.to_string(),
            retries: 0,
            retry_interval_secs: DEFAULT_RETRY_INTERVAL_SECS,
        }
    }
}

impl StoreConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }
}

/// Upload loop behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Upload only; never trigger or wait for parsing
    pub only_upload: bool,

    /// Log parse progress on every poll
    pub progress_log: bool,

    pub poll_interval_secs: u64,

    /// Give up waiting on a document after this many polls; unset waits forever
    pub max_polls: Option<u64>,

    /// Pause once after the first successful upload of a run
    pub first_parse_wait_secs: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            only_upload: false,
            progress_log: true,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            max_polls: None,
            first_parse_wait_secs: 0,
        }
    }
}

impl UploadConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn first_parse_wait(&self) -> Duration {
        Duration::from_secs(self.first_parse_wait_secs)
    }
}

/// State directory, defaulting to `~/.ragflow_upload`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct StateDir(pub PathBuf);

impl Default for StateDir {
    fn default() -> Self {
        let base = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self(base.join(STATE_DIR_NAME))
    }
}

impl StateDir {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl Config {
    /// Default config file location: `~/.ragflow_upload/ragup.toml`
    pub fn default_path() -> PathBuf {
        StateDir::default().0.join(CONFIG_FILE_NAME)
    }

    /// Load config from `path` (if present) and the environment
    ///
    /// No validation happens here so that inspection commands work on a
    /// half-written config; call [`Config::validate`] before using it.
    pub fn load(path: &Path) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| {
                CliError::config(format!("Failed to read {}: {}", path.display(), e))
            })?;
            toml::from_str::<Config>(&content)?
        } else {
            debug!(path = %path.display(), "Config file not found, using defaults and environment");
            Config::default()
        };

        config.apply_env()?;
        Ok(config)
    }

    /// Override fields from `RAGUP_*` environment variables
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(url) = env_string("RAGUP_API_URL") {
            self.api.url = url;
        }
        if let Some(token) = env_string("RAGUP_AUTHORIZATION") {
            self.api.authorization = token;
        }
        if let Some(id) = env_string("RAGUP_KB_ID") {
            self.knowledge_base.id = id;
        }
        if let Some(name) = env_string("RAGUP_KB_NAME") {
            self.knowledge_base.name = name;
        }
        if let Some(parser) = env_string("RAGUP_PARSER_ID") {
            self.knowledge_base.parser_id = parser;
        }
        if let Some(dir) = env_string("RAGUP_DOC_DIR") {
            self.documents.dir = PathBuf::from(dir);
        }
        if let Some(suffix) = env_string("RAGUP_DOC_SUFFIX") {
            self.documents.extensions = suffix.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Some(min_lines) = env_parse("RAGUP_DOC_MIN_LINES")? {
            self.documents.min_lines = min_lines;
        }
        if let Some(host) = env_string("RAGUP_MYSQL_HOST") {
            self.store.host = host;
        }
        if let Some(port) = env_parse("RAGUP_MYSQL_PORT")? {
            self.store.port = port;
        }
        if let Some(user) = env_string("RAGUP_MYSQL_USER") {
            self.store.user = user;
        }
        if let Some(password) = env_string("RAGUP_MYSQL_PASSWORD") {
            self.store.password = password;
        }
        if let Some(database) = env_string("RAGUP_MYSQL_DATABASE") {
            self.store.database = database;
        }
        if let Some(retries) = env_parse("RAGUP_SQL_RETRIES")? {
            self.store.retries = retries;
        }
        if let Some(only_upload) = env_flag("RAGUP_ONLY_UPLOAD")? {
            self.upload.only_upload = only_upload;
        }
        if let Some(interval) = env_parse("RAGUP_POLL_INTERVAL_SECS")? {
            self.upload.poll_interval_secs = interval;
        }
        if let Some(max_polls) = env_parse("RAGUP_MAX_POLLS")? {
            self.upload.max_polls = Some(max_polls);
        }
        if let Some(wait) = env_parse("RAGUP_FIRST_PARSE_WAIT_SECS")? {
            self.upload.first_parse_wait_secs = wait;
        }
        if let Some(dir) = env_string("RAGUP_STATE_DIR") {
            self.state_dir = StateDir(PathBuf::from(dir));
        }

        Ok(())
    }

    /// Validate the settings every service-facing command needs
    pub fn validate(&self) -> Result<()> {
        let url = self.api.url.trim();
        if url.is_empty() {
            return Err(CliError::config("api.url must be set"));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(CliError::config(format!(
                "api.url must start with http:// or https:// (got '{}')",
                url
            )));
        }
        if self.api.authorization.trim().is_empty() {
            return Err(CliError::config("api.authorization must be set"));
        }
        if self.api.timeout_secs == 0 {
            return Err(CliError::config("api.timeout_secs must be greater than 0"));
        }
        if self.knowledge_base.id.trim().is_empty() {
            return Err(CliError::config("knowledge_base.id must be set"));
        }
        if self.knowledge_base.name.trim().is_empty() {
            return Err(CliError::config("knowledge_base.name must be set"));
        }
        if self.documents.normalized_extensions().is_empty() {
            return Err(CliError::config("documents.extensions must list at least one extension"));
        }
        if self.upload.max_polls == Some(0) {
            return Err(CliError::config("upload.max_polls must be greater than 0 when set"));
        }
        if self.upload.poll_interval_secs == 0 && self.upload.max_polls.is_none() {
            return Err(CliError::config(
                "upload.poll_interval_secs must be greater than 0 unless upload.max_polls is set",
            ));
        }
        Ok(())
    }

    /// [`Config::validate`] plus the document directory a run needs
    pub fn validate_for_run(&self) -> Result<()> {
        self.validate()?;
        if self.documents.dir.as_os_str().is_empty() {
            return Err(CliError::config("documents.dir must be set"));
        }
        Ok(())
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| CliError::config(format!("{} has an invalid value: '{}'", key, value))),
        Err(_) => Ok(None),
    }
}

fn env_flag(key: &str) -> Result<Option<bool>> {
    match std::env::var(key) {
        Ok(value) => match value.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(CliError::config(format!("{} must be true or false (got '{}')", key, value))),
        },
        Err(_) => Ok(None),
    }
}

/// Mask a secret for display, keeping a short prefix
pub fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return "(not set)".to_string();
    }
    let prefix: String = secret.chars().take(4).collect();
    format!("{}****", prefix)
}

/// Commented template written by `ragup init`
pub const CONFIG_TEMPLATE: &str = r#"# ragup configuration
# Environment variables (RAGUP_*) override anything set here.

[api]
# Service API base URL
url = "http://localhost:80/v1"
# API token, sent as the `authorization` header
authorization = "your authorization"
timeout_secs = 300

[knowledge_base]
id = "your kb_id"
name = "your kb_name"
# Parser requested on upload; leave empty for the service default
parser_id = "naive"

[documents]
# Directory scanned recursively for documents
dir = ""
extensions = ["md", "txt", "pdf", "docx"]
# txt/md/html files with fewer lines are skipped
min_lines = 1

[store]
host = "localhost"
port = 5455
user = "root"
password = "infini_rag_flow"
database = "rag_flow"
# Extra lookups when a freshly uploaded document is not visible yet
retries = 0
retry_interval_secs = 1

[upload]
# true = upload only, never trigger or wait for parsing
only_upload = false
progress_log = true
poll_interval_secs = 1
# Stop waiting on a document after this many polls (omit to wait forever)
# max_polls = 3600
# Pause once after the first successful upload before parsing
first_parse_wait_secs = 0
"#;
