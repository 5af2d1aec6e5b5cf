//! Append-only log of documents whose parse failed or timed out

use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// File name of the failure log inside the state directory
pub const FAILURE_LOG_NAME: &str = "ragflow_fail.txt";

#[derive(Debug, Clone)]
pub struct FailureLog {
    path: PathBuf,
}

impl FailureLog {
    pub fn in_dir(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join(FAILURE_LOG_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a timestamped line; write errors are logged, never raised
    pub fn record(&self, message: &str) {
        let line = format!("{} {}\n", Local::now().format("%Y-%m-%d %H:%M:%S"), message);

        if let Err(e) = self.append(&line) {
            warn!(path = %self.path.display(), error = %e, "Failed to write failure log");
            return;
        }
        info!(path = %self.path.display(), "Recorded failure: {}", message);
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(line.as_bytes())
    }
}
