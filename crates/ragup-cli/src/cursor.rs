//! Persisted run cursor
//!
//! One file per knowledge base, holding the 1-based index of the last file
//! dispatched. Resuming by index is only meaningful while the document tree
//! and its enumeration order are unchanged between runs.

use crate::error::{CliError, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Cursor file for one knowledge base
#[derive(Debug, Clone)]
pub struct CursorFile {
    path: PathBuf,
}

impl CursorFile {
    /// `<state_dir>/index_<kb_id>_<kb_name>.txt`
    pub fn for_knowledge_base(state_dir: &Path, kb_id: &str, kb_name: &str) -> Self {
        Self {
            path: state_dir.join(format!("index_{}_{}.txt", kb_id, kb_name)),
        }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored index, or 1 when nothing was stored yet
    pub fn load(&self) -> Result<usize> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(1),
            Err(e) => return Err(e.into()),
        };

        let text = content.trim();
        if text.is_empty() {
            return Ok(1);
        }

        match text.parse::<usize>() {
            Ok(index) if index >= 1 => Ok(index),
            _ => Err(CliError::config(format!(
                "cursor file {} holds '{}', expected an integer >= 1",
                self.path.display(),
                text
            ))),
        }
    }

    /// Overwrite the stored index
    pub fn save(&self, index: usize) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, index.to_string())?;
        debug!(cursor = %self.path.display(), index, "Saved cursor");
        Ok(())
    }

    /// Delete the cursor file; returns whether one existed
    pub fn reset(&self) -> Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
