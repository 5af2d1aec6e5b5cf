//! Document discovery
//!
//! Walks the document directory once per configured extension. Within a
//! pass entries come back sorted by file name, so an unchanged tree always
//! yields the same listing and the cursor can resume by index.

use crate::error::{CliError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// All files under `root` whose extension is in `extensions`
///
/// Results are grouped by extension, in the order given. A file is listed
/// once per matching pass; no deduplication across extensions.
pub fn discover<S: AsRef<str>>(root: &Path, extensions: &[S]) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(CliError::config(format!(
            "documents.dir '{}' does not exist or is not a directory",
            root.display()
        )));
    }

    let mut files = Vec::new();
    for ext in extensions {
        let ext = ext.as_ref().trim().trim_start_matches('.');
        if ext.is_empty() {
            continue;
        }

        let before = files.len();
        files.extend(walk_extension(root, ext));
        debug!(extension = ext, count = files.len() - before, "Discovered documents");
    }

    Ok(files)
}

fn walk_extension(root: &Path, ext: &str) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry");
                None
            },
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.path().extension().and_then(|e| e.to_str()) == Some(ext))
        .map(DirEntry::into_path)
        .collect()
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}
