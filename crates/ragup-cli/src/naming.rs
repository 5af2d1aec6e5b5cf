//! Upload name normalization and the line-count pre-check
//!
//! Documents are uploaded as `{parent}_{stem}_{hash8}{.ext}`. The name is
//! the dedup key in the metadata store, so it must only change when the
//! content (or location) changes.

use ragup_common::checksum::{compute_file_md5, short_digest};
use std::path::Path;
use tracing::{debug, warn};

/// Hex characters of the content hash kept in the upload name
pub const HASH_PREFIX_LEN: usize = 8;

/// Placeholder used when the file cannot be hashed
pub const UNKNOWN_HASH: &str = "unknown";

/// Extensions subject to the minimum line count
pub const LINE_COUNTED_EXTENSIONS: &[&str] = &["txt", "md", "html"];

/// Collision-resistant name under which `path` is uploaded
pub fn upload_name(path: &Path) -> String {
    let digest = match compute_file_md5(path) {
        Ok(digest) => digest,
        Err(e) => {
            warn!(file = %path.display(), error = %e, "Failed to hash file");
            UNKNOWN_HASH.to_string()
        },
    };
    let hash = short_digest(&digest, HASH_PREFIX_LEN);

    let parent = path
        .parent()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    let name = format!("{}_{}_{}{}", parent, stem, hash, ext);
    debug!(file = %path.display(), upload_name = %name, "Normalized file name");
    name
}

/// Whether `path` gets the minimum line-count check
pub fn needs_line_count(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            LINE_COUNTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Number of lines in a UTF-8 text file; 0 when it cannot be read
///
/// `\n`, `\r\n` and a bare `\r` all end a line, so old Mac line endings
/// count the same as Unix ones.
pub fn count_lines(path: &Path) -> usize {
    match std::fs::read_to_string(path) {
        Ok(text) => count_text_lines(&text),
        Err(e) => {
            warn!(file = %path.display(), error = %e, "Failed to read file for line count");
            0
        },
    }
}

fn count_text_lines(text: &str) -> usize {
    let mut count = 0;
    let mut open_line = false;
    let mut after_cr = false;

    for byte in text.bytes() {
        match byte {
            b'\n' if after_cr => after_cr = false,
            b'\n' | b'\r' => {
                count += 1;
                open_line = false;
                after_cr = byte == b'\r';
            },
            _ => {
                open_line = true;
                after_cr = false;
            },
        }
    }

    if open_line {
        count += 1;
    }
    count
}
