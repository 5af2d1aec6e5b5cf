//! MD5 content hashing
//!
//! Upload names carry a short MD5 prefix of the file content. Files are read
//! in fixed-size chunks so large documents are never buffered whole.

use crate::error::Result;
use std::io::Read;
use std::path::Path;

/// Chunk size used when streaming a file through the hasher.
pub const HASH_CHUNK_SIZE: usize = 4096;

/// Compute the MD5 hex digest of any readable source, chunk by chunk
pub fn compute_md5_reader<R: Read>(reader: &mut R) -> Result<String> {
    let mut context = md5::Context::new();
    let mut buffer = [0u8; HASH_CHUNK_SIZE];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        context.consume(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", context.compute()))
}

/// Compute the MD5 hex digest of a file
pub fn compute_file_md5(path: impl AsRef<Path>) -> Result<String> {
    let mut file = std::fs::File::open(path)?;
    compute_md5_reader(&mut file)
}

/// First `len` characters of a hex digest
pub fn short_digest(digest: &str, len: usize) -> &str {
    digest.get(..len).unwrap_or(digest)
}
