//! SHA-256 digests of produced archives.

use crate::error::Result;
use camino::Utf8Path;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::io::Read;

/// Lowercase hex SHA-256 digest of an archive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchiveDigest(String);

impl ArchiveDigest {
    /// The digest as a hex string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The first twelve hex digits, for progress output.
    #[must_use]
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for ArchiveDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the SHA-256 digest of the file at `path`.
///
/// # Errors
///
/// Returns [`crate::error::PackagerError::Io`] if the file cannot be read.
pub fn compute_sha256(path: &Utf8Path) -> Result<ArchiveDigest> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(ArchiveDigest(format!("{:x}", hasher.finalize())))
}
