//! SHA-256 content digests used to tell unchanged files from customized ones

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest as _, Sha256};

use super::error::InstallerError;

const READ_CHUNK: usize = 64 * 1024;

/// Hex-encoded SHA-256 of a file's bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest(String);

impl Digest {
    /// Digest of an in-memory buffer
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hex::encode(hasher.finalize()))
    }

    /// Digest of the file at `path`, read in chunks.
    ///
    /// Always reads the file at call time; results are never cached because the
    /// target directory may change between checks.
    pub fn of_file(path: &Path) -> Result<Self, InstallerError> {
        hash_reader(path).map_err(|source| InstallerError::HashComputationFailed {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn hash_reader(path: &Path) -> io::Result<Digest> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; READ_CHUNK];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(Digest(hex::encode(hasher.finalize())))
}
