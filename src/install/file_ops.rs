//! Atomic file writes for installed configuration.
//!
//! A half-written config left behind by an interrupted run would hash
//! differently from its template and look customized on the next run, so
//! content is written to a sibling temp file, synced, then renamed into place.

use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Write `content` to `path` atomically
pub(crate) fn write_file_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
    let temp_path = partial_path(path);

    let result = write_synced(&mut fs::OpenOptions::new(), &temp_path, content)
        .and_then(|()| fs::rename(&temp_path, path));
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

/// Write a file that only its owner can read on Unix.
///
/// The mode is applied when the file is created, so the content is never
/// readable by others, not even briefly.
pub(crate) fn write_private_file(path: &Path, content: &[u8]) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    write_synced(&mut options, path, content)
}

fn write_synced(options: &mut fs::OpenOptions, path: &Path, content: &[u8]) -> io::Result<()> {
    let mut file = options.write(true).create(true).truncate(true).open(path)?;
    file.write_all(content)?;
    file.sync_all()
}

/// `<dir>/.<name>.partial`
fn partial_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(".partial");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_leaves_no_partial_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("Config.yml");

        write_file_atomic(&path, b"listen: 0.0.0.0\n").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"listen: 0.0.0.0\n");
        assert!(!temp.path().join(".Config.yml.partial").exists());
    }

    #[test]
    fn atomic_write_fails_when_parent_missing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing").join("Config.yml");

        assert!(write_file_atomic(&path, b"x").is_err());
    }

    #[test]
    fn failed_atomic_write_removes_partial_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("Config.yml");
        // A directory in the way makes the rename fail after the temp file was written.
        fs::create_dir(&path).unwrap();
        fs::write(path.join("inner"), "x").unwrap();

        assert!(write_file_atomic(&path, b"listen: 0.0.0.0\n").is_err());
        assert!(!temp.path().join(".Config.yml.partial").exists());
    }

    #[cfg(unix)]
    #[test]
    fn private_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("registration.key");
        write_private_file(&path, b"secret\n").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
