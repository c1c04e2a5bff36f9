//! Binary staging for the beacon installer
//!
//! Copies the platform's binary tree from the asset bundle into the target
//! directory. Binaries are always overwritten; only sample configuration is
//! protected from clobbering.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::debug;
use walkdir::WalkDir;

use super::error::InstallerError;

/// Recursively copy `bundle_dir` into `dest_dir`, returning the number of files copied
pub fn stage_binaries(bundle_dir: &Path, dest_dir: &Path) -> Result<usize> {
    if !bundle_dir.is_dir() {
        return Err(InstallerError::SourceUnavailable {
            path: bundle_dir.to_path_buf(),
            reason: "binary bundle for this platform is missing".to_string(),
        }
        .into());
    }

    fs::create_dir_all(dest_dir)
        .with_context(|| format!("Failed to create binary directory: {}", dest_dir.display()))?;

    let mut copied = 0;
    for entry in WalkDir::new(bundle_dir).min_depth(1) {
        let entry = entry
            .with_context(|| format!("Failed to walk binary bundle: {}", bundle_dir.display()))?;
        let relative = entry
            .path()
            .strip_prefix(bundle_dir)
            .with_context(|| format!("Invalid bundle entry: {}", entry.path().display()))?;
        let dest_path = dest_dir.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest_path)
                .with_context(|| format!("Failed to create directory: {}", dest_path.display()))?;
            continue;
        }

        fs::copy(entry.path(), &dest_path).with_context(|| {
            format!("Failed to copy {} to {}", entry.path().display(), dest_path.display())
        })?;
        set_executable(&dest_path)?;

        debug!("Staged {}", dest_path.display());
        copied += 1;
    }

    Ok(copied)
}

/// Set executable permissions (755)
#[cfg(unix)]
fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)
        .with_context(|| format!("Failed to read metadata: {}", path.display()))?
        .permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms)
        .with_context(|| format!("Failed to set permissions: {}", path.display()))
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn copies_nested_tree_and_overwrites() {
        let temp = TempDir::new().unwrap();
        let bundle = temp.path().join("assets/bin/linux-x64");
        fs::create_dir_all(bundle.join("lib")).unwrap();
        fs::write(bundle.join("beacon-server"), b"new server").unwrap();
        fs::write(bundle.join("lib/libbeacon.so"), b"lib").unwrap();

        let dest = temp.path().join("target/bin");
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("beacon-server"), b"old server").unwrap();

        let copied = stage_binaries(&bundle, &dest).unwrap();

        assert_eq!(copied, 2);
        assert_eq!(fs::read(dest.join("beacon-server")).unwrap(), b"new server");
        assert_eq!(fs::read(dest.join("lib/libbeacon.so")).unwrap(), b"lib");
    }

    #[cfg(unix)]
    #[test]
    fn staged_files_are_executable() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let bundle = temp.path().join("bundle");
        fs::create_dir_all(&bundle).unwrap();
        fs::write(bundle.join("beacon-server"), b"bin").unwrap();
        let dest = temp.path().join("bin");

        stage_binaries(&bundle, &dest).unwrap();

        let mode = fs::metadata(dest.join("beacon-server")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn missing_bundle_is_source_unavailable() {
        let temp = TempDir::new().unwrap();

        let err = stage_binaries(&temp.path().join("missing"), &temp.path().join("bin")).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<InstallerError>(),
            Some(InstallerError::SourceUnavailable { .. })
        ));
    }
}
