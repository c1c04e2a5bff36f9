//! Installer error types

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the installer steps.
///
/// Per-file variants (`HashComputationFailed`, `WriteFailed`,
/// `ArchiveLimitExceeded`, `ReservedName`) are collected by the sample reconciler and do not
/// stop the batch; `PartialFailure` summarises them once the batch is done.
#[derive(Debug, Error)]
pub enum InstallerError {
    #[error("Source unavailable at {}: {reason}", .path.display())]
    SourceUnavailable { path: PathBuf, reason: String },

    #[error("Failed to hash {}: {source}", .path.display())]
    HashComputationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No free sample slot for {name} within {limit} attempts")]
    ArchiveLimitExceeded { name: String, limit: usize },

    #[error("Sample {name} would occupy the reserved path {}", .path.display())]
    ReservedName { name: String, path: PathBuf },

    #[error("{failed} of {total} sample files could not be reconciled")]
    PartialFailure { failed: usize, total: usize },

    #[error("Failed to provision registration key at {}: {source}", .path.display())]
    MarkerWriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("An existing deployment was found at {} (use --force to install over it)", .path.display())]
    ExistingDeployment { path: PathBuf },

    #[error("Unsupported platform: {os} {arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("Invalid configuration {}: {reason}", .path.display())]
    Config { path: PathBuf, reason: String },
}
