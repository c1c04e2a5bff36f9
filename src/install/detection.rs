//! Existing deployment detection
//!
//! Determines whether the target directory already holds a Beacon deployment
//! by checking:
//! - the server binary in `<target>/bin`
//! - the registration key marker directory

use std::path::Path;

use super::platform::Platform;

/// Installation state enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallationState {
    /// Neither the server binary nor the marker directory exists
    NotInstalled,
    /// One of them exists (interrupted install, repair needed)
    PartiallyInstalled,
    /// Both exist
    Installed,
}

/// Check the deployment state of `target_dir`
pub fn check_installation_state(
    target_dir: &Path,
    platform: Platform,
    marker_dir: &Path,
) -> InstallationState {
    let binary_ok = target_dir.join("bin").join(platform.server_binary()).is_file();
    let marker_ok = marker_dir.exists();

    match (binary_ok, marker_ok) {
        (false, false) => InstallationState::NotInstalled,
        (true, true) => InstallationState::Installed,
        _ => InstallationState::PartiallyInstalled,
    }
}
