//! Platform detection for asset bundle selection

use std::fmt;
use std::str::FromStr;

use once_cell::sync::OnceCell;

use super::error::InstallerError;

/// Platforms the asset bundle ships binaries for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    LinuxX64,
    LinuxArm64,
    MacOsX64,
    MacOsArm64,
    WindowsX64,
}

/// Global cache for platform detection (initialized once, used everywhere)
static PLATFORM_CACHE: OnceCell<Platform> = OnceCell::new();

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::LinuxX64,
        Platform::LinuxArm64,
        Platform::MacOsX64,
        Platform::MacOsArm64,
        Platform::WindowsX64,
    ];

    /// Detect current platform (cached after first call)
    pub fn detect() -> Result<Self, InstallerError> {
        PLATFORM_CACHE
            .get_or_try_init(|| Self::from_os_arch(std::env::consts::OS, std::env::consts::ARCH))
            .copied()
    }

    pub fn from_os_arch(os: &str, arch: &str) -> Result<Self, InstallerError> {
        match (os, arch) {
            ("linux", "x86_64") => Ok(Platform::LinuxX64),
            ("linux", "aarch64") => Ok(Platform::LinuxArm64),
            ("macos", "x86_64") => Ok(Platform::MacOsX64),
            ("macos", "aarch64") => Ok(Platform::MacOsArm64),
            ("windows", "x86_64") => Ok(Platform::WindowsX64),
            (os, arch) => Err(InstallerError::UnsupportedPlatform {
                os: os.to_string(),
                arch: arch.to_string(),
            }),
        }
    }

    /// Name of this platform's directory under `<assets>/bin`
    pub fn id(&self) -> &'static str {
        match self {
            Platform::LinuxX64 => "linux-x64",
            Platform::LinuxArm64 => "linux-arm64",
            Platform::MacOsX64 => "macos-x64",
            Platform::MacOsArm64 => "macos-arm64",
            Platform::WindowsX64 => "windows-x64",
        }
    }

    /// File name of the server executable on this platform
    pub fn server_binary(&self) -> &'static str {
        match self {
            Platform::WindowsX64 => "beacon-server.exe",
            _ => "beacon-server",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|p| p.id() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = Platform::ALL.iter().map(Platform::id).collect();
                format!("unknown platform '{s}' (expected one of: {})", known.join(", "))
            })
    }
}
