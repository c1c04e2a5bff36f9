use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;

use crate::install::InstallerError;
use crate::install::samples::DEFAULT_MAX_ARCHIVE_INDEX;

/// Installer configuration (optional TOML file, every field defaulted).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstallerConfig {
    /// Installation directory; the platform data dir when unset
    pub target_dir: Option<PathBuf>,
    /// Asset bundle directory; `<exe dir>/assets` when unset
    pub assets_dir: Option<PathBuf>,
    /// Archived samples, relative to the target directory
    pub samples_dir: PathBuf,
    /// Registration key marker directory, relative to the target directory
    pub marker_dir: PathBuf,
    /// Registration key file name inside the marker directory
    pub credential_file: String,
    pub max_archive_index: usize,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            target_dir: None,
            assets_dir: None,
            samples_dir: PathBuf::from("samples"),
            marker_dir: PathBuf::from("keys"),
            credential_file: "registration.key".to_string(),
            max_archive_index: DEFAULT_MAX_ARCHIVE_INDEX,
        }
    }
}

impl InstallerConfig {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self, InstallerError> {
        let content = fs::read_to_string(path).map_err(|e| InstallerError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::parse(&content, path)
    }

    /// Load `explicit` if given, else the per-user config file if present, else defaults
    pub fn discover(explicit: Option<&Path>) -> Result<Self, InstallerError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match default_config_path() {
            Some(path) if path.is_file() => {
                log::debug!("Using config file {}", path.display());
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn parse(content: &str, origin: &Path) -> Result<Self, InstallerError> {
        let config: Self = toml::from_str(content).map_err(|e| InstallerError::Config {
            path: origin.to_path_buf(),
            reason: e.to_string(),
        })?;
        config.validate(origin)?;
        Ok(config)
    }

    fn validate(&self, origin: &Path) -> Result<(), InstallerError> {
        let invalid = |reason: String| InstallerError::Config {
            path: origin.to_path_buf(),
            reason,
        };

        for (key, value) in [("samples_dir", &self.samples_dir), ("marker_dir", &self.marker_dir)] {
            if !is_plain_relative(value) {
                return Err(invalid(format!(
                    "{key} must be a relative path inside the target directory, got {}",
                    value.display()
                )));
            }
        }

        // Archiving creates the samples directory, which would then pass for
        // the key marker.
        let samples = normalized(&self.samples_dir);
        let marker = normalized(&self.marker_dir);
        if samples.starts_with(&marker) || marker.starts_with(&samples) {
            return Err(invalid(format!(
                "samples_dir ({}) and marker_dir ({}) must not overlap",
                self.samples_dir.display(),
                self.marker_dir.display()
            )));
        }

        if self.credential_file.is_empty()
            || self.credential_file.contains(['/', '\\'])
            || self.credential_file == "."
            || self.credential_file == ".."
        {
            return Err(invalid(format!(
                "credential_file must be a plain file name, got '{}'",
                self.credential_file
            )));
        }

        if self.max_archive_index == 0 {
            return Err(invalid("max_archive_index must be at least 1".to_string()));
        }

        Ok(())
    }
}

/// Relative, non-empty, and free of `..`/root components
fn is_plain_relative(path: &Path) -> bool {
    let mut components = path.components().peekable();
    if components.peek().is_none() {
        return false;
    }
    components.all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        && path.components().any(|c| matches!(c, Component::Normal(_)))
}

/// `path` without `.` components, so `./keys` and `keys` compare equal
fn normalized(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect()
}

/// `<config dir>/beacon/install.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("beacon").join("install.toml"))
}

/// Platform-specific installation directory (system-wide for a server)
pub fn default_target_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        PathBuf::from("/usr/local/var/beacon")
    }

    #[cfg(target_os = "linux")]
    {
        PathBuf::from("/var/lib/beacon")
    }

    #[cfg(target_os = "windows")]
    {
        std::env::var("ProgramData")
            .map(|p| PathBuf::from(p).join("Beacon"))
            .unwrap_or_else(|_| PathBuf::from("C:\\ProgramData\\Beacon"))
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        dirs::data_local_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("beacon")
    }
}

/// `<directory of the running executable>/assets`
pub fn default_assets_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("assets")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Result<InstallerConfig, InstallerError> {
        InstallerConfig::parse(content, Path::new("beacon-install.toml"))
    }

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(parse("").unwrap(), InstallerConfig::default());
    }

    #[test]
    fn overrides_are_applied() {
        let config = parse(
            r#"
target_dir = "/srv/beacon"
samples_dir = "config/samples"
marker_dir = "config/keys"
credential_file = "beacon.key"
max_archive_index = 50
"#,
        )
        .unwrap();

        assert_eq!(config.target_dir, Some(PathBuf::from("/srv/beacon")));
        assert_eq!(config.samples_dir, PathBuf::from("config/samples"));
        assert_eq!(config.marker_dir, PathBuf::from("config/keys"));
        assert_eq!(config.credential_file, "beacon.key");
        assert_eq!(config.max_archive_index, 50);
        assert_eq!(config.assets_dir, None);
    }

    #[test]
    fn escaping_layout_paths_are_rejected() {
        assert!(parse(r#"samples_dir = "../samples""#).is_err());
        assert!(parse(r#"marker_dir = "/etc/keys""#).is_err());
        assert!(parse(r#"marker_dir = """#).is_err());
        assert!(parse(r#"credential_file = "keys/registration.key""#).is_err());
        assert!(parse("max_archive_index = 0").is_err());
    }

    #[test]
    fn overlapping_samples_and_marker_dirs_are_rejected() {
        for content in [
            "samples_dir = \"keys\"",
            "samples_dir = \"./keys\"",
            "samples_dir = \"keys/samples\"",
            "marker_dir = \"samples/keys\"",
        ] {
            assert!(
                matches!(parse(content), Err(InstallerError::Config { .. })),
                "accepted: {content}"
            );
        }

        let sibling = parse("samples_dir = \"config/samples\"\nmarker_dir = \"config/keys\"").unwrap();
        assert_eq!(sibling.marker_dir, PathBuf::from("config/keys"));
        assert!(parse("samples_dir = \"keysets\"").is_ok());
    }

    #[test]
    fn explicit_missing_file_is_a_config_error() {
        let temp = tempfile::TempDir::new().unwrap();
        let missing = temp.path().join("absent.toml");

        assert!(matches!(
            InstallerConfig::discover(Some(&missing)),
            Err(InstallerError::Config { path, .. }) if path == missing
        ));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            parse("sample_dir = \"x\""),
            Err(InstallerError::Config { .. })
        ));
    }
}
