//! First-run registration key provisioning
//!
//! The marker directory is the only record that a key was ever issued. Once it
//! exists provisioning never runs again, even if the key file inside it is
//! later removed or edited.
//!
//! The key file is written into a hidden staging directory next to the marker
//! and the staging directory is renamed onto the marker path, so the marker
//! cannot exist without a complete key file.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, info};
use uuid::Uuid;

use super::error::InstallerError;
use super::file_ops::write_private_file;

/// Source of registration tokens
pub trait TokenSource {
    fn next_token(&mut self) -> Uuid;
}

/// Random 128-bit identifiers (UUID v4)
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomTokens;

impl TokenSource for RandomTokens {
    fn next_token(&mut self) -> Uuid {
        Uuid::new_v4()
    }
}

/// Who generated the key, where and when
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub generated_at: DateTime<Utc>,
    pub operator: String,
    pub host: String,
}

/// Where the marker directory and key file live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialLayout {
    pub marker_dir: PathBuf,
    pub credential_file: PathBuf,
}

impl CredentialLayout {
    pub fn new(target_dir: &Path, marker_subdir: &Path, file_name: &str) -> Self {
        let marker_dir = target_dir.join(marker_subdir);
        let credential_file = marker_dir.join(file_name);
        Self {
            marker_dir,
            credential_file,
        }
    }

    /// Hidden sibling the key is written into before the rename.
    ///
    /// The name is fixed so a run killed mid-write leaves a directory the
    /// next run recognises and removes.
    fn staging_dir(&self) -> PathBuf {
        let mut name = OsString::from(".");
        name.push(self.marker_dir.file_name().unwrap_or_default());
        name.push(".partial");
        self.marker_dir.with_file_name(name)
    }

    fn is_provisioned(&self) -> bool {
        self.marker_dir.exists()
    }
}

/// A freshly issued registration key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: Uuid,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    Provisioned(Credential),
    AlreadyProvisioned { marker_dir: PathBuf },
}

/// Issue a registration key unless the marker directory already exists
pub fn provision_credential(
    layout: &CredentialLayout,
    provenance: &Provenance,
    tokens: &mut dyn TokenSource,
) -> Result<ProvisionOutcome, InstallerError> {
    if layout.is_provisioned() {
        info!(
            "Registration key already provisioned ({} exists), skipping",
            layout.marker_dir.display()
        );
        return Ok(ProvisionOutcome::AlreadyProvisioned {
            marker_dir: layout.marker_dir.clone(),
        });
    }

    let token = tokens.next_token();
    let content = render_credential_file(&token, provenance, &layout.credential_file);

    let staging = layout.staging_dir();
    write_staged(layout, &staging, content.as_bytes()).map_err(|source| {
        let _ = fs::remove_dir_all(&staging);
        InstallerError::MarkerWriteFailed {
            path: layout.credential_file.clone(),
            source,
        }
    })?;

    info!("Registration key written to {}", layout.credential_file.display());
    Ok(ProvisionOutcome::Provisioned(Credential {
        token,
        path: layout.credential_file.clone(),
    }))
}

fn write_staged(layout: &CredentialLayout, staging: &Path, content: &[u8]) -> io::Result<()> {
    if let Some(parent) = layout.marker_dir.parent() {
        fs::create_dir_all(parent)?;
    }

    if staging.exists() {
        debug!("Removing leftover staging directory {}", staging.display());
        fs::remove_dir_all(staging)?;
    }
    fs::create_dir(staging)?;

    let file_name = layout
        .credential_file
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "credential path has no file name"))?;
    write_private_file(&staging.join(file_name), content)?;

    fs::rename(staging, &layout.marker_dir)
}

/// Text of the registration key file
pub fn render_credential_file(token: &Uuid, provenance: &Provenance, path: &Path) -> String {
    let mut out = String::new();
    out.push_str("# Beacon server registration key\n");
    out.push_str("#\n");
    out.push_str("# This file was generated once, when the server was first installed.\n");
    out.push_str("# Clients must present the key below to register with this server.\n");
    out.push_str("# Treat it like a password: anyone holding it can register clients.\n");
    out.push_str("#\n");
    out.push_str("# The installer never regenerates this key. To issue a new one, replace\n");
    out.push_str("# the last line with a new identifier and restart the server.\n");
    out.push_str("#\n");
    out.push_str(&format!(
        "# Generated: {}\n",
        provenance.generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    ));
    out.push_str(&format!("# Operator:  {}\n", provenance.operator));
    out.push_str(&format!("# Host:      {}\n", provenance.host));
    out.push_str(&format!("# File:      {}\n", path.display()));
    out.push_str(&format!("{}\n", token.hyphenated()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    struct FixedTokens {
        next: u128,
        issued: usize,
    }

    impl FixedTokens {
        fn starting_at(next: u128) -> Self {
            Self { next, issued: 0 }
        }
    }

    impl TokenSource for FixedTokens {
        fn next_token(&mut self) -> Uuid {
            let token = Uuid::from_u128(self.next);
            self.next += 1;
            self.issued += 1;
            token
        }
    }

    fn provenance() -> Provenance {
        Provenance {
            generated_at: Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap(),
            operator: "ops".to_string(),
            host: "beacon-01".to_string(),
        }
    }

    fn layout(temp: &TempDir) -> CredentialLayout {
        CredentialLayout::new(temp.path(), Path::new("keys"), "registration.key")
    }

    #[test]
    fn provisions_key_when_marker_absent() {
        let temp = TempDir::new().unwrap();
        let layout = layout(&temp);
        let mut tokens = FixedTokens::starting_at(0x0123_4567_89ab_cdef_0123_4567_89ab_cdef);

        let outcome = provision_credential(&layout, &provenance(), &mut tokens).unwrap();

        let ProvisionOutcome::Provisioned(credential) = outcome else {
            panic!("expected a new key, got {outcome:?}");
        };
        assert_eq!(credential.path, temp.path().join("keys").join("registration.key"));
        assert!(layout.marker_dir.is_dir());
        let text = fs::read_to_string(&credential.path).unwrap();
        assert_eq!(
            text.lines().last().unwrap(),
            "01234567-89ab-cdef-0123-456789abcdef"
        );
    }

    #[test]
    fn second_call_is_a_no_op() {
        let temp = TempDir::new().unwrap();
        let layout = layout(&temp);
        let mut tokens = FixedTokens::starting_at(1);

        provision_credential(&layout, &provenance(), &mut tokens).unwrap();
        let first = fs::read(&layout.credential_file).unwrap();
        let outcome = provision_credential(&layout, &provenance(), &mut tokens).unwrap();

        assert!(matches!(outcome, ProvisionOutcome::AlreadyProvisioned { .. }));
        assert_eq!(tokens.issued, 1);
        assert_eq!(fs::read(&layout.credential_file).unwrap(), first);
        assert_eq!(fs::read_dir(&layout.marker_dir).unwrap().count(), 1);
    }

    #[test]
    fn existing_marker_without_key_is_not_reprovisioned() {
        let temp = TempDir::new().unwrap();
        let layout = layout(&temp);
        fs::create_dir_all(&layout.marker_dir).unwrap();
        let mut tokens = FixedTokens::starting_at(1);

        let outcome = provision_credential(&layout, &provenance(), &mut tokens).unwrap();

        assert!(matches!(outcome, ProvisionOutcome::AlreadyProvisioned { .. }));
        assert!(!layout.credential_file.exists());
        assert_eq!(tokens.issued, 0);
    }

    #[test]
    fn leftover_staging_directory_from_killed_run_is_removed() {
        let temp = TempDir::new().unwrap();
        let layout = layout(&temp);
        // Left by an earlier process that died before the rename.
        let staging = temp.path().join(".keys.partial");
        fs::create_dir_all(&staging).unwrap();
        fs::write(staging.join("registration.key"), "stale secret").unwrap();
        fs::write(staging.join("junk"), "x").unwrap();

        provision_credential(&layout, &provenance(), &mut RandomTokens).unwrap();

        assert!(!staging.exists());
        let entries: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![OsString::from("keys")]);
        assert_eq!(fs::read_dir(&layout.marker_dir).unwrap().count(), 1);
        let text = fs::read_to_string(&layout.credential_file).unwrap();
        assert!(text.starts_with("# Beacon server registration key\n"));
        assert!(!text.contains("stale secret"));
    }

    #[test]
    fn nested_marker_path_creates_parents() {
        let temp = TempDir::new().unwrap();
        let layout = CredentialLayout::new(temp.path(), Path::new("config/keys"), "registration.key");

        provision_credential(&layout, &provenance(), &mut RandomTokens).unwrap();

        assert!(temp.path().join("config/keys/registration.key").is_file());
    }

    #[test]
    fn write_failure_leaves_no_marker() {
        let temp = TempDir::new().unwrap();
        // A plain file where the marker's parent directory should be.
        fs::write(temp.path().join("config"), "not a directory").unwrap();
        let layout = CredentialLayout::new(temp.path(), Path::new("config/keys"), "registration.key");

        let result = provision_credential(&layout, &provenance(), &mut RandomTokens);

        assert!(matches!(result, Err(InstallerError::MarkerWriteFailed { .. })));
        assert!(!layout.marker_dir.exists());
    }

    #[test]
    fn random_tokens_differ() {
        let mut tokens = RandomTokens;
        let a = tokens.next_token();
        let b = tokens.next_token();

        assert_ne!(a, b);
        assert_eq!(a.get_version_num(), 4);
    }

    #[test]
    fn renders_documentation_provenance_and_token() {
        let token = Uuid::from_u128(0xfeed_beef_0000_4000_8000_0000_0000_0001);
        let text = render_credential_file(
            &token,
            &provenance(),
            Path::new("/var/lib/beacon/keys/registration.key"),
        );

        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[..lines.len() - 1].iter().all(|l| l.starts_with('#')));
        assert!(lines.contains(&"# Generated: 2026-03-14T09:26:53Z"));
        assert!(lines.contains(&"# Operator:  ops"));
        assert!(lines.contains(&"# Host:      beacon-01"));
        assert!(lines.contains(&"# File:      /var/lib/beacon/keys/registration.key"));
        assert_eq!(*lines.last().unwrap(), "feedbeef-0000-4000-8000-000000000001");
        assert!(text.ends_with('\n'));
    }
}
