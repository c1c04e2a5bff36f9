//! Sample configuration reconciliation
//!
//! Every template shipped in the asset bundle is compared against the file of
//! the same name in the target directory:
//! - absent → the template is installed
//! - identical content → left alone
//! - customized → the template is archived as `<samples>/<name>_<n>` unless an
//!   archive entry with the same content already exists
//!
//! The live file is never overwritten once it exists. Re-running is safe:
//! installed and archived templates are recognised by content and skipped.

use std::fs;
use std::path::{Component, Path, PathBuf};

use log::{debug, info, warn};

use super::digest::Digest;
use super::error::InstallerError;
use super::file_ops::write_file_atomic;

/// Upper bound on archive indices tried for one template
pub const DEFAULT_MAX_ARCHIVE_INDEX: usize = 1000;

/// Settings for one reconciliation pass
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Samples directory, relative to the target directory
    pub samples_dir: PathBuf,
    /// Key marker directory, relative to the target directory; no template
    /// may be installed over it
    pub marker_dir: PathBuf,
    pub max_archive_index: usize,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            samples_dir: PathBuf::from("samples"),
            marker_dir: PathBuf::from("keys"),
            max_archive_index: DEFAULT_MAX_ARCHIVE_INDEX,
        }
    }
}

impl ReconcileOptions {
    /// Top-level entry of the target a template named `name` must not claim
    fn reserved_entry(&self, name: &str) -> Option<&Path> {
        [&self.samples_dir, &self.marker_dir]
            .into_iter()
            .find(|dir| first_component(dir).is_some_and(|c| c == name))
            .map(PathBuf::as_path)
    }
}

fn first_component(path: &Path) -> Option<&str> {
    path.components()
        .find_map(|c| match c {
            Component::Normal(name) => Some(name),
            _ => None,
        })
        .and_then(|name| name.to_str())
}

/// A template file from the asset bundle
#[derive(Debug, Clone)]
pub struct Template {
    pub name: String,
    pub path: PathBuf,
}

/// What happened to one template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleOutcome {
    /// No target file existed; the template was copied in
    Installed { path: PathBuf },
    /// The target file already matches the template
    Unchanged { path: PathBuf },
    /// The target file is customized; the template was saved as a new sample
    Archived { archive_path: PathBuf },
    /// The target file is customized and this template is already archived
    AlreadyArchived { archive_path: PathBuf },
}

impl SampleOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Installed { .. } => "installed",
            Self::Unchanged { .. } => "unchanged",
            Self::Archived { .. } => "archived",
            Self::AlreadyArchived { .. } => "already archived",
        }
    }
}

/// Result for one template
#[derive(Debug)]
pub struct SampleRecord {
    pub name: String,
    pub result: Result<SampleOutcome, InstallerError>,
}

/// Per-template results of a reconciliation pass, in template name order
#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub records: Vec<SampleRecord>,
}

impl ReconcileReport {
    pub fn outcomes(&self) -> impl Iterator<Item = (&str, &SampleOutcome)> {
        self.records
            .iter()
            .filter_map(|r| r.result.as_ref().ok().map(|o| (r.name.as_str(), o)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &InstallerError)> {
        self.records
            .iter()
            .filter_map(|r| r.result.as_ref().err().map(|e| (r.name.as_str(), e)))
    }

    pub fn failed_count(&self) -> usize {
        self.failures().count()
    }

    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    /// `PartialFailure` if any template failed
    pub fn check(&self) -> Result<(), InstallerError> {
        match self.failed_count() {
            0 => Ok(()),
            failed => Err(InstallerError::PartialFailure {
                failed,
                total: self.records.len(),
            }),
        }
    }
}

/// List the templates in `source_dir`, sorted by name.
///
/// Only regular files are templates; a missing or unreadable directory is
/// `SourceUnavailable`.
pub fn list_templates(source_dir: &Path) -> Result<Vec<Template>, InstallerError> {
    let unavailable = |reason: String| InstallerError::SourceUnavailable {
        path: source_dir.to_path_buf(),
        reason,
    };

    if !source_dir.is_dir() {
        return Err(unavailable("sample directory does not exist".to_string()));
    }

    let entries = fs::read_dir(source_dir).map_err(|e| unavailable(e.to_string()))?;

    let mut templates = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| unavailable(e.to_string()))?;
        let path = entry.path();
        if !path.is_file() {
            debug!("Ignoring non-file entry in samples: {}", path.display());
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            warn!("Ignoring sample with non UTF-8 name: {}", path.display());
            continue;
        };
        templates.push(Template { name, path });
    }

    templates.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(templates)
}

/// Reconcile every template in `source_dir` against `target_dir`.
///
/// Per-file failures are recorded in the report and do not stop the batch;
/// call [`ReconcileReport::check`] to turn them into an overall error.
pub fn reconcile_samples(
    source_dir: &Path,
    target_dir: &Path,
    options: &ReconcileOptions,
) -> Result<ReconcileReport, InstallerError> {
    let templates = list_templates(source_dir)?;
    info!(
        "Reconciling {} sample file(s) from {} into {}",
        templates.len(),
        source_dir.display(),
        target_dir.display()
    );

    let mut report = ReconcileReport::default();
    for template in &templates {
        let result = reconcile_one(template, target_dir, options);
        match &result {
            Ok(outcome) => log_outcome(&template.name, outcome),
            Err(e) => warn!("Sample {} not reconciled: {e}", template.name),
        }
        report.records.push(SampleRecord {
            name: template.name.clone(),
            result,
        });
    }

    Ok(report)
}

/// Reconcile a single template
pub fn reconcile_one(
    template: &Template,
    target_dir: &Path,
    options: &ReconcileOptions,
) -> Result<SampleOutcome, InstallerError> {
    if let Some(reserved) = options.reserved_entry(&template.name) {
        return Err(InstallerError::ReservedName {
            name: template.name.clone(),
            path: target_dir.join(reserved),
        });
    }

    let content = fs::read(&template.path).map_err(|source| {
        InstallerError::HashComputationFailed {
            path: template.path.clone(),
            source,
        }
    })?;
    let template_digest = Digest::of_bytes(&content);

    let target_path = target_dir.join(&template.name);
    if !target_path.exists() {
        write_file_atomic(&target_path, &content).map_err(|source| {
            InstallerError::WriteFailed {
                path: target_path.clone(),
                source,
            }
        })?;
        return Ok(SampleOutcome::Installed { path: target_path });
    }

    if Digest::of_file(&target_path)? == template_digest {
        return Ok(SampleOutcome::Unchanged { path: target_path });
    }

    archive_sample(
        &template.name,
        &content,
        &template_digest,
        &target_dir.join(&options.samples_dir),
        options.max_archive_index,
    )
}

/// Store `content` under the first free `<name>_<n>` in `samples_dir`.
///
/// Candidates are tried from `_1` upwards. An occupied slot holding the same
/// content means the template is already archived and nothing is written.
pub fn archive_sample(
    name: &str,
    content: &[u8],
    digest: &Digest,
    samples_dir: &Path,
    max_index: usize,
) -> Result<SampleOutcome, InstallerError> {
    for index in 1..=max_index {
        let candidate = samples_dir.join(archive_name(name, index));

        if !candidate.exists() {
            fs::create_dir_all(samples_dir).map_err(|source| InstallerError::WriteFailed {
                path: samples_dir.to_path_buf(),
                source,
            })?;
            write_file_atomic(&candidate, content).map_err(|source| {
                InstallerError::WriteFailed {
                    path: candidate.clone(),
                    source,
                }
            })?;
            return Ok(SampleOutcome::Archived {
                archive_path: candidate,
            });
        }

        if Digest::of_file(&candidate)? == *digest {
            return Ok(SampleOutcome::AlreadyArchived {
                archive_path: candidate,
            });
        }

        debug!("{} holds different content, trying next index", candidate.display());
    }

    Err(InstallerError::ArchiveLimitExceeded {
        name: name.to_string(),
        limit: max_index,
    })
}

/// `<name>_<index>`
pub fn archive_name(name: &str, index: usize) -> String {
    format!("{name}_{index}")
}

fn log_outcome(name: &str, outcome: &SampleOutcome) {
    match outcome {
        SampleOutcome::Installed { path } => {
            info!("Installed sample {name} at {}", path.display())
        }
        SampleOutcome::Unchanged { path } => {
            info!("{} matches the shipped sample, left untouched", path.display())
        }
        SampleOutcome::Archived { archive_path } => info!(
            "{name} has local changes; new sample saved as {}",
            archive_path.display()
        ),
        SampleOutcome::AlreadyArchived { archive_path } => info!(
            "{name} has local changes; sample already saved as {}",
            archive_path.display()
        ),
    }
}
