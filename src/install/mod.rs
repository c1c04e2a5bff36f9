//! Beacon installation library
//!
//! Installation runs these steps in order:
//! 1. validate the asset bundle and refuse to clobber an existing deployment
//! 2. stage platform binaries into `<target>/bin`
//! 3. reconcile sample configuration files ([`samples`])
//! 4. provision the registration key on first install ([`credential`])
//!
//! Steps 3 and 4 are safe to re-run; re-running is the recovery path after a
//! partial failure.

pub mod binary_staging;
pub mod credential;
pub mod detection;
pub mod digest;
pub mod environment;
pub mod error;
mod file_ops;
pub mod platform;
pub mod report;
pub mod samples;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};

pub use credential::{ProvisionOutcome, Provenance, RandomTokens, TokenSource};
pub use detection::{InstallationState, check_installation_state};
pub use error::InstallerError;
pub use platform::Platform;

use crate::cli::Cli;
use crate::config::{InstallerConfig, default_assets_dir, default_target_dir};
use credential::CredentialLayout;
use samples::{ReconcileOptions, ReconcileReport};

/// Fully resolved inputs for one installation run
#[derive(Debug, Clone)]
pub struct InstallPlan {
    pub target_dir: PathBuf,
    pub assets_dir: PathBuf,
    pub platform: Platform,
    pub config: InstallerConfig,
    pub force: bool,
    pub skip_binaries: bool,
}

impl InstallPlan {
    /// Resolve paths with CLI flag > config file > built-in default precedence
    pub fn resolve(cli: &Cli, config: InstallerConfig) -> Result<Self> {
        let platform = match cli.platform {
            Some(platform) => platform,
            None => Platform::detect()?,
        };

        let target_dir = cli
            .target
            .clone()
            .or_else(|| config.target_dir.clone())
            .unwrap_or_else(default_target_dir);

        let assets_dir = cli
            .assets
            .clone()
            .or_else(|| config.assets_dir.clone())
            .or_else(default_assets_dir)
            .context("Could not determine the asset bundle location; pass --assets")?;

        Ok(Self {
            target_dir,
            assets_dir,
            platform,
            config,
            force: cli.force,
            skip_binaries: cli.skip_binaries,
        })
    }

    pub fn samples_source(&self) -> PathBuf {
        self.assets_dir.join("samples")
    }

    pub fn binary_bundle(&self) -> PathBuf {
        self.assets_dir.join("bin").join(self.platform.id())
    }

    pub fn binary_dest(&self) -> PathBuf {
        self.target_dir.join("bin")
    }

    pub fn credential_layout(&self) -> CredentialLayout {
        CredentialLayout::new(
            &self.target_dir,
            &self.config.marker_dir,
            &self.config.credential_file,
        )
    }

    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            samples_dir: self.config.samples_dir.clone(),
            marker_dir: self.config.marker_dir.clone(),
            max_archive_index: self.config.max_archive_index,
        }
    }
}

/// Everything an installation run did
#[derive(Debug)]
pub struct InstallSummary {
    pub target_dir: PathBuf,
    pub platform: Platform,
    pub prior_state: InstallationState,
    /// State left behind; `Installed` means the next run needs `--force`
    pub final_state: InstallationState,
    /// Files copied, `None` when binaries were skipped
    pub binaries_staged: Option<usize>,
    pub samples: ReconcileReport,
    pub credential: Result<ProvisionOutcome, InstallerError>,
}

impl InstallSummary {
    /// Any per-file sample failure or a provisioning failure fails the run
    pub fn is_success(&self) -> bool {
        self.samples.is_success() && self.credential.is_ok()
    }
}

/// Run a full installation.
///
/// Returns `Err` only for failures that stop the run before samples are
/// touched (missing bundle, existing deployment, binary staging). Per-file
/// sample failures and key provisioning failures are reported in the summary.
pub fn run_install(
    plan: &InstallPlan,
    provenance: &Provenance,
    tokens: &mut dyn TokenSource,
) -> Result<InstallSummary> {
    info!(
        "Installing Beacon for {} into {}",
        plan.platform,
        plan.target_dir.display()
    );

    validate_sources(plan)?;

    let layout = plan.credential_layout();
    let prior_state = check_installation_state(&plan.target_dir, plan.platform, &layout.marker_dir);
    match prior_state {
        InstallationState::Installed if !plan.force => {
            return Err(InstallerError::ExistingDeployment {
                path: plan.target_dir.clone(),
            }
            .into());
        }
        InstallationState::Installed => {
            warn!("Existing deployment found, installing over it (--force)")
        }
        InstallationState::PartiallyInstalled => {
            info!("Incomplete deployment found, repairing")
        }
        InstallationState::NotInstalled => {}
    }

    fs::create_dir_all(&plan.target_dir).with_context(|| {
        format!("Failed to create target directory: {}", plan.target_dir.display())
    })?;

    let binaries_staged = if plan.skip_binaries {
        info!("Skipping binary staging");
        None
    } else {
        let copied = binary_staging::stage_binaries(&plan.binary_bundle(), &plan.binary_dest())?;
        info!("Staged {copied} binary file(s) into {}", plan.binary_dest().display());
        Some(copied)
    };

    let samples = samples::reconcile_samples(
        &plan.samples_source(),
        &plan.target_dir,
        &plan.reconcile_options(),
    )?;

    let credential = credential::provision_credential(&layout, provenance, tokens);
    if let Err(e) = &credential {
        warn!("{e}");
    }

    let final_state = check_installation_state(&plan.target_dir, plan.platform, &layout.marker_dir);

    Ok(InstallSummary {
        target_dir: plan.target_dir.clone(),
        platform: plan.platform,
        prior_state,
        final_state,
        binaries_staged,
        samples,
        credential,
    })
}

/// Check the bundle before anything in the target is modified
fn validate_sources(plan: &InstallPlan) -> Result<(), InstallerError> {
    require_dir(&plan.assets_dir, "asset bundle directory does not exist")?;
    require_dir(&plan.samples_source(), "asset bundle has no samples directory")?;
    if !plan.skip_binaries {
        require_dir(&plan.binary_bundle(), "asset bundle has no binaries for this platform")?;
    }
    Ok(())
}

fn require_dir(path: &Path, reason: &str) -> Result<(), InstallerError> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(InstallerError::SourceUnavailable {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        })
    }
}

/// Entry point for the `beacon-install` binary
pub fn install_from_cli(cli: &Cli) -> Result<InstallSummary> {
    let config = InstallerConfig::discover(cli.config.as_deref())?;
    let plan = InstallPlan::resolve(cli, config)?;
    let provenance = environment::capture_provenance();
    run_install(&plan, &provenance, &mut RandomTokens)
}
