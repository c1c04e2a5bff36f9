//! Command-line arguments for beacon-install

use std::path::PathBuf;

use clap::Parser;

use crate::install::platform::Platform;

/// Install the Beacon server into a target directory
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "beacon-install")]
#[command(version, about = "Install the Beacon server and its sample configuration")]
pub struct Cli {
    /// Installation directory (defaults to the platform data directory)
    #[arg(long)]
    pub target: Option<PathBuf>,

    /// Asset bundle containing bin/<platform> and samples/
    #[arg(long)]
    pub assets: Option<PathBuf>,

    /// Path to installer configuration file (TOML)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Override platform detection (e.g. linux-x64, windows-x64)
    #[arg(long)]
    pub platform: Option<Platform>,

    /// Install over an existing deployment
    #[arg(long)]
    pub force: bool,

    /// Leave binaries alone; only reconcile samples and the registration key
    #[arg(long)]
    pub skip_binaries: bool,

    /// Debug logging
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags() {
        let cli = Cli::try_parse_from([
            "beacon-install",
            "--target",
            "/srv/beacon",
            "--platform",
            "linux-arm64",
            "--force",
        ])
        .unwrap();

        assert_eq!(cli.target, Some(PathBuf::from("/srv/beacon")));
        assert_eq!(cli.platform, Some(Platform::LinuxArm64));
        assert!(cli.force);
        assert!(!cli.skip_binaries);
    }

    #[test]
    fn rejects_unknown_platform() {
        assert!(Cli::try_parse_from(["beacon-install", "--platform", "amiga"]).is_err());
    }
}
