//! Console summary of an installation run

use std::io::{self, Write};

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use super::samples::SampleOutcome;
use super::{InstallSummary, InstallationState, ProvisionOutcome};

/// Print the summary to stdout
pub fn print_summary(summary: &InstallSummary) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let _ = write_summary(&mut stdout, summary);
}

/// Write the summary to any colour-capable writer
pub fn write_summary<W: WriteColor>(out: &mut W, summary: &InstallSummary) -> io::Result<()> {
    heading(out, "\nBeacon installation summary")?;
    writeln!(out, "   Target:   {}", summary.target_dir.display())?;
    writeln!(out, "   Platform: {}", summary.platform)?;
    match summary.binaries_staged {
        Some(count) => writeln!(out, "   Binaries: {count} file(s) staged")?,
        None => writeln!(out, "   Binaries: skipped")?,
    }

    heading(out, "\nSample configuration")?;
    if summary.samples.records.is_empty() {
        writeln!(out, "   (no sample files in bundle)")?;
    }
    for (name, outcome) in summary.samples.outcomes() {
        let (color, detail) = match outcome {
            SampleOutcome::Installed { .. } => (Color::Green, String::new()),
            SampleOutcome::Unchanged { .. } => (Color::White, String::new()),
            SampleOutcome::Archived { archive_path } => {
                (Color::Yellow, format!(" → {}", archive_path.display()))
            }
            SampleOutcome::AlreadyArchived { archive_path } => {
                (Color::White, format!(" ({})", archive_path.display()))
            }
        };
        status(out, color, outcome.label())?;
        writeln!(out, " {name}{detail}")?;
    }
    for (name, error) in summary.samples.failures() {
        status(out, Color::Red, "failed")?;
        writeln!(out, " {name}: {error}")?;
    }
    if let Err(e) = summary.samples.check() {
        let rerun = match summary.final_state {
            InstallationState::Installed => "re-run the installer with --force",
            _ => "re-run the installer",
        };
        status(out, Color::Red, "error")?;
        writeln!(out, " {e}; {rerun} after fixing the cause")?;
    }

    heading(out, "\nRegistration key")?;
    match &summary.credential {
        Ok(ProvisionOutcome::Provisioned(credential)) => {
            status(out, Color::Green, "created")?;
            writeln!(out, " {}", credential.path.display())?;
        }
        Ok(ProvisionOutcome::AlreadyProvisioned { marker_dir }) => {
            status(out, Color::White, "kept")?;
            writeln!(out, " already provisioned ({})", marker_dir.display())?;
        }
        Err(e) => {
            status(out, Color::Red, "failed")?;
            writeln!(out, " {e}")?;
        }
    }

    writeln!(out)?;
    if summary.is_success() {
        status(out, Color::Green, "✓ Installation completed successfully")?;
    } else {
        status(out, Color::Red, "✗ Installation finished with errors")?;
    }
    writeln!(out)
}

fn heading<W: WriteColor>(out: &mut W, text: &str) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true))?;
    writeln!(out, "{text}")?;
    out.reset()
}

fn status<W: WriteColor>(out: &mut W, color: Color, label: &str) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(color)))?;
    write!(out, "   {label:<16}")?;
    out.reset()
}
