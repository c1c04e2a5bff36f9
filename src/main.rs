use beacon_install::cli::Cli;
use beacon_install::install::{self, report};
use log::error;

fn main() {
    let cli = Cli::parse_args();

    // RUST_LOG overrides the default level
    env_logger::Builder::new()
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[{} {} {}:{}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .filter_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .parse_default_env()
        .init();

    match install::install_from_cli(&cli) {
        Ok(summary) => {
            report::print_summary(&summary);
            if !summary.is_success() {
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("Installation failed: {e:#}");
            std::process::exit(1);
        }
    }
}
