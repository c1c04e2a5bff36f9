//! Environment queries for registration key provenance
//!
//! Kept out of the provisioning code so that code only sees plain values.

use chrono::Utc;

use super::credential::Provenance;

const UNKNOWN: &str = "unknown";

/// Capture timestamp, operator account and host name from the running system
pub fn capture_provenance() -> Provenance {
    Provenance {
        generated_at: Utc::now(),
        operator: non_empty(operator_name()),
        host: non_empty(host_name()),
    }
}

fn non_empty(value: Option<String>) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// Account the installer runs as
pub fn operator_name() -> Option<String> {
    cfg_if::cfg_if! {
        if #[cfg(unix)] {
            match nix::unistd::User::from_uid(nix::unistd::getuid()) {
                Ok(Some(user)) => Some(user.name),
                Ok(None) => std::env::var("USER").ok(),
                Err(e) => {
                    log::debug!("User lookup failed: {e}");
                    std::env::var("USER").ok()
                }
            }
        } else {
            std::env::var("USERNAME").ok()
        }
    }
}

/// Name of this machine
pub fn host_name() -> Option<String> {
    cfg_if::cfg_if! {
        if #[cfg(unix)] {
            match nix::unistd::gethostname() {
                Ok(name) => name.into_string().ok(),
                Err(e) => {
                    log::debug!("gethostname failed: {e}");
                    None
                }
            }
        } else {
            std::env::var("COMPUTERNAME").ok()
        }
    }
}
