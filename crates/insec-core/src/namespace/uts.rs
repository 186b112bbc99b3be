//! UTS namespace isolation.
//!
//! Lets the container carry its own hostname without touching the host's.

use insec_common::error::{InsecError, Result};

/// Sets the hostname inside the caller's UTS namespace.
///
/// Only meaningful after the caller has entered a new UTS namespace;
/// otherwise it renames the host.
///
/// # Errors
///
/// Returns [`InsecError::Hostname`] if `sethostname(2)` fails.
pub fn set_hostname(hostname: &str) -> Result<()> {
    nix::unistd::sethostname(hostname).map_err(|e| InsecError::Hostname {
        hostname: hostname.to_string(),
        source: e.into(),
    })?;
    tracing::debug!(hostname, "container hostname set");
    Ok(())
}
