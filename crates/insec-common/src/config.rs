//! Launch configuration model.
//!
//! The command-line binary always launches with [`LaunchConfig::default`];
//! the other fields exist for embedders and for tests that need a
//! different program or lower layer.

use std::path::PathBuf;

use crate::constants::{DEFAULT_LOWER_DIR, DEFAULT_SHELL, SCRATCH_PREFIX};

/// Everything the supervisor needs to launch one isolated shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    /// Program executed as PID 1 inside the new namespaces.
    pub shell: PathBuf,
    /// Arguments after `argv[0]`. Empty for the default launch.
    pub args: Vec<String>,
    /// Read-only lower layer of the overlay.
    pub lower_dir: PathBuf,
    /// Directory in which the scratch directory is allocated.
    pub scratch_parent: PathBuf,
    /// Name prefix of the scratch directory.
    pub scratch_prefix: String,
    /// Hostname set inside the UTS namespace, if any.
    pub hostname: Option<String>,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            shell: PathBuf::from(DEFAULT_SHELL),
            args: Vec::new(),
            lower_dir: PathBuf::from(DEFAULT_LOWER_DIR),
            scratch_parent: std::env::temp_dir(),
            scratch_prefix: SCRATCH_PREFIX.to_string(),
            hostname: None,
        }
    }
}

impl LaunchConfig {
    /// Replaces the launched program and its arguments.
    #[must_use]
    pub fn with_command(mut self, shell: impl Into<PathBuf>, args: Vec<String>) -> Self {
        self.shell = shell.into();
        self.args = args;
        self
    }

    /// Replaces the overlay's lower layer.
    #[must_use]
    pub fn with_lower_dir(mut self, lower_dir: impl Into<PathBuf>) -> Self {
        self.lower_dir = lower_dir.into();
        self
    }

    /// Allocates scratch space under `parent` instead of the temp directory.
    #[must_use]
    pub fn with_scratch_parent(mut self, parent: impl Into<PathBuf>) -> Self {
        self.scratch_parent = parent.into();
        self
    }

    /// Sets the hostname applied inside the UTS namespace.
    #[must_use]
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }
}
