//! Unified error types for the insec workspace.
//!
//! Errors raised inside the child never cross the namespace boundary as
//! values: the child logs them and exits with a status code. Errors raised
//! by the supervisor are returned to the caller directly.

use std::path::PathBuf;

use thiserror::Error;

use crate::constants::{EXIT_EXEC_FAILURE, EXIT_FAILURE, EXIT_SETUP_FAILURE};
use crate::types::{MountStepKind, RootSwitchOp};

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum InsecError {
    /// The scratch directory could not be created.
    #[error("failed to allocate scratch directory under {parent}: {source}")]
    Allocation {
        /// Directory the scratch space was to be created in.
        parent: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The namespace-creating spawn failed.
    #[error("failed to spawn child in new namespaces: {source}")]
    Namespace {
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// Setting the hostname inside the UTS namespace failed.
    #[error("failed to set hostname {hostname:?}: {source}")]
    Hostname {
        /// Requested hostname.
        hostname: String,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// A step of the mount plan failed.
    #[error("mount step '{step}' failed on {target}: {source}")]
    Mount {
        /// Which step failed.
        step: MountStepKind,
        /// Target path of the failing step.
        target: PathBuf,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// An operation of the root switch failed.
    #[error("root switch '{op}' failed: {source}")]
    RootSwitch {
        /// Which operation failed.
        op: RootSwitchOp,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// Replacing the child's image with the target program failed.
    #[error("failed to exec {program}: {source}")]
    Exec {
        /// Program that could not be executed.
        program: PathBuf,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// Retrieving the child's termination status failed.
    #[error("failed to wait for child {pid}: {source}")]
    Wait {
        /// PID of the child, as seen by the supervisor.
        pid: i32,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// Recursive removal of the scratch directory failed.
    #[error("failed to clean up {path}: {source}")]
    Cleanup {
        /// Entry that could not be removed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A path or argument could not be passed to the kernel.
    #[error("invalid argument {value:?}: {message}")]
    InvalidArgument {
        /// The offending value.
        value: String,
        /// Why it was rejected.
        message: &'static str,
    },
}

impl InsecError {
    /// Status the child exits with when it hits this error.
    ///
    /// Exec failures are kept distinct from setup failures so the
    /// supervisor's caller can tell a broken program path from a broken
    /// mount plan.
    #[must_use]
    pub const fn child_exit_code(&self) -> u8 {
        match self {
            Self::Exec { .. } => EXIT_EXEC_FAILURE,
            Self::Hostname { .. }
            | Self::Mount { .. }
            | Self::RootSwitch { .. }
            | Self::InvalidArgument { .. } => EXIT_SETUP_FAILURE,
            Self::Allocation { .. }
            | Self::Namespace { .. }
            | Self::Wait { .. }
            | Self::Cleanup { .. } => EXIT_FAILURE,
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, InsecError>;
