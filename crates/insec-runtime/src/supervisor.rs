//! Parent-side control flow for one launch.
//!
//! Allocates scratch space, spawns the isolated child, blocks until it
//! terminates, reclaims the scratch directory, and maps the child's
//! termination onto an outcome. Cleanup is attempted on every path once
//! the scratch directory exists, including when spawning or waiting fails.

use insec_common::config::LaunchConfig;
use insec_common::constants::EXIT_FAILURE;
use insec_common::error::{InsecError, Result};
use insec_common::types::ProcessOutcome;
use insec_core::filesystem::scratch::{ScratchLayout, ScratchSpace};
use nix::errno::Errno;
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::Pid;

use crate::process::{ChildPlan, spawn_container_process};
use crate::signals::SignalShield;

/// Runs one isolated shell to completion.
#[derive(Debug, Clone, Default)]
pub struct Supervisor {
    config: LaunchConfig,
}

impl Supervisor {
    /// Creates a supervisor for the given launch configuration.
    #[must_use]
    pub const fn new(config: LaunchConfig) -> Self {
        Self { config }
    }

    /// Launches the child and returns how it terminated.
    ///
    /// # Errors
    ///
    /// Returns [`InsecError::Allocation`] if no scratch directory could be
    /// created, [`InsecError::Namespace`] if the spawn failed,
    /// [`InsecError::Wait`] if the child's status could not be retrieved,
    /// and [`InsecError::Cleanup`] if the scratch directory could not be
    /// removed. Failures inside the child are not errors here: they show
    /// up as a non-zero [`ProcessOutcome`].
    pub fn run(&self) -> Result<ProcessOutcome> {
        let scratch =
            ScratchSpace::create(&self.config.scratch_parent, &self.config.scratch_prefix)?;
        let outcome = self.launch(scratch.layout());
        let cleanup = scratch.delete();
        let outcome = settle(outcome, cleanup)?;
        tracing::info!(%outcome, "launch finished");
        Ok(outcome)
    }

    fn launch(&self, layout: &ScratchLayout) -> Result<ProcessOutcome> {
        let plan = ChildPlan::new(&self.config, layout)?;
        let _shield = SignalShield::engage();
        let pid = spawn_container_process(&plan)?;
        wait_for_exit(pid)
    }
}

/// Combines the launch result with the cleanup result.
///
/// A launch error wins over a cleanup error; the cleanup error is logged.
fn settle(outcome: Result<ProcessOutcome>, cleanup: Result<()>) -> Result<ProcessOutcome> {
    match (outcome, cleanup) {
        (Ok(outcome), Ok(())) => Ok(outcome),
        (Ok(_), Err(e)) | (Err(e), Ok(())) => Err(e),
        (Err(e), Err(cleanup_err)) => {
            tracing::error!(error = %cleanup_err, "scratch cleanup failed after launch error");
            Err(e)
        }
    }
}

/// Blocks until `pid` terminates and classifies how it ended.
///
/// A wait interrupted by a signal is reissued.
///
/// # Errors
///
/// Returns [`InsecError::Wait`] if `waitpid(2)` fails, e.g. `ECHILD`.
pub fn wait_for_exit(pid: Pid) -> Result<ProcessOutcome> {
    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, code)) => {
                let code = u8::try_from(code).unwrap_or(EXIT_FAILURE);
                tracing::info!(pid = pid.as_raw(), code, "child exited");
                return Ok(ProcessOutcome::Exited(code));
            }
            Ok(WaitStatus::Signaled(_, signal, core_dumped)) => {
                tracing::warn!(pid = pid.as_raw(), ?signal, core_dumped, "child killed by signal");
                return Ok(ProcessOutcome::Abnormal);
            }
            Ok(status) => tracing::debug!(?status, "ignoring non-terminal wait status"),
            Err(Errno::EINTR) => {}
            Err(e) => {
                return Err(InsecError::Wait {
                    pid: pid.as_raw(),
                    source: e.into(),
                });
            }
        }
    }
}
