//! Process spawning inside isolated namespaces.
//!
//! Everything the child needs (mount plan, exec arguments, hostname, old
//! root path) is prepared in the parent by [`ChildPlan::new`], so the
//! child's path to `execv(2)` makes no allocations of its own. Log events
//! and the error built on a failure path may still allocate; that is only
//! safe while no other parent thread can hold the allocator lock at clone
//! time, which holds for the single-threaded CLI. The child never returns
//! into the caller's stack; every exit path goes through `_exit(2)`.

use std::convert::Infallible;
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use insec_common::config::LaunchConfig;
use insec_common::error::{InsecError, Result};
use insec_core::filesystem::mount::MountPlan;
use insec_core::filesystem::pivot_root::{old_root_path, switch_root};
use insec_core::filesystem::scratch::ScratchLayout;
use insec_core::namespace::{spawn_isolated, uts};
use nix::unistd::Pid;

use crate::signals;

/// The program image that replaces the child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecTarget {
    program: PathBuf,
    path: CString,
    argv: Vec<CString>,
}

impl ExecTarget {
    /// Prepares `program` with `args`; `argv[0]` is the program path.
    ///
    /// # Errors
    ///
    /// Returns [`InsecError::InvalidArgument`] if the path or an argument
    /// contains an interior NUL byte.
    pub fn new(program: &Path, args: &[String]) -> Result<Self> {
        let path = to_cstring(program.as_os_str().as_bytes())?;
        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push(path.clone());
        for arg in args {
            argv.push(to_cstring(arg.as_bytes())?);
        }
        Ok(Self {
            program: program.to_path_buf(),
            path,
            argv,
        })
    }

    /// Returns the arguments passed to the program, including `argv[0]`.
    #[must_use]
    pub fn argv(&self) -> &[CString] {
        &self.argv
    }

    /// Replaces the current process image. Only returns on failure.
    ///
    /// # Errors
    ///
    /// Returns [`InsecError::Exec`] if `execv(2)` fails.
    pub fn exec(&self) -> Result<Infallible> {
        nix::unistd::execv(&self.path, &self.argv).map_err(|e| InsecError::Exec {
            program: self.program.clone(),
            source: e.into(),
        })
    }
}

fn to_cstring(bytes: &[u8]) -> Result<CString> {
    CString::new(bytes).map_err(|_| InsecError::InvalidArgument {
        value: String::from_utf8_lossy(bytes).into_owned(),
        message: "contains an interior NUL byte",
    })
}

/// Everything the child executes after entering its namespaces.
#[derive(Debug, Clone)]
pub struct ChildPlan {
    hostname: Option<String>,
    mounts: MountPlan,
    new_root: PathBuf,
    old_root: PathBuf,
    target: ExecTarget,
}

impl ChildPlan {
    /// Prepares the child's work for the given scratch layout.
    ///
    /// # Errors
    ///
    /// Returns [`InsecError::InvalidArgument`] if the overlay options or
    /// exec arguments cannot be passed to the kernel.
    pub fn new(config: &LaunchConfig, layout: &ScratchLayout) -> Result<Self> {
        Ok(Self {
            hostname: config.hostname.clone(),
            mounts: MountPlan::new(layout, &config.lower_dir)?,
            new_root: layout.root.clone(),
            old_root: old_root_path(),
            target: ExecTarget::new(&config.shell, &config.args)?,
        })
    }

    /// Child entry point: set up, switch root, exec.
    ///
    /// On any failure the error is logged and the process exits at once
    /// with [`InsecError::child_exit_code`]; this status is the only
    /// failure signal the supervisor receives.
    pub fn run(&self) -> ! {
        let Err(err) = self.setup_and_exec();
        tracing::error!(error = %err, "container launch failed");
        // SAFETY: `_exit` ends the child at once, without running the
        // parent's atexit handlers or flushing its copied stdio buffers.
        unsafe { libc::_exit(i32::from(err.child_exit_code())) }
    }

    fn setup_and_exec(&self) -> Result<Infallible> {
        signals::reset_for_exec();
        if let Some(hostname) = &self.hostname {
            uts::set_hostname(hostname)?;
        }
        self.mounts.execute()?;
        switch_root(&self.new_root, &self.old_root)?;
        tracing::info!(program = %self.target.program.display(), "executing container init");
        self.target.exec()
    }
}

/// Spawns the child in new mount, PID, and UTS namespaces and starts it
/// on `plan`.
///
/// Returns the child's PID as seen from the parent. The namespaces, and
/// every mount made inside them, are released by the kernel when the
/// child exits; nothing here tears them down.
///
/// # Errors
///
/// Returns [`InsecError::Namespace`] if the spawn fails.
pub fn spawn_container_process(plan: &ChildPlan) -> Result<Pid> {
    spawn_isolated(|| -> isize { plan.run() })
}
