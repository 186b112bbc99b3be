//! Domain primitive types shared by the launcher and the supervisor.

use std::fmt;

use crate::constants::EXIT_FAILURE;

/// Identifies one step of the mount plan, for error reporting and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MountStepKind {
    /// Re-mark the inherited mount tree private and recursive.
    MakePrivate,
    /// Create the `root`, `storage`, and `work` directories.
    PrepareDirs,
    /// Mount the copy-on-write overlay at the merge point.
    Overlay,
    /// Mount a fresh `devtmpfs` at `root/dev`.
    DevTmpfs,
    /// Cover `/proc` with a read-only procfs, inside the child's namespace.
    HostProcReadOnly,
    /// Mount the container's own procfs at `root/proc`.
    ContainerProc,
    /// Bind a host procfs subtree (named relative to `/proc`).
    ProcBind(&'static str),
    /// Bind the host's `/sys`.
    SysBind,
}

impl fmt::Display for MountStepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MakePrivate => write!(f, "make mount tree private"),
            Self::PrepareDirs => write!(f, "prepare overlay directories"),
            Self::Overlay => write!(f, "mount overlay root"),
            Self::DevTmpfs => write!(f, "mount devtmpfs"),
            Self::HostProcReadOnly => write!(f, "mount read-only /proc"),
            Self::ContainerProc => write!(f, "mount container /proc"),
            Self::ProcBind(name) => write!(f, "bind /proc/{name}"),
            Self::SysBind => write!(f, "bind /sys"),
        }
    }
}

/// Identifies one operation of the root switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RootSwitchOp {
    /// Change into the new root.
    Chdir,
    /// Create the staging directory for the old root.
    MakePutOld,
    /// Swap the namespace root.
    PivotRoot,
    /// Mark the relocated old root private.
    PrivatizeOldRoot,
    /// Lazily unmount the relocated old root.
    DetachOldRoot,
    /// Drop residual path context with `chroot(".")`.
    Chroot,
}

impl fmt::Display for RootSwitchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chdir => write!(f, "chdir"),
            Self::MakePutOld => write!(f, "mkdir put_old"),
            Self::PivotRoot => write!(f, "pivot_root"),
            Self::PrivatizeOldRoot => write!(f, "make old root private"),
            Self::DetachOldRoot => write!(f, "detach old root"),
            Self::Chroot => write!(f, "chroot"),
        }
    }
}

/// How the launched child terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Normal exit with the given status.
    Exited(u8),
    /// Killed by a signal, or no usable status.
    Abnormal,
}

impl ProcessOutcome {
    /// Exit status the supervisor reports for this outcome.
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Exited(code) => code,
            Self::Abnormal => EXIT_FAILURE,
        }
    }
}

impl fmt::Display for ProcessOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exited with status {code}"),
            Self::Abnormal => write!(f, "terminated abnormally"),
        }
    }
}
