//! The ordered mount plan that assembles the container root.
//!
//! The plan is built in the supervisor, before the child exists, and only
//! executed in the child after it has entered its own mount namespace.
//! Every step runs strictly in sequence; the first failure aborts the rest.
//! Nothing is rolled back: every mount made here lives in the child's
//! namespace and is discarded by the kernel when the child exits.

use std::path::{Path, PathBuf};

use insec_common::constants::{PRIVATE_DIR_MODE, PROC_FORWARDED_PATHS};
use insec_common::error::{InsecError, Result};
use insec_common::types::MountStepKind;
use nix::mount::{MsFlags, mount};
use nix::sys::stat::Mode;

use super::overlayfs::OverlayConfig;
use super::scratch::ScratchLayout;

const PROC: &str = "/proc";
const SYS: &str = "/sys";

/// One `mount(2)` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountStep {
    /// Which plan step this is.
    pub kind: MountStepKind,
    /// Source path or device name, if the filesystem takes one.
    pub source: Option<PathBuf>,
    /// Existing directory (or file, for bind mounts) to mount on.
    pub target: PathBuf,
    /// Filesystem type, or `None` for bind and propagation changes.
    pub fstype: Option<&'static str>,
    /// Mount flags.
    pub flags: MsFlags,
    /// Filesystem-specific data string.
    pub data: Option<String>,
}

impl MountStep {
    /// Marks the tree at `target` private and recursive.
    #[must_use]
    pub fn make_private(kind: MountStepKind, target: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            source: None,
            target: target.into(),
            fstype: None,
            flags: MsFlags::MS_PRIVATE | MsFlags::MS_REC,
            data: None,
        }
    }

    /// Mounts a fresh instance of a pseudo-filesystem at `target`.
    #[must_use]
    pub fn filesystem(
        kind: MountStepKind,
        fstype: &'static str,
        target: impl Into<PathBuf>,
        flags: MsFlags,
    ) -> Self {
        Self {
            kind,
            source: Some(PathBuf::from(fstype)),
            target: target.into(),
            fstype: Some(fstype),
            flags,
            data: None,
        }
    }

    /// Bind-mounts `source` onto `target`.
    #[must_use]
    pub fn bind(kind: MountStepKind, source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            source: Some(source.into()),
            target: target.into(),
            fstype: None,
            flags: MsFlags::MS_BIND,
            data: None,
        }
    }

    /// Issues the `mount(2)` call for this step.
    ///
    /// # Errors
    ///
    /// Returns [`InsecError::Mount`] tagged with this step's kind.
    pub fn apply(&self) -> Result<()> {
        mount(
            self.source.as_deref(),
            &self.target,
            self.fstype,
            self.flags,
            self.data.as_deref(),
        )
        .map_err(|e| InsecError::Mount {
            step: self.kind,
            target: self.target.clone(),
            source: e.into(),
        })?;
        tracing::debug!(step = %self.kind, target = %self.target.display(), "mount step applied");
        Ok(())
    }
}

/// One entry of the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanStep {
    /// Create owner-only directories, in order.
    CreateDirs(Vec<PathBuf>),
    /// Perform a mount.
    Mount(MountStep),
}

impl PlanStep {
    /// Returns the step's kind.
    #[must_use]
    pub const fn kind(&self) -> MountStepKind {
        match self {
            Self::CreateDirs(_) => MountStepKind::PrepareDirs,
            Self::Mount(step) => step.kind,
        }
    }

    fn run(&self) -> Result<()> {
        match self {
            Self::CreateDirs(dirs) => dirs.iter().try_for_each(|dir| create_private_dir(dir)),
            Self::Mount(step) => step.apply(),
        }
    }
}

/// Ordered, dependency-respecting sequence of steps building the new root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPlan {
    steps: Vec<PlanStep>,
}

impl MountPlan {
    /// Builds the plan for a scratch layout over the given lower layer.
    ///
    /// The order is mandatory: the overlay must exist before anything is
    /// mounted beneath it, and the container's `/proc` must exist before
    /// host procfs subtrees are bound into it.
    ///
    /// # Errors
    ///
    /// Returns [`InsecError::InvalidArgument`] if the overlay options cannot
    /// be rendered for these paths.
    pub fn new(layout: &ScratchLayout, lower_dir: &Path) -> Result<Self> {
        let overlay = OverlayConfig::for_scratch(layout, lower_dir);
        let root = &layout.root;
        let hardened = MsFlags::MS_NOSUID | MsFlags::MS_NODEV | MsFlags::MS_NOEXEC;

        let mut steps = vec![
            PlanStep::Mount(MountStep::make_private(MountStepKind::MakePrivate, "/")),
            PlanStep::CreateDirs(Vec::from(layout.subdirectories().map(Path::to_path_buf))),
            PlanStep::Mount(MountStep {
                kind: MountStepKind::Overlay,
                source: Some(PathBuf::from("overlay")),
                target: overlay.merged_dir.clone(),
                fstype: Some("overlay"),
                flags: MsFlags::empty(),
                data: Some(overlay.options()?),
            }),
            PlanStep::Mount(MountStep::filesystem(
                MountStepKind::DevTmpfs,
                "devtmpfs",
                root.join("dev"),
                MsFlags::empty(),
            )),
            // The forwarded /proc subtrees below are bound from this
            // instance, so they reach the container read-only.
            PlanStep::Mount(MountStep::filesystem(
                MountStepKind::HostProcReadOnly,
                "proc",
                PROC,
                MsFlags::MS_RDONLY | hardened,
            )),
            PlanStep::Mount(MountStep::filesystem(
                MountStepKind::ContainerProc,
                "proc",
                root.join("proc"),
                MsFlags::MS_RELATIME | hardened,
            )),
        ];
        steps.extend(PROC_FORWARDED_PATHS.into_iter().map(|name| {
            PlanStep::Mount(MountStep::bind(
                MountStepKind::ProcBind(name),
                Path::new(PROC).join(name),
                root.join("proc").join(name),
            ))
        }));
        steps.push(PlanStep::Mount(MountStep::bind(
            MountStepKind::SysBind,
            SYS,
            root.join("sys"),
        )));

        Ok(Self { steps })
    }

    /// Returns the steps in execution order.
    #[must_use]
    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    /// Runs every step in order, stopping at the first failure.
    ///
    /// Must only be called inside a private mount namespace.
    ///
    /// # Errors
    ///
    /// Returns [`InsecError::Mount`] tagged with the failing step.
    pub fn execute(&self) -> Result<()> {
        for step in &self.steps {
            step.run()?;
        }
        tracing::info!(steps = self.steps.len(), "mount plan complete");
        Ok(())
    }
}

fn create_private_dir(path: &Path) -> Result<()> {
    nix::unistd::mkdir(path, Mode::from_bits_truncate(PRIVATE_DIR_MODE)).map_err(|e| {
        InsecError::Mount {
            step: MountStepKind::PrepareDirs,
            target: path.to_path_buf(),
            source: e.into(),
        }
    })
}
