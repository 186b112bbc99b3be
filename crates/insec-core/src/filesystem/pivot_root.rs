//! Secure root filesystem switching via `pivot_root(2)`.
//!
//! More secure than `chroot` alone: `pivot_root` replaces the mount
//! namespace's root entry, and the old root is then detached so no path
//! in the namespace can reach it.

use std::path::{Path, PathBuf};

use insec_common::constants::{PRIVATE_DIR_MODE, PUT_OLD_DIR_NAME};
use insec_common::error::{InsecError, Result};
use insec_common::types::RootSwitchOp;
use nix::mount::{MntFlags, MsFlags, mount, umount2};
use nix::sys::stat::Mode;
use nix::unistd::{chdir, chroot, mkdir, pivot_root};

/// Where the old root is reachable right after the pivot.
///
/// Built ahead of time so [`switch_root`] itself does not allocate.
#[must_use]
pub fn old_root_path() -> PathBuf {
    Path::new("/").join(PUT_OLD_DIR_NAME)
}

/// Makes `new_root` the process root and discards the old one.
///
/// `new_root` must be a mount point in a private mount namespace and
/// `put_old` the value of [`old_root_path`]. The sequence is: enter
/// `new_root`, create `.orig`, pivot so the old root lands on `/.orig`,
/// privatize and lazily detach `/.orig`, then `chroot(".")`. The working
/// directory is `/` of the new root afterwards.
///
/// # Errors
///
/// Returns [`InsecError::RootSwitch`] naming the operation that failed.
pub fn switch_root(new_root: &Path, put_old: &Path) -> Result<()> {
    chdir(new_root).map_err(|e| switch_error(RootSwitchOp::Chdir, e))?;
    mkdir(PUT_OLD_DIR_NAME, Mode::from_bits_truncate(PRIVATE_DIR_MODE))
        .map_err(|e| switch_error(RootSwitchOp::MakePutOld, e))?;
    pivot_root(".", PUT_OLD_DIR_NAME).map_err(|e| switch_error(RootSwitchOp::PivotRoot, e))?;
    tracing::debug!(new_root = %new_root.display(), "pivot_root complete");

    mount(
        None::<&str>,
        put_old,
        None::<&str>,
        MsFlags::MS_PRIVATE | MsFlags::MS_REC,
        None::<&str>,
    )
    .map_err(|e| switch_error(RootSwitchOp::PrivatizeOldRoot, e))?;
    umount2(put_old, MntFlags::MNT_DETACH)
        .map_err(|e| switch_error(RootSwitchOp::DetachOldRoot, e))?;
    chroot(".").map_err(|e| switch_error(RootSwitchOp::Chroot, e))?;

    tracing::info!("root switched, old root detached");
    Ok(())
}

fn switch_error(op: RootSwitchOp, errno: nix::Error) -> InsecError {
    InsecError::RootSwitch {
        op,
        source: errno.into(),
    }
}
