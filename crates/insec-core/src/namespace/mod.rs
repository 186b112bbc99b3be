//! Linux namespace management for the launched child.
//!
//! The child is created by a single `clone(2)` that also creates its
//! namespaces, so it never runs with the parent's mount, PID, or UTS view.

pub mod uts;

use insec_common::constants::CHILD_STACK_SIZE;
use insec_common::error::{InsecError, Result};
use nix::sched::CloneFlags;
use nix::unistd::Pid;

/// Namespaces every launched child is created in. The set is fixed: the
/// mount plan relies on a private mount table, and the shell must be PID 1
/// with its own hostname.
pub const ISOLATION_FLAGS: CloneFlags = CloneFlags::CLONE_NEWNS
    .union(CloneFlags::CLONE_NEWPID)
    .union(CloneFlags::CLONE_NEWUTS);

/// Spawns `child` as a new process inside fresh mount, PID, and UTS
/// namespaces.
///
/// The namespaces are kernel-owned: they are released when their last
/// member exits, so every mount the child makes disappears with it and
/// nothing here needs explicit teardown. The child gets a copy of the
/// parent's memory (no `CLONE_VM`), and its exit status is the value
/// `child` returns unless `child` terminates the process itself.
///
/// # Errors
///
/// Returns [`InsecError::Namespace`] if `clone(2)` fails, typically
/// `EPERM` without `CAP_SYS_ADMIN`.
pub fn spawn_isolated<'a, F>(child: F) -> Result<Pid>
where
    F: FnMut() -> isize + 'a,
{
    let pid = clone_child(ISOLATION_FLAGS, child)?;
    tracing::info!(pid = pid.as_raw(), flags = ?ISOLATION_FLAGS, "child spawned in new namespaces");
    Ok(pid)
}

#[allow(unsafe_code)]
fn clone_child<'a, F>(flags: CloneFlags, child: F) -> Result<Pid>
where
    F: FnMut() -> isize + 'a,
{
    let mut stack = vec![0_u8; CHILD_STACK_SIZE];
    // SAFETY: without CLONE_VM the child runs on its own copy of `stack`
    // and of every value `child` captures, so nothing it touches is shared
    // with the parent. The parent's stack buffer is only freed after
    // clone(2) has returned.
    unsafe { nix::sched::clone(Box::new(child), &mut stack, flags, Some(libc::SIGCHLD)) }
        .map_err(|e| InsecError::Namespace { source: e.into() })
}
