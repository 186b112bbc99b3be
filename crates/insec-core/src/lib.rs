//! # insec-core
//!
//! Low-level Linux isolation primitives for the insec launcher.
//!
//! This crate provides safe abstractions over:
//! - **Scratch space**: a private temporary tree holding the overlay's
//!   upper and work layers plus the merged root, with symlink-safe
//!   recursive removal.
//! - **Filesystem**: the ordered mount plan that assembles the new root
//!   (`OverlayFS`, `devtmpfs`, procfs, bind mounts) and the `pivot_root`
//!   handshake that switches into it.
//! - **Namespaces**: a `clone(2)` wrapper that starts a child directly in
//!   fresh mount, PID, and UTS namespaces.
//!
//! All unsafe system calls are encapsulated in safe wrappers with
//! `// SAFETY:` documentation.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

#[cfg(not(target_os = "linux"))]
compile_error!("insec-core requires Linux namespaces and mount(2)");

pub mod filesystem;
pub mod namespace;
