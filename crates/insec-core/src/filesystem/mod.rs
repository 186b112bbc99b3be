//! Filesystem management for the isolated root.
//!
//! Provides the host-side scratch directory, the `OverlayFS` options
//! builder, the ordered mount plan, and `pivot_root` for switching the
//! process root into the assembled tree.

pub mod mount;
pub mod overlayfs;
pub mod pivot_root;
pub mod scratch;
