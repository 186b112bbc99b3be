//! # insec-common
//!
//! Shared error taxonomy, launch configuration, and constants used across
//! the insec workspace.
//!
//! This crate is the leaf of the dependency graph: it depends on no other
//! internal crate and carries no Linux-specific code, so its types can be
//! named from both sides of the namespace boundary.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
