//! Launch lifecycle for the insec isolated shell.
//!
//! [`supervisor::Supervisor`] is the entry point: it allocates scratch
//! space, spawns the child through [`process`], waits for it, and always
//! reclaims the scratch directory before reporting the child's outcome.

#![allow(unsafe_code)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod process;
pub mod signals;
pub mod supervisor;
