//! System-wide constants, default paths, and exit codes.

/// Program executed as PID 1 of the new namespace.
pub const DEFAULT_SHELL: &str = "/bin/bash";

/// Lower layer of the overlay: the host's original root.
pub const DEFAULT_LOWER_DIR: &str = "/";

/// Prefix of the scratch directory created under the system temp directory.
pub const SCRATCH_PREFIX: &str = "insec-";

/// Overlay merge point; becomes the container's `/`.
pub const ROOT_DIR_NAME: &str = "root";

/// Overlay upper layer; receives every copy-up write.
pub const STORAGE_DIR_NAME: &str = "storage";

/// Overlay work directory; must share a filesystem with the upper layer.
pub const WORK_DIR_NAME: &str = "work";

/// Staging directory for the old root during `pivot_root(2)`.
pub const PUT_OLD_DIR_NAME: &str = ".orig";

/// Mode for every directory this crate creates.
pub const PRIVATE_DIR_MODE: u32 = 0o700;

/// Host procfs subtrees forwarded into the container's `/proc`.
pub const PROC_FORWARDED_PATHS: [&str; 4] = ["sys", "sysrq-trigger", "irq", "bus"];

/// Stack handed to the namespace-creating `clone(2)`.
pub const CHILD_STACK_SIZE: usize = 1024 * 1024;

/// Generic failure: supervisor error, or the child died by a signal.
pub const EXIT_FAILURE: u8 = 1;

/// The child failed while building the mount plan or switching root.
pub const EXIT_SETUP_FAILURE: u8 = 125;

/// The child could not replace its image with the target program.
pub const EXIT_EXEC_FAILURE: u8 = 126;
