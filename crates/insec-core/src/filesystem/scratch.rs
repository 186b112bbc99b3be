//! Host-side scratch directory for one launch.
//!
//! The scratch directory holds the overlay's upper layer (`storage`), its
//! work directory (`work`), and the merge point (`root`). It is created by
//! the supervisor before the child is spawned and removed after the child
//! has been reaped, at which point the kernel has already torn down every
//! mount the child made on top of it.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use insec_common::constants::{PRIVATE_DIR_MODE, ROOT_DIR_NAME, STORAGE_DIR_NAME, WORK_DIR_NAME};
use insec_common::error::{InsecError, Result};

/// Paths inside one scratch directory.
///
/// Built by joining fixed names onto the base path; nothing here touches
/// the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchLayout {
    /// Unique, host-visible scratch directory.
    pub base: PathBuf,
    /// Overlay merge point; becomes the container's `/`.
    pub root: PathBuf,
    /// Overlay upper layer.
    pub storage: PathBuf,
    /// Overlay work directory.
    pub work: PathBuf,
}

impl ScratchLayout {
    /// Derives the layout for the given scratch base directory.
    #[must_use]
    pub fn new(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            root: base.join(ROOT_DIR_NAME),
            storage: base.join(STORAGE_DIR_NAME),
            work: base.join(WORK_DIR_NAME),
            base,
        }
    }

    /// Subdirectories created before the overlay is mounted, in order.
    #[must_use]
    pub fn subdirectories(&self) -> [&Path; 3] {
        [&self.root, &self.storage, &self.work]
    }
}

/// Owned scratch directory, removed on [`ScratchSpace::delete`] or drop.
///
/// Only paths produced by [`ScratchSpace::create`] are ever removed; there
/// is no way to wrap a caller-supplied path.
#[derive(Debug)]
pub struct ScratchSpace {
    layout: ScratchLayout,
    released: bool,
}

impl ScratchSpace {
    /// Allocates a uniquely named, owner-only directory under `parent`.
    ///
    /// The name is `prefix` followed by a random suffix chosen by
    /// `tempfile`, so concurrent launches never collide.
    ///
    /// # Errors
    ///
    /// Returns [`InsecError::Allocation`] if `parent` is unwritable or the
    /// filesystem is exhausted.
    pub fn create(parent: &Path, prefix: &str) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .permissions(fs::Permissions::from_mode(PRIVATE_DIR_MODE))
            .tempdir_in(parent)
            .map_err(|e| InsecError::Allocation {
                parent: parent.to_path_buf(),
                source: e,
            })?;
        let base = dir.keep();
        tracing::info!(path = %base.display(), "scratch directory created");
        Ok(Self {
            layout: ScratchLayout::new(base),
            released: false,
        })
    }

    /// Returns the paths inside this scratch directory.
    #[must_use]
    pub const fn layout(&self) -> &ScratchLayout {
        &self.layout
    }

    /// Returns the scratch base directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.layout.base
    }

    /// Recursively removes the scratch directory.
    ///
    /// # Errors
    ///
    /// Returns [`InsecError::Cleanup`] naming the first entry that could
    /// not be listed, inspected, or removed. Removal stops at that entry.
    pub fn delete(mut self) -> Result<()> {
        self.released = true;
        remove_tree(&self.layout.base)?;
        tracing::info!(path = %self.layout.base.display(), "scratch directory removed");
        Ok(())
    }
}

impl Drop for ScratchSpace {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = remove_tree(&self.layout.base) {
            tracing::warn!(error = %e, "scratch directory left on disk");
        }
    }
}

/// Removes `path` and everything beneath it, children first.
///
/// Entries are classified without following symlinks: a symlink is
/// unlinked, never traversed. An entry that disappears between listing
/// and inspection is reported as an error rather than skipped.
///
/// # Errors
///
/// Returns [`InsecError::Cleanup`] for the first failing entry.
pub fn remove_tree(path: &Path) -> Result<()> {
    let entries = fs::read_dir(path).map_err(|e| cleanup_error(path, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| cleanup_error(path, e))?;
        let child = entry.path();
        let meta = fs::symlink_metadata(&child).map_err(|e| cleanup_error(&child, e))?;
        if meta.is_dir() {
            remove_tree(&child)?;
        } else {
            fs::remove_file(&child).map_err(|e| cleanup_error(&child, e))?;
        }
    }
    fs::remove_dir(path).map_err(|e| cleanup_error(path, e))
}

fn cleanup_error(path: &Path, source: std::io::Error) -> InsecError {
    InsecError::Cleanup {
        path: path.to_path_buf(),
        source,
    }
}
