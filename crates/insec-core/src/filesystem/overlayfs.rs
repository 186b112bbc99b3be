//! `OverlayFS` configuration for the copy-on-write container root.
//!
//! A single read-only lower layer (the host root by default) is stacked
//! under a writable upper layer in the scratch directory. Reads fall
//! through to the lower layer; writes are copied up into `upper_dir`, so
//! the lower tree is never modified.

use std::path::{Path, PathBuf};

use insec_common::error::{InsecError, Result};

use super::scratch::ScratchLayout;

/// Characters the kernel's overlay option parser treats as separators.
const RESERVED_OPTION_CHARS: [char; 2] = [',', ':'];

/// Configuration for an `OverlayFS` mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayConfig {
    /// Read-only lower layer.
    pub lower_dir: PathBuf,
    /// Writable upper layer directory.
    pub upper_dir: PathBuf,
    /// Work directory required by `OverlayFS`; same filesystem as `upper_dir`.
    pub work_dir: PathBuf,
    /// Final merged mount point.
    pub merged_dir: PathBuf,
}

impl OverlayConfig {
    /// Builds the overlay configuration for a scratch layout.
    #[must_use]
    pub fn for_scratch(layout: &ScratchLayout, lower_dir: &Path) -> Self {
        Self {
            lower_dir: lower_dir.to_path_buf(),
            upper_dir: layout.storage.clone(),
            work_dir: layout.work.clone(),
            merged_dir: layout.root.clone(),
        }
    }

    /// Renders the `mount(2)` data string for this overlay.
    ///
    /// # Errors
    ///
    /// Returns [`InsecError::InvalidArgument`] if a layer path is not
    /// valid UTF-8 or contains a `,` or `:`, either of which would
    /// change the meaning of the option string.
    pub fn options(&self) -> Result<String> {
        let upper = option_path(&self.upper_dir)?;
        let lower = option_path(&self.lower_dir)?;
        let work = option_path(&self.work_dir)?;
        Ok(format!("upperdir={upper},lowerdir={lower},workdir={work}"))
    }
}

fn option_path(path: &Path) -> Result<&str> {
    let s = path.to_str().ok_or_else(|| InsecError::InvalidArgument {
        value: path.display().to_string(),
        message: "overlay layer path is not valid UTF-8",
    })?;
    if s.contains(RESERVED_OPTION_CHARS) {
        return Err(InsecError::InvalidArgument {
            value: s.to_string(),
            message: "overlay layer path contains ',' or ':'",
        });
    }
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn for_scratch_maps_layout_to_layers() {
        let layout = ScratchLayout::new("/tmp/insec-q1");
        let cfg = OverlayConfig::for_scratch(&layout, Path::new("/"));
        assert_eq!(cfg.lower_dir, PathBuf::from("/"));
        assert_eq!(cfg.upper_dir, layout.storage);
        assert_eq!(cfg.work_dir, layout.work);
        assert_eq!(cfg.merged_dir, layout.root);
    }

    #[test]
    fn options_lists_all_three_layers() {
        let layout = ScratchLayout::new("/tmp/insec-q1");
        let opts = OverlayConfig::for_scratch(&layout, Path::new("/"))
            .options()
            .expect("options");
        assert_eq!(
            opts,
            "upperdir=/tmp/insec-q1/storage,lowerdir=/,workdir=/tmp/insec-q1/work"
        );
    }

    #[test]
    fn options_rejects_separator_in_path() {
        let layout = ScratchLayout::new("/tmp/a,b");
        let err = OverlayConfig::for_scratch(&layout, Path::new("/"))
            .options()
            .expect_err("comma must be rejected");
        assert!(matches!(err, InsecError::InvalidArgument { .. }));

        let layout = ScratchLayout::new("/tmp/ok");
        let err = OverlayConfig::for_scratch(&layout, Path::new("/a:b"))
            .options()
            .expect_err("colon must be rejected");
        assert!(matches!(err, InsecError::InvalidArgument { .. }));
    }
}
