//! Staging tree assembly.
//!
//! Each architecture variant is assembled in a fresh staging directory inside
//! the package directory:
//!
//! 1. any previous staging directory is removed and `DEBIAN/` is created;
//! 2. `app/` is copied to `<share_root>/<app name>`;
//! 3. `files/all/` is layered over the tree root;
//! 4. `files/<arch>/` is layered on top for architecture-specific variants;
//! 5. `DEBIAN/control` is rendered unless a layer supplied one.
//!
//! [`StagingTree`] removes the directory when dropped, so a failed variant
//! never leaves a tree behind for the next one.

use crate::arch::Architecture;
use crate::config::RepoConfig;
use crate::control::ControlFields;
use crate::copy::copy_tree;
use crate::error::{PackagerError, Result};
use crate::layout::PackageLayout;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use std::fs;

/// Name of the control subdirectory inside a staging tree.
pub const CONTROL_DIR: &str = "DEBIAN";
/// Name of the control file inside [`CONTROL_DIR`].
pub const CONTROL_FILE: &str = "control";

/// Where the staged control file came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSource {
    /// Rendered from the resolved control fields.
    Generated,
    /// Provided verbatim by an asset layer.
    Supplied,
}

/// An ephemeral staging directory, removed on drop.
#[derive(Debug)]
pub struct StagingTree {
    root: Utf8PathBuf,
}

impl StagingTree {
    /// Create a fresh staging tree at `root`, removing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::StagingFailed`] if the old tree cannot be
    /// removed or the control directory cannot be created.
    pub fn create(root: &Utf8Path) -> Result<Self> {
        if root.symlink_metadata().is_ok() {
            debug!("removing stale staging tree {root}");
            remove_path(root).map_err(|source| staging_error(root, source))?;
        }
        let control_dir = root.join(CONTROL_DIR);
        fs::create_dir_all(&control_dir).map_err(|source| staging_error(&control_dir, source))?;
        Ok(Self {
            root: root.to_owned(),
        })
    }

    /// The staging tree root handed to the archive builder.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Path of the control file.
    #[must_use]
    pub fn control_path(&self) -> Utf8PathBuf {
        self.root.join(CONTROL_DIR).join(CONTROL_FILE)
    }

    /// Copy the application payload to `<share_root>/<app_name>`.
    ///
    /// Returns `false` without touching the tree when `app_dir` is absent.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::StagingFailed`] if copying fails.
    pub fn install_payload(
        &self,
        app_dir: &Utf8Path,
        share_root: &Utf8Path,
        app_name: &str,
    ) -> Result<bool> {
        if !app_dir.is_dir() {
            return Ok(false);
        }
        let destination = self.root.join(share_root).join(app_name);
        debug!("installing {app_dir} to {destination}");
        copy_tree(app_dir, &destination)?;
        Ok(true)
    }

    /// Layer an asset directory over the tree root.
    ///
    /// Returns `false` when `assets` is absent.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::StagingFailed`] if copying fails.
    pub fn layer(&self, assets: &Utf8Path) -> Result<bool> {
        if !assets.is_dir() {
            return Ok(false);
        }
        debug!("layering {assets} over {}", self.root);
        copy_tree(assets, &self.root)?;
        Ok(true)
    }

    /// Write `rendered` as the control file unless one is already present.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::StagingFailed`] if the file cannot be written.
    pub fn write_control(&self, rendered: &str) -> Result<ControlSource> {
        let path = self.control_path();
        if path.exists() {
            return Ok(ControlSource::Supplied);
        }
        fs::write(&path, rendered).map_err(|source| staging_error(&path, source))?;
        Ok(ControlSource::Generated)
    }

    /// Remove the tree now, reporting failure instead of logging it.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::StagingFailed`] if removal fails.
    pub fn remove(self) -> Result<()> {
        remove_path(&self.root).map_err(|source| staging_error(&self.root, source))
    }
}

impl Drop for StagingTree {
    fn drop(&mut self) {
        if self.root.symlink_metadata().is_err() {
            return;
        }
        if let Err(err) = remove_path(&self.root) {
            warn!("failed to remove staging tree {}: {err}", self.root);
        }
    }
}

/// Assemble the staging tree for one architecture variant.
///
/// # Errors
///
/// Returns [`PackagerError::StagingFailed`] if any filesystem step fails.
/// The partially assembled tree is removed before returning.
pub fn assemble(
    layout: &PackageLayout,
    config: &RepoConfig,
    control: &ControlFields,
    arch: Architecture,
) -> Result<(StagingTree, ControlSource)> {
    let tree = StagingTree::create(&layout.staging_dir())?;

    tree.install_payload(
        &layout.app_dir(),
        &config.share_root,
        control.app_name(&config.app_prefix),
    )?;
    tree.layer(&layout.assets_for(Architecture::All))?;
    if !arch.is_all() {
        tree.layer(&layout.assets_for(arch))?;
    }

    let source = tree.write_control(&control.render(arch))?;
    if source == ControlSource::Supplied {
        debug!("{}: keeping supplied control file for {arch}", layout.name());
    }

    Ok((tree, source))
}

fn remove_path(path: &Utf8Path) -> std::io::Result<()> {
    let metadata = path.symlink_metadata()?;
    if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

fn staging_error(path: &Utf8Path, source: std::io::Error) -> PackagerError {
    PackagerError::StagingFailed {
        path: path.to_owned(),
        source,
    }
}

#[cfg(test)]
#[path = "staging_tests.rs"]
mod tests;
