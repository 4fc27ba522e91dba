//! On-disk layout of a single package.
//!
//! Every path the pipeline reads or writes for a package is derived here from
//! the package directory, so no component depends on the process working
//! directory.

use crate::arch::Architecture;
use crate::config::RepoConfig;
use crate::package_name::PackageName;
use camino::{Utf8Path, Utf8PathBuf};

/// Directory holding the application payload.
pub const APP_DIR: &str = "app";
/// Directory holding per-architecture asset layers.
pub const FILES_DIR: &str = "files";

/// Paths belonging to one package directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageLayout {
    name: PackageName,
    root: Utf8PathBuf,
    manifest_file: String,
    staging_dir: String,
}

impl PackageLayout {
    /// Describe the package `name` under the configured packages directory.
    #[must_use]
    pub fn new(config: &RepoConfig, name: &PackageName) -> Self {
        Self {
            name: name.clone(),
            root: config.packages_dir.join(name.as_str()),
            manifest_file: config.manifest_file.clone(),
            staging_dir: config.staging_dir.clone(),
        }
    }

    /// The package's directory name.
    #[must_use]
    pub fn name(&self) -> &PackageName {
        &self.name
    }

    /// The package directory; build hooks run here.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// The manifest file (`package.json` by default).
    #[must_use]
    pub fn manifest_path(&self) -> Utf8PathBuf {
        self.root.join(&self.manifest_file)
    }

    /// The optional application payload directory.
    #[must_use]
    pub fn app_dir(&self) -> Utf8PathBuf {
        self.root.join(APP_DIR)
    }

    /// The optional asset directory containing architecture layers.
    #[must_use]
    pub fn files_dir(&self) -> Utf8PathBuf {
        self.root.join(FILES_DIR)
    }

    /// The asset layer for `arch` (`files/all` for [`Architecture::All`]).
    #[must_use]
    pub fn assets_for(&self, arch: Architecture) -> Utf8PathBuf {
        self.files_dir().join(arch.as_str())
    }

    /// The ephemeral staging tree root.
    #[must_use]
    pub fn staging_dir(&self) -> Utf8PathBuf {
        self.root.join(&self.staging_dir)
    }
}
