//! Package index regeneration.
//!
//! After every requested package has been processed the index is rebuilt
//! from whatever archives are in the output directory. The scanner runs from
//! the repository root over `./<dist>` so the `Filename:` fields it emits are
//! relative to the repository, and its output is gzip-compressed here.

use crate::config::RepoConfig;
use crate::error::{PackagerError, Result};
use crate::exec::{CommandExecutor, Invocation, stderr_text};
use camino::{Utf8Path, Utf8PathBuf};
use flate2::Compression;
use flate2::write::GzEncoder;
use log::{debug, info};
use std::fs;
use std::io::{self, Write};

/// Result of a successful index update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSummary {
    /// Path of the written index.
    pub path: Utf8PathBuf,
    /// Number of package stanzas in the index.
    pub entries: usize,
}

/// Regenerates the compressed package index.
pub struct IndexUpdater<'a> {
    executor: &'a dyn CommandExecutor,
    config: &'a RepoConfig,
}

impl<'a> IndexUpdater<'a> {
    /// Create an updater for `config.dist_dir`.
    #[must_use]
    pub fn new(executor: &'a dyn CommandExecutor, config: &'a RepoConfig) -> Self {
        Self { executor, config }
    }

    /// The scanner invocation.
    #[must_use]
    pub fn invocation(&self) -> Invocation {
        Invocation::new(self.config.index_tool.as_str())
            .arg("-m")
            .arg(self.config.dist_dir_from_root().as_str())
            .current_dir(self.config.root.clone())
    }

    /// Rebuild the index over every archive in the output directory.
    ///
    /// # Errors
    ///
    /// - [`PackagerError::Io`] if the directory or index file cannot be
    ///   written.
    /// - [`PackagerError::CommandSpawn`] if the scanner cannot be started.
    /// - [`PackagerError::IndexFailed`] if it exits unsuccessfully.
    pub fn update(&self) -> Result<IndexSummary> {
        let dist = &self.config.dist_dir;
        fs::create_dir_all(dist)?;
        let path = self.config.index_path();
        match fs::remove_file(&path) {
            Ok(()) => debug!("removed previous {path}"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let output = self.executor.run(&self.invocation())?;
        if !output.status.success() {
            return Err(PackagerError::IndexFailed {
                dist: dist.clone(),
                status: output.status,
                stderr: stderr_text(&output),
            });
        }

        write_gzip(&path, &output.stdout)?;
        let entries = count_entries(&output.stdout);
        info!("indexed {entries} package(s) into {path}");
        Ok(IndexSummary { path, entries })
    }
}

fn write_gzip(path: &Utf8Path, contents: &[u8]) -> Result<()> {
    let file = fs::File::create(path)?;
    let mut encoder = GzEncoder::new(file, Compression::best());
    encoder.write_all(contents)?;
    encoder.finish()?.sync_all()?;
    Ok(())
}

/// Count the stanzas in a `Packages` listing.
#[must_use]
pub fn count_entries(listing: &[u8]) -> usize {
    String::from_utf8_lossy(listing)
        .lines()
        .filter(|line| line.starts_with("Package:"))
        .count()
}
