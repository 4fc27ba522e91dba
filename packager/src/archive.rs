//! Debian archive production.
//!
//! The archive itself is built by the external `dpkg-deb` tool from a staging
//! tree. This module names the output, clears stale copies and maps tool
//! failures to [`PackagerError::PackagingFailed`].

use crate::config::RepoConfig;
use crate::error::{PackagerError, Result};
use crate::exec::{CommandExecutor, Invocation, stderr_text};
use crate::staging::StagingTree;
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use std::fs;
use std::io;

/// Builds `.deb` archives into the output directory.
pub struct DebBuilder<'a> {
    executor: &'a dyn CommandExecutor,
    config: &'a RepoConfig,
}

impl<'a> DebBuilder<'a> {
    /// Create a builder writing to `config.dist_dir`.
    #[must_use]
    pub fn new(executor: &'a dyn CommandExecutor, config: &'a RepoConfig) -> Self {
        Self { executor, config }
    }

    /// Where an archive named `file_name` is written.
    #[must_use]
    pub fn output_path(&self, file_name: &str) -> Utf8PathBuf {
        self.config.dist_dir.join(file_name)
    }

    /// The archive builder invocation for `staging` and `output`.
    #[must_use]
    pub fn invocation(&self, staging: &Utf8Path, output: &Utf8Path) -> Invocation {
        Invocation::new(self.config.deb_tool.as_str())
            .arg("--build")
            .arg(format!("-Z{}", self.config.deb_compression))
            .arg(staging.as_str())
            .arg(output.as_str())
    }

    /// Build `file_name` from the staging tree, replacing any old archive.
    ///
    /// # Errors
    ///
    /// - [`PackagerError::Io`] if the output directory cannot be prepared.
    /// - [`PackagerError::CommandSpawn`] if the tool cannot be started.
    /// - [`PackagerError::PackagingFailed`] if it exits unsuccessfully.
    pub fn build(&self, staging: &StagingTree, file_name: &str) -> Result<Utf8PathBuf> {
        fs::create_dir_all(&self.config.dist_dir)?;
        let output = self.output_path(file_name);
        remove_stale(&output)?;

        let result = self.executor.run(&self.invocation(staging.root(), &output))?;
        if !result.status.success() {
            return Err(PackagerError::PackagingFailed {
                archive: output,
                status: result.status,
                stderr: stderr_text(&result),
            });
        }

        debug!("built {output}");
        Ok(output)
    }
}

fn remove_stale(path: &Utf8Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("removed previous {path}");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ExpectedCall, StubExecutor, failure_output, success_output};
    use tempfile::TempDir;

    fn fixture() -> (TempDir, RepoConfig, StagingTree) {
        let dir = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).expect("utf8 root");
        let config = RepoConfig::for_root(&root);
        let tree = StagingTree::create(&root.join("packages/clock/.deb_pkg")).expect("staging");
        (dir, config, tree)
    }

    #[test]
    fn invokes_dpkg_deb_with_compression() {
        let (_dir, config, tree) = fixture();
        let output = config.dist_dir.join("clock-all.deb");
        let stub = StubExecutor::new(vec![
            ExpectedCall::new(
                "dpkg-deb",
                ["--build", "-Zgzip", tree.root().as_str(), output.as_str()],
            )
            .returning(Ok(success_output())),
        ]);

        let built = DebBuilder::new(&stub, &config)
            .build(&tree, "clock-all.deb")
            .expect("archive builds");

        assert_eq!(built, output);
        assert!(config.dist_dir.is_dir());
        stub.assert_finished();
    }

    #[test]
    fn removes_stale_archive_before_building() {
        let (_dir, config, tree) = fixture();
        fs::create_dir_all(&config.dist_dir).expect("dist");
        let output = config.dist_dir.join("clock-all.deb");
        fs::write(&output, "old").expect("stale archive");
        let stub = StubExecutor::new(vec![
            ExpectedCall::new(
                "dpkg-deb",
                ["--build", "-Zgzip", tree.root().as_str(), output.as_str()],
            )
            .returning(Ok(failure_output(
                "dpkg-deb: error: control directory has bad permissions",
            ))),
        ]);

        let err = DebBuilder::new(&stub, &config)
            .build(&tree, "clock-all.deb")
            .expect_err("tool fails");

        assert!(!output.exists(), "stale archive should be gone");
        assert!(matches!(
            err,
            PackagerError::PackagingFailed { ref archive, ref stderr, .. }
                if *archive == output && stderr.contains("bad permissions")
        ));
    }
}
