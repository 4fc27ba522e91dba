//! Error types for the debyw packager.
//!
//! This module defines semantic error variants for every stage of a packaging
//! run. Each variant belongs to an [`ErrorCategory`] which tells the pipeline
//! whether the affected item is simply skipped or the package build is
//! aborted.

use crate::package_name::PackageName;
use camino::Utf8PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// How the pipeline reacts to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad input: reported, the item is skipped and the run continues.
    Configuration,
    /// An external tool or filesystem operation failed while building.
    Execution,
}

/// Errors that can occur while packaging a repository.
#[derive(Debug, Error)]
pub enum PackagerError {
    /// The packages directory does not exist or is not a directory.
    #[error("packages directory {path} not found")]
    PackagesDirNotFound {
        /// Path that was expected to hold the packages.
        path: Utf8PathBuf,
    },

    /// A requested package has no directory under the packages root.
    #[error("package \"{name}\" does not exist!")]
    UnknownPackage {
        /// Name of the missing package.
        name: PackageName,
    },

    /// The package has no manifest file.
    #[error("can't open {path}, skipping")]
    ManifestMissing {
        /// Path where the manifest was expected.
        path: Utf8PathBuf,
    },

    /// The manifest file exists but is not valid structured data.
    #[error("can't parse {path}: {reason}")]
    ManifestUnparseable {
        /// Path to the manifest.
        path: Utf8PathBuf,
        /// Description of the parse error.
        reason: String,
    },

    /// The manifest parsed but violates a packaging requirement.
    #[error("invalid manifest {path}: {reason}")]
    ManifestInvalid {
        /// Path to the manifest.
        path: Utf8PathBuf,
        /// Description of the violation.
        reason: String,
    },

    /// A directory under `files/` is not a Debian architecture.
    #[error("architecture files/{name} is not a valid architecture")]
    InvalidArchitecture {
        /// Directory name that was rejected.
        name: String,
    },

    /// A build hook exited unsuccessfully.
    #[error("build script \"{script}\" failed for {package} ({status}): {stderr}")]
    HookFailed {
        /// Package whose hook failed.
        package: PackageName,
        /// Script entry that was run (`build` or `build-deb`).
        script: String,
        /// Exit status reported by the runner.
        status: ExitStatus,
        /// Captured standard error of the runner.
        stderr: String,
    },

    /// The Debian archive builder exited unsuccessfully.
    #[error("packaging {archive} failed ({status}): {stderr}")]
    PackagingFailed {
        /// Archive that was being produced.
        archive: Utf8PathBuf,
        /// Exit status reported by the tool.
        status: ExitStatus,
        /// Captured standard error of the tool.
        stderr: String,
    },

    /// The package index generator exited unsuccessfully.
    #[error("index generation in {dist} failed ({status}): {stderr}")]
    IndexFailed {
        /// Output directory that was being indexed.
        dist: Utf8PathBuf,
        /// Exit status reported by the tool.
        status: ExitStatus,
        /// Captured standard error of the tool.
        stderr: String,
    },

    /// An external command could not be started.
    #[error("failed to run {program}: {source}")]
    CommandSpawn {
        /// Program that could not be spawned.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A staging tree operation failed.
    #[error("staging failed at {path}: {source}")]
    StagingFailed {
        /// Path involved in the failed operation.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file could not be read.
    #[error("can't read configuration {path}: {source}")]
    ConfigUnreadable {
        /// Path to the configuration file.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file or CLI overrides are invalid.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },

    /// A path on disk is not valid UTF-8.
    #[error("path is not valid UTF-8: {path}")]
    NonUtf8Path {
        /// Lossy rendering of the offending path.
        path: String,
    },

    /// Failed to write user-facing output.
    #[error("failed to write output")]
    WriteFailed {
        /// The underlying error that caused the write to fail.
        #[source]
        source: std::io::Error,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Test stub received an unexpected or mismatched command invocation.
    #[cfg(any(test, feature = "test-support"))]
    #[error("stub mismatch: {message}")]
    StubMismatch {
        /// Description of what was expected versus what was received.
        message: String,
    },
}

impl PackagerError {
    /// Classify the error for the pipeline's skip-or-abort decision.
    ///
    /// # Examples
    ///
    /// ```
    /// use debyw_packager::error::{ErrorCategory, PackagerError};
    ///
    /// let err = PackagerError::InvalidArchitecture { name: "bogus".to_owned() };
    /// assert_eq!(err.category(), ErrorCategory::Configuration);
    /// ```
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::PackagesDirNotFound { .. }
            | Self::UnknownPackage { .. }
            | Self::ManifestMissing { .. }
            | Self::ManifestUnparseable { .. }
            | Self::ManifestInvalid { .. }
            | Self::InvalidArchitecture { .. }
            | Self::ConfigUnreadable { .. }
            | Self::InvalidConfig { .. } => ErrorCategory::Configuration,
            Self::HookFailed { .. }
            | Self::PackagingFailed { .. }
            | Self::IndexFailed { .. }
            | Self::CommandSpawn { .. }
            | Self::StagingFailed { .. }
            | Self::NonUtf8Path { .. }
            | Self::WriteFailed { .. }
            | Self::Io(_) => ErrorCategory::Execution,
            #[cfg(any(test, feature = "test-support"))]
            Self::StubMismatch { .. } => ErrorCategory::Execution,
        }
    }
}

/// Result type alias using [`PackagerError`].
pub type Result<T> = std::result::Result<T, PackagerError>;
