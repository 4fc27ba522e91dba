//! debyw packager library.
//!
//! This crate turns a repository of debyw app packages into Debian archives
//! and a package index. It is used by the `debyw-build` CLI binary and can be
//! driven programmatically with a substitute [`exec::CommandExecutor`] for
//! testing.
//!
//! # Modules
//!
//! - [`arch`] - Architecture enumeration and per-package variant planning
//! - [`archive`] - Debian archive production through `dpkg-deb`
//! - [`checksum`] - SHA-256 digests of produced archives
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - Repository configuration from `debyw.toml` and flags
//! - [`control`] - Control field resolution and rendering
//! - [`copy`] - Recursive directory layering
//! - [`discovery`] - Package discovery and request resolution
//! - [`error`] - Semantic error types
//! - [`exec`] - External command invocation
//! - [`hooks`] - Build script execution
//! - [`index`] - Package index regeneration
//! - [`layout`] - Per-package path conventions
//! - [`manifest`] - `package.json` loading
//! - [`output`] - User-facing progress and error output
//! - [`package_name`] - Semantic wrapper for package directory names
//! - [`pipeline`] - Packaging run orchestration
//! - [`staging`] - Staging tree assembly

pub mod arch;
pub mod archive;
pub mod checksum;
pub mod cli;
pub mod config;
pub mod control;
pub mod copy;
pub mod discovery;
pub mod error;
pub mod exec;
pub mod hooks;
pub mod index;
pub mod layout;
pub mod manifest;
pub mod output;
pub mod package_name;
pub mod pipeline;
pub mod staging;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
