//! Semantic wrapper for package directory names.
//!
//! This module provides the [`PackageName`] newtype for type-safe handling of
//! package names throughout the packager. A package name is the name of its
//! directory under the packages root, which is not necessarily the Debian
//! `Package` field.

use std::fmt;

/// The directory name identifying a package in the repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageName(String);

impl PackageName {
    /// Normalise a name given on the command line.
    ///
    /// Shell completion tends to produce `packages/foo/` rather than `foo`, so
    /// a leading `./`, a leading `<packages_dir>/` and trailing slashes are
    /// stripped before matching against discovered packages.
    ///
    /// # Examples
    ///
    /// ```
    /// use debyw_packager::package_name::PackageName;
    ///
    /// let name = PackageName::from_request("./packages/clock/", "packages");
    /// assert_eq!(name.as_str(), "clock");
    /// ```
    #[must_use]
    pub fn from_request(raw: &str, packages_dir: &str) -> Self {
        let mut name = raw.trim();
        name = name.strip_prefix("./").unwrap_or(name);

        let prefix = packages_dir.trim_start_matches("./").trim_end_matches('/');
        if !prefix.is_empty() {
            if let Some(rest) = name
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_prefix('/'))
            {
                name = rest;
            }
        }

        Self(name.trim_end_matches('/').to_owned())
    }

    /// Get the package name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PackageName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for PackageName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
