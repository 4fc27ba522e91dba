//! Package discovery and request resolution.
//!
//! Every immediate subdirectory of the packages directory is a package.
//! Requested names from the command line are normalised and matched against
//! that set; unmatched names are reported per package rather than aborting.

use crate::error::{PackagerError, Result};
use crate::package_name::PackageName;
use camino::Utf8Path;
use log::{debug, warn};
use std::fs;

/// One entry of the work list, in processing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requested {
    /// A package directory that exists.
    Found(PackageName),
    /// A requested name with no matching directory.
    Missing(PackageName),
}

impl Requested {
    /// The normalised package name.
    #[must_use]
    pub fn name(&self) -> &PackageName {
        match self {
            Self::Found(name) | Self::Missing(name) => name,
        }
    }

    /// The error to report for a missing package, if any.
    #[must_use]
    pub fn error(&self) -> Option<PackagerError> {
        match self {
            Self::Found(_) => None,
            Self::Missing(name) => Some(PackagerError::UnknownPackage { name: name.clone() }),
        }
    }
}

/// List the packages under `packages_dir`, sorted by name.
///
/// Plain files are ignored, as are entries whose names are not UTF-8.
///
/// # Errors
///
/// Returns [`PackagerError::PackagesDirNotFound`] if `packages_dir` is not a
/// directory and [`PackagerError::Io`] if it cannot be listed.
pub fn discover(packages_dir: &Utf8Path) -> Result<Vec<PackageName>> {
    if !packages_dir.is_dir() {
        return Err(PackagerError::PackagesDirNotFound {
            path: packages_dir.to_owned(),
        });
    }

    let mut names = Vec::new();
    for entry in fs::read_dir(packages_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(PackageName::from(name)),
            Err(raw) => warn!(
                "skipping package directory with non-UTF-8 name {}",
                raw.to_string_lossy()
            ),
        }
    }
    names.sort();
    debug!("discovered {} package(s) in {packages_dir}", names.len());
    Ok(names)
}

/// Build the work list.
///
/// With no requests every discovered package is processed. Otherwise the
/// requests are normalised with [`PackageName::from_request`] and processed
/// in the order given; repeated names are processed once.
///
/// # Examples
///
/// ```
/// use debyw_packager::discovery::{Requested, select};
/// use debyw_packager::package_name::PackageName;
///
/// let discovered = [PackageName::from("clock"), PackageName::from("weather")];
/// let work = select(&discovered, &["packages/weather/".to_owned(), "nope".to_owned()], "packages");
/// assert_eq!(
///     work,
///     [
///         Requested::Found(PackageName::from("weather")),
///         Requested::Missing(PackageName::from("nope")),
///     ]
/// );
/// ```
#[must_use]
pub fn select(
    discovered: &[PackageName],
    requested: &[String],
    packages_dir_label: &str,
) -> Vec<Requested> {
    if requested.is_empty() {
        return discovered.iter().cloned().map(Requested::Found).collect();
    }

    let mut work: Vec<Requested> = Vec::new();
    for raw in requested {
        let name = PackageName::from_request(raw, packages_dir_label);
        if work.iter().any(|entry| entry.name() == &name) {
            debug!("ignoring repeated request for {name}");
            continue;
        }
        if discovered.contains(&name) {
            work.push(Requested::Found(name));
        } else {
            work.push(Requested::Missing(name));
        }
    }
    work
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use rstest::rstest;
    use tempfile::TempDir;

    fn names(raw: &[&str]) -> Vec<PackageName> {
        raw.iter().copied().map(PackageName::from).collect()
    }

    #[test]
    fn discovers_sorted_subdirectories_only() {
        let dir = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).expect("utf8");
        for name in ["weather", "clock", "notes"] {
            fs::create_dir(root.join(name)).expect("mkdir");
        }
        fs::write(root.join("README.md"), "not a package").expect("write");

        let discovered = discover(&root).expect("discover");

        assert_eq!(discovered, names(&["clock", "notes", "weather"]));
    }

    #[test]
    fn missing_packages_dir_is_reported() {
        let err = discover(Utf8Path::new("/nonexistent/packages")).expect_err("missing dir");
        assert!(matches!(err, PackagerError::PackagesDirNotFound { .. }));
    }

    #[test]
    fn no_requests_selects_everything() {
        let discovered = names(&["clock", "weather"]);
        let work = select(&discovered, &[], "packages");
        assert_eq!(
            work,
            [
                Requested::Found(PackageName::from("clock")),
                Requested::Found(PackageName::from("weather")),
            ]
        );
    }

    #[rstest]
    #[case::plain("clock")]
    #[case::dot_slash("./clock")]
    #[case::prefixed("packages/clock")]
    #[case::prefixed_trailing("./packages/clock/")]
    fn requests_are_normalised(#[case] raw: &str) {
        let work = select(&names(&["clock"]), &[raw.to_owned()], "packages");
        assert_eq!(work, [Requested::Found(PackageName::from("clock"))]);
    }

    #[test]
    fn request_order_is_kept_and_duplicates_dropped() {
        let discovered = names(&["clock", "notes", "weather"]);
        let requested = ["weather", "clock", "packages/weather"].map(str::to_owned);

        let work = select(&discovered, &requested, "packages");

        let order: Vec<&str> = work.iter().map(|r| r.name().as_str()).collect();
        assert_eq!(order, ["weather", "clock"]);
    }

    #[test]
    fn unknown_request_reports_error_and_continues() {
        let work = select(
            &names(&["clock"]),
            &["ghost".to_owned(), "clock".to_owned()],
            "packages",
        );

        let errors: Vec<String> = work
            .iter()
            .filter_map(Requested::error)
            .map(|e| e.to_string())
            .collect();
        assert_eq!(errors, ["package \"ghost\" does not exist!"]);
        assert_eq!(work.get(1), Some(&Requested::Found(PackageName::from("clock"))));
    }
}
