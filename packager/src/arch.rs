//! Architecture planning from the asset directory layout.
//!
//! A package opts into per-architecture archives by providing
//! `files/<arch>/` directories named after Debian architectures. The planner
//! turns that layout into the list of variants to build; `files/all/` is a
//! common layer and never a target on its own.

use crate::error::{PackagerError, Result};
use camino::Utf8Path;
use log::debug;
use std::fmt;
use std::str::FromStr;

/// Architecture of one archive variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Architecture {
    /// Architecture-independent package.
    All,
    /// ARM EABI little-endian.
    Armel,
    /// ARM hard-float.
    Armhf,
    /// 64-bit ARM.
    Arm64,
    /// 32-bit x86.
    I386,
    /// 64-bit x86.
    Amd64,
    /// MIPS little-endian.
    Mipsel,
    /// 64-bit MIPS little-endian.
    Mips64el,
    /// 64-bit POWER little-endian.
    Ppc64el,
    /// IBM System z.
    S390x,
}

impl Architecture {
    /// Every architecture that may appear as a `files/<arch>` directory.
    pub const SPECIFIC: [Self; 9] = [
        Self::Armel,
        Self::Armhf,
        Self::Arm64,
        Self::I386,
        Self::Amd64,
        Self::Mipsel,
        Self::Mips64el,
        Self::Ppc64el,
        Self::S390x,
    ];

    /// The Debian identifier, as used in control files and archive names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Armel => "armel",
            Self::Armhf => "armhf",
            Self::Arm64 => "arm64",
            Self::I386 => "i386",
            Self::Amd64 => "amd64",
            Self::Mipsel => "mipsel",
            Self::Mips64el => "mips64el",
            Self::Ppc64el => "ppc64el",
            Self::S390x => "s390x",
        }
    }

    /// Whether this is the architecture-independent variant.
    #[must_use]
    pub const fn is_all(self) -> bool {
        matches!(self, Self::All)
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Architecture {
    type Err = PackagerError;

    fn from_str(s: &str) -> Result<Self> {
        if s == Self::All.as_str() {
            return Ok(Self::All);
        }
        Self::SPECIFIC
            .into_iter()
            .find(|arch| arch.as_str() == s)
            .ok_or_else(|| PackagerError::InvalidArchitecture { name: s.to_owned() })
    }
}

/// Variants to build for one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchitecturePlan {
    targets: Vec<Architecture>,
    rejected: Vec<String>,
}

impl ArchitecturePlan {
    /// Inspect `files_dir` and decide which variants to build.
    ///
    /// Directory names other than `all` must be Debian architectures; any
    /// that are not (including names that are not UTF-8, listed lossily) end
    /// up in [`Self::rejected`] and are otherwise ignored.
    /// Targets follow the sorted directory names.
    /// Without at least one valid architecture directory the plan is the
    /// single `all` variant.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::Io`] if `files_dir` exists but cannot be
    /// listed.
    pub fn from_files_dir(files_dir: &Utf8Path) -> Result<Self> {
        if !files_dir.is_dir() {
            debug!("{files_dir} absent, building the all variant only");
            return Ok(Self::from_directory_names(std::iter::empty::<&str>()));
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(files_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                // Non-UTF-8 names can never match and are rejected like any other.
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();

        Ok(Self::from_directory_names(names.iter().map(String::as_str)))
    }

    /// Plan from already-listed directory names.
    ///
    /// # Examples
    ///
    /// ```
    /// use debyw_packager::arch::{Architecture, ArchitecturePlan};
    ///
    /// let plan = ArchitecturePlan::from_directory_names(["all", "armhf", "bogus"]);
    /// assert_eq!(plan.targets(), [Architecture::Armhf]);
    /// assert_eq!(plan.rejected().len(), 1);
    /// ```
    #[must_use]
    pub fn from_directory_names<'a, I>(names: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut targets = Vec::new();
        let mut rejected = Vec::new();

        for name in names {
            match name.parse::<Architecture>() {
                Ok(Architecture::All) => {}
                Ok(arch) => {
                    if !targets.contains(&arch) {
                        targets.push(arch);
                    }
                }
                Err(_) => rejected.push(name.to_owned()),
            }
        }

        if targets.is_empty() {
            targets.push(Architecture::All);
        }

        Self { targets, rejected }
    }

    /// Variants to build, in build order.
    #[must_use]
    pub fn targets(&self) -> &[Architecture] {
        &self.targets
    }

    /// Names of invalid architecture directories found while planning.
    #[must_use]
    pub fn rejected(&self) -> &[String] {
        &self.rejected
    }

    /// One [`PackagerError::InvalidArchitecture`] per rejected directory.
    pub fn rejection_errors(&self) -> impl Iterator<Item = PackagerError> + '_ {
        self.rejected
            .iter()
            .map(|name| PackagerError::InvalidArchitecture { name: name.clone() })
    }
}
