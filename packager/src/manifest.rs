//! Package manifest loading.
//!
//! Each package carries an npm-style `package.json`. Only the fields that feed
//! the Debian control file and the build hooks are read; everything else in
//! the file is ignored.

use crate::error::{PackagerError, Result};
use camino::Utf8Path;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// Parsed package manifest.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Manifest {
    /// Package name; becomes the Debian `Package` field.
    pub name: String,
    /// Package version.
    #[serde(default)]
    pub version: Option<String>,
    /// Package author; becomes the Debian `Maintainer` field.
    #[serde(default)]
    pub author: Option<Author>,
    /// One-line description.
    #[serde(default)]
    pub description: Option<String>,
    /// Project homepage.
    #[serde(default)]
    pub homepage: Option<String>,
    /// Raw control-field overrides, in manifest order.
    #[serde(default)]
    pub debcontrol: serde_json::Map<String, Value>,
    /// Build scripts.
    #[serde(default)]
    pub scripts: Scripts,
}

/// Manifest author in either npm form.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Author {
    /// `"Jane Doe <jane@example.org>"`.
    Text(String),
    /// `{ "name": ..., "email": ..., "url": ... }`.
    Person {
        /// Display name.
        name: String,
        /// Contact address.
        #[serde(default)]
        email: Option<String>,
        /// Personal page.
        #[serde(default)]
        url: Option<String>,
    },
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Person { name, email, url } => {
                f.write_str(name)?;
                if let Some(email) = email.as_deref().filter(|e| !e.is_empty()) {
                    write!(f, " <{email}>")?;
                }
                if let Some(url) = url.as_deref().filter(|u| !u.is_empty()) {
                    write!(f, " ({url})")?;
                }
                Ok(())
            }
        }
    }
}

/// The build scripts the packager knows about.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct Scripts {
    /// General build script, run first.
    #[serde(default)]
    pub build: Option<String>,
    /// Packaging-specific build script, run after `build`.
    #[serde(default, rename = "build-deb")]
    pub build_deb: Option<String>,
}

impl Scripts {
    /// Script entry names to run, in order.
    ///
    /// # Examples
    ///
    /// ```
    /// use debyw_packager::manifest::Scripts;
    ///
    /// let scripts = Scripts {
    ///     build: Some("tsc".to_owned()),
    ///     build_deb: Some("node deb.js".to_owned()),
    /// };
    /// assert_eq!(scripts.declared(), ["build", "build-deb"]);
    /// ```
    #[must_use]
    pub fn declared(&self) -> Vec<&'static str> {
        [("build", &self.build), ("build-deb", &self.build_deb)]
            .into_iter()
            .filter(|(_, command)| command.as_deref().is_some_and(|c| !c.trim().is_empty()))
            .map(|(name, _)| name)
            .collect()
    }
}

impl Manifest {
    /// Read and parse the manifest at `path`.
    ///
    /// # Errors
    ///
    /// - [`PackagerError::ManifestMissing`] if the file cannot be opened.
    /// - [`PackagerError::ManifestUnparseable`] if it is not a JSON object
    ///   with a string `name`.
    /// - [`PackagerError::ManifestInvalid`] if `name` is empty.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|_| {
            PackagerError::ManifestMissing {
                path: path.to_owned(),
            }
        })?;
        Self::parse(path, &contents)
    }

    /// Parse manifest text; `path` is used for error messages only.
    ///
    /// # Errors
    ///
    /// See [`Self::load`].
    pub fn parse(path: &Utf8Path, contents: &str) -> Result<Self> {
        let unparseable = |reason: String| PackagerError::ManifestUnparseable {
            path: path.to_owned(),
            reason,
        };
        let value: Value = serde_json::from_str(contents).map_err(|e| unparseable(e.to_string()))?;
        if !value.is_object() {
            return Err(unparseable("expected a JSON object".to_owned()));
        }
        let manifest: Self = serde_json::from_value(value).map_err(|e| unparseable(e.to_string()))?;

        if manifest.name.trim().is_empty() {
            return Err(PackagerError::ManifestInvalid {
                path: path.to_owned(),
                reason: "\"name\" must not be empty".to_owned(),
            });
        }

        Ok(manifest)
    }

    /// The version, if present and non-empty.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        non_empty(self.version.as_deref())
    }

    /// The rendered maintainer, if an author is present.
    #[must_use]
    pub fn maintainer(&self) -> Option<String> {
        self.author
            .as_ref()
            .map(ToString::to_string)
            .filter(|m| !m.trim().is_empty())
    }

    /// The description, if present and non-empty.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        non_empty(self.description.as_deref())
    }

    /// The homepage, if present and non-empty.
    #[must_use]
    pub fn homepage(&self) -> Option<&str> {
        non_empty(self.homepage.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
