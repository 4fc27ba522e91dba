//! Repository-wide packaging configuration.
//!
//! The packager works with zero configuration on the conventional layout
//! (`packages/`, `dist/`, `package.json`). A `debyw.toml` at the repository
//! root can adjust names and external tools; CLI flags override both. All
//! relative paths are resolved against the repository root once, here, so
//! later stages only see resolved paths.

use crate::error::{PackagerError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use serde::Deserialize;

/// Name of the optional configuration file at the repository root.
pub const CONFIG_FILE_NAME: &str = "debyw.toml";

/// Settings as written in `debyw.toml`. Every key is optional.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Directory containing one subdirectory per package.
    pub packages_dir: Option<String>,
    /// Directory receiving archives and the package index.
    pub dist_dir: Option<String>,
    /// Manifest file name inside each package directory.
    pub manifest_file: Option<String>,
    /// Staging directory name created inside each package directory.
    pub staging_dir: Option<String>,
    /// Value of the computed `Depends` control field.
    pub runtime_depends: Option<String>,
    /// Package-name prefix stripped to derive the installed app name.
    pub app_prefix: Option<String>,
    /// Install root for application payloads inside the staging tree.
    pub share_root: Option<String>,
    /// Runner for build scripts; the script name is appended.
    pub script_runner: Option<Vec<String>>,
    /// Debian archive builder.
    pub deb_tool: Option<String>,
    /// Compression passed to the archive builder with `-Z`.
    pub deb_compression: Option<String>,
    /// Package index scanner.
    pub index_tool: Option<String>,
    /// File name of the compressed package index.
    pub index_file: Option<String>,
}

impl ConfigFile {
    /// Parse configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::InvalidConfig`] on syntax errors or unknown
    /// keys.
    ///
    /// # Examples
    ///
    /// ```
    /// use debyw_packager::config::ConfigFile;
    ///
    /// let file = ConfigFile::parse("dist_dir = \"public\"")?;
    /// assert_eq!(file.dist_dir.as_deref(), Some("public"));
    /// # Ok::<(), debyw_packager::error::PackagerError>(())
    /// ```
    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| PackagerError::InvalidConfig {
            reason: e.to_string(),
        })
    }
}

/// Command-line overrides applied on top of the configuration file.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ConfigOverrides {
    /// Replacement for `packages_dir`.
    pub packages_dir: Option<Utf8PathBuf>,
    /// Replacement for `dist_dir`.
    pub dist_dir: Option<Utf8PathBuf>,
}

/// Fully resolved configuration for one run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RepoConfig {
    /// Repository root; external tools that scan `dist` run from here.
    pub root: Utf8PathBuf,
    /// Resolved packages directory.
    pub packages_dir: Utf8PathBuf,
    /// Resolved output directory.
    pub dist_dir: Utf8PathBuf,
    /// Manifest file name inside each package directory.
    pub manifest_file: String,
    /// Staging directory name inside each package directory.
    pub staging_dir: String,
    /// Value of the computed `Depends` control field.
    pub runtime_depends: String,
    /// Package-name prefix stripped to derive the installed app name.
    pub app_prefix: String,
    /// Relative install root for application payloads.
    pub share_root: Utf8PathBuf,
    /// Runner program followed by its leading arguments.
    pub script_runner: Vec<String>,
    /// Debian archive builder.
    pub deb_tool: String,
    /// Compression passed to the archive builder.
    pub deb_compression: String,
    /// Package index scanner.
    pub index_tool: String,
    /// File name of the compressed package index.
    pub index_file: String,
}

impl RepoConfig {
    /// Default configuration for the repository at `root`.
    #[must_use]
    pub fn for_root(root: &Utf8Path) -> Self {
        Self {
            root: root.to_owned(),
            packages_dir: root.join("packages"),
            dist_dir: root.join("dist"),
            manifest_file: "package.json".to_owned(),
            staging_dir: ".deb_pkg".to_owned(),
            runtime_depends: "debyw".to_owned(),
            app_prefix: "debyw-app-".to_owned(),
            share_root: Utf8PathBuf::from("usr/share/debyw"),
            script_runner: vec!["npm".to_owned(), "run".to_owned()],
            deb_tool: "dpkg-deb".to_owned(),
            deb_compression: "gzip".to_owned(),
            index_tool: "dpkg-scanpackages".to_owned(),
            index_file: "Packages.gz".to_owned(),
        }
    }

    /// Load configuration for `root`.
    ///
    /// An explicit `config_path` must exist. Without one, `debyw.toml` in the
    /// root is used when present and the defaults otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::ConfigUnreadable`] if the file cannot be read
    /// and [`PackagerError::InvalidConfig`] if it does not parse or validate.
    pub fn load(
        root: &Utf8Path,
        config_path: Option<&Utf8Path>,
        overrides: &ConfigOverrides,
    ) -> Result<Self> {
        let file = match config_path {
            Some(path) => Some(read_config_file(&resolve(root, path))?),
            None => {
                let default_path = root.join(CONFIG_FILE_NAME);
                if default_path.is_file() {
                    Some(read_config_file(&default_path)?)
                } else {
                    None
                }
            }
        };

        let mut config = Self::for_root(root);
        if let Some(file) = file {
            config.merge_file(file);
        }
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Apply the keys set in `file`, resolving paths against the root.
    pub fn merge_file(&mut self, file: ConfigFile) {
        if let Some(dir) = file.packages_dir {
            self.packages_dir = resolve(&self.root, Utf8Path::new(&dir));
        }
        if let Some(dir) = file.dist_dir {
            self.dist_dir = resolve(&self.root, Utf8Path::new(&dir));
        }
        if let Some(share_root) = file.share_root {
            self.share_root = Utf8PathBuf::from(share_root.trim_start_matches('/'));
        }
        set_if_some(&mut self.manifest_file, file.manifest_file);
        set_if_some(&mut self.staging_dir, file.staging_dir);
        set_if_some(&mut self.runtime_depends, file.runtime_depends);
        set_if_some(&mut self.app_prefix, file.app_prefix);
        set_if_some(&mut self.script_runner, file.script_runner);
        set_if_some(&mut self.deb_tool, file.deb_tool);
        set_if_some(&mut self.deb_compression, file.deb_compression);
        set_if_some(&mut self.index_tool, file.index_tool);
        set_if_some(&mut self.index_file, file.index_file);
    }

    /// Apply command-line overrides.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(dir) = &overrides.packages_dir {
            self.packages_dir = resolve(&self.root, dir);
        }
        if let Some(dir) = &overrides.dist_dir {
            self.dist_dir = resolve(&self.root, dir);
        }
    }

    /// Check the invariants later stages rely on.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::InvalidConfig`] naming the offending key.
    pub fn validate(&self) -> Result<()> {
        if self.script_runner.first().is_none_or(|program| program.is_empty()) {
            return Err(invalid("script_runner must name a program"));
        }

        let names = [
            ("manifest_file", &self.manifest_file),
            ("staging_dir", &self.staging_dir),
            ("deb_tool", &self.deb_tool),
            ("deb_compression", &self.deb_compression),
            ("index_tool", &self.index_tool),
            ("index_file", &self.index_file),
        ];
        for (key, value) in names {
            if value.trim().is_empty() {
                return Err(invalid(&format!("{key} must not be empty")));
            }
        }

        if self.staging_dir.contains('/') || self.staging_dir == "." || self.staging_dir == ".." {
            return Err(invalid("staging_dir must be a plain directory name"));
        }

        Ok(())
    }

    /// The packages directory as users type it on the command line.
    ///
    /// Used to strip redundant prefixes from requested package names.
    #[must_use]
    pub fn packages_dir_label(&self) -> &str {
        self.packages_dir
            .strip_prefix(&self.root)
            .map_or_else(|_| self.packages_dir.as_str(), Utf8Path::as_str)
    }

    /// The output directory relative to the root, for tools run from there.
    #[must_use]
    pub fn dist_dir_from_root(&self) -> Utf8PathBuf {
        match self.dist_dir.strip_prefix(&self.root) {
            Ok(relative) => Utf8Path::new(".").join(relative),
            Err(_) => self.dist_dir.clone(),
        }
    }

    /// Path of the compressed package index.
    #[must_use]
    pub fn index_path(&self) -> Utf8PathBuf {
        self.dist_dir.join(&self.index_file)
    }
}

fn read_config_file(path: &Utf8Path) -> Result<ConfigFile> {
    debug!("reading configuration from {path}");
    let contents = std::fs::read_to_string(path).map_err(|source| {
        PackagerError::ConfigUnreadable {
            path: path.to_owned(),
            source,
        }
    })?;
    ConfigFile::parse(&contents).map_err(|err| match err {
        PackagerError::InvalidConfig { reason } => PackagerError::InvalidConfig {
            reason: format!("{path}: {reason}"),
        },
        other => other,
    })
}

fn resolve(root: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    if path.is_absolute() {
        path.to_owned()
    } else {
        root.join(path)
    }
}

fn set_if_some<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn invalid(reason: &str) -> PackagerError {
    PackagerError::InvalidConfig {
        reason: reason.to_owned(),
    }
}
