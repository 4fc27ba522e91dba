//! Debian control metadata resolution and rendering.
//!
//! Control fields are computed from the manifest in a fixed order, then the
//! manifest's `debcontrol` overrides are merged in. An override replaces a
//! computed field in place (field names compare case-insensitively, as dpkg
//! does) and new fields are appended in manifest order. `Architecture` is
//! never stored: each variant appends its own as the last line.

use crate::arch::Architecture;
use crate::error::{PackagerError, Result};
use crate::manifest::Manifest;
use camino::Utf8Path;
use log::warn;
use serde_json::Value;

/// Field name of the package identifier.
pub const PACKAGE: &str = "Package";
/// Field name written last by [`ControlFields::render`].
pub const ARCHITECTURE: &str = "Architecture";

/// Ordered Debian control fields, excluding `Architecture`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControlFields {
    fields: Vec<(String, String)>,
}

impl ControlFields {
    /// Compute the control fields for a package.
    ///
    /// The base fields are `Package`, then `Version`, `Maintainer`,
    /// `Description` and `Homepage` when the manifest has them, then
    /// `Depends` (set to `runtime_depends`) and `Priority: optional`.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::ManifestInvalid`] when an override cannot be
    /// expressed as a control value or would remove `Package`.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use debyw_packager::arch::Architecture;
    /// use debyw_packager::control::ControlFields;
    /// use debyw_packager::manifest::Manifest;
    ///
    /// let path = Utf8Path::new("package.json");
    /// let manifest = Manifest::parse(path, r#"{"name": "foo", "version": "1.0"}"#)?;
    /// let control = ControlFields::resolve(&manifest, path, "debyw")?;
    /// assert_eq!(
    ///     control.render(Architecture::All),
    ///     "Package: foo\nVersion: 1.0\nDepends: debyw\nPriority: optional\nArchitecture: all\n",
    /// );
    /// # Ok::<(), debyw_packager::error::PackagerError>(())
    /// ```
    pub fn resolve(
        manifest: &Manifest,
        manifest_path: &Utf8Path,
        runtime_depends: &str,
    ) -> Result<Self> {
        let mut control = Self::base(manifest, runtime_depends);

        for (key, value) in &manifest.debcontrol {
            if key.eq_ignore_ascii_case(ARCHITECTURE) {
                warn!(
                    "{manifest_path}: ignoring debcontrol.{key}; the architecture comes from files/"
                );
                continue;
            }

            match override_value(value) {
                Some(Ok(text)) => control.set(key, text),
                Some(Err(kind)) => {
                    return Err(PackagerError::ManifestInvalid {
                        path: manifest_path.to_owned(),
                        reason: format!("debcontrol.{key} cannot be {kind}"),
                    });
                }
                None if key.eq_ignore_ascii_case(PACKAGE) => {
                    return Err(PackagerError::ManifestInvalid {
                        path: manifest_path.to_owned(),
                        reason: format!("debcontrol.{key} cannot remove the package name"),
                    });
                }
                None => control.remove(key),
            }
        }

        if !is_valid_package_name(control.package()) {
            return Err(PackagerError::ManifestInvalid {
                path: manifest_path.to_owned(),
                reason: format!(
                    "Package {:?} is not a Debian package name (lowercase letters, digits, '+', '-' and '.', at least two characters, starting alphanumeric)",
                    control.package()
                ),
            });
        }

        Ok(control)
    }

    fn base(manifest: &Manifest, runtime_depends: &str) -> Self {
        let mut control = Self { fields: Vec::new() };
        control.set(PACKAGE, manifest.name.clone());
        if let Some(version) = manifest.version() {
            control.set("Version", version.to_owned());
        }
        if let Some(maintainer) = manifest.maintainer() {
            control.set("Maintainer", maintainer);
        }
        if let Some(description) = manifest.description() {
            control.set("Description", description.to_owned());
        }
        if let Some(homepage) = manifest.homepage() {
            control.set("Homepage", homepage.to_owned());
        }
        control.set("Depends", runtime_depends.to_owned());
        control.set("Priority", "optional".to_owned());
        control
    }

    /// Set `key`, replacing an existing field of the same name in place.
    pub fn set(&mut self, key: &str, value: String) {
        match self.position(key) {
            Some(index) => {
                if let Some(slot) = self.fields.get_mut(index) {
                    *slot = (key.to_owned(), value);
                }
            }
            None => self.fields.push((key.to_owned(), value)),
        }
    }

    /// Remove `key` if present.
    pub fn remove(&mut self, key: &str) {
        if let Some(index) = self.position(key) {
            self.fields.remove(index);
        }
    }

    /// Look up a field by name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// The resolved `Package` field.
    #[must_use]
    pub fn package(&self) -> &str {
        self.get(PACKAGE).unwrap_or_default()
    }

    /// Fields in render order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The archive file name for `arch`: `<Package>-<arch>.deb`.
    #[must_use]
    pub fn archive_name(&self, arch: Architecture) -> String {
        format!("{}-{arch}.deb", self.package())
    }

    /// The installed application name: `Package` without `app_prefix`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use camino::Utf8Path;
    /// # use debyw_packager::control::ControlFields;
    /// # use debyw_packager::manifest::Manifest;
    /// let path = Utf8Path::new("package.json");
    /// let manifest = Manifest::parse(path, r#"{"name": "debyw-app-clock"}"#)?;
    /// let control = ControlFields::resolve(&manifest, path, "debyw")?;
    /// assert_eq!(control.app_name("debyw-app-"), "clock");
    /// # Ok::<(), debyw_packager::error::PackagerError>(())
    /// ```
    #[must_use]
    pub fn app_name(&self, app_prefix: &str) -> &str {
        let package = self.package();
        match package.strip_prefix(app_prefix) {
            Some(rest) if !app_prefix.is_empty() && !rest.is_empty() => rest,
            _ => package,
        }
    }

    /// Render the control file for `arch`.
    ///
    /// Every field is written as `Key: value`; multi-line values use Debian
    /// continuation lines. `Architecture: <arch>` is always the final line.
    #[must_use]
    pub fn render(&self, arch: Architecture) -> String {
        let mut out = String::new();
        for (key, value) in self.iter() {
            push_field(&mut out, key, value);
        }
        push_field(&mut out, ARCHITECTURE, arch.as_str());
        out
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(key))
    }
}

fn push_field(out: &mut String, key: &str, value: &str) {
    let mut lines = value.lines();
    out.push_str(key);
    out.push_str(": ");
    out.push_str(lines.next().unwrap_or_default());
    out.push('\n');
    for line in lines {
        if line.trim().is_empty() {
            out.push_str(" .\n");
        } else {
            out.push(' ');
            out.push_str(line);
            out.push('\n');
        }
    }
}

/// Whether `name` follows the Debian package name syntax.
///
/// The name is joined onto staging and output paths, so it must never carry
/// a separator or start with a dot.
///
/// # Examples
///
/// ```
/// use debyw_packager::control::is_valid_package_name;
///
/// assert!(is_valid_package_name("debyw-app-clock"));
/// assert!(!is_valid_package_name("../clock"));
/// ```
#[must_use]
pub fn is_valid_package_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    name.len() >= 2
        && (first.is_ascii_lowercase() || first.is_ascii_digit())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '+' | '-' | '.'))
}

/// Convert a `debcontrol` value.
///
/// `None` removes the field; `Some(Err(kind))` names an unsupported JSON kind.
fn override_value(value: &Value) -> Option<std::result::Result<String, &'static str>> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(Ok(text.clone())),
        Value::Bool(_) | Value::Number(_) => Some(Ok(value.to_string())),
        Value::Array(items) => Some(
            items
                .iter()
                .map(|item| match item {
                    Value::String(text) => Ok(text.clone()),
                    Value::Bool(_) | Value::Number(_) => Ok(item.to_string()),
                    Value::Null | Value::Array(_) | Value::Object(_) => Err("a nested list"),
                })
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(|parts| parts.join(", ")),
        ),
        Value::Object(_) => Some(Err("an object")),
    }
}
