//! Recursive directory layering.
//!
//! Asset directories are merged over the staging tree the way `cp -R src/.
//! dest/` does: directories are merged, regular files overwrite whatever is at
//! the same relative path, and symlinks are recreated rather than followed.

use crate::error::{PackagerError, Result};
use camino::Utf8Path;
use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// Copy the contents of `source` into `destination`, merging directories.
///
/// `destination` is created if missing. File permission bits are preserved.
///
/// # Errors
///
/// Returns [`PackagerError::StagingFailed`] naming the path that could not be
/// read, created or written.
///
/// # Examples
///
/// ```
/// use camino::Utf8PathBuf;
/// use debyw_packager::copy::copy_tree;
/// use std::fs;
///
/// # fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let source = tempfile::tempdir()?;
/// fs::create_dir_all(source.path().join("etc"))?;
/// fs::write(source.path().join("etc/app.conf"), "a = 1")?;
/// let destination = tempfile::tempdir()?;
///
/// let src = Utf8PathBuf::try_from(source.path().to_path_buf())?;
/// let dst = Utf8PathBuf::try_from(destination.path().to_path_buf())?;
/// copy_tree(&src, &dst)?;
/// assert!(dst.join("etc/app.conf").exists());
/// # Ok(())
/// # }
/// ```
pub fn copy_tree(source: &Utf8Path, destination: &Utf8Path) -> Result<()> {
    fs::create_dir_all(destination).map_err(|e| staging_error(destination.as_std_path(), e))?;

    for entry in WalkDir::new(source).min_depth(1).follow_links(false) {
        let entry = entry.map_err(|e| staging_error(source.as_std_path(), io::Error::from(e)))?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| staging_error(entry.path(), io::Error::other(e)))?;
        let target = destination.as_std_path().join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            create_dir_over(&target)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            copy_file(entry.path(), &target)?;
        }
    }

    Ok(())
}

/// Create `target` as a directory, replacing a file or link in the way.
fn create_dir_over(target: &Path) -> Result<()> {
    if let Ok(metadata) = target.symlink_metadata() {
        if metadata.is_dir() {
            return Ok(());
        }
        fs::remove_file(target).map_err(|e| staging_error(target, e))?;
    }
    fs::create_dir_all(target).map_err(|e| staging_error(target, e))
}

fn copy_file(source: &Path, target: &Path) -> Result<()> {
    remove_link(target)?;
    fs::copy(source, target).map_err(|e| staging_error(target, e))?;
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(source: &Path, target: &Path) -> Result<()> {
    let link_target = fs::read_link(source).map_err(|e| staging_error(source, e))?;
    remove_existing(target)?;
    std::os::unix::fs::symlink(&link_target, target).map_err(|e| staging_error(target, e))
}

#[cfg(not(unix))]
fn copy_symlink(source: &Path, target: &Path) -> Result<()> {
    copy_file(source, target)
}

/// Remove `target` if it is a symlink so a copy does not write through it.
fn remove_link(target: &Path) -> Result<()> {
    match target.symlink_metadata() {
        Ok(metadata) if metadata.file_type().is_symlink() => {
            fs::remove_file(target).map_err(|e| staging_error(target, e))
        }
        _ => Ok(()),
    }
}

#[cfg(unix)]
fn remove_existing(target: &Path) -> Result<()> {
    match target.symlink_metadata() {
        Ok(metadata) if metadata.is_dir() => {
            fs::remove_dir_all(target).map_err(|e| staging_error(target, e))
        }
        Ok(_) => fs::remove_file(target).map_err(|e| staging_error(target, e)),
        Err(_) => Ok(()),
    }
}

fn staging_error(path: &Path, source: io::Error) -> PackagerError {
    PackagerError::StagingFailed {
        path: path.to_string_lossy().into_owned().into(),
        source,
    }
}
