//! Project identity: proper packages and proper paths
//!
//! A project is named equivalently by a *proper package* (a dotted name such
//! as `wet.sprocket`) and a *proper path* (the relative path `wet/sprocket`).
//! The two are mutually derivable by separator substitution; a pair that
//! fails this check is a configuration error.

use crate::error::{BuildError, BuildResult};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Path segment reserved for a project's internal build code.  No project may
/// be named by it.
pub const RESERVED_SEGMENT: &str = "builder";

/// Proper package of the build tool's own home project.
pub const HOME_PACKAGE: &str = "build.ember";

/// Proper path of the build tool's own home project.
pub fn home_path() -> PathBuf {
    path_of(HOME_PACKAGE)
}

/// Converts a proper package to the equivalent proper path.
pub fn path_of(package: &str) -> PathBuf {
    PathBuf::from(package.replace('.', std::path::MAIN_SEPARATOR_STR))
}

/// Converts a proper path to the equivalent proper package.
pub fn package_of(path: &Path) -> BuildResult<String> {
    if path.is_absolute() {
        return Err(BuildError::config(format!(
            "Absolute project path: {}",
            path.display()
        )));
    }
    Ok(path
        .to_string_lossy()
        .replace(std::path::MAIN_SEPARATOR, "."))
}

/// Tests the validity of a proper package.
pub fn validate_package(package: &str) -> BuildResult<()> {
    if package.is_empty() || package.starts_with('.') || package.ends_with('.') || package.contains("..") {
        return Err(BuildError::config(format!(
            "Malformed project package: `{package}`"
        )));
    }
    if package == RESERVED_SEGMENT || package.ends_with(".builder") {
        return Err(BuildError::config(format!(
            "Project package ends with `{RESERVED_SEGMENT}`: {package}"
        )));
    }
    Ok(())
}

/// Tests the validity of a proper path.
pub fn validate_path(path: &Path) -> BuildResult<()> {
    if path.is_absolute() {
        return Err(BuildError::config(format!(
            "Absolute project path: {}",
            path.display()
        )));
    }
    if path.file_name() == Some(OsStr::new(RESERVED_SEGMENT)) {
        return Err(BuildError::config(format!(
            "Project path ends with `{RESERVED_SEGMENT}`: {}",
            path.display()
        )));
    }
    Ok(())
}

/// Tests for consistency between the two forms of a project's name.
/// Where applicable, validate each form individually before calling this.
pub fn validate_pair(package: &str, path: &Path) -> BuildResult<()> {
    if path_of(package) != path {
        return Err(BuildError::config(format!(
            "Inequivalent project package `{package}` and path `{}`",
            path.display()
        )));
    }
    Ok(())
}

/// A project under build, named by its validated package/path pair.
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Project {
    package: String,
    path: PathBuf,
}

impl Project {
    /// Names a project by its proper package.
    pub fn from_package(package: impl Into<String>) -> BuildResult<Self> {
        let package = package.into();
        validate_package(&package)?;
        let path = path_of(&package);
        Ok(Self { package, path })
    }

    /// Names a project by its proper path.
    pub fn from_path(path: impl Into<PathBuf>) -> BuildResult<Self> {
        let path = path.into();
        validate_path(&path)?;
        let package = package_of(&path)?;
        validate_package(&package)?;
        Ok(Self { package, path })
    }

    /// Names a project by both forms, checking their consistency.
    pub fn new(package: impl Into<String>, path: impl Into<PathBuf>) -> BuildResult<Self> {
        let package = package.into();
        let path = path.into();
        validate_package(&package)?;
        validate_path(&path)?;
        validate_pair(&package, &path)?;
        Ok(Self { package, path })
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
