use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Why a project subdirectory was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubpathError {
    #[error("project directory `{0}` must be relative to the workspace root")]
    Absolute(String),
    #[error("project directory `{0}` must not contain `..`")]
    Traversal(String),
}

/// Resolve `.` and `..` lexically, without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir => {}
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
            Component::RootDir => normalized.push(component.as_os_str()),
            Component::Normal(part) => normalized.push(part),
        }
    }
    normalized
}

/// Check a configured project subdirectory: relative and free of `..`.
pub fn validate_subpath(subpath: &str) -> Result<PathBuf, SubpathError> {
    let path = Path::new(subpath.trim());
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => {
                return Err(SubpathError::Absolute(subpath.to_string()));
            }
            Component::ParentDir => return Err(SubpathError::Traversal(subpath.to_string())),
            Component::CurDir => {}
            Component::Normal(part) => clean.push(part),
        }
    }
    Ok(clean)
}

/// A project directory below the workspace root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDir {
    /// Absolute directory the workflow runs in.
    pub path: PathBuf,
    /// Validated subpath below the root; empty when the project is the root.
    pub subpath: PathBuf,
}

/// Directory a workflow runs in: `root` joined with the optional subdirectory.
pub fn resolve_project_dir(
    root: &Path,
    directory: Option<&str>,
) -> Result<ProjectDir, SubpathError> {
    let base = normalize_path(root);
    let subpath = validate_subpath(directory.unwrap_or_default())?;
    let path = if subpath.as_os_str().is_empty() {
        base
    } else {
        base.join(&subpath)
    };
    Ok(ProjectDir { path, subpath })
}
