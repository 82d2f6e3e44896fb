//! Xcode project discovery
//!
//! Finds the `.xcodeproj` inside a platform project directory. More than one
//! match is not fatal: the first in name order is used and a warning names
//! the rest.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Extension of Xcode project bundles
pub const PROJECT_EXTENSION: &str = "xcodeproj";

/// Errors from project discovery
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("No Xcode project found in {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to list {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A discovered Xcode project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XcodeProject {
    /// Base name without extension, e.g. "HelloCordova"
    pub name: String,
    /// Full path to the `.xcodeproj` bundle
    pub path: PathBuf,
    /// Other matches that were passed over
    pub ignored: Vec<String>,
}

/// Find the Xcode project in `dir`.
pub fn find_xcode_project_in(dir: &Path) -> Result<XcodeProject, ProjectError> {
    let entries = fs::read_dir(dir).map_err(|source| ProjectError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ProjectError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();

    select_project(dir, &names)
}

/// Pick the project among directory entry names, in the order given.
pub fn select_project(dir: &Path, entries: &[String]) -> Result<XcodeProject, ProjectError> {
    let matches: Vec<&String> = entries
        .iter()
        .filter(|name| {
            Path::new(name.as_str())
                .extension()
                .is_some_and(|ext| ext == PROJECT_EXTENSION)
        })
        .collect();

    let Some((first, rest)) = matches.split_first() else {
        return Err(ProjectError::NotFound(dir.to_path_buf()));
    };

    if !rest.is_empty() {
        log::warn!(
            "Found multiple .{} directories in {}: {}. Using {}",
            PROJECT_EXTENSION,
            dir.display(),
            matches
                .iter()
                .map(|name| name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            first
        );
    }

    let name = Path::new(first.as_str())
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| (*first).clone());

    Ok(XcodeProject {
        name,
        path: dir.join(first.as_str()),
        ignored: rest.iter().map(|name| (*name).clone()).collect(),
    })
}
