//! Resolution of client-supplied paths inside the served root.
//!
//! Every handler that touches the filesystem goes through [`PathConfiner::confine`]
//! first. Resolution is purely lexical: the input is treated as rooted, a `..`
//! that would climb above that root is rejected, and the joined result must
//! still start with the absolute root afterwards.

use std::path::{Component, Path, PathBuf};

use crate::error::{AppError, Result};

#[derive(Debug, Clone)]
pub struct PathConfiner {
    root: PathBuf,
}

impl PathConfiner {
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = std::path::absolute(root.as_ref())?;
        Ok(Self {
            root: normalize(&root),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn confine(&self, relative: &str) -> Result<PathBuf> {
        if relative.contains('\0') {
            return Err(forbidden(relative));
        }

        let segments = rooted_segments(relative).ok_or_else(|| forbidden(relative))?;

        let mut resolved = self.root.clone();
        for segment in segments {
            resolved.push(segment);
        }

        if !resolved.starts_with(&self.root) {
            return Err(forbidden(relative));
        }

        Ok(resolved)
    }
}

fn forbidden(relative: &str) -> AppError {
    tracing::warn!(path = %relative.escape_debug(), "Rejected path outside the served root");
    AppError::Forbidden("Access outside the served directory is not allowed".to_string())
}

/// Normal segments left after treating `relative` as rooted at `/`, or `None`
/// if a `..` climbs above that root.
fn rooted_segments(relative: &str) -> Option<Vec<&str>> {
    let mut segments: Vec<&str> = Vec::new();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => segments.push(part.to_str()?),
            Component::ParentDir => {
                segments.pop()?;
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    Some(segments)
}

fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir => {}
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Client-facing form of `relative`: `/` followed by its normalized segments.
///
/// Only meaningful for paths that already passed [`PathConfiner::confine`];
/// anything escaping the root displays as `/`.
pub fn display_path(relative: &str) -> String {
    format!("/{}", rooted_segments(relative).unwrap_or_default().join("/"))
}

/// Directory echo for listings, always starting and ending with `/`.
pub fn display_dir(relative: &str) -> String {
    let path = display_path(relative);
    if path == "/" {
        path
    } else {
        format!("{}/", path)
    }
}

/// Strips every directory component from a client-supplied file name.
///
/// Both `/` and `\` count as separators. Returns `None` when nothing usable
/// is left.
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let base = name
        .rsplit(|c| c == '/' || c == '\\')
        .find(|part| !part.is_empty())?
        .trim();

    if base.is_empty() || base == "." || base == ".." || base.contains('\0') {
        return None;
    }

    Some(base.to_string())
}
