//! Workspace root handle and path confinement.
//!
//! Every file-system tool resolves its path argument here before touching
//! the disk. Confinement is best-effort path validation, not isolation.

use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum PathViolation {
    #[error("Absolute paths are not allowed.")]
    Absolute,
    #[error("Path '{path}' is outside the secure workspace.")]
    OutsideWorkspace { path: String },
    #[error("could not resolve path '{path}': {source}")]
    Resolve {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Canonical workspace root shared by all tools of a process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Create the root directory if needed and pin its canonical form.
    pub fn open(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)
            .with_context(|| format!("create workspace {}", root.display()))?;
        let root = fs::canonicalize(root)
            .with_context(|| format!("canonicalize workspace {}", root.display()))?;
        debug!(root = %root.display(), "workspace opened");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a workspace-relative path to a canonical absolute path under the root.
    ///
    /// The path does not need to exist. `""` and `"."` resolve to the root.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, PathViolation> {
        let requested = Path::new(relative);
        if requested.is_absolute() || requested.has_root() {
            return Err(PathViolation::Absolute);
        }

        let outside = || PathViolation::OutsideWorkspace {
            path: relative.to_string(),
        };

        let mut normalized = self.root.clone();
        for component in requested.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    if !normalized.pop() {
                        return Err(outside());
                    }
                }
                Component::Normal(part) => normalized.push(part),
                Component::RootDir | Component::Prefix(_) => return Err(PathViolation::Absolute),
            }
        }
        if !normalized.starts_with(&self.root) {
            return Err(outside());
        }

        // Symlinks inside the root may still point elsewhere.
        let resolved =
            canonicalize_existing_prefix(&normalized).map_err(|source| PathViolation::Resolve {
                path: relative.to_string(),
                source,
            })?;
        if !resolved.starts_with(&self.root) {
            return Err(outside());
        }
        Ok(resolved)
    }
}

/// Canonicalize the deepest existing ancestor of `path` and re-append the missing tail.
fn canonicalize_existing_prefix(path: &Path) -> std::io::Result<PathBuf> {
    let mut tail: Vec<OsString> = Vec::new();
    let mut current = path.to_path_buf();
    loop {
        match fs::canonicalize(&current) {
            Ok(mut base) => {
                for part in tail.iter().rev() {
                    base.push(part);
                }
                return Ok(base);
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                if fs::symlink_metadata(&current).is_ok() {
                    // Dangling link: its target cannot be checked.
                    return Err(std::io::Error::new(
                        ErrorKind::InvalidInput,
                        "path goes through a dangling symbolic link",
                    ));
                }
                let Some(name) = current.file_name() else {
                    return Err(err);
                };
                tail.push(name.to_os_string());
                if !current.pop() {
                    return Err(err);
                }
            }
            Err(err) => return Err(err),
        }
    }
}
