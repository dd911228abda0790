//! Path resolution relative to an importing file.
//!
//! Import paths are resolved against the directory of the file that names them, then
//! normalized lexically (`.` dropped, `..` folded) without touching the filesystem, so the
//! same file reached by two spellings gets the same key.

use std::io;
use std::path::{Component, Path, PathBuf};

/// Lexically normalize a path.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)))
                    && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Absolute, normalized form of `path`, relative paths taken from the current directory.
pub fn absolute(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(normalize(path))
    } else {
        Ok(normalize(&std::env::current_dir()?.join(path)))
    }
}

/// Resolves paths relative to the directory of one file.
#[derive(Debug, Clone)]
pub struct PathResolver {
    base: PathBuf,
}

impl PathResolver {
    pub fn new(file: &Path) -> Self {
        let base = file.parent().map(normalize).unwrap_or_default();
        Self { base }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        normalize(&self.base.join(relative))
    }
}
