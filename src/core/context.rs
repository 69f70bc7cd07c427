//! Where an injection happens.

use std::path::{Path, PathBuf};

/// Location an injector operates from.
///
/// `current_dir` anchors project-root discovery and relative import paths;
/// `file` only shows up in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionContext {
    /// Directory resolution is relative to
    pub current_dir: PathBuf,
    /// File performing the injection, when known
    pub file: Option<PathBuf>,
}

impl ResolutionContext {
    /// Context for a directory.
    pub fn for_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            current_dir: dir.into(),
            file: None,
        }
    }

    /// Context for a file; its parent becomes the current directory.
    pub fn for_file(file: impl Into<PathBuf>) -> Self {
        let file = file.into();
        let current_dir = file.parent().map(Path::to_path_buf).unwrap_or_default();
        Self {
            current_dir,
            file: Some(file),
        }
    }

    /// The same context with absolute paths; relative ones are taken from
    /// the process working directory.
    pub fn absolute(&self) -> std::io::Result<Self> {
        let current_dir = if self.current_dir.as_os_str().is_empty() {
            std::env::current_dir()?
        } else {
            std::path::absolute(&self.current_dir)?
        };
        let file = self.file.as_deref().map(std::path::absolute).transpose()?;
        Ok(Self {
            current_dir,
            file,
        })
    }

    /// Resolve `path` against the current directory.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.current_dir.join(path)
        }
    }

    /// Label used in error messages.
    pub fn display_file(&self) -> String {
        self.file.as_deref().unwrap_or(&self.current_dir).display().to_string()
    }
}
