use std::ffi::OsString;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LocateError {
    #[error("failed to get current executable: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("failed to resolve executable path {}: {source}", path.display())]
    Resolve {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("executable path has no file name: {}", .0.display())]
    NoFileName(PathBuf),
    #[error("executable path has no parent directory: {}", .0.display())]
    NoParent(PathBuf),
}

/// Where the binary being replaced lives, split into directory and base name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableLocation {
    pub directory: PathBuf,
    pub base_name: OsString,
}

impl ExecutableLocation {
    /// Locate the executable of the running process.
    ///
    /// Symlinks are resolved so the real file is replaced rather than the link.
    ///
    /// # Errors
    /// Returns an error when the OS cannot report the executable path or the
    /// path cannot be canonicalized.
    pub fn current() -> Result<Self, LocateError> {
        let exe = std::env::current_exe().map_err(LocateError::CurrentExe)?;
        let exe = strip_deleted_suffix(exe);
        let resolved = exe
            .canonicalize()
            .map_err(|source| LocateError::Resolve { path: exe, source })?;
        Self::from_path(&resolved)
    }

    /// Split an explicit executable path into its location parts.
    ///
    /// # Errors
    /// Returns an error when the path has no file name or no parent directory.
    pub fn from_path(path: &Path) -> Result<Self, LocateError> {
        let base_name = path
            .file_name()
            .ok_or_else(|| LocateError::NoFileName(path.to_path_buf()))?
            .to_os_string();
        let directory = match path.parent() {
            Some(parent) if parent.as_os_str().is_empty() => PathBuf::from("."),
            Some(parent) => parent.to_path_buf(),
            None => return Err(LocateError::NoParent(path.to_path_buf())),
        };
        Ok(Self {
            directory,
            base_name,
        })
    }

    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.base_name)
    }

    /// Staging sidecar: `<dir>/.<base>.new`.
    #[must_use]
    pub fn new_sidecar(&self) -> PathBuf {
        self.sidecar("new")
    }

    /// Rollback sidecar: `<dir>/.<base>.old`.
    #[must_use]
    pub fn old_sidecar(&self) -> PathBuf {
        self.sidecar("old")
    }

    fn sidecar(&self, suffix: &str) -> PathBuf {
        let mut name = OsString::from(".");
        name.push(&self.base_name);
        name.push(".");
        name.push(suffix);
        self.directory.join(name)
    }
}

// After the running binary has been replaced on Linux, /proc/self/exe points
// at the unlinked inode and current_exe() reports "<path> (deleted)".
fn strip_deleted_suffix(exe: PathBuf) -> PathBuf {
    if !cfg!(target_os = "linux") {
        return exe;
    }
    let stripped = exe
        .to_str()
        .and_then(|path| path.strip_suffix(" (deleted)"))
        .map(PathBuf::from);
    match stripped {
        Some(fixed) => {
            log::debug!("Adjusted exe path from deleted inode: {}", fixed.display());
            fixed
        }
        None => exe,
    }
}
