use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use selfup_platform::{ExecutableLocation, LocateError};
use selfup_resolver::UpdatePayload;
use tempfile::TempDir;
use thiserror::Error;

use crate::archive::{ExtractError, Extractor};

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("could not extract update archive: {0}")]
    CouldNotExtract(#[source] ExtractError),

    #[error("could not locate the executable to replace: {0}")]
    CouldNotLocateCurrent(#[source] LocateError),

    #[error("update archive does not contain a file named {name}")]
    BinaryNotInArchive { name: String },

    #[error("could not stage new binary at {}: {source}", path.display())]
    CouldNotStageNew {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not move current binary {} aside: {source}", path.display())]
    CouldNotDisplaceCurrent {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not install new binary at {} (original restored): {source}", path.display())]
    CouldNotInstallNew {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(
        "could not install new binary at {} ({install_error}) and could not restore the original from {}: {rollback_error}",
        path.display(),
        backup.display()
    )]
    CorruptState {
        path: PathBuf,
        backup: PathBuf,
        install_error: io::Error,
        #[source]
        rollback_error: io::Error,
    },
}

impl ApplyError {
    /// The executable path may hold no runnable binary. Never retry.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::CorruptState { .. })
    }

    /// Whether the original binary is known to still be in place.
    #[must_use]
    pub fn original_intact(&self) -> bool {
        !self.is_fatal()
    }
}

/// Filesystem operations whose failure the swap has to survive.
pub trait SwapFs {
    /// # Errors
    /// Propagates the underlying filesystem error.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
    /// # Errors
    /// Propagates the underlying filesystem error.
    fn remove_file(&self, path: &Path) -> io::Result<()>;
    /// # Errors
    /// Propagates the underlying filesystem error.
    fn hide(&self, path: &Path) -> io::Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl SwapFs for OsFs {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn hide(&self, path: &Path) -> io::Result<()> {
        selfup_platform::hide_file(path)
    }
}

/// Progress of one swap, used to decide what to undo.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct SwapState {
    pub staged_new: bool,
    pub displaced_current: bool,
    pub installed_new: bool,
    pub removed_old: bool,
}

/// Replaces an executable on disk with the binary from an update archive.
///
/// The swap goes through two sidecars next to the target, `.<name>.new` and
/// `.<name>.old`. Renames within that directory are the only atomicity the
/// procedure relies on.
pub struct Applier<F = OsFs> {
    target: Option<PathBuf>,
    scratch_root: Option<PathBuf>,
    fs: F,
}

impl Applier<OsFs> {
    /// Applier for the running executable.
    #[must_use]
    pub fn new() -> Self {
        Self::with_fs(OsFs)
    }
}

impl Default for Applier<OsFs> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: SwapFs> Applier<F> {
    #[must_use]
    pub fn with_fs(fs: F) -> Self {
        Self {
            target: None,
            scratch_root: None,
            fs,
        }
    }

    /// Replace `path` instead of the running executable.
    #[must_use]
    pub fn with_target(mut self, path: impl Into<PathBuf>) -> Self {
        self.target = Some(path.into());
        self
    }

    /// Extract archives below `dir` instead of the system temp directory.
    #[must_use]
    pub fn with_scratch_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(dir.into());
        self
    }

    /// Install the binary contained in `payload`.
    ///
    /// # Errors
    /// See [`ApplyError`]. Every variant except
    /// [`ApplyError::CorruptState`] leaves the original binary in place.
    pub fn apply(&self, payload: &mut UpdatePayload) -> Result<(), ApplyError> {
        let format = payload.format();
        self.apply_with(payload, &format)
    }

    /// Install the binary from an archive stream unpacked by `extractor`.
    ///
    /// # Errors
    /// See [`ApplyError`].
    pub fn apply_with(
        &self,
        reader: &mut dyn Read,
        extractor: &dyn Extractor,
    ) -> Result<(), ApplyError> {
        let scratch = self.scratch_dir()?;
        extractor
            .extract(reader, scratch.path())
            .map_err(ApplyError::CouldNotExtract)?;

        let location = self.locate()?;
        let new_binary = scratch.path().join(&location.base_name);
        if !new_binary.is_file() {
            return Err(ApplyError::BinaryNotInArchive {
                name: location.base_name.to_string_lossy().into_owned(),
            });
        }

        self.swap(&new_binary, &location)
    }

    fn scratch_dir(&self) -> Result<TempDir, ApplyError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("selfup-update-");
        let dir = match &self.scratch_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        };
        dir.map_err(|error| {
            ApplyError::CouldNotExtract(ExtractError::io(
                "failed to create scratch directory",
                error,
            ))
        })
    }

    fn locate(&self) -> Result<ExecutableLocation, ApplyError> {
        match &self.target {
            Some(path) => ExecutableLocation::from_path(path),
            None => ExecutableLocation::current(),
        }
        .map_err(ApplyError::CouldNotLocateCurrent)
    }

    fn swap(&self, new_binary: &Path, location: &ExecutableLocation) -> Result<(), ApplyError> {
        let target = location.path();
        let staged = location.new_sidecar();
        let old = location.old_sidecar();
        let mut state = SwapState::default();

        info!("Replacing {} with {}", target.display(), new_binary.display());

        if let Err(source) = stage_new(new_binary, &target, &staged) {
            self.discard(&staged);
            return Err(ApplyError::CouldNotStageNew {
                path: staged,
                source,
            });
        }
        state.staged_new = true;
        debug!("Staged new binary at {}", staged.display());

        // Leftover from an earlier run; Windows refuses to rename onto it.
        self.discard(&old);

        if let Err(source) = self.fs.rename(&target, &old) {
            self.discard(&staged);
            return Err(ApplyError::CouldNotDisplaceCurrent {
                path: target,
                source,
            });
        }
        state.displaced_current = true;
        debug!("Moved current binary to {}", old.display());

        if let Err(install_error) = self.fs.rename(&staged, &target) {
            warn!("Install failed, restoring original binary: {install_error}");
            return Err(match self.unwind(&state, location) {
                Ok(()) => ApplyError::CouldNotInstallNew {
                    path: target,
                    source: install_error,
                },
                Err(rollback_error) => ApplyError::CorruptState {
                    path: target,
                    backup: old,
                    install_error,
                    rollback_error,
                },
            });
        }
        state.installed_new = true;

        match self.fs.remove_file(&old) {
            Ok(()) => state.removed_old = true,
            Err(error) => {
                // Windows keeps the image of a running process locked.
                warn!("Could not remove {}: {error}; hiding it", old.display());
                if let Err(error) = self.fs.hide(&old) {
                    warn!("Could not hide {}: {error}", old.display());
                }
            }
        }

        debug!("Swap finished: {state:?}");
        info!("Update applied to {}", target.display());
        Ok(())
    }

    fn unwind(&self, state: &SwapState, location: &ExecutableLocation) -> io::Result<()> {
        if state.installed_new {
            return Ok(());
        }
        if state.displaced_current {
            self.fs.rename(&location.old_sidecar(), &location.path())?;
            info!("Restored original binary at {}", location.path().display());
        }
        if state.staged_new {
            self.discard(&location.new_sidecar());
        }
        Ok(())
    }

    fn discard(&self, path: &Path) {
        if let Err(error) = self.fs.remove_file(path)
            && error.kind() != io::ErrorKind::NotFound
        {
            warn!("Could not remove {}: {error}", path.display());
        }
    }
}

fn stage_new(new_binary: &Path, target: &Path, staged: &Path) -> io::Result<()> {
    let permissions = std::fs::metadata(target)?.permissions();
    let mut source = File::open(new_binary)?;
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(staged)?;
    io::copy(&mut source, &mut file)?;
    file.sync_all()?;
    // Must be closed before the rename: some platforms refuse to move an open file.
    drop(file);
    std::fs::set_permissions(staged, permissions)
}
