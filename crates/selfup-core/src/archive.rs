use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use log::{debug, warn};
use selfup_resolver::ArchiveFormat;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("{context}: {source}")]
    Zip {
        context: &'static str,
        #[source]
        source: zip::result::ZipError,
    },
}

impl ExtractError {
    pub(crate) fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }

    fn zip(context: &'static str, source: zip::result::ZipError) -> Self {
        Self::Zip { context, source }
    }

    fn io_with_path(context: &'static str, path: &Path, source: &std::io::Error) -> Self {
        Self::io(
            context,
            std::io::Error::new(source.kind(), format!("{}: {source}", path.display())),
        )
    }
}

/// Unpacks an archive stream into a directory.
pub trait Extractor {
    /// # Errors
    /// Returns an error when the stream is not a readable archive of the
    /// expected kind or an entry cannot be written under `dest`.
    fn extract(&self, reader: &mut dyn Read, dest: &Path) -> Result<(), ExtractError>;
}

impl Extractor for ArchiveFormat {
    fn extract(&self, reader: &mut dyn Read, dest: &Path) -> Result<(), ExtractError> {
        std::fs::create_dir_all(dest).map_err(|error| {
            ExtractError::io_with_path("failed to create extraction directory", dest, &error)
        })?;
        match self {
            ArchiveFormat::TarGz => extract_tar_gz(reader, dest),
            ArchiveFormat::Zip => extract_zip(reader, dest),
        }
    }
}

fn extract_tar_gz(reader: &mut dyn Read, dest: &Path) -> Result<(), ExtractError> {
    let gz = flate2::read::GzDecoder::new(reader);
    let mut archive = tar::Archive::new(gz);

    let entries = archive
        .entries()
        .map_err(|error| ExtractError::io("failed to read tar entries", error))?;
    for entry in entries {
        let mut entry =
            entry.map_err(|error| ExtractError::io("failed to read tar entry", error))?;
        let unpacked = entry.unpack_in(dest).map_err(|error| {
            ExtractError::io_with_path("failed to extract archive entry", dest, &error)
        })?;
        if !unpacked {
            warn!("Skipping tar entry with unsafe path");
        }
    }

    debug!("Extraction complete to {}", dest.display());
    Ok(())
}

fn extract_zip(reader: &mut dyn Read, dest: &Path) -> Result<(), ExtractError> {
    // ZipArchive needs random access, so spool the stream first.
    let mut spool = tempfile::tempfile()
        .map_err(|error| ExtractError::io("failed to create zip spool file", error))?;
    std::io::copy(reader, &mut spool)
        .map_err(|error| ExtractError::io("failed to read zip stream", error))?;
    spool
        .seek(SeekFrom::Start(0))
        .map_err(|error| ExtractError::io("failed to rewind zip spool file", error))?;

    let mut archive = zip::ZipArchive::new(spool)
        .map_err(|error| ExtractError::zip("failed to read zip archive", error))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|error| ExtractError::zip("failed to read zip entry", error))?;
        let Some(name) = entry.enclosed_name() else {
            warn!("Skipping zip entry with unsafe path");
            continue;
        };
        let out_path = dest.join(name);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|error| {
                ExtractError::io_with_path(
                    "failed to create extraction directory",
                    &out_path,
                    &error,
                )
            })?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                ExtractError::io_with_path(
                    "failed to create extraction parent directory",
                    parent,
                    &error,
                )
            })?;
        }
        let mut outfile = std::fs::File::create(&out_path).map_err(|error| {
            ExtractError::io_with_path("failed to create extracted file", &out_path, &error)
        })?;
        std::io::copy(&mut entry, &mut outfile).map_err(|error| {
            ExtractError::io_with_path("failed to extract archive entry", &out_path, &error)
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode()
                && let Err(error) =
                    std::fs::set_permissions(&out_path, std::fs::Permissions::from_mode(mode))
            {
                warn!("Could not set mode {mode:o} on {}: {error}", out_path.display());
            }
        }
    }

    debug!("Extraction complete to {}", dest.display());
    Ok(())
}
