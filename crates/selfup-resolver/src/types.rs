use std::fmt;
use std::io::Read;

use tokio_util::sync::CancellationToken;

/// Latest release as reported by a release source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseDescriptor {
    pub tag: String,
    pub assets: Vec<AssetDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDescriptor {
    pub name: String,
    /// URL or path the asset bytes are fetched from.
    pub fetch_locator: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchiveFormat {
    #[default]
    TarGz,
    Zip,
}

impl ArchiveFormat {
    /// Guess the archive format from an asset file name. Anything that is not
    /// a `.zip` is treated as gzip-compressed tar.
    #[must_use]
    pub fn from_asset_name(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".zip") {
            Self::Zip
        } else {
            Self::TarGz
        }
    }
}

/// Archive bytes of an available update.
///
/// Dropping the payload closes the underlying stream.
pub struct UpdatePayload {
    reader: Box<dyn Read + Send>,
    format: ArchiveFormat,
    asset_name: String,
}

impl UpdatePayload {
    #[must_use]
    pub fn new(
        reader: Box<dyn Read + Send>,
        format: ArchiveFormat,
        asset_name: impl Into<String>,
    ) -> Self {
        Self {
            reader,
            format,
            asset_name: asset_name.into(),
        }
    }

    /// Payload backed by an in-memory archive, format guessed from the name.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>, asset_name: &str) -> Self {
        Self::new(
            Box::new(std::io::Cursor::new(bytes)),
            ArchiveFormat::from_asset_name(asset_name),
            asset_name,
        )
    }

    #[must_use]
    pub fn format(&self) -> ArchiveFormat {
        self.format
    }

    #[must_use]
    pub fn asset_name(&self) -> &str {
        &self.asset_name
    }
}

impl Read for UpdatePayload {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.read(buf)
    }
}

impl fmt::Debug for UpdatePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdatePayload")
            .field("format", &self.format)
            .field("asset_name", &self.asset_name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub enum UpdateOutcome {
    NoUpdateAvailable,
    Update(UpdatePayload),
}

impl UpdateOutcome {
    #[must_use]
    pub fn is_update(&self) -> bool {
        matches!(self, Self::Update(_))
    }
}

/// Input of a single resolution.
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    pub current_version: String,
    pub cancel: Option<CancellationToken>,
}

impl ResolveRequest {
    #[must_use]
    pub fn new(current_version: impl Into<String>) -> Self {
        Self {
            current_version: current_version.into(),
            cancel: None,
        }
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read as _;

    use tokio_util::sync::CancellationToken;

    use super::{ArchiveFormat, ResolveRequest, UpdateOutcome, UpdatePayload};

    #[test]
    fn archive_format_is_guessed_from_extension() {
        assert_eq!(
            ArchiveFormat::from_asset_name("tool-windows-x64.ZIP"),
            ArchiveFormat::Zip
        );
        assert_eq!(
            ArchiveFormat::from_asset_name("tool-linux-x86_64.tar.gz"),
            ArchiveFormat::TarGz
        );
        assert_eq!(
            ArchiveFormat::from_asset_name("tool-linux-x86_64.tgz"),
            ArchiveFormat::TarGz
        );
    }

    #[test]
    fn payload_reads_through_to_inner_stream() {
        let mut payload = UpdatePayload::from_bytes(b"archive".to_vec(), "tool-linux.tar.gz");
        let mut contents = Vec::new();
        payload
            .read_to_end(&mut contents)
            .expect("in-memory payload should be readable");

        assert_eq!(contents, b"archive");
        assert_eq!(payload.asset_name(), "tool-linux.tar.gz");
        assert!(UpdateOutcome::Update(payload).is_update());
        assert!(!UpdateOutcome::NoUpdateAvailable.is_update());
    }

    #[test]
    fn request_reports_cancellation() {
        let token = CancellationToken::new();
        let request = ResolveRequest::new("v1.2.3").with_cancel(token.clone());
        assert!(!request.is_cancelled());

        token.cancel();
        assert!(request.is_cancelled());
        assert!(!ResolveRequest::new("v1.2.3").is_cancelled());
    }
}
