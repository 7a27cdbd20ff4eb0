use selfup_platform::PlatformTarget;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("Invalid resolver configuration: {0}")]
    InvalidConfig(String),

    #[error("To check for updates you must provide a {source_name} token")]
    MissingToken { source_name: &'static str },

    #[error("Could not fetch release metadata ({stage}): {details}")]
    Metadata { stage: NetworkStage, details: String },

    #[error("Release metadata request failed with HTTP {status}{body_snippet}")]
    MetadataStatus { status: u16, body_snippet: String },

    #[error("No asset for {target} in release {tag}")]
    AssetNotFound { tag: String, target: PlatformTarget },

    #[error("Invalid fetch locator '{locator}': {details}")]
    InvalidLocator { locator: String, details: String },

    #[error("Could not download {asset}: {details}")]
    Download { asset: String, details: String },

    #[error("Download of {asset} failed with HTTP {status}")]
    DownloadStatus { asset: String, status: u16 },

    #[error("{context}: {source}")]
    Spool {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Update check was cancelled")]
    Cancelled,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStage {
    #[error("request")]
    Request,
    #[error("response parse")]
    ResponseParse,
}

impl ResolutionError {
    #[must_use]
    pub fn metadata_request_from<E>(error: E) -> Self
    where
        E: std::fmt::Display,
    {
        Self::Metadata {
            stage: NetworkStage::Request,
            details: error.to_string(),
        }
    }

    #[must_use]
    pub fn metadata_parse_from<E>(error: E) -> Self
    where
        E: std::fmt::Display,
    {
        Self::Metadata {
            stage: NetworkStage::ResponseParse,
            details: error.to_string(),
        }
    }

    #[must_use]
    pub fn download_from<E>(asset: impl Into<String>, error: E) -> Self
    where
        E: std::fmt::Display,
    {
        Self::Download {
            asset: asset.into(),
            details: error.to_string(),
        }
    }

    #[must_use]
    pub fn spool(context: &'static str, source: std::io::Error) -> Self {
        Self::Spool { context, source }
    }
}
