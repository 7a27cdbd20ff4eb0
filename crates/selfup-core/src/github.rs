use std::future::Future;
use std::io::{Seek, SeekFrom};

use async_trait::async_trait;
use futures_util::StreamExt;
use log::{debug, info};
use selfup_platform::PlatformTarget;
use selfup_resolver::{
    ArchiveFormat, AssetDescriptor, ReleaseDescriptor, ResolutionError, ResolveRequest, Resolver,
    UpdateOutcome, UpdatePayload, VersionPolicy, is_update_available, select_asset,
};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("selfup/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubAsset {
    pub name: String,
    /// API URL; serves the raw bytes when asked for `application/octet-stream`.
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub browser_download_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRelease {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<GitHubAsset>,
}

impl From<GitHubRelease> for ReleaseDescriptor {
    fn from(release: GitHubRelease) -> Self {
        Self {
            tag: release.tag_name,
            assets: release
                .assets
                .into_iter()
                .map(|asset| AssetDescriptor {
                    fetch_locator: if asset.url.is_empty() {
                        asset.browser_download_url
                    } else {
                        asset.url
                    },
                    name: asset.name,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GithubOptions {
    pub owner: String,
    pub repo: String,
    pub token: Option<String>,
    /// Private repositories cannot be queried without a token.
    pub private: bool,
    pub api_base: String,
    pub version_policy: VersionPolicy,
}

impl GithubOptions {
    #[must_use]
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            token: None,
            private: false,
            api_base: DEFAULT_API_BASE.to_string(),
            version_policy: VersionPolicy::default(),
        }
    }
}

/// Resolves updates from the latest release of a GitHub repository.
pub struct GithubResolver {
    client: reqwest::Client,
    owner: String,
    repo: String,
    token: Option<String>,
    api_base: String,
    version_policy: VersionPolicy,
    target: PlatformTarget,
}

impl GithubResolver {
    /// # Errors
    /// Returns [`ResolutionError::InvalidConfig`] when the repository
    /// coordinates are empty and [`ResolutionError::MissingToken`] when a
    /// private repository is configured without a token.
    pub fn new(client: reqwest::Client, options: GithubOptions) -> Result<Self, ResolutionError> {
        if options.owner.trim().is_empty() || options.repo.trim().is_empty() {
            return Err(ResolutionError::InvalidConfig(
                "github owner and repo must both be set".to_string(),
            ));
        }

        let token = options.token.filter(|token| !token.trim().is_empty());
        if options.private && token.is_none() {
            return Err(ResolutionError::MissingToken {
                source_name: "github",
            });
        }

        Ok(Self {
            client,
            owner: options.owner,
            repo: options.repo,
            token,
            api_base: options.api_base.trim_end_matches('/').to_string(),
            version_policy: options.version_policy,
            target: PlatformTarget::current(),
        })
    }

    /// Select assets for `target` instead of the host platform.
    #[must_use]
    pub fn with_target(mut self, target: PlatformTarget) -> Self {
        self.target = target;
        self
    }

    /// Fetch the latest published release.
    ///
    /// # Errors
    /// Returns an error when the request fails, GitHub answers with a non-2xx
    /// status, or the body is not a release document.
    pub async fn latest_release(
        &self,
        cancel: Option<&CancellationToken>,
    ) -> Result<ReleaseDescriptor, ResolutionError> {
        let url = format!(
            "{}/repos/{}/{}/releases/latest",
            self.api_base, self.owner, self.repo
        );
        debug!("Fetching latest release from {url}");

        let mut request = self
            .client
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = cancellable(cancel, request.send())
            .await?
            .map_err(ResolutionError::metadata_request_from)?;

        if !response.status().is_success() {
            let status = response.status();
            let body_snippet = cancellable(cancel, response.text())
                .await?
                .ok()
                .map(|body| response_snippet(&body, 160))
                .unwrap_or_default();
            return Err(ResolutionError::MetadataStatus {
                status: status.as_u16(),
                body_snippet,
            });
        }

        let release: GitHubRelease = cancellable(cancel, response.json())
            .await?
            .map_err(ResolutionError::metadata_parse_from)?;
        Ok(release.into())
    }

    fn download_url(&self, asset: &AssetDescriptor) -> Result<reqwest::Url, ResolutionError> {
        let mut url = reqwest::Url::parse(&asset.fetch_locator).map_err(|error| {
            ResolutionError::InvalidLocator {
                locator: asset.fetch_locator.clone(),
                details: error.to_string(),
            }
        })?;
        if let Some(token) = &self.token {
            url.query_pairs_mut().append_pair("access_token", token);
        }
        Ok(url)
    }

    async fn download(
        &self,
        asset: &AssetDescriptor,
        cancel: Option<&CancellationToken>,
    ) -> Result<UpdatePayload, ResolutionError> {
        let url = self.download_url(asset)?;

        let mut request = self
            .client
            .get(url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/octet-stream");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = cancellable(cancel, request.send())
            .await?
            .map_err(|error| ResolutionError::download_from(&asset.name, error))?;

        if !response.status().is_success() {
            return Err(ResolutionError::DownloadStatus {
                asset: asset.name.clone(),
                status: response.status().as_u16(),
            });
        }

        let spool = tempfile::tempfile()
            .map_err(|error| ResolutionError::spool("failed to create download file", error))?;
        let mut file = tokio::fs::File::from_std(spool);
        let mut downloaded: u64 = 0;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = cancellable(cancel, stream.next()).await? {
            let chunk = chunk.map_err(|error| ResolutionError::download_from(&asset.name, error))?;
            file.write_all(&chunk)
                .await
                .map_err(|error| ResolutionError::spool("failed to write download data", error))?;
            downloaded += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|error| ResolutionError::spool("failed to flush download file", error))?;

        let mut spool = file.into_std().await;
        spool
            .seek(SeekFrom::Start(0))
            .map_err(|error| ResolutionError::spool("failed to rewind download file", error))?;

        info!("Downloaded {}: {downloaded} bytes", asset.name);
        Ok(UpdatePayload::new(
            Box::new(spool),
            ArchiveFormat::from_asset_name(&asset.name),
            asset.name.clone(),
        ))
    }
}

#[async_trait]
impl Resolver for GithubResolver {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn resolve(&self, request: &ResolveRequest) -> Result<UpdateOutcome, ResolutionError> {
        if request.is_cancelled() {
            return Err(ResolutionError::Cancelled);
        }
        let cancel = request.cancel.as_ref();
        let release = self.latest_release(cancel).await?;

        if !is_update_available(self.version_policy, &release.tag, &request.current_version) {
            info!("Already up to date ({})", request.current_version);
            return Ok(UpdateOutcome::NoUpdateAvailable);
        }

        let asset = select_asset(&release, &self.target).ok_or_else(|| {
            ResolutionError::AssetNotFound {
                tag: release.tag.clone(),
                target: self.target,
            }
        })?;
        info!(
            "Update available: {} -> {} ({})",
            request.current_version, release.tag, asset.name
        );

        self.download(asset, cancel)
            .await
            .map(UpdateOutcome::Update)
    }
}

async fn cancellable<F: Future>(
    cancel: Option<&CancellationToken>,
    future: F,
) -> Result<F::Output, ResolutionError> {
    match cancel {
        Some(token) => tokio::select! {
            biased;
            () = token.cancelled() => Err(ResolutionError::Cancelled),
            output = future => Ok(output),
        },
        None => Ok(future.await),
    }
}

fn response_snippet(body: &str, max_chars: usize) -> String {
    let snippet: String = body.chars().take(max_chars).collect();
    if snippet.is_empty() {
        String::new()
    } else {
        format!(": {snippet}")
    }
}
