use selfup_platform::{Arch, PlatformTarget};
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::types::{AssetDescriptor, ReleaseDescriptor};

/// How a release tag is compared with the running version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VersionPolicy {
    /// Any tag that is not byte-for-byte the running version is an update.
    #[default]
    ExactMatch,
    /// Only a semantically newer tag is an update. Tags that do not parse as
    /// versions fall back to inequality.
    NewerSemver,
}

#[must_use]
pub fn is_update_available(policy: VersionPolicy, latest_tag: &str, current: &str) -> bool {
    match policy {
        VersionPolicy::ExactMatch => latest_tag != current,
        VersionPolicy::NewerSemver => is_newer_version(latest_tag, current),
    }
}

fn is_newer_version(latest: &str, current: &str) -> bool {
    match (parse_semver(latest), parse_semver(current)) {
        (Some(latest), Some(current)) => latest > current,
        _ => latest != current,
    }
}

fn parse_semver(version: &str) -> Option<Version> {
    let version = version.strip_prefix('v').unwrap_or(version);
    if let Ok(parsed) = Version::parse(version) {
        return Some(parsed);
    }

    let suffix_idx = version.find(['-', '+']).unwrap_or(version.len());
    let (core, suffix) = version.split_at(suffix_idx);
    let mut parts = core.split('.');
    let major = parts.next()?.parse::<u64>().ok()?;
    let minor = parts.next().map(str::parse::<u64>).transpose().ok()?;
    let patch = parts.next().map(str::parse::<u64>).transpose().ok()?;

    if parts.next().is_some() {
        return None;
    }

    let normalized = match (minor, patch) {
        (None, _) => format!("{major}.0.0{suffix}"),
        (Some(minor), None) => format!("{major}.{minor}.0{suffix}"),
        (Some(minor), Some(patch)) => format!("{major}.{minor}.{patch}{suffix}"),
    };

    Version::parse(&normalized).ok()
}

/// Pick the release asset built for `target`.
///
/// The first asset (in listed order) naming both the host OS and the host
/// architecture wins. Failing that, the first asset naming the host OS and no
/// architecture at all is accepted. An asset built for another architecture is
/// never returned.
#[must_use]
pub fn select_asset<'a>(
    release: &'a ReleaseDescriptor,
    target: &PlatformTarget,
) -> Option<&'a AssetDescriptor> {
    let for_os = || {
        release
            .assets
            .iter()
            .filter(|asset| target.matches_os(&asset.name))
    };

    let selected = for_os()
        .find(|asset| target.matches_arch(&asset.name))
        .or_else(|| for_os().find(|asset| !Arch::is_named_in(&asset.name)));

    match selected {
        Some(asset) => log::debug!("Selected asset {} for {target}", asset.name),
        None => log::debug!(
            "No asset in {} matches {target} ({} candidates)",
            release.tag,
            release.assets.len()
        ),
    }
    selected
}
