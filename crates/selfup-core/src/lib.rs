//! Self-update engine for selfup.
//!
//! This crate drives one check-and-apply cycle:
//! - [`GithubResolver`] finds and downloads the latest release asset.
//! - [`Extractor`] unpacks the downloaded archive.
//! - [`Applier`] swaps the executable on disk with rollback on failure.
//! - [`run_update_cycle`] ties the three together.

mod apply;
mod archive;
mod cycle;
mod github;

/// Executable swap with `.new`/`.old` sidecars and rollback.
pub use apply::{Applier, ApplyError, OsFs, SwapFs, SwapState};
/// Archive unpacking behind a small trait.
pub use archive::{ExtractError, Extractor};
/// One check-and-apply cycle.
pub use cycle::{UpdateCycleError, run_update_cycle, run_update_cycle_with};
/// GitHub releases as an update source.
pub use github::{DEFAULT_API_BASE, GitHubAsset, GitHubRelease, GithubOptions, GithubResolver};
