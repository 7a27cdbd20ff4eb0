use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use selfup_resolver::VersionPolicy;

use crate::settings::Settings;

#[derive(Debug, Parser)]
#[command(
    name = "selfup",
    version,
    about = "Replace an executable with the build published in the latest GitHub release"
)]
pub struct Cli {
    /// Repository owner (user or organization).
    #[arg(long)]
    pub owner: Option<String>,

    /// Repository name.
    #[arg(long)]
    pub repo: Option<String>,

    /// Access token for private repositories or higher rate limits.
    #[arg(long, env = "SELFUP_GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Treat the repository as private; a token becomes mandatory.
    #[arg(long)]
    pub private: bool,

    /// GitHub API base URL, for GitHub Enterprise or mirrors.
    #[arg(long)]
    pub api_base: Option<String>,

    /// Version tag of the executable being updated.
    #[arg(long, default_value = concat!("v", env!("CARGO_PKG_VERSION")))]
    pub current_version: String,

    /// Update this file instead of the running executable.
    #[arg(long)]
    pub target: Option<PathBuf>,

    /// How the latest tag is compared against the current version.
    #[arg(long, value_enum)]
    pub version_policy: Option<PolicyArg>,

    /// Read settings from this file instead of the user config directory.
    #[arg(long)]
    pub settings: Option<PathBuf>,

    #[arg(long, short)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    Exact,
    Semver,
}

impl From<PolicyArg> for VersionPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Exact => VersionPolicy::ExactMatch,
            PolicyArg::Semver => VersionPolicy::NewerSemver,
        }
    }
}

impl Cli {
    /// Flags given on the command line win over the settings file.
    pub fn override_settings(&self, settings: &mut Settings) {
        if let Some(owner) = &self.owner {
            settings.owner.clone_from(owner);
        }
        if let Some(repo) = &self.repo {
            settings.repo.clone_from(repo);
        }
        if let Some(token) = &self.token {
            settings.token = Some(token.clone());
        }
        if self.private {
            settings.private = true;
        }
        if let Some(api_base) = &self.api_base {
            settings.api_base.clone_from(api_base);
        }
        if let Some(policy) = self.version_policy {
            settings.version_policy = policy.into();
        }
        if self.verbose {
            settings.debug_logging = true;
        }
    }
}
