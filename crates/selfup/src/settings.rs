use std::path::{Path, PathBuf};

use selfup_core::{DEFAULT_API_BASE, GithubOptions};
use selfup_platform::AppPaths;
use selfup_resolver::VersionPolicy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("could not read settings file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub owner: String,

    #[serde(default)]
    pub repo: String,

    #[serde(default)]
    pub token: Option<String>,

    #[serde(default)]
    pub private: bool,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    #[serde(default)]
    pub version_policy: VersionPolicy,

    #[serde(default)]
    pub debug_logging: bool,

    #[serde(default = "default_max_log_size_bytes")]
    pub max_log_size_bytes: u64,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_http_timeout() -> u64 {
    30
}

fn default_max_log_size_bytes() -> u64 {
    5 * 1024 * 1024
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repo: String::new(),
            token: None,
            private: false,
            api_base: default_api_base(),
            http_timeout_secs: default_http_timeout(),
            version_policy: VersionPolicy::default(),
            debug_logging: false,
            max_log_size_bytes: default_max_log_size_bytes(),
        }
    }
}

impl Settings {
    /// # Errors
    /// See [`Settings::load_from`].
    pub fn load() -> Result<Self, SettingsError> {
        let Ok(paths) = AppPaths::new() else {
            return Ok(Self::default());
        };
        Self::load_from(&paths.settings_file())
    }

    /// A missing file yields defaults.
    ///
    /// # Errors
    /// Returns an error when the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn github_options(&self) -> GithubOptions {
        let mut options = GithubOptions::new(self.owner.clone(), self.repo.clone());
        options.token = self.token.clone().filter(|token| !token.is_empty());
        options.private = self.private;
        options.api_base.clone_from(&self.api_base);
        options.version_policy = self.version_policy;
        options
    }
}

#[cfg(test)]
mod tests {
    use selfup_resolver::VersionPolicy;

    use super::{Settings, SettingsError};

    #[test]
    fn missing_file_yields_defaults() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let settings = Settings::load_from(&temp_dir.path().join("settings.json"))
            .expect("missing file should not be an error");

        assert!(settings.owner.is_empty());
        assert_eq!(settings.api_base, "https://api.github.com");
        assert_eq!(settings.http_timeout_secs, 30);
        assert_eq!(settings.version_policy, VersionPolicy::ExactMatch);
    }

    #[test]
    fn partial_file_fills_remaining_fields_with_defaults() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let path = temp_dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{ "owner": "acme", "repo": "tool", "version_policy": "newer-semver" }"#,
        )
        .expect("settings file should be written");

        let settings = Settings::load_from(&path).expect("partial file should load");

        assert_eq!(settings.owner, "acme");
        assert_eq!(settings.repo, "tool");
        assert_eq!(settings.version_policy, VersionPolicy::NewerSemver);
        assert!(!settings.private);
        assert_eq!(settings.max_log_size_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn invalid_file_is_reported() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let path = temp_dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").expect("settings file should be written");

        let error = Settings::load_from(&path).expect_err("invalid json should be reported");

        assert!(matches!(error, SettingsError::Parse { .. }));
        assert!(error.to_string().contains("settings.json"));
    }

    #[test]
    fn unreadable_file_is_reported() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");

        let error = Settings::load_from(temp_dir.path())
            .expect_err("a directory should not read as a settings file");

        assert!(matches!(error, SettingsError::Read { .. }));
    }

    #[test]
    fn github_options_drop_empty_token() {
        let settings = Settings {
            owner: "acme".to_string(),
            repo: "tool".to_string(),
            token: Some(String::new()),
            private: true,
            ..Settings::default()
        };

        let options = settings.github_options();

        assert_eq!(options.owner, "acme");
        assert!(options.token.is_none());
        assert!(options.private);
    }
}
