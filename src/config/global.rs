//! Global (user-level) configuration.
//!
//! The configuration lives in the binpm home folder:
//!
//! - **Unix/macOS**: `~/.binpm/config.toml`
//! - **Windows**: `%LOCALAPPDATA%\binpm\config.toml`
//! - **Override**: `BINPM_HOME` replaces the home folder
//!
//! ```toml
//! # Track recipe revisions when looking binaries up
//! revisions_enabled = true
//!
//! # Where the package cache lives (default: {home}/data)
//! storage_path = "/var/cache/binpm"
//!
//! # Remote registry file (default: {home}/registry.json)
//! registry_path = "/etc/binpm/registry.json"
//! ```
//!
//! `BINPM_REVISIONS_ENABLED=1` (or `true`) enables revisions regardless of
//! the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Environment variable replacing the home folder.
pub const HOME_ENV: &str = "BINPM_HOME";

/// Environment variable enabling recipe revisions.
pub const REVISIONS_ENV: &str = "BINPM_REVISIONS_ENABLED";

/// Global configuration for binpm.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Whether recipe revisions are tracked.
    #[serde(default)]
    pub revisions_enabled: bool,

    /// Package cache root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<PathBuf>,

    /// Remote registry file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_path: Option<PathBuf>,
}

impl GlobalConfig {
    /// Loads the configuration from `path`, or from the default location when
    /// `None`. A missing file yields the default configuration. Environment
    /// overrides are applied on top.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };
        let config = if path.exists() {
            Self::load_from(&path).await?
        } else {
            Self::default()
        };
        Ok(config.with_env_overrides())
    }

    /// Loads the configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read global config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse global config from {}", path.display()))
    }

    /// Saves the configuration, creating parent folders as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize global config")?;

        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write global config to {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let mut perms = fs::metadata(path)
                .await
                .with_context(|| format!("Failed to read permissions for {}", path.display()))?
                .permissions();
            perms.set_mode(0o600);
            fs::set_permissions(path, perms).await.with_context(|| {
                format!("Failed to set secure permissions on {}", path.display())
            })?;
        }

        Ok(())
    }

    /// The binpm home folder.
    ///
    /// # Errors
    ///
    /// Returns an error if the home (or local data) directory cannot be
    /// determined and `BINPM_HOME` is not set.
    pub fn home_dir() -> Result<PathBuf> {
        if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(home));
        }
        let home = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("binpm")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".binpm")
        };
        Ok(home)
    }

    /// Default configuration file path.
    ///
    /// # Errors
    ///
    /// See [`GlobalConfig::home_dir`].
    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::home_dir()?.join("config.toml"))
    }

    /// Package cache root, defaulting to `{home}/data`.
    pub fn storage_path(&self, home: &Path) -> PathBuf {
        self.storage_path.clone().unwrap_or_else(|| home.join("data"))
    }

    /// Registry file, defaulting to `{home}/registry.json`.
    pub fn registry_path(&self, home: &Path) -> PathBuf {
        self.registry_path.clone().unwrap_or_else(|| home.join("registry.json"))
    }

    /// Applies environment overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        self.apply_revisions_override(std::env::var(REVISIONS_ENV).ok().as_deref());
        self
    }

    fn apply_revisions_override(&mut self, value: Option<&str>) {
        if let Some(value) = value {
            self.revisions_enabled = is_truthy(value);
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true")
}
