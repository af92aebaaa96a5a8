//! User settings (`settings.toml`).
//!
//! ```toml
//! [game]
//! dir = "/home/me/KSP"
//! version = "1.4.1"
//!
//! [repository]
//! url = "https://github.com/KSP-CKAN/CKAN-meta/archive/master.zip"
//!
//! [install]
//! clean_on_failure = false
//! resolve_timeout_secs = 30
//! ```
//!
//! Every key is optional; missing keys take their defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::paths::default_game_dir;

/// Game version assumed until the user sets one.
pub const DEFAULT_GAME_VERSION: &str = "1.4.1";

/// Repository bundle used until the user sets one.
pub const DEFAULT_REPOSITORY_URL: &str = "https://github.com/KSP-CKAN/CKAN-meta/archive/master.zip";

/// Contents of `settings.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    /// `[game]` table.
    pub game: GameSettings,
    /// `[repository]` table.
    pub repository: RepositorySettings,
    /// `[install]` table.
    pub install: InstallSettings,
}

/// Where the game lives and which version it runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    /// Game installation directory.
    pub dir: PathBuf,
    /// Version compatibility is checked against.
    pub version: String,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            dir: default_game_dir(),
            version: DEFAULT_GAME_VERSION.to_string(),
        }
    }
}

/// Where the catalog comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositorySettings {
    /// URL of the zipped repository bundle.
    pub url: String,
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_REPOSITORY_URL.to_string(),
        }
    }
}

/// Install behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallSettings {
    /// Delete the files a failed install already copied.
    pub clean_on_failure: bool,
    /// Seconds to wait for a dependency resolution.
    pub resolve_timeout_secs: u64,
}

impl Default for InstallSettings {
    fn default() -> Self {
        Self {
            clean_on_failure: false,
            resolve_timeout_secs: 30,
        }
    }
}

impl Settings {
    /// Load settings from `path`, or defaults if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load(path: &Path) -> Result<Self> {
        if !fs::try_exists(path).await.unwrap_or(false) {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Write settings to `path` atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or any filesystem step fails.
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create settings directory")?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize settings")?;

        let tmp = path.with_extension("toml.tmp");
        fs::write(&tmp, content)
            .await
            .context("Failed to write temporary settings file")?;
        fs::rename(&tmp, path)
            .await
            .context("Failed to replace settings file")?;
        Ok(())
    }

    /// Resolution timeout, never below one second.
    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.install.resolve_timeout_secs.max(1))
    }
}
