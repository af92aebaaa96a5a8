//! Filesystem locations under the hangar home directory.

use dirs::home_dir;
use std::path::PathBuf;

/// Environment variable overriding the hangar home directory.
pub const HOME_ENV: &str = "HANGAR_HOME";

/// Returns the hangar home directory, or None if the user's home cannot be resolved.
pub fn try_hangar_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var(HOME_ENV) {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".hangar"))
}

/// `SQLite` database path: ~/.hangar/state.db
pub fn db_path(home: &std::path::Path) -> PathBuf {
    home.join("state.db")
}

/// Settings path: ~/.hangar/settings.toml
pub fn settings_path(home: &std::path::Path) -> PathBuf {
    home.join("settings.toml")
}

/// Scratch space for downloads and extraction: ~/.hangar/tmp
pub fn tmp_path(home: &std::path::Path) -> PathBuf {
    home.join("tmp")
}

/// Default game directory: `<downloads>/KSPMods`, falling back to the home directory.
pub fn default_game_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(home_dir)
        .unwrap_or_default()
        .join("KSPMods")
}
