//! Shared command context.
//!
//! Groups the state every command needs: the hangar home, the effective
//! settings, the install-record actor and the reporter.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use hangar_core::{Reporter, Settings, settings_path, try_hangar_home};

use crate::store::{DbHandle, StateDb};

/// Command-line overrides applied on top of `settings.toml`.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub game_dir: Option<PathBuf>,
    pub game_version: Option<String>,
}

impl Overrides {
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(dir) = &self.game_dir {
            settings.game.dir.clone_from(dir);
        }
        if let Some(version) = &self.game_version {
            settings.game.version.clone_from(version);
        }
    }
}

#[derive(Clone)]
pub struct Context {
    pub home: PathBuf,
    pub settings: Settings,
    pub db: DbHandle,
    pub reporter: Arc<dyn Reporter>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("home", &self.home)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Context {
    pub fn new(home: PathBuf, settings: Settings, db: DbHandle, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            home,
            settings,
            db,
            reporter,
        }
    }

    /// Resolve the hangar home, load settings and start the database actor.
    pub async fn load(overrides: &Overrides, reporter: Arc<dyn Reporter>) -> Result<Self> {
        let home = home_dir()?;
        let mut settings = Settings::load(&settings_path(&home)).await?;
        overrides.apply(&mut settings);

        let db = DbHandle::spawn(&home).context("Failed to open state database")?;
        Ok(Self::new(home, settings, db, reporter))
    }

    /// A fresh catalog connection, independent of the actor.
    pub fn open_catalog(&self) -> Result<StateDb> {
        StateDb::open(&self.home).context("Failed to open state database")
    }
}

/// The hangar home directory, or an error if none can be determined.
pub fn home_dir() -> Result<PathBuf> {
    try_hangar_home().context("Could not determine home directory; set HANGAR_HOME")
}
