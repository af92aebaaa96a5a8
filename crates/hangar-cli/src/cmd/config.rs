//! Config command

use anyhow::Result;
use hangar_core::{Settings, settings_path};

use crate::ops::Overrides;
use crate::ops::context::home_dir;
use crate::ui::list::print_field;

/// Settings changes requested on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigChanges {
    pub overrides: Overrides,
    pub repository_url: Option<String>,
    pub resolve_timeout: Option<u64>,
    pub clean_on_failure: Option<bool>,
}

impl ConfigChanges {
    /// Apply to `settings`; returns whether anything was requested.
    pub fn apply(&self, settings: &mut Settings) -> bool {
        self.overrides.apply(settings);
        if let Some(url) = &self.repository_url {
            settings.repository.url.clone_from(url);
        }
        if let Some(secs) = self.resolve_timeout {
            settings.install.resolve_timeout_secs = secs;
        }
        if let Some(clean) = self.clean_on_failure {
            settings.install.clean_on_failure = clean;
        }

        self.overrides.game_dir.is_some()
            || self.overrides.game_version.is_some()
            || self.repository_url.is_some()
            || self.resolve_timeout.is_some()
            || self.clean_on_failure.is_some()
    }
}

/// Persist any requested changes, then print the effective settings
pub async fn config(changes: &ConfigChanges) -> Result<()> {
    let path = settings_path(&home_dir()?);
    let mut settings = Settings::load(&path).await?;

    if changes.apply(&mut settings) {
        settings.save(&path).await?;
        println!("  Saved {}", path.display());
    }

    println!();
    print_field("game dir", &settings.game.dir.display().to_string());
    print_field("game version", &settings.game.version);
    print_field("repository", &settings.repository.url);
    print_field("timeout", &format!("{}s", settings.install.resolve_timeout_secs));
    print_field("clean", &settings.install.clean_on_failure.to_string());
    println!();
    Ok(())
}
