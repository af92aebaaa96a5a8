//! hangar - a mod manager for Kerbal Space Program
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_panics_doc)]
//!
//! Refreshes a catalog of mods from a repository bundle, resolves a mod's
//! dependency tree against the configured game version, and copies the chosen
//! mods into the game directory.
//!
//! # Architecture
//!
//! - **Actor Pattern**: Install records are serialized through `DbHandle`;
//!   dependency resolution runs on its own thread behind `ResolverHandle`.
//! - **Newtypes**: `ModId` (`identifier---version`) keys catalog entries and
//!   install records alike.
//!
//! # Directory Layout
//!
//! ```text
//! ~/.hangar/
//! ├── settings.toml  # Game directory, game version, repository URL
//! ├── state.db       # SQLite: catalog and install records
//! └── tmp/           # Scratch space for downloads
//! ```

pub mod cmd;
pub mod ops;
pub mod store;
pub mod ui;

pub use crate::store::{DbHandle, StateDb};

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::ops::Overrides;

#[derive(Debug, Parser)]
#[command(name = "hangar")]
#[command(author, version, about = "hangar - a mod manager for Kerbal Space Program")]
pub struct Cli {
    /// Game directory to install into
    #[arg(long, global = true, env = "HANGAR_GAME_DIR")]
    pub game_dir: Option<PathBuf>,

    /// Game version used for compatibility checks
    #[arg(long, global = true, env = "HANGAR_GAME_VERSION")]
    pub game_version: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            game_dir: self.game_dir.clone(),
            game_version: self.game_version.clone(),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Refresh the mod catalog from the repository
    Update {
        /// Repository bundle URL (defaults to the configured one)
        #[arg(long)]
        url: Option<String>,
    },
    /// List mods compatible with the game version
    List {
        /// Show every version, compatible or not
        #[arg(long, short = 'a', conflicts_with = "installed")]
        all: bool,
        /// Show install records instead of the catalog
        #[arg(long, short = 'i')]
        installed: bool,
    },
    /// Show details for a mod
    Info {
        /// Identifier or identifier---version
        #[arg(value_name = "MOD")]
        reference: String,
    },
    /// Install a mod and its dependencies
    Install {
        /// Identifier or identifier---version
        #[arg(value_name = "MOD")]
        reference: String,
        /// Pick a provider for a dependency: NAME=identifier---version
        #[arg(long = "choose", value_name = "DEP=ID")]
        choose: Vec<String>,
        /// Skip prompts; fail if a dependency has several candidates
        #[arg(long, short = 'y')]
        yes: bool,
        /// Delete copied files of a mod that fails to install
        #[arg(long)]
        clean_on_failure: bool,
    },
    /// Remove installed mods
    Remove {
        /// Identifiers or identifier---version ids
        #[arg(required = true, value_name = "MOD")]
        mods: Vec<String>,
        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Show settings, catalog size and installs
    Status,
    /// Show or change settings; `--game-dir` and `--game-version` are saved too
    Config {
        /// Repository bundle URL
        #[arg(long, value_name = "URL")]
        repository_url: Option<String>,
        /// Seconds to wait for dependency resolution
        #[arg(long, value_name = "SECS")]
        resolve_timeout: Option<u64>,
        /// Keep or delete the files of a failed install
        #[arg(long, value_name = "BOOL")]
        clean_on_failure: Option<bool>,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}
