//! Domain-specific errors for mod operations

use std::path::PathBuf;
use std::time::Duration;

use hangar_core::io::{DownloadError, ExtractError};
use hangar_core::{CatalogError, PlanError, ResolveError};
use hangar_schema::ModId;
use thiserror::Error;

use crate::store::DbError;

#[derive(Error, Debug)]
pub enum InstallError {
    #[error("Mod not found in catalog: {0}")]
    NotFound(ModId),

    #[error("Another install of {0} is in progress")]
    InProgress(ModId),

    #[error("Download failed: {0}")]
    Download(#[from] DownloadError),

    #[error("Archive error: {0}")]
    Archive(#[from] ExtractError),

    #[error("Install plan failed: {0}")]
    Plan(#[from] PlanError),

    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error("{context}: {message}")]
    Context {
        context: &'static str,
        message: String,
    },
}

impl InstallError {
    /// Create an error with context for better debugging.
    pub fn context(ctx: &'static str, msg: impl std::fmt::Display) -> Self {
        Self::Context {
            context: ctx,
            message: msg.to_string(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Why a dependency resolution produced no tree.
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Dependency resolution did not finish within {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Resolver stopped")]
    ActorDied,
}
