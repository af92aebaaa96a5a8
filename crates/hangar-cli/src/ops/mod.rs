//! Operations shared by the commands.

pub mod context;
pub mod error;
pub mod install;
pub mod remove;
pub mod resolve;

pub use context::{Context, Overrides};
pub use error::{InstallError, ResolutionError};
pub use install::{BatchReport, FailurePolicy, InstallExecutor, InstallPhase, ModFailure};
pub use remove::{RemoveReport, remove_mods};
pub use resolve::ResolverHandle;
