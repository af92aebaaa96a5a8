//! Core library for hangar.
//!
//! Everything here is independent of the terminal and of the state database:
//! compatibility checks, catalog reduction, dependency resolution, install
//! planning, and the download/extract primitives the executor drives.

pub mod catalog;
pub mod compat;
pub mod config;
pub mod flatten;
pub mod io;
pub mod paths;
pub mod planner;
pub mod repo;
pub mod reporter;
pub mod resolver;

pub use catalog::{CatalogError, CatalogStore, MemoryCatalog, ModFilter, latest_per_identifier};
pub use compat::is_compatible;
pub use config::Settings;
pub use flatten::{Flattened, Selections, flatten};
pub use paths::*;
pub use planner::{PlanError, PlannedCopy, plan_install};
pub use reporter::{NullReporter, Reporter};
pub use resolver::{
    DependencyChoice, DependencyNode, DependencyResolution, Encountered, ResolveError,
    build_tree, candidates_for, resolve_dependencies,
};

/// User Agent string for core operations
pub const USER_AGENT: &str = concat!("hangar-core/", env!("CARGO_PKG_VERSION"));
