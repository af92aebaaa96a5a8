//! Wire types shared by the hangar crates.
//!
//! A [`ModRecord`] is one entry of the repository bundle. Records enter the
//! system only through [`ModRecord::from_json`], which rejects anything that
//! does not have the record shape.

pub mod record;
pub mod types;
pub mod version;

// Re-exports
pub use record::*;
pub use types::*;
pub use version::{CompareOptions, VersionOrdering, compare, is_newer};

/// Separator between identifier and version in a [`ModId`].
pub const ID_SEPARATOR: &str = "---";

/// Sentinel accepted in any version constraint field.
pub const ANY_VERSION: &str = "any";
