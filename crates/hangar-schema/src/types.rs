//! Identifier newtypes.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

use crate::ID_SEPARATOR;

/// Unique key of a catalog entry: `identifier---version`.
///
/// Identifiers are case-sensitive, so unlike package names nothing is
/// normalized here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModId(String);

impl ModId {
    /// Build the id for `identifier` at `version`.
    pub fn new(identifier: &str, version: &str) -> Self {
        Self(format!("{identifier}{ID_SEPARATOR}{version}"))
    }

    /// Wrap an already formatted id without validation.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Whether `s` has the `identifier---version` shape.
    pub fn looks_like_id(s: &str) -> bool {
        s.split_once(ID_SEPARATOR)
            .is_some_and(|(ident, version)| !ident.is_empty() && !version.is_empty())
    }

    /// The identifier half, or the whole id if it carries no separator.
    pub fn identifier(&self) -> &str {
        self.0
            .split_once(ID_SEPARATOR)
            .map_or(self.0.as_str(), |(ident, _)| ident)
    }

    /// The version half, if present.
    pub fn version(&self) -> Option<&str> {
        self.0.split_once(ID_SEPARATOR).map(|(_, version)| version)
    }

    /// Return the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ModId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for ModId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for ModId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ModId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for ModId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ModId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl From<&str> for ModId {
    fn from(s: &str) -> Self {
        Self::from_raw(s)
    }
}

impl From<String> for ModId {
    fn from(s: String) -> Self {
        Self::from_raw(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mod_id_parts() {
        let id = ModId::new("MechJeb2", "2.8.1.0");
        assert_eq!(id, "MechJeb2---2.8.1.0");
        assert_eq!(id.identifier(), "MechJeb2");
        assert_eq!(id.version(), Some("2.8.1.0"));
    }

    #[test]
    fn test_looks_like_id() {
        assert!(ModId::looks_like_id("A---1.0"));
        assert!(!ModId::looks_like_id("A"));
        assert!(!ModId::looks_like_id("---1.0"));
        assert!(!ModId::looks_like_id("A---"));
    }

    #[test]
    fn test_identifier_without_separator() {
        let id = ModId::from_raw("Kopernicus");
        assert_eq!(id.identifier(), "Kopernicus");
        assert_eq!(id.version(), None);
    }
}
