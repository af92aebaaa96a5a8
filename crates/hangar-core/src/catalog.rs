//! Catalog store contract and the per-identifier reducer.
//!
//! The resolver and the executor only ever see the catalog through
//! [`CatalogStore`]. The CLI backs it with SQLite; [`MemoryCatalog`] serves
//! tests and one-shot tooling.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use hangar_schema::{CompareOptions, ModId, ModRecord, VersionOrdering, compare};
use thiserror::Error;

/// Errors raised by a catalog backend.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The storage layer failed.
    #[error("Catalog backend error: {0}")]
    Backend(String),

    /// A stored record no longer deserializes.
    #[error("Stored record for {id} is corrupt: {reason}")]
    Corrupt {
        /// Id of the corrupt record.
        id: String,
        /// Why it failed to deserialize.
        reason: String,
    },
}

/// Query accepted by [`CatalogStore::find`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModFilter {
    /// Every record, ordered by display name.
    All,
    /// The record with this id.
    Id(ModId),
    /// Every version of an identifier.
    Identifier(String),
    /// Every record listing this name in `provides`.
    Provides(String),
}

impl ModFilter {
    /// `Id` for `identifier---version` shaped input, `Identifier` otherwise.
    pub fn parse(reference: &str) -> Self {
        if ModId::looks_like_id(reference) {
            Self::Id(ModId::from_raw(reference))
        } else {
            Self::Identifier(reference.to_string())
        }
    }

    /// Whether `record` satisfies the filter.
    pub fn matches(&self, record: &ModRecord) -> bool {
        match self {
            Self::All => true,
            Self::Id(id) => record.id() == *id,
            Self::Identifier(identifier) => record.identifier == *identifier,
            Self::Provides(name) => record.provides.iter().any(|p| p.name == *name),
        }
    }
}

impl std::fmt::Display for ModFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "*"),
            Self::Id(id) => write!(f, "{id}"),
            Self::Identifier(identifier) => write!(f, "{identifier}"),
            Self::Provides(name) => write!(f, "provides:{name}"),
        }
    }
}

/// Read/replace access to the mod catalog.
pub trait CatalogStore {
    /// All records matching `filter`.
    fn find(&self, filter: &ModFilter) -> Result<Vec<ModRecord>, CatalogError>;

    /// The first record matching `filter`.
    fn find_one(&self, filter: &ModFilter) -> Result<Option<ModRecord>, CatalogError> {
        Ok(self.find(filter)?.into_iter().next())
    }

    /// Atomically swap the whole catalog. Readers see the old or the new
    /// contents, never a mix.
    fn replace_all(&self, records: Vec<ModRecord>) -> Result<(), CatalogError>;
}

impl<T: CatalogStore + ?Sized> CatalogStore for Arc<T> {
    fn find(&self, filter: &ModFilter) -> Result<Vec<ModRecord>, CatalogError> {
        (**self).find(filter)
    }
    fn find_one(&self, filter: &ModFilter) -> Result<Option<ModRecord>, CatalogError> {
        (**self).find_one(filter)
    }
    fn replace_all(&self, records: Vec<ModRecord>) -> Result<(), CatalogError> {
        (**self).replace_all(records)
    }
}

/// In-process catalog. `replace_all` swaps an `Arc` snapshot under a write
/// lock, so concurrent readers keep the snapshot they started with.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    records: RwLock<Arc<Vec<ModRecord>>>,
}

impl MemoryCatalog {
    /// A catalog holding `records`, first duplicate id kept.
    pub fn new(records: Vec<ModRecord>) -> Self {
        let catalog = Self::default();
        catalog.swap(records);
        catalog
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Whether no record is stored.
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    fn snapshot(&self) -> Arc<Vec<ModRecord>> {
        Arc::clone(&self.records.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn swap(&self, records: Vec<ModRecord>) {
        let mut seen = HashSet::new();
        let mut unique: Vec<ModRecord> = records
            .into_iter()
            .filter(|record| seen.insert(record.id()))
            .collect();
        unique.sort_by(|a, b| a.display_name().cmp(b.display_name()));

        *self.records.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(unique);
    }
}

impl CatalogStore for MemoryCatalog {
    fn find(&self, filter: &ModFilter) -> Result<Vec<ModRecord>, CatalogError> {
        Ok(self
            .snapshot()
            .iter()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect())
    }

    fn replace_all(&self, records: Vec<ModRecord>) -> Result<(), CatalogError> {
        self.swap(records);
        Ok(())
    }
}

/// Reduce `records` to the highest version of each identifier.
///
/// The first record seen for an identifier is kept unless a later one is
/// strictly greater, so ties and incomparable versions keep the earlier
/// entry. Output follows the order identifiers were first seen.
pub fn latest_per_identifier(records: Vec<ModRecord>) -> Vec<ModRecord> {
    let mut latest: Vec<ModRecord> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();

    for record in records {
        match slots.get(&record.identifier) {
            Some(&slot) => {
                let newer = compare(
                    &record.version,
                    &latest[slot].version,
                    CompareOptions::default(),
                ) == VersionOrdering::Greater;
                if newer {
                    latest[slot] = record;
                }
            }
            None => {
                slots.insert(record.identifier.clone(), latest.len());
                latest.push(record);
            }
        }
    }

    latest
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use hangar_schema::Relationship;

    pub(crate) fn simple_record(identifier: &str, version: &str) -> ModRecord {
        serde_json::from_value(serde_json::json!({
            "identifier": identifier,
            "version": version,
            "download": format!("https://example.org/{identifier}-{version}.zip"),
        }))
        .unwrap()
    }

    #[test]
    fn test_latest_per_identifier() {
        let reduced = latest_per_identifier(vec![
            simple_record("A", "1.0"),
            simple_record("B", "0.1"),
            simple_record("A", "1.10"),
            simple_record("A", "1.2"),
        ]);
        let ids: Vec<_> = reduced.iter().map(|r| r.id().to_string()).collect();
        assert_eq!(ids, vec!["A---1.10", "B---0.1"]);
    }

    #[test]
    fn test_latest_keeps_first_on_tie_or_incomparable() {
        let mut first = simple_record("A", "1.0");
        first.name = Some("first".into());
        let reduced = latest_per_identifier(vec![
            first,
            simple_record("A", "v1.0"),
            simple_record("A", "1.x"),
        ]);
        assert_eq!(reduced.len(), 1);
        assert_eq!(reduced[0].name.as_deref(), Some("first"));
    }

    #[test]
    fn test_memory_catalog_filters() {
        let mut provider = simple_record("RealFuels", "12.0");
        provider.provides = vec![Relationship::new("FuelSystem")];
        let catalog = MemoryCatalog::new(vec![
            simple_record("B", "1.0"),
            provider,
            simple_record("A", "1.0"),
            simple_record("A", "2.0"),
        ]);

        let all: Vec<_> = catalog
            .find(&ModFilter::All)
            .unwrap()
            .into_iter()
            .map(|r| r.identifier)
            .collect();
        assert_eq!(all, vec!["A", "A", "B", "RealFuels"]);

        assert_eq!(catalog.find(&ModFilter::Identifier("A".into())).unwrap().len(), 2);
        assert_eq!(
            catalog
                .find(&ModFilter::Provides("FuelSystem".into()))
                .unwrap()[0]
                .identifier,
            "RealFuels"
        );
        let one = catalog.find_one(&ModFilter::parse("A---2.0")).unwrap().unwrap();
        assert_eq!(one.version, "2.0");
        assert!(catalog.find_one(&ModFilter::parse("Z")).unwrap().is_none());
    }

    #[test]
    fn test_memory_catalog_replace_all() {
        let catalog = MemoryCatalog::new(vec![simple_record("A", "1.0")]);
        let before = catalog.snapshot();

        catalog
            .replace_all(vec![simple_record("B", "1.0"), simple_record("B", "1.0")])
            .unwrap();

        assert_eq!(before.len(), 1);
        assert_eq!(before[0].identifier, "A");
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.find(&ModFilter::All).unwrap()[0].identifier, "B");
    }

    #[test]
    fn test_filter_parse() {
        assert_eq!(
            ModFilter::parse("A---1.0"),
            ModFilter::Id(ModId::from_raw("A---1.0"))
        );
        assert_eq!(ModFilter::parse("A"), ModFilter::Identifier("A".into()));
    }
}
