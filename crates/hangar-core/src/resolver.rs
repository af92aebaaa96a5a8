//! Dependency resolution.
//!
//! Given a root mod and a game version, builds the tree of dependency
//! choices the operator (or the flattener) picks from. The walk is a
//! depth-first traversal threading an [`Encountered`] set: a mod claimed
//! on the way (by identifier or alias) is never offered again, which both
//! breaks cycles and collapses diamonds. Alternatives of one node each see
//! their own copy of the set.

use std::collections::HashSet;

use hangar_schema::{ModId, ModRecord, Relationship};
use thiserror::Error;
use tracing::{debug, trace};

use crate::catalog::{CatalogError, CatalogStore, ModFilter, latest_per_identifier};
use crate::compat::compatible_only;

/// Why a root mod could not be resolved.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// No record matches the reference.
    #[error("Mod not found: {0}")]
    NotFound(String),

    /// Versions exist, none for this game version.
    #[error("No version of {identifier} is compatible with game version {target}")]
    Incompatible {
        /// Requested identifier.
        identifier: String,
        /// Game version checked against.
        target: String,
    },

    /// The catalog could not be read.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// One concrete mod that can satisfy a dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyChoice {
    /// Id of the candidate.
    pub id: ModId,
    /// `"<name> (Version <version>)"`
    pub label: String,
    /// This choice's own dependencies, minus anything claimed earlier.
    pub dependencies: Vec<DependencyNode>,
    /// Dependency names of this choice with no compatible candidate at all.
    pub unresolved: Vec<String>,
}

/// A dependency slot and the mods that can fill it. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyNode {
    /// Dependency name as written in `depends`.
    pub name: String,
    /// Candidates, latest compatible version of each identifier.
    pub choices: Vec<DependencyChoice>,
}

impl DependencyNode {
    /// Whether the operator has to pick.
    pub fn is_ambiguous(&self) -> bool {
        self.choices.len() > 1
    }
}

/// Full answer for one root mod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyResolution {
    /// The resolved root.
    pub id: ModId,
    /// Dependency tree of the root.
    pub dependencies: Vec<DependencyNode>,
    /// Root dependencies with no compatible candidate.
    pub unresolved: Vec<String>,
    /// One level of `recommends`; informational only.
    pub recommendations: Vec<DependencyNode>,
    /// One level of `suggests`; informational only.
    pub suggestions: Vec<DependencyNode>,
}

/// Names already claimed during one tree build.
#[derive(Debug, Default, Clone)]
pub struct Encountered {
    names: HashSet<String>,
}

impl Encountered {
    /// A fresh set holding the root's identifier and aliases.
    pub fn seeded(root: &ModRecord) -> Self {
        let mut encountered = Self::default();
        encountered.claim(root);
        encountered
    }

    /// Whether `record` answers to any claimed name.
    pub fn claims(&self, record: &ModRecord) -> bool {
        record.names().any(|name| self.names.contains(name))
    }

    /// Claim `record`'s identifier and every alias.
    pub fn claim(&mut self, record: &ModRecord) {
        self.names.extend(record.names().map(str::to_string));
    }

    /// Whether `name` has been claimed.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Drop every name `other` has not claimed.
    pub fn retain_shared(&mut self, other: &Encountered) {
        self.names.retain(|name| other.names.contains(name));
    }
}

/// Mods able to satisfy `name` for game version `target`: identifier matches
/// plus `provides` matches, filtered for compatibility, latest version of
/// each identifier.
pub fn candidates_for(
    catalog: &dyn CatalogStore,
    name: &str,
    target: &str,
) -> Result<Vec<ModRecord>, ResolveError> {
    let mut pool = catalog.find(&ModFilter::Identifier(name.to_string()))?;
    let mut seen: HashSet<ModId> = pool.iter().map(ModRecord::id).collect();
    for provider in catalog.find(&ModFilter::Provides(name.to_string()))? {
        if seen.insert(provider.id()) {
            pool.push(provider);
        }
    }

    Ok(latest_per_identifier(compatible_only(pool, target)))
}

/// Build the dependency subtree of `record`.
///
/// Returns the nodes (each with at least one choice) and the names of
/// dependencies that had no compatible candidate. A dependency whose
/// candidates were all claimed on the path so far is dropped silently.
/// Each alternative of a node expands against its own copy of
/// `encountered`, so its claims never hide anything from its siblings.
/// After the node, only names claimed by every alternative stay claimed.
pub fn build_tree(
    catalog: &dyn CatalogStore,
    record: &ModRecord,
    target: &str,
    encountered: &mut Encountered,
) -> Result<(Vec<DependencyNode>, Vec<String>), ResolveError> {
    let mut nodes = Vec::new();
    let mut unresolved = Vec::new();

    for dependency in &record.depends {
        let candidates = candidates_for(catalog, &dependency.name, target)?;
        if candidates.is_empty() {
            debug!(
                mod_id = %record.id(),
                dependency = %dependency.name,
                "No compatible candidate"
            );
            unresolved.push(dependency.name.clone());
            continue;
        }

        let survivors: Vec<ModRecord> = candidates
            .into_iter()
            .filter(|candidate| !encountered.claims(candidate))
            .collect();
        if survivors.is_empty() {
            trace!(dependency = %dependency.name, "Already claimed elsewhere in the tree");
            continue;
        }

        // Only names claimed by every alternative carry forward.
        let mut choices = Vec::with_capacity(survivors.len());
        let mut common: Option<Encountered> = None;
        for choice in survivors {
            let mut branch = encountered.clone();
            branch.claim(&choice);
            let (dependencies, choice_unresolved) =
                build_tree(catalog, &choice, target, &mut branch)?;
            choices.push(DependencyChoice {
                id: choice.id(),
                label: label(&choice),
                dependencies,
                unresolved: choice_unresolved,
            });
            match common.as_mut() {
                Some(common) => common.retain_shared(&branch),
                None => common = Some(branch),
            }
        }
        if let Some(common) = common {
            *encountered = common;
        }

        nodes.push(DependencyNode {
            name: dependency.name.clone(),
            choices,
        });
    }

    Ok((nodes, unresolved))
}

/// Resolve the root named by `filter` and its whole dependency tree.
pub fn resolve_dependencies(
    catalog: &dyn CatalogStore,
    filter: &ModFilter,
    target: &str,
) -> Result<DependencyResolution, ResolveError> {
    let root = root_record(catalog, filter, target)?;
    debug!(mod_id = %root.id(), target, "Resolving dependencies");

    let mut encountered = Encountered::seeded(&root);
    let (dependencies, unresolved) = build_tree(catalog, &root, target, &mut encountered)?;

    Ok(DependencyResolution {
        id: root.id(),
        dependencies,
        unresolved,
        recommendations: shallow(catalog, &root.recommends, target)?,
        suggestions: shallow(catalog, &root.suggests, target)?,
    })
}

fn root_record(
    catalog: &dyn CatalogStore,
    filter: &ModFilter,
    target: &str,
) -> Result<ModRecord, ResolveError> {
    let ModFilter::Identifier(identifier) = filter else {
        return catalog
            .find_one(filter)?
            .ok_or_else(|| ResolveError::NotFound(filter.to_string()));
    };

    let versions = catalog.find(filter)?;
    if versions.is_empty() {
        return Err(ResolveError::NotFound(identifier.clone()));
    }
    latest_per_identifier(compatible_only(versions, target))
        .into_iter()
        .next()
        .ok_or_else(|| ResolveError::Incompatible {
            identifier: identifier.clone(),
            target: target.to_string(),
        })
}

fn shallow(
    catalog: &dyn CatalogStore,
    relationships: &[Relationship],
    target: &str,
) -> Result<Vec<DependencyNode>, ResolveError> {
    let mut nodes = Vec::new();
    for relationship in relationships {
        let choices: Vec<DependencyChoice> = candidates_for(catalog, &relationship.name, target)?
            .iter()
            .map(|candidate| DependencyChoice {
                id: candidate.id(),
                label: label(candidate),
                dependencies: Vec::new(),
                unresolved: Vec::new(),
            })
            .collect();
        if !choices.is_empty() {
            nodes.push(DependencyNode {
                name: relationship.name.clone(),
                choices,
            });
        }
    }
    Ok(nodes)
}

fn label(record: &ModRecord) -> String {
    format!("{} (Version {})", record.display_name(), record.version)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::flatten::Selections;

    const TARGET: &str = "1.4.1";

    pub(crate) fn mod_record(
        identifier: &str,
        version: &str,
        depends: &[&str],
        provides: &[&str],
    ) -> ModRecord {
        serde_json::from_value(serde_json::json!({
            "identifier": identifier,
            "version": version,
            "download": format!("https://example.org/{identifier}.zip"),
            "depends": depends.iter().map(|d| serde_json::json!({"name": d})).collect::<Vec<_>>(),
            "provides": provides,
        }))
        .unwrap()
    }

    fn resolve(catalog: &MemoryCatalog, reference: &str) -> DependencyResolution {
        resolve_dependencies(catalog, &ModFilter::parse(reference), TARGET).unwrap()
    }

    fn names(nodes: &[DependencyNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.name.as_str()).collect()
    }

    #[test]
    fn test_single_dependency() {
        let catalog = MemoryCatalog::new(vec![
            mod_record("A", "1.0", &["B"], &[]),
            mod_record("B", "1.0", &[], &[]),
        ]);

        let resolution = resolve(&catalog, "A---1.0");

        assert_eq!(
            resolution.dependencies,
            vec![DependencyNode {
                name: "B".into(),
                choices: vec![DependencyChoice {
                    id: ModId::from_raw("B---1.0"),
                    label: "B (Version 1.0)".into(),
                    dependencies: vec![],
                    unresolved: vec![],
                }],
            }]
        );
        assert!(resolution.unresolved.is_empty());
    }

    #[test]
    fn test_latest_compatible_candidate_is_offered() {
        let mut too_new = mod_record("B", "3.0", &[], &[]);
        too_new.ksp_version = Some("1.12".into());
        let catalog = MemoryCatalog::new(vec![
            mod_record("A", "1.0", &["B"], &[]),
            mod_record("B", "1.0", &[], &[]),
            mod_record("B", "2.0", &[], &[]),
            too_new,
        ]);

        let resolution = resolve(&catalog, "A");
        let choices = &resolution.dependencies[0].choices;
        assert_eq!(choices.len(), 1);
        assert_eq!(choices[0].id, "B---2.0");
    }

    #[test]
    fn test_virtual_dependency_offers_every_provider() {
        let catalog = MemoryCatalog::new(vec![
            mod_record("A", "1.0", &["FuelSystem"], &[]),
            mod_record("RealFuels", "12.0", &[], &["FuelSystem"]),
            mod_record("ModularFuelTanks", "5.0", &[], &["FuelSystem"]),
        ]);

        let resolution = resolve(&catalog, "A");
        let node = &resolution.dependencies[0];
        assert!(node.is_ambiguous());
        let mut ids: Vec<_> = node.choices.iter().map(|c| c.id.to_string()).collect();
        ids.sort();
        assert_eq!(ids, vec!["ModularFuelTanks---5.0", "RealFuels---12.0"]);
    }

    #[test]
    fn test_diamond_appears_once() {
        let catalog = MemoryCatalog::new(vec![
            mod_record("A", "1.0", &["B", "C"], &[]),
            mod_record("B", "1.0", &["D"], &[]),
            mod_record("C", "1.0", &["D"], &[]),
            mod_record("D", "1.0", &[], &[]),
        ]);

        let resolution = resolve(&catalog, "A");
        assert_eq!(names(&resolution.dependencies), vec!["B", "C"]);
        let b = &resolution.dependencies[0].choices[0];
        let c = &resolution.dependencies[1].choices[0];
        assert_eq!(names(&b.dependencies), vec!["D"]);
        assert!(c.dependencies.is_empty());
    }

    #[test]
    fn test_cycle_terminates() {
        let catalog = MemoryCatalog::new(vec![
            mod_record("A", "1.0", &["B"], &[]),
            mod_record("B", "1.0", &["A"], &[]),
        ]);

        let resolution = resolve(&catalog, "A");
        assert_eq!(names(&resolution.dependencies), vec!["B"]);
        assert!(resolution.dependencies[0].choices[0].dependencies.is_empty());
    }

    fn fuel_catalog(root_depends: &[&str]) -> MemoryCatalog {
        MemoryCatalog::new(vec![
            mod_record("A", "1.0", root_depends, &[]),
            mod_record("P", "1.0", &["Z"], &["X"]),
            mod_record("Q", "1.0", &["Z", "W"], &["X"]),
            mod_record("Z", "1.0", &[], &[]),
            mod_record("W", "1.0", &[], &[]),
        ])
    }

    fn queue_with(resolution: &DependencyResolution, name: &str, id: &str) -> Vec<String> {
        let mut selections = Selections::new();
        selections.insert(name.into(), ModId::from_raw(id));
        let flattened = resolution.flatten(&selections);
        assert!(flattened.is_ready());
        flattened.install_queue.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_alternatives_each_keep_shared_dependency() {
        let resolution = resolve(&fuel_catalog(&["X"]), "A");
        let node = &resolution.dependencies[0];
        assert!(node.is_ambiguous());
        for choice in &node.choices {
            assert!(names(&choice.dependencies).contains(&"Z"), "{} lost Z", choice.id);
        }

        assert_eq!(
            queue_with(&resolution, "X", "Q---1.0"),
            vec!["Z---1.0", "W---1.0", "Q---1.0", "A---1.0"]
        );
        assert_eq!(
            queue_with(&resolution, "X", "P---1.0"),
            vec!["Z---1.0", "P---1.0", "A---1.0"]
        );
    }

    #[test]
    fn test_claims_of_one_alternative_do_not_hide_later_dependencies() {
        // Only Q pulls in W, so picking P must still install W for the root.
        let resolution = resolve(&fuel_catalog(&["X", "W", "Z"]), "A");
        assert_eq!(names(&resolution.dependencies), vec!["X", "W"]);

        assert_eq!(
            queue_with(&resolution, "X", "P---1.0"),
            vec!["Z---1.0", "P---1.0", "W---1.0", "A---1.0"]
        );
        assert_eq!(
            queue_with(&resolution, "X", "Q---1.0"),
            vec!["Z---1.0", "W---1.0", "Q---1.0", "A---1.0"]
        );
    }

    #[test]
    fn test_claimed_alias_satisfies_later_dependency() {
        let catalog = MemoryCatalog::new(vec![
            mod_record("A", "1.0", &["B", "Toolbar"], &[]),
            mod_record("B", "1.0", &[], &["Toolbar"]),
        ]);

        let resolution = resolve(&catalog, "A");
        assert_eq!(names(&resolution.dependencies), vec!["B"]);
        assert!(resolution.unresolved.is_empty());
    }

    #[test]
    fn test_missing_dependency_is_recorded() {
        let mut old = mod_record("B", "1.0", &[], &[]);
        old.ksp_version = Some("1.2".into());
        let catalog = MemoryCatalog::new(vec![
            mod_record("A", "1.0", &["B", "Ghost"], &[]),
            old,
        ]);

        let resolution = resolve(&catalog, "A");
        assert!(resolution.dependencies.is_empty());
        assert_eq!(resolution.unresolved, vec!["B", "Ghost"]);
    }

    #[test]
    fn test_nested_missing_dependency_stays_on_choice() {
        let catalog = MemoryCatalog::new(vec![
            mod_record("A", "1.0", &["B"], &[]),
            mod_record("B", "1.0", &["Ghost"], &[]),
        ]);

        let resolution = resolve(&catalog, "A");
        assert!(resolution.unresolved.is_empty());
        assert_eq!(resolution.dependencies[0].choices[0].unresolved, vec!["Ghost"]);
    }

    #[test]
    fn test_root_not_found() {
        let catalog = MemoryCatalog::new(vec![mod_record("A", "1.0", &[], &[])]);
        let err = resolve_dependencies(&catalog, &ModFilter::parse("Z---1.0"), TARGET).unwrap_err();
        assert!(matches!(err, ResolveError::NotFound(ref id) if id == "Z---1.0"));

        let err = resolve_dependencies(&catalog, &ModFilter::parse("Z"), TARGET).unwrap_err();
        assert!(matches!(err, ResolveError::NotFound(_)));
    }

    #[test]
    fn test_root_by_identifier_must_be_compatible() {
        let mut old = mod_record("A", "1.0", &[], &[]);
        old.ksp_version = Some("1.2".into());
        let catalog = MemoryCatalog::new(vec![old]);

        let err = resolve_dependencies(&catalog, &ModFilter::parse("A"), TARGET).unwrap_err();
        assert!(matches!(err, ResolveError::Incompatible { .. }));

        // An explicit id bypasses the compatibility check.
        assert!(resolve_dependencies(&catalog, &ModFilter::parse("A---1.0"), TARGET).is_ok());
    }

    #[test]
    fn test_recommendations_and_suggestions() {
        let mut root = mod_record("A", "1.0", &[], &[]);
        root.recommends = vec![Relationship::new("R"), Relationship::new("Missing")];
        root.suggests = vec![Relationship::new("S")];
        let catalog = MemoryCatalog::new(vec![
            root,
            mod_record("R", "1.0", &["Deep"], &[]),
            mod_record("S", "1.0", &[], &[]),
            mod_record("Deep", "1.0", &[], &[]),
        ]);

        let resolution = resolve(&catalog, "A");
        assert_eq!(names(&resolution.recommendations), vec!["R"]);
        assert!(resolution.recommendations[0].choices[0].dependencies.is_empty());
        assert_eq!(names(&resolution.suggestions), vec!["S"]);
        assert!(resolution.dependencies.is_empty());
    }

    #[test]
    fn test_encountered_set() {
        let record = mod_record("A", "1.0", &[], &["Alias"]);
        let encountered = Encountered::seeded(&record);
        assert!(encountered.contains("A"));
        assert!(encountered.contains("Alias"));
        assert!(encountered.claims(&mod_record("Other", "1.0", &[], &["Alias"])));
        assert!(!encountered.claims(&mod_record("Other", "1.0", &[], &[])));
    }
}
