//! Collapse a dependency tree into an install queue.
//!
//! Single-choice nodes are selected automatically; nodes with several
//! choices need a selection from the operator and are returned in
//! [`Flattened::choices`] until one is supplied. Flattening is pure: feed the
//! returned selections (plus any new answers) back in and the result only
//! grows.

use std::collections::BTreeMap;

use hangar_schema::ModId;

use crate::resolver::{DependencyNode, DependencyResolution};

/// Chosen mod id per dependency name.
pub type Selections = BTreeMap<String, ModId>;

/// Outcome of [`flatten`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flattened {
    /// Prior selections plus every automatic one.
    pub selected: Selections,
    /// Nodes still waiting for a selection. Their subtrees are not visited.
    pub choices: Vec<DependencyNode>,
    /// Dependency names with no candidate under the selected branches.
    pub unresolved: Vec<String>,
    /// Ids to install, dependencies before the mods that need them.
    pub install_queue: Vec<ModId>,
}

impl Flattened {
    /// Nothing left to choose and nothing missing.
    pub fn is_ready(&self) -> bool {
        self.choices.is_empty() && self.unresolved.is_empty()
    }
}

/// Flatten `nodes` given the selections made so far.
pub fn flatten(nodes: &[DependencyNode], prior: &Selections) -> Flattened {
    let mut flattened = Flattened {
        selected: prior.clone(),
        ..Flattened::default()
    };
    walk(nodes, prior, &mut flattened);
    flattened
}

impl DependencyResolution {
    /// Flatten the whole resolution; the root id closes the queue.
    pub fn flatten(&self, prior: &Selections) -> Flattened {
        let mut flattened = flatten(&self.dependencies, prior);
        flattened.unresolved.splice(0..0, self.unresolved.iter().cloned());
        push_unique(&mut flattened.install_queue, &self.id);
        flattened
    }
}

fn walk(nodes: &[DependencyNode], prior: &Selections, out: &mut Flattened) {
    for node in nodes {
        let chosen = match node.choices.as_slice() {
            [only] => {
                out.selected.insert(node.name.clone(), only.id.clone());
                Some(only)
            }
            many => prior
                .get(&node.name)
                .and_then(|id| many.iter().find(|choice| choice.id == *id)),
        };

        let Some(choice) = chosen else {
            // stale selection from an older tree
            out.selected.remove(&node.name);
            out.choices.push(node.clone());
            continue;
        };

        out.unresolved.extend(choice.unresolved.iter().cloned());
        walk(&choice.dependencies, prior, out);
        push_unique(&mut out.install_queue, &choice.id);
    }
}

fn push_unique(queue: &mut Vec<ModId>, id: &ModId) {
    if !queue.contains(id) {
        queue.push(id.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::DependencyChoice;

    fn choice(id: &str, dependencies: Vec<DependencyNode>) -> DependencyChoice {
        DependencyChoice {
            id: ModId::from_raw(id),
            label: id.to_string(),
            dependencies,
            unresolved: vec![],
        }
    }

    fn node(name: &str, choices: Vec<DependencyChoice>) -> DependencyNode {
        DependencyNode {
            name: name.to_string(),
            choices,
        }
    }

    fn resolution(dependencies: Vec<DependencyNode>) -> DependencyResolution {
        DependencyResolution {
            id: ModId::from_raw("A---1.0"),
            dependencies,
            unresolved: vec![],
            recommendations: vec![],
            suggestions: vec![],
        }
    }

    fn queue(flattened: &Flattened) -> Vec<&str> {
        flattened.install_queue.iter().map(ModId::as_str).collect()
    }

    #[test]
    fn test_single_choice_auto_selected() {
        let tree = resolution(vec![node("B", vec![choice("B---1.0", vec![])])]);

        let flattened = tree.flatten(&Selections::new());

        assert!(flattened.is_ready());
        assert_eq!(flattened.selected.get("B").unwrap(), "B---1.0");
        assert_eq!(queue(&flattened), vec!["B---1.0", "A---1.0"]);
    }

    #[test]
    fn test_dependencies_precede_dependents() {
        let tree = resolution(vec![node(
            "B",
            vec![choice(
                "B---1.0",
                vec![node("C", vec![choice("C---1.0", vec![])])],
            )],
        )]);

        assert_eq!(
            queue(&tree.flatten(&Selections::new())),
            vec!["C---1.0", "B---1.0", "A---1.0"]
        );
    }

    #[test]
    fn test_ambiguous_node_waits_for_selection() {
        let tree = resolution(vec![node(
            "FuelSystem",
            vec![
                choice("RealFuels---12.0", vec![node("SolverEngines", vec![choice("SolverEngines---3.0", vec![])])]),
                choice("ModularFuelTanks---5.0", vec![]),
            ],
        )]);

        let first = tree.flatten(&Selections::new());
        assert!(!first.is_ready());
        assert_eq!(first.choices.len(), 1);
        assert_eq!(first.choices[0].name, "FuelSystem");
        assert_eq!(queue(&first), vec!["A---1.0"]);

        let mut answers = first.selected.clone();
        answers.insert("FuelSystem".into(), ModId::from_raw("RealFuels---12.0"));
        let second = tree.flatten(&answers);
        assert!(second.is_ready());
        assert_eq!(
            queue(&second),
            vec!["SolverEngines---3.0", "RealFuels---12.0", "A---1.0"]
        );
    }

    #[test]
    fn test_flatten_is_idempotent() {
        let tree = resolution(vec![
            node("B", vec![choice("B---1.0", vec![])]),
            node("X", vec![choice("X1---1.0", vec![]), choice("X2---1.0", vec![])]),
        ]);

        let once = tree.flatten(&Selections::new());
        let twice = tree.flatten(&once.selected);
        assert_eq!(once, twice);

        let mut answers = once.selected.clone();
        answers.insert("X".into(), ModId::from_raw("X2---1.0"));
        let resolved = tree.flatten(&answers);
        assert_eq!(tree.flatten(&resolved.selected), resolved);
    }

    #[test]
    fn test_stale_selection_is_dropped() {
        let tree = resolution(vec![node(
            "X",
            vec![choice("X1---1.0", vec![]), choice("X2---1.0", vec![])],
        )]);
        let mut prior = Selections::new();
        prior.insert("X".into(), ModId::from_raw("X3---1.0"));

        let flattened = tree.flatten(&prior);
        assert!(!flattened.selected.contains_key("X"));
        assert_eq!(flattened.choices.len(), 1);
    }

    #[test]
    fn test_unresolved_follows_selected_branches_only() {
        let mut broken = choice("X1---1.0", vec![]);
        broken.unresolved = vec!["Ghost".into()];
        let mut tree = resolution(vec![node("X", vec![broken, choice("X2---1.0", vec![])])]);
        tree.unresolved = vec!["Missing".into()];

        let pending = tree.flatten(&Selections::new());
        assert_eq!(pending.unresolved, vec!["Missing"]);

        let mut answers = Selections::new();
        answers.insert("X".into(), ModId::from_raw("X1---1.0"));
        let chosen = tree.flatten(&answers);
        assert_eq!(chosen.unresolved, vec!["Missing", "Ghost"]);
        assert!(!chosen.is_ready());
    }

    #[test]
    fn test_queue_has_no_duplicates() {
        let shared = || node("D", vec![choice("D---1.0", vec![])]);
        let nodes = vec![
            node("B", vec![choice("B---1.0", vec![shared()])]),
            node("C", vec![choice("C---1.0", vec![shared()])]),
        ];

        let flattened = flatten(&nodes, &Selections::new());
        assert_eq!(queue(&flattened), vec!["D---1.0", "B---1.0", "C---1.0"]);
    }
}
