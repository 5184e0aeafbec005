use super::ModuleId;
use crate::span::Span;
use indexmap::IndexMap;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::path::PathBuf;

/// A resolved `require` call inside one module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// The module name as written (after decoding escapes)
    pub literal: String,
    /// Byte span of the whole call in the requiring module's source
    pub span: Span,
    /// Canonical path of the required file
    pub path: PathBuf,
    pub target: ModuleId,
}

/// One module of the closure
#[derive(Debug, Clone)]
pub struct ModuleRecord {
    pub id: ModuleId,
    pub path: PathBuf,
    pub source: String,
    /// Outgoing references in source order
    pub references: Vec<Reference>,
}

impl ModuleRecord {
    /// Distinct required modules, first occurrence first
    pub fn dependencies(&self) -> Vec<&ModuleId> {
        let mut seen = Vec::new();
        for reference in &self.references {
            if !seen.contains(&&reference.target) {
                seen.push(&reference.target);
            }
        }
        seen
    }
}

/// The dependency closure of an entry module.
///
/// Modules are kept in first-discovery order, which is what the emitter
/// writes out. Every reference target is a module of the graph.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    entry: ModuleId,
    modules: IndexMap<ModuleId, ModuleRecord>,
}

impl DependencyGraph {
    pub(crate) fn new(entry: ModuleId, modules: IndexMap<ModuleId, ModuleRecord>) -> Self {
        Self { entry, modules }
    }

    pub fn entry(&self) -> &ModuleId {
        &self.entry
    }

    pub fn entry_module(&self) -> Option<&ModuleRecord> {
        self.modules.get(&self.entry)
    }

    pub fn get(&self, id: &ModuleId) -> Option<&ModuleRecord> {
        self.modules.get(id)
    }

    pub fn contains(&self, id: &ModuleId) -> bool {
        self.modules.contains_key(id)
    }

    /// Modules in first-discovery order, entry first
    pub fn modules(&self) -> impl Iterator<Item = &ModuleRecord> {
        self.modules.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ModuleId> {
        self.modules.keys()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn dependencies(&self, id: &ModuleId) -> Vec<&ModuleId> {
        self.modules
            .get(id)
            .map(ModuleRecord::dependencies)
            .unwrap_or_default()
    }

    /// Modules that require `id`, in discovery order
    pub fn dependents(&self, id: &ModuleId) -> Vec<&ModuleId> {
        self.modules
            .values()
            .filter(|module| module.references.iter().any(|r| &r.target == id))
            .map(|module| &module.id)
            .collect()
    }

    /// Whether every reference points at a module of the graph
    pub fn is_closed(&self) -> bool {
        self.modules
            .values()
            .flat_map(|module| &module.references)
            .all(|reference| self.modules.contains_key(&reference.target))
    }

    /// Groups of modules that require each other, directly or through
    /// other modules. Each group and the list of groups are in discovery
    /// order.
    pub fn circular_groups(&self) -> Vec<Vec<ModuleId>> {
        let mut graph: DiGraph<usize, ()> = DiGraph::new();
        let nodes: Vec<NodeIndex> = (0..self.modules.len())
            .map(|index| graph.add_node(index))
            .collect();

        for (from, module) in self.modules.values().enumerate() {
            for reference in &module.references {
                if let Some(to) = self.modules.get_index_of(&reference.target) {
                    graph.update_edge(nodes[from], nodes[to], ());
                }
            }
        }

        let mut groups: Vec<Vec<usize>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || graph.contains_edge(component[0], component[0])
            })
            .map(|component| {
                let mut indices: Vec<usize> =
                    component.into_iter().map(|node| graph[node]).collect();
                indices.sort_unstable();
                indices
            })
            .collect();
        groups.sort_unstable_by_key(|indices| indices[0]);

        groups
            .into_iter()
            .map(|indices| {
                indices
                    .into_iter()
                    .filter_map(|index| self.modules.get_index(index))
                    .map(|(id, _)| id.clone())
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, targets: &[&str]) -> ModuleRecord {
        ModuleRecord {
            id: ModuleId::new(id),
            path: PathBuf::from(format!("/p/{}.lua", id)),
            source: String::new(),
            references: targets
                .iter()
                .map(|target| Reference {
                    literal: target.to_string(),
                    span: Span::default(),
                    path: PathBuf::from(format!("/p/{}.lua", target)),
                    target: ModuleId::new(*target),
                })
                .collect(),
        }
    }

    fn graph(records: Vec<ModuleRecord>) -> DependencyGraph {
        let entry = records[0].id.clone();
        let modules = records.into_iter().map(|r| (r.id.clone(), r)).collect();
        DependencyGraph::new(entry, modules)
    }

    #[test]
    fn test_dependencies_and_dependents() {
        let g = graph(vec![
            record("main", &["a", "b", "a"]),
            record("a", &["b"]),
            record("b", &[]),
        ]);
        let b = ModuleId::new("b");

        assert_eq!(
            g.dependencies(&ModuleId::new("main")),
            vec![&ModuleId::new("a"), &b]
        );
        assert_eq!(
            g.dependents(&b),
            vec![&ModuleId::new("main"), &ModuleId::new("a")]
        );
        assert!(g.is_closed());
        assert!(g.circular_groups().is_empty());
    }

    #[test]
    fn test_open_graph_detected() {
        let g = graph(vec![record("main", &["ghost"])]);
        assert!(!g.is_closed());
    }

    #[test]
    fn test_circular_groups() {
        let g = graph(vec![
            record("main", &["a", "self"]),
            record("a", &["b"]),
            record("b", &["a"]),
            record("self", &["self"]),
        ]);
        assert_eq!(
            g.circular_groups(),
            vec![
                vec![ModuleId::new("a"), ModuleId::new("b")],
                vec![ModuleId::new("self")],
            ]
        );
    }
}
