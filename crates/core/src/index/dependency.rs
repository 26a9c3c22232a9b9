use crate::model::PathId;
use std::collections::{BTreeMap, BTreeSet};

/// Reverse import edges: module file -> files importing it.
///
/// Edges are only ever added. When an importer drops an import the stale
/// edge stays until the next full reset.
#[derive(Debug, Default, Clone)]
pub struct DependencyIndex {
    dependents: BTreeMap<PathId, BTreeSet<PathId>>,
}

impl DependencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the edge was not present yet.
    pub fn record_edge(&mut self, module: PathId, importer: PathId) -> bool {
        self.dependents.entry(module).or_default().insert(importer)
    }

    pub fn dependents_of(&self, module: PathId) -> impl Iterator<Item = PathId> + '_ {
        self.dependents
            .get(&module)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Every importer of any module, deduplicated.
    pub fn all_dependents(&self) -> BTreeSet<PathId> {
        self.dependents.values().flatten().copied().collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = (PathId, &BTreeSet<PathId>)> {
        self.dependents.iter().map(|(k, v)| (*k, v))
    }

    pub fn edge_count(&self) -> usize {
        self.dependents.values().map(BTreeSet::len).sum()
    }

    pub fn module_count(&self) -> usize {
        self.dependents.len()
    }

    pub fn clear(&mut self) {
        self.dependents.clear();
    }
}
