//! The in-memory index: path interner, reverse import edges and the class
//! symbol cache, guarded together because id assignment and LRU recency are
//! order sensitive.

pub mod cache;
pub mod dependency;
pub mod interner;
pub mod symbols;

pub use cache::{BoundedCache, EvictionPolicy, Lru};
pub use dependency::DependencyIndex;
pub use interner::PathInterner;
pub use symbols::{SymbolIndex, extract_class_table};

use crate::config::IndexConfig;
use crate::content::{ContentSource, FsContentSource};
use crate::document::{Dialect, TextDocument};
use crate::error::{Result, StylescopeError};
use crate::model::{ClassTable, PathId, TextRange};
use crate::persistence::CacheSnapshot;
use crate::resolve::PathResolver;
use crate::syntax::{
    ImportExtractor, ImportStatement, LexicalClassifier, LexicalRegions, RegexImportExtractor,
    SafeCssParser, StylesheetParser, TokenClassifier,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Injectable text-processing services.
#[derive(Clone)]
pub struct Collaborators {
    pub parser: Arc<dyn StylesheetParser>,
    pub classifier: Arc<dyn TokenClassifier>,
    pub imports: Arc<dyn ImportExtractor>,
    pub content: Arc<dyn ContentSource>,
}

impl Collaborators {
    /// Default implementations, with the import pattern built from the
    /// configured module extensions.
    pub fn for_config(config: &IndexConfig) -> Self {
        Self {
            parser: Arc::new(SafeCssParser),
            classifier: Arc::new(LexicalClassifier),
            imports: Arc::new(RegexImportExtractor::new(&config.module_extensions)),
            content: Arc::new(FsContentSource),
        }
    }
}

#[derive(Debug)]
struct IndexState {
    interner: PathInterner,
    dependencies: DependencyIndex,
    symbols: SymbolIndex,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub paths: usize,
    pub modules_with_dependents: usize,
    pub dependency_edges: usize,
    pub cached_symbol_tables: usize,
}

pub struct WorkspaceIndex {
    resolver: PathResolver,
    state: Mutex<IndexState>,
    collaborators: Collaborators,
}

impl WorkspaceIndex {
    pub fn new(resolver: PathResolver, symbol_capacity: usize, collaborators: Collaborators) -> Self {
        Self {
            resolver,
            state: Mutex::new(IndexState {
                interner: PathInterner::new(),
                dependencies: DependencyIndex::new(),
                symbols: SymbolIndex::new(symbol_capacity),
            }),
            collaborators,
        }
    }

    fn state(&self) -> MutexGuard<'_, IndexState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn classifier(&self) -> &dyn TokenClassifier {
        self.collaborators.classifier.as_ref()
    }

    pub fn content(&self) -> &dyn ContentSource {
        self.collaborators.content.as_ref()
    }

    pub fn intern(&self, path: &Path) -> PathId {
        let key = self.resolver.relative_key(path);
        self.state().interner.intern(&key)
    }

    /// Absolute path behind an id.
    pub fn path_of(&self, id: PathId) -> Option<PathBuf> {
        let state = self.state();
        state
            .interner
            .resolve(id)
            .map(|key| self.resolver.absolute_path(key))
    }

    // ---- Symbols ----

    /// Class table of a module file, parsing it on a cache miss. Unreadable
    /// files yield an empty table that is not cached.
    pub fn symbols(&self, path: &Path) -> Arc<ClassTable> {
        let key = self.resolver.relative_key(path);
        let id = {
            let mut state = self.state();
            let id = state.interner.intern(&key);
            if let Some(table) = state.symbols.get(id) {
                return table;
            }
            id
        };

        match self.parse_module(&self.resolver.absolute_path(&key)) {
            Some(table) => {
                let table = Arc::new(table);
                self.store_symbols(id, table.clone());
                table
            }
            None => Arc::default(),
        }
    }

    /// Re-parses a module unconditionally. A module that can no longer be
    /// read loses its cache entry.
    pub fn refresh_symbols(&self, path: &Path) -> Arc<ClassTable> {
        let id = self.intern(path);
        match self.parse_module(path) {
            Some(table) => {
                let table = Arc::new(table);
                self.store_symbols(id, table.clone());
                table
            }
            None => {
                self.state().symbols.invalidate(id);
                Arc::default()
            }
        }
    }

    pub fn set_symbols(&self, path: &Path, table: ClassTable) {
        let id = self.intern(path);
        self.store_symbols(id, Arc::new(table));
    }

    pub fn invalidate_symbols(&self, path: &Path) -> bool {
        let key = self.resolver.relative_key(path);
        let mut state = self.state();
        match state.interner.get(&key) {
            Some(id) => state.symbols.invalidate(id),
            None => false,
        }
    }

    /// Whether a table is cached for the path, without touching recency.
    pub fn is_symbols_cached(&self, path: &Path) -> bool {
        let key = self.resolver.relative_key(path);
        let state = self.state();
        state
            .interner
            .get(&key)
            .is_some_and(|id| state.symbols.peek(id).is_some())
    }

    fn store_symbols(&self, id: PathId, table: Arc<ClassTable>) {
        let evicted = self.state().symbols.set(id, table);
        for id in evicted {
            tracing::trace!("Evicted class table {}", id);
        }
    }

    fn parse_module(&self, path: &Path) -> Option<ClassTable> {
        let text = self.collaborators.content.read(path)?;
        let dialect = Dialect::from_path(path);
        Some(extract_class_table(
            &text,
            dialect,
            self.collaborators.parser.as_ref(),
            self.collaborators.classifier.as_ref(),
        ))
    }

    // ---- Imports and dependencies ----

    /// Module imports of a script that sit in code, not in strings or comments.
    pub fn imports_of(&self, doc: &TextDocument, regions: &LexicalRegions) -> Vec<ImportStatement> {
        self.collaborators
            .imports
            .extract(&doc.text)
            .into_iter()
            .filter(|import| !regions.in_string_or_comment(import.statement_offset))
            .collect()
    }

    /// Records an edge for every import whose target exists. Returns the
    /// number of edges that were new.
    pub fn scan_imports(&self, doc: &TextDocument) -> usize {
        let regions = self.collaborators.classifier.classify(&doc.text, doc.dialect);
        let targets: Vec<PathBuf> = self
            .imports_of(doc, &regions)
            .iter()
            .map(|import| self.resolver.resolve_import(&doc.path, &import.specifier))
            .filter(|target| self.collaborators.content.exists(target))
            .collect();
        if targets.is_empty() {
            return 0;
        }

        let importer_key = self.resolver.relative_key(&doc.path);
        let mut state = self.state();
        let importer = state.interner.intern(&importer_key);
        let mut added = 0;
        for target in targets {
            let module = state.interner.intern(&self.resolver.relative_key(&target));
            if state.dependencies.record_edge(module, importer) {
                added += 1;
            }
        }
        added
    }

    pub fn record_dependency(&self, module: &Path, importer: &Path) -> bool {
        let module_key = self.resolver.relative_key(module);
        let importer_key = self.resolver.relative_key(importer);
        let mut state = self.state();
        let module = state.interner.intern(&module_key);
        let importer = state.interner.intern(&importer_key);
        state.dependencies.record_edge(module, importer)
    }

    // ---- Query surface ----

    pub fn class_names_of(&self, path: &Path) -> Vec<String> {
        self.symbols(path)
            .class_names()
            .map(str::to_string)
            .collect()
    }

    pub fn has_class(&self, path: &Path, name: &str) -> bool {
        self.symbols(path).contains(name)
    }

    pub fn ranges_of(&self, path: &Path, name: &str) -> Vec<TextRange> {
        self.symbols(path)
            .ranges(name)
            .iter()
            .map(|r| r.range)
            .collect()
    }

    /// Absolute paths of the files importing a module.
    pub fn dependents_of(&self, path: &Path) -> Vec<PathBuf> {
        let key = self.resolver.relative_key(path);
        let state = self.state();
        let Some(module) = state.interner.get(&key) else {
            return Vec::new();
        };
        state
            .dependencies
            .dependents_of(module)
            .filter_map(|id| state.interner.resolve(id))
            .map(|key| self.resolver.absolute_path(key))
            .collect()
    }

    /// Every importer of any module, deduplicated.
    pub fn all_dependent_paths(&self) -> Vec<PathBuf> {
        let state = self.state();
        state
            .dependencies
            .all_dependents()
            .into_iter()
            .filter_map(|id| state.interner.resolve(id))
            .map(|key| self.resolver.absolute_path(key))
            .collect()
    }

    /// Absolute paths of the modules that have at least one importer.
    pub fn modules_with_dependents(&self) -> Vec<PathBuf> {
        let state = self.state();
        state
            .dependencies
            .entries()
            .filter(|(_, importers)| !importers.is_empty())
            .filter_map(|(module, _)| state.interner.resolve(module))
            .map(|key| self.resolver.absolute_path(key))
            .collect()
    }

    pub fn stats(&self) -> IndexStats {
        let state = self.state();
        IndexStats {
            paths: state.interner.len(),
            modules_with_dependents: state.dependencies.module_count(),
            dependency_edges: state.dependencies.edge_count(),
            cached_symbol_tables: state.symbols.len(),
        }
    }

    // ---- Lifecycle ----

    /// Drops every path, edge and table. All previously issued ids are stale.
    pub fn reset(&self) {
        let mut state = self.state();
        state.interner.reset();
        state.dependencies.clear();
        state.symbols.clear();
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        let state = self.state();
        CacheSnapshot {
            path_map_cache: state.interner.paths().map(str::to_string).collect(),
            module_path_cache: state
                .dependencies
                .entries()
                .map(|(module, importers)| (module.0, importers.iter().map(|id| id.0).collect::<Vec<_>>()))
                .collect(),
            class_name_cache: state
                .symbols
                .entries()
                .map(|(id, table)| (id.0, table.as_ref().clone()))
                .collect(),
        }
    }

    /// Replaces the whole index with a snapshot, keeping ids as stored.
    /// Nothing changes when the snapshot is inconsistent.
    pub fn restore(&self, snapshot: CacheSnapshot) -> Result<()> {
        let mut interner = PathInterner::new();
        interner.load_ordered(&snapshot.path_map_cache)?;

        let check = |raw: u32| -> Result<PathId> {
            let id = PathId(raw);
            if interner.contains_id(id) {
                Ok(id)
            } else {
                Err(StylescopeError::Parsing(format!(
                    "snapshot references unknown path id {raw}"
                )))
            }
        };

        let mut dependencies = DependencyIndex::new();
        for (module, importers) in &snapshot.module_path_cache {
            let module = check(*module)?;
            let importers = importers
                .iter()
                .map(|raw| check(*raw))
                .collect::<Result<BTreeSet<_>>>()?;
            for importer in importers {
                dependencies.record_edge(module, importer);
            }
        }

        let mut symbols = SymbolIndex::new(self.state().symbols.capacity());
        for (id, table) in snapshot.class_name_cache {
            symbols.set(check(id)?, Arc::new(table));
        }

        let mut state = self.state();
        *state = IndexState {
            interner,
            dependencies,
            symbols,
        };
        Ok(())
    }
}

impl std::fmt::Debug for WorkspaceIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceIndex")
            .field("root", &self.resolver.root())
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn index_at(root: &Path, capacity: usize) -> WorkspaceIndex {
        let config = IndexConfig::default();
        WorkspaceIndex::new(
            PathResolver::new(root.to_path_buf(), &config),
            capacity,
            Collaborators::for_config(&config),
        )
    }

    #[test]
    fn test_symbols_parse_on_miss() {
        let dir = tempdir().unwrap();
        let module = dir.path().join("a.module.css");
        fs::write(&module, ".title {}\n.body {}").unwrap();
        let index = index_at(dir.path(), 3);

        assert!(!index.is_symbols_cached(&module));
        assert_eq!(index.class_names_of(&module), vec!["title", "body"]);
        assert!(index.is_symbols_cached(&module));
        assert!(index.has_class(&module, "body"));
        assert!(!index.has_class(&module, "footer"));
        assert_eq!(index.ranges_of(&module, "title").len(), 1);
    }

    #[test]
    fn test_missing_module_is_empty_and_uncached() {
        let dir = tempdir().unwrap();
        let index = index_at(dir.path(), 3);
        let missing = dir.path().join("gone.module.css");
        assert!(index.class_names_of(&missing).is_empty());
        assert!(!index.is_symbols_cached(&missing));
    }

    #[test]
    fn test_invalidate_forces_reparse() {
        let dir = tempdir().unwrap();
        let module = dir.path().join("a.module.css");
        fs::write(&module, ".old {}").unwrap();
        let index = index_at(dir.path(), 3);
        assert!(index.has_class(&module, "old"));

        fs::write(&module, ".new {}").unwrap();
        assert!(index.has_class(&module, "old"));
        assert!(index.invalidate_symbols(&module));
        assert!(index.has_class(&module, "new"));
        assert!(!index.has_class(&module, "old"));
    }

    #[test]
    fn test_scan_imports_records_existing_targets() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        let module = dir.path().join("src/App.module.css");
        fs::write(&module, ".app {}").unwrap();
        let script = dir.path().join("src/App.tsx");
        let doc = TextDocument::new(
            script.clone(),
            "import styles from './App.module.css';\nimport gone from './Gone.module.css';\n// import c from './App.module.css'",
            1,
        );

        let index = index_at(dir.path(), 3);
        assert_eq!(index.scan_imports(&doc), 1);
        assert_eq!(index.scan_imports(&doc), 0);
        assert_eq!(index.dependents_of(&module), vec![script.clone()]);
        assert!(index.dependents_of(&dir.path().join("src/Gone.module.css")).is_empty());
        assert_eq!(index.all_dependent_paths(), vec![script]);
        assert_eq!(index.modules_with_dependents(), vec![module]);
    }

    #[test]
    fn test_modules_with_dependents_lists_modules_not_importers() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        let a = dir.path().join("src/a.module.css");
        let b = dir.path().join("src/b.module.css");
        fs::write(&a, ".a {}").unwrap();
        fs::write(&b, ".b {}").unwrap();
        let index = index_at(dir.path(), 3);

        for (name, body) in [
            ("src/One.tsx", "import a from './a.module.css';\nimport b from './b.module.css';"),
            ("src/Two.tsx", "import b from './b.module.css';"),
        ] {
            index.scan_imports(&TextDocument::new(dir.path().join(name), body, 1));
        }

        let mut modules = index.modules_with_dependents();
        modules.sort();
        assert_eq!(modules, vec![a, b.clone()]);
        assert_eq!(index.dependents_of(&b).len(), 2);
        assert_eq!(index.stats().modules_with_dependents, 2);
    }

    #[test]
    fn test_restore_rejects_unknown_ids() {
        let dir = tempdir().unwrap();
        let index = index_at(dir.path(), 3);
        index.record_dependency(&dir.path().join("a.module.css"), &dir.path().join("a.ts"));

        let bad = CacheSnapshot {
            path_map_cache: vec!["x.module.css".into()],
            module_path_cache: [(0, vec![4])].into_iter().collect(),
            ..Default::default()
        };
        assert!(index.restore(bad).is_err());
        assert_eq!(index.stats().dependency_edges, 1);
    }

    #[test]
    fn test_reset_clears_everything() {
        let dir = tempdir().unwrap();
        let index = index_at(dir.path(), 3);
        index.record_dependency(&dir.path().join("a.module.css"), &dir.path().join("a.ts"));
        index.set_symbols(&dir.path().join("a.module.css"), ClassTable::new());
        index.reset();
        assert_eq!(index.stats(), IndexStats::default());
    }
}
