//! Engine wiring the index, the analysis queue, debounce timers and the
//! snapshot store together.

mod queue;
mod scheduler;

pub use queue::{AnalysisQueue, DocumentAnalyzer, QueuePhase};
pub use scheduler::CoalescingScheduler;

use crate::analysis::{Diagnostic, DiagnosticSink, DiagnosticStore, DocumentChecker};
use crate::config::IndexConfig;
use crate::content::ContentSource;
use crate::document::TextDocument;
use crate::error::{Result, StylescopeError};
use crate::index::{Collaborators, IndexStats, WorkspaceIndex};
use crate::model::{PathId, TextRange};
use crate::persistence::{PersistenceLayer, SnapshotStore};
use crate::resolve::PathResolver;
use crate::scanner::scan_workspace;
use crate::syntax::{ImportExtractor, StylesheetParser, TokenClassifier};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;

/// Keys of the engine's debounced operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKey {
    Save,
    SymbolRefresh(PathId),
}

pub struct StylescopeEngineBuilder {
    root: PathBuf,
    config: Option<IndexConfig>,
    parser: Option<Arc<dyn StylesheetParser>>,
    classifier: Option<Arc<dyn TokenClassifier>>,
    imports: Option<Arc<dyn ImportExtractor>>,
    content: Option<Arc<dyn ContentSource>>,
    sink: Option<Arc<dyn DiagnosticSink>>,
    store: Option<SnapshotStore>,
}

impl StylescopeEngineBuilder {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            config: None,
            parser: None,
            classifier: None,
            imports: None,
            content: None,
            sink: None,
            store: None,
        }
    }

    /// Defaults to `.stylescope.json` in the root, if any.
    pub fn with_config(mut self, config: IndexConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_parser(mut self, parser: Arc<dyn StylesheetParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn TokenClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_import_extractor(mut self, imports: Arc<dyn ImportExtractor>) -> Self {
        self.imports = Some(imports);
        self
    }

    pub fn with_content_source(mut self, content: Arc<dyn ContentSource>) -> Self {
        self.content = Some(content);
        self
    }

    pub fn with_diagnostic_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Defaults to the per-workspace directory under the cache base dir.
    pub fn with_snapshot_store(mut self, store: SnapshotStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> StylescopeEngine {
        let config = self
            .config
            .unwrap_or_else(|| IndexConfig::load_or_default(&self.root));

        let defaults = Collaborators::for_config(&config);
        let collaborators = Collaborators {
            parser: self.parser.unwrap_or(defaults.parser),
            classifier: self.classifier.unwrap_or(defaults.classifier),
            imports: self.imports.unwrap_or(defaults.imports),
            content: self.content.unwrap_or(defaults.content),
        };

        let resolver = PathResolver::new(self.root.clone(), &config);
        let index = Arc::new(WorkspaceIndex::new(
            resolver,
            config.symbol_cache_capacity,
            collaborators,
        ));

        let sink: Arc<dyn DiagnosticSink> = self
            .sink
            .unwrap_or_else(|| Arc::new(DiagnosticStore::new()));
        let checker = Arc::new(DocumentChecker::new(index.clone(), sink.clone()));
        let queue = AnalysisQueue::new(
            checker.clone(),
            config.max_queue_length,
            config.debounce.analysis(),
        );

        let scheduler = CoalescingScheduler::new();
        let store = self
            .store
            .unwrap_or_else(|| SnapshotStore::for_workspace(&self.root));
        let persistence = Arc::new(PersistenceLayer::new(
            index.clone(),
            store,
            scheduler.clone(),
            config.debounce.save(),
        ));

        StylescopeEngine {
            root: index.resolver().root().to_path_buf(),
            config,
            index,
            checker,
            queue,
            scheduler,
            persistence,
            sink,
        }
    }
}

/// One workspace's CSS module index and its background machinery.
///
/// Everything is owned by the instance; two engines never share state.
pub struct StylescopeEngine {
    root: PathBuf,
    config: IndexConfig,
    index: Arc<WorkspaceIndex>,
    checker: Arc<DocumentChecker>,
    queue: AnalysisQueue<PathBuf>,
    scheduler: CoalescingScheduler<TimerKey>,
    persistence: Arc<PersistenceLayer>,
    sink: Arc<dyn DiagnosticSink>,
}

impl Drop for StylescopeEngine {
    fn drop(&mut self) {
        self.scheduler.shutdown();
        self.queue.close();
    }
}

impl StylescopeEngine {
    pub fn builder(root: PathBuf) -> StylescopeEngineBuilder {
        StylescopeEngineBuilder::new(root)
    }

    pub fn root_path(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn index(&self) -> &Arc<WorkspaceIndex> {
        &self.index
    }

    pub fn queue(&self) -> &AnalysisQueue<PathBuf> {
        &self.queue
    }

    pub fn snapshot_store(&self) -> &SnapshotStore {
        self.persistence.store()
    }

    pub fn stats(&self) -> IndexStats {
        self.index.stats()
    }

    // ---- Lifecycle ----

    /// Loads the snapshot, populating from the workspace on a miss.
    /// Returns whether the snapshot was used.
    pub async fn initialize(&self) -> Result<bool> {
        if self.persistence.load().await {
            return Ok(true);
        }
        self.populate().await?;
        Ok(false)
    }

    /// Parses every module and scans every script of the workspace.
    pub async fn populate(&self) -> Result<()> {
        let resolver = self.index.resolver().clone();
        let exclude = self.config.exclude.clone();
        let files = tokio::task::spawn_blocking(move || scan_workspace(&resolver, &exclude))
            .await
            .map_err(|e| StylescopeError::Internal(e.to_string()))??;

        tracing::info!(
            "Populating {}: {} modules, {} scripts",
            self.root.display(),
            files.modules.len(),
            files.scripts.len()
        );

        let mut tasks = JoinSet::new();
        for module in files.modules {
            let index = self.index.clone();
            tasks.spawn_blocking(move || {
                index.refresh_symbols(&module);
            });
        }
        for script in files.scripts {
            let index = self.index.clone();
            tasks.spawn_blocking(move || {
                if let Some(text) = index.content().read(&script) {
                    index.scan_imports(&TextDocument::new(script, text, 0));
                }
            });
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::warn!("Population task failed: {}", e);
            }
        }

        let stats = self.index.stats();
        tracing::info!(
            "Populated {} paths, {} dependency edges",
            stats.paths,
            stats.dependency_edges
        );
        self.persistence.save();
        Ok(())
    }

    /// Drops every cached fact and rebuilds from the workspace.
    pub async fn reset_cache(&self) -> Result<()> {
        self.persistence.clear().await;
        self.populate().await
    }

    /// Cancels pending work and writes a final snapshot.
    pub async fn shutdown(&self) -> bool {
        self.queue.close();
        self.scheduler.shutdown();
        self.persistence.save_now().await
    }

    /// Resolves once queued analyses have drained.
    pub async fn wait_for_analysis(&self) {
        self.queue.wait_idle().await;
    }

    // ---- Ingestion ----

    pub fn on_document_opened(&self, doc: &TextDocument) {
        if self.is_script(&doc.path) {
            self.ingest_script(doc);
        } else if self.is_module(&doc.path) {
            self.index.symbols(&doc.path);
        }
    }

    pub fn on_document_changed(&self, doc: &TextDocument) {
        if self.config.process_on_edit {
            self.ingest(doc);
        }
    }

    pub fn on_document_saved(&self, doc: &TextDocument) {
        if self.config.process_on_save {
            self.ingest(doc);
        }
    }

    /// A closed module falls back to its on-disk text.
    pub fn on_document_closed(&self, path: &Path) {
        if self.is_module(path) {
            self.index.invalidate_symbols(path);
            self.schedule_symbol_refresh(path);
        }
    }

    pub fn on_file_created(&self, path: &Path) {
        if self.is_module(path) {
            self.index.invalidate_symbols(path);
            self.schedule_symbol_refresh(path);
        } else if self.is_script(path) {
            let Some(text) = self.index.content().read(path) else {
                return;
            };
            if self.index.scan_imports(&TextDocument::new(path.to_path_buf(), text, 0)) > 0 {
                self.persistence.save();
            }
        }
    }

    pub fn on_file_deleted(&self, path: &Path) {
        if self.is_module(path) {
            let id = self.index.intern(path);
            self.scheduler.cancel(&TimerKey::SymbolRefresh(id));
            self.index.invalidate_symbols(path);
            self.persistence.save();
            self.reanalyze_open_dependents(path);
        } else if self.is_script(path) {
            let sink = self.sink.clone();
            let path = path.to_path_buf();
            tokio::spawn(async move { sink.publish(&path, Vec::new()).await });
        }
    }

    fn ingest(&self, doc: &TextDocument) {
        if self.is_script(&doc.path) {
            self.ingest_script(doc);
        } else if self.is_module(&doc.path) {
            self.index.invalidate_symbols(&doc.path);
            self.schedule_symbol_refresh(&doc.path);
        }
    }

    fn ingest_script(&self, doc: &TextDocument) {
        if self.index.scan_imports(doc) > 0 {
            self.persistence.save();
        }
        self.queue.push(doc.path.clone());
    }

    fn schedule_symbol_refresh(&self, path: &Path) {
        let id = self.index.intern(path);
        let index = self.index.clone();
        let persistence = self.persistence.clone();
        let queue = self.queue.clone();
        let path = path.to_path_buf();

        self.scheduler.schedule(
            TimerKey::SymbolRefresh(id),
            self.config.debounce.symbol_refresh(),
            move || async move {
                let refreshed = {
                    let index = index.clone();
                    let path = path.clone();
                    tokio::task::spawn_blocking(move || index.refresh_symbols(&path)).await
                };
                match refreshed {
                    Ok(table) => tracing::debug!(
                        "Refreshed {} classes of {}",
                        table.len(),
                        path.display()
                    ),
                    Err(e) => tracing::warn!("Symbol refresh of {} failed: {}", path.display(), e),
                }
                persistence.save();
                for dependent in index.dependents_of(&path) {
                    if index.content().is_open(&dependent) {
                        queue.push(dependent);
                    }
                }
            },
        );
    }

    fn reanalyze_open_dependents(&self, module: &Path) {
        for dependent in self.index.dependents_of(module) {
            if self.index.content().is_open(&dependent) {
                self.queue.push(dependent);
            }
        }
    }

    fn is_script(&self, path: &Path) -> bool {
        self.index.resolver().is_script_path(path)
    }

    fn is_module(&self, path: &Path) -> bool {
        self.index.resolver().is_module_path(path)
    }

    // ---- Queries ----

    /// Diagnostics of a document, computed now and not published.
    pub fn check_document(&self, doc: &TextDocument) -> Vec<Diagnostic> {
        self.checker.check(doc)
    }

    pub fn class_names_of(&self, module: &Path) -> Vec<String> {
        self.index.class_names_of(module)
    }

    pub fn has_class(&self, module: &Path, name: &str) -> bool {
        self.index.has_class(module, name)
    }

    pub fn ranges_of(&self, module: &Path, name: &str) -> Vec<TextRange> {
        self.index.ranges_of(module, name)
    }

    pub fn dependents_of(&self, module: &Path) -> Vec<PathBuf> {
        self.index.dependents_of(module)
    }

    pub fn all_dependent_paths(&self) -> Vec<PathBuf> {
        self.index.all_dependent_paths()
    }

    pub fn modules_with_dependents(&self) -> Vec<PathBuf> {
        self.index.modules_with_dependents()
    }
}
