#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use stylescope_core::analysis::{DiagnosticSink, DiagnosticStore};
use stylescope_core::config::{DebounceConfig, IndexConfig};
use stylescope_core::content::{ContentSource, FsContentSource};
use stylescope_core::persistence::SnapshotStore;
use stylescope_core::StylescopeEngine;
use tempfile::TempDir;

/// Temporary workspace plus a private snapshot directory.
pub struct Workspace {
    pub dir: TempDir,
    pub cache: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            cache: tempfile::tempdir().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root().join(rel)
    }

    pub fn write(&self, rel: &str, body: &str) -> PathBuf {
        let path = self.path(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, body).unwrap();
        path
    }

    pub fn store(&self) -> SnapshotStore {
        SnapshotStore::at(self.cache.path().to_path_buf())
    }

    pub fn engine(&self, sink: Arc<DiagnosticStore>) -> StylescopeEngine {
        self.engine_with(fast_config(), sink, Arc::new(FsContentSource))
    }

    pub fn engine_with(
        &self,
        config: IndexConfig,
        sink: Arc<DiagnosticStore>,
        content: Arc<dyn ContentSource>,
    ) -> StylescopeEngine {
        let sink: Arc<dyn DiagnosticSink> = sink;
        StylescopeEngine::builder(self.root().to_path_buf())
            .with_config(config)
            .with_diagnostic_sink(sink)
            .with_content_source(content)
            .with_snapshot_store(self.store())
            .build()
    }
}

pub fn fast_config() -> IndexConfig {
    IndexConfig {
        debounce: DebounceConfig {
            analysis_ms: 5,
            symbol_refresh_ms: 10,
            save_ms: 10,
        },
        ..IndexConfig::default()
    }
}

/// Open buffers over the file system, like an editor host.
#[derive(Default)]
pub struct Buffers {
    open: RwLock<HashMap<PathBuf, String>>,
}

impl Buffers {
    pub fn open(&self, path: &Path, text: &str) {
        self.open
            .write()
            .unwrap()
            .insert(path.to_path_buf(), text.to_string());
    }

    pub fn close(&self, path: &Path) {
        self.open.write().unwrap().remove(path);
    }
}

impl ContentSource for Buffers {
    fn read(&self, path: &Path) -> Option<String> {
        if let Some(text) = self.open.read().unwrap().get(path) {
            return Some(text.clone());
        }
        FsContentSource.read(path)
    }

    fn is_open(&self, path: &Path) -> bool {
        self.open.read().unwrap().contains_key(path)
    }
}
