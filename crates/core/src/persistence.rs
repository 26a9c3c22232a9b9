//! On-disk snapshot of the workspace index.

use crate::error::{Result, StylescopeError};
use crate::index::WorkspaceIndex;
use crate::model::ClassTable;
use crate::runtime::{CoalescingScheduler, TimerKey};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use xxhash_rust::xxh3::xxh3_64;

pub const CACHE_FILE_NAME: &str = "css-modules-cache.json";
pub const CACHE_DIR_ENV: &str = "STYLESCOPE_CACHE_DIR";
pub const DEFAULT_CACHE_DIR: &str = ".stylescope/cache";

/// Serialized form of the index. Ids are positions in `path_map_cache`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSnapshot {
    #[serde(default)]
    pub path_map_cache: Vec<String>,
    #[serde(default)]
    pub module_path_cache: BTreeMap<u32, Vec<u32>>,
    /// Oldest to most recently used.
    #[serde(default)]
    pub class_name_cache: IndexMap<u32, ClassTable>,
}

/// Location and file I/O of one workspace's snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Per-workspace directory under [`SnapshotStore::base_dir`].
    pub fn for_workspace(root: &Path) -> Self {
        Self::in_base_dir(&Self::base_dir(), root)
    }

    pub fn in_base_dir(base: &Path, root: &Path) -> Self {
        let canonical = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        let hash = xxh3_64(canonical.to_string_lossy().as_bytes());
        Self {
            dir: base.join(format!("{:016x}", hash)),
        }
    }

    pub fn at(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// `STYLESCOPE_CACHE_DIR` when set, otherwise `~/.stylescope/cache`.
    pub fn base_dir() -> PathBuf {
        if let Ok(env_dir) = std::env::var(CACHE_DIR_ENV) {
            return PathBuf::from(env_dir);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_CACHE_DIR)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_path(&self) -> PathBuf {
        self.dir.join(CACHE_FILE_NAME)
    }

    /// Writes the snapshot atomically (temp file, then rename).
    pub fn write(&self, snapshot: &CacheSnapshot) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let bytes = serde_json::to_vec_pretty(snapshot)?;

        let path = self.file_path();
        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, bytes)?;
        std::fs::rename(&temp_path, &path)?;

        tracing::debug!("Saved snapshot to {}", path.display());
        Ok(())
    }

    pub fn read(&self) -> Result<Option<CacheSnapshot>> {
        let path = self.file_path();
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    pub fn remove(&self) -> Result<()> {
        let path = self.file_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// Debounced saving and miss-tolerant loading of a [`WorkspaceIndex`].
///
/// No failure here ever propagates: a failed load is a miss and a failed
/// save is logged and skipped.
pub struct PersistenceLayer {
    index: Arc<WorkspaceIndex>,
    store: SnapshotStore,
    scheduler: CoalescingScheduler<TimerKey>,
    save_delay: Duration,
}

impl PersistenceLayer {
    pub fn new(
        index: Arc<WorkspaceIndex>,
        store: SnapshotStore,
        scheduler: CoalescingScheduler<TimerKey>,
        save_delay: Duration,
    ) -> Self {
        Self {
            index,
            store,
            scheduler,
            save_delay,
        }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Schedules a write; calls within the save window collapse into one.
    pub fn save(self: &Arc<Self>) {
        let this = self.clone();
        self.scheduler
            .schedule(TimerKey::Save, self.save_delay, move || async move {
                this.save_now().await;
            });
    }

    /// Writes immediately. Returns whether the write succeeded.
    pub async fn save_now(&self) -> bool {
        let snapshot = self.index.snapshot();
        let store = self.store.clone();
        let written = tokio::task::spawn_blocking(move || store.write(&snapshot))
            .await
            .map_err(|e| StylescopeError::Internal(e.to_string()))
            .and_then(|r| r);
        match written {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    "Failed to save snapshot to {}: {}",
                    self.store.file_path().display(),
                    e
                );
                false
            }
        }
    }

    /// Replaces the index with the stored snapshot. `false` on any miss,
    /// which tells the caller to repopulate.
    pub async fn load(&self) -> bool {
        let store = self.store.clone();
        let read = tokio::task::spawn_blocking(move || store.read())
            .await
            .map_err(|e| StylescopeError::Internal(e.to_string()))
            .and_then(|r| r);

        let path = self.store.file_path();
        match read {
            Ok(Some(snapshot)) => match self.index.restore(snapshot) {
                Ok(()) => {
                    tracing::info!("Loaded snapshot from {}", path.display());
                    true
                }
                Err(e) => {
                    tracing::warn!(
                        "Inconsistent snapshot at {}: {}. Will rebuild.",
                        path.display(),
                        e
                    );
                    false
                }
            },
            Ok(None) => {
                tracing::info!("No snapshot at {}", path.display());
                false
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to read snapshot at {}: {}. Will rebuild.",
                    path.display(),
                    e
                );
                false
            }
        }
    }

    /// Resets the index and writes the empty snapshot.
    pub async fn clear(&self) -> bool {
        self.scheduler.cancel(&TimerKey::Save);
        self.index.reset();
        self.save_now().await
    }
}
