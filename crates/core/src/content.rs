//! Where document text comes from.

use std::path::Path;

/// Text provider for files the index reads on demand. A host with open
/// editor buffers layers them over the file system.
pub trait ContentSource: Send + Sync {
    fn read(&self, path: &Path) -> Option<String>;

    /// Whether the file exists on disk.
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    /// Whether the file is currently open in an editor.
    fn is_open(&self, _path: &Path) -> bool {
        false
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FsContentSource;

impl ContentSource for FsContentSource {
    fn read(&self, path: &Path) -> Option<String> {
        match std::fs::read_to_string(path) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::debug!("Failed to read {}: {}", path.display(), e);
                None
            }
        }
    }
}
