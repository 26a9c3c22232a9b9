use dashmap::DashMap;
use std::path::{Path, PathBuf};
use stylescope_core::content::{ContentSource, FsContentSource};
use stylescope_core::document::{LineIndex, TextDocument};
use stylescope_core::model::Position;
use tower_lsp::lsp_types::TextDocumentContentChangeEvent;

/// Editor buffers, layered over the file system for the index.
#[derive(Default)]
pub struct OpenDocuments {
    docs: DashMap<PathBuf, TextDocument>,
}

impl OpenDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, path: PathBuf, text: String, version: i32) -> TextDocument {
        let doc = TextDocument::new(path.clone(), text, version);
        self.docs.insert(path, doc.clone());
        doc
    }

    /// Applies full or ranged edits in order. `None` for a document that
    /// was never opened.
    pub fn apply_changes(
        &self,
        path: &Path,
        changes: &[TextDocumentContentChangeEvent],
        version: i32,
    ) -> Option<TextDocument> {
        let mut entry = self.docs.get_mut(path)?;
        let text = apply_content_changes(&entry.text, changes);
        let doc = TextDocument::new(path.to_path_buf(), text, version);
        *entry = doc.clone();
        Some(doc)
    }

    pub fn get(&self, path: &Path) -> Option<TextDocument> {
        self.docs.get(path).map(|entry| entry.value().clone())
    }

    pub fn close(&self, path: &Path) -> Option<TextDocument> {
        self.docs.remove(path).map(|(_, doc)| doc)
    }

    pub fn all(&self) -> Vec<TextDocument> {
        self.docs.iter().map(|entry| entry.value().clone()).collect()
    }
}

impl ContentSource for OpenDocuments {
    fn read(&self, path: &Path) -> Option<String> {
        match self.docs.get(path) {
            Some(doc) => Some(doc.text.to_string()),
            None => FsContentSource.read(path),
        }
    }

    fn is_open(&self, path: &Path) -> bool {
        self.docs.contains_key(path)
    }
}

pub fn apply_content_changes(text: &str, changes: &[TextDocumentContentChangeEvent]) -> String {
    let mut content = text.to_string();
    for change in changes {
        match change.range {
            Some(range) => {
                let lines = LineIndex::new(&content);
                let offset = |p: tower_lsp::lsp_types::Position| {
                    lines
                        .offset(Position::new(p.line, p.character))
                        .unwrap_or(content.len())
                };
                let start = offset(range.start);
                let end = offset(range.end).max(start);
                content.replace_range(start..end, &change.text);
            }
            None => content = change.text.clone(),
        }
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower_lsp::lsp_types::{Position as LspPosition, Range};

    fn edit(start: (u32, u32), end: (u32, u32), text: &str) -> TextDocumentContentChangeEvent {
        TextDocumentContentChangeEvent {
            range: Some(Range::new(
                LspPosition::new(start.0, start.1),
                LspPosition::new(end.0, end.1),
            )),
            range_length: None,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_ranged_edits_apply_in_order() {
        let text = "styles.a;\nstyles.b;\n";
        let changes = [edit((0, 7), (0, 8), "header"), edit((1, 0), (1, 0), "// ")];
        assert_eq!(
            apply_content_changes(text, &changes),
            "styles.header;\n// styles.b;\n"
        );
    }

    #[test]
    fn test_full_replacement() {
        let changes = [TextDocumentContentChangeEvent {
            range: None,
            range_length: None,
            text: "new".to_string(),
        }];
        assert_eq!(apply_content_changes("old", &changes), "new");
    }

    #[test]
    fn test_overlay_shadows_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.module.css");
        std::fs::write(&path, ".disk {}").unwrap();

        let docs = OpenDocuments::new();
        assert_eq!(docs.read(&path).as_deref(), Some(".disk {}"));
        assert!(!docs.is_open(&path));

        docs.open(path.clone(), ".buffer {}".to_string(), 1);
        assert_eq!(docs.read(&path).as_deref(), Some(".buffer {}"));
        let changed = docs
            .apply_changes(&path, &[edit((0, 1), (0, 7), "edited")], 2)
            .unwrap();
        assert_eq!(&*changed.text, ".edited {}");
        assert_eq!(changed.version, 2);

        docs.close(&path);
        assert_eq!(docs.read(&path).as_deref(), Some(".disk {}"));
    }
}
