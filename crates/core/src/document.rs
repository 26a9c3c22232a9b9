//! Documents as the index sees them, plus byte offset <-> position mapping.

use crate::model::{Position, TextRange};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Lexical flavour of a file, selected by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Script,
    Css,
    Scss,
    Sass,
    Less,
    Stylus,
    Unknown,
}

impl Dialect {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("js" | "jsx" | "ts" | "tsx" | "mjs" | "cjs" | "mts" | "cts") => Dialect::Script,
            Some("css" | "pcss" | "postcss") => Dialect::Css,
            Some("scss") => Dialect::Scss,
            Some("sass") => Dialect::Sass,
            Some("less") => Dialect::Less,
            Some("styl" | "stylus") => Dialect::Stylus,
            _ => Dialect::Unknown,
        }
    }

    pub fn is_script(self) -> bool {
        self == Dialect::Script
    }

    pub fn is_stylesheet(self) -> bool {
        matches!(
            self,
            Dialect::Css | Dialect::Scss | Dialect::Sass | Dialect::Less | Dialect::Stylus
        )
    }

    /// Whether `//` starts a comment.
    pub fn has_line_comments(self) -> bool {
        !matches!(self, Dialect::Css | Dialect::Unknown)
    }
}

/// Snapshot of a document's text at one version.
#[derive(Debug, Clone)]
pub struct TextDocument {
    pub path: PathBuf,
    pub text: Arc<str>,
    pub version: i32,
    pub dialect: Dialect,
}

impl TextDocument {
    pub fn new(path: PathBuf, text: impl Into<Arc<str>>, version: i32) -> Self {
        let dialect = Dialect::from_path(&path);
        Self {
            path,
            text: text.into(),
            version,
            dialect,
        }
    }

    pub fn line_index(&self) -> LineIndex {
        LineIndex::new(&self.text)
    }
}

/// Line start table for converting between byte offsets and positions.
pub struct LineIndex {
    line_starts: Vec<usize>,
    source: String,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, c) in source.char_indices() {
            if c == '\n' {
                line_starts.push(i + 1);
            }
        }
        Self {
            line_starts,
            source: source.to_string(),
        }
    }

    /// Byte offset of a position. Characters past the end of a line clamp to it.
    pub fn offset(&self, position: Position) -> Option<usize> {
        let line_start = *self.line_starts.get(position.line as usize)?;
        let line_text = self.line_text(position.line)?;

        let mut utf16_offset = 0u32;
        for (byte_offset, c) in line_text.char_indices() {
            if utf16_offset >= position.character {
                return Some(line_start + byte_offset);
            }
            utf16_offset += c.len_utf16() as u32;
        }
        Some(line_start + line_text.len())
    }

    pub fn position(&self, offset: usize) -> Position {
        let mut offset = offset.min(self.source.len());
        while !self.source.is_char_boundary(offset) {
            offset -= 1;
        }
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let line_start = self.line_starts[line];
        let character: u32 = self.source[line_start..offset]
            .chars()
            .map(|c| c.len_utf16() as u32)
            .sum();
        Position::new(line as u32, character)
    }

    pub fn range(&self, start: usize, end: usize) -> TextRange {
        TextRange::new(self.position(start), self.position(end))
    }

    fn line_text(&self, line: u32) -> Option<&str> {
        let start = *self.line_starts.get(line as usize)?;
        let end = self
            .line_starts
            .get(line as usize + 1)
            .copied()
            .unwrap_or(self.source.len());
        Some(self.source[start..end].trim_end_matches(['\n', '\r']))
    }
}
