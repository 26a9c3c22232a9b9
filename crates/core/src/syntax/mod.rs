//! Collaborators that turn raw text into the facts the index needs.
//!
//! Each concern sits behind a trait so a host can inject a real grammar
//! engine; the default implementations are lexical approximations that never
//! fail on malformed input.

mod css;
mod imports;
mod lexer;

pub use css::SafeCssParser;
pub use imports::RegexImportExtractor;
pub use lexer::LexicalClassifier;

use crate::document::Dialect;
use crate::error::Result;
use std::ops::Range;

/// A style rule as reported by a stylesheet parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRule {
    /// Selector text, trimmed.
    pub selector: String,
    /// Byte offset of the first selector character in the document.
    pub selector_offset: usize,
}

pub trait StylesheetParser: Send + Sync {
    fn parse(&self, text: &str, dialect: Dialect) -> Result<Vec<StyleRule>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    Comment,
    String,
}

/// Comment and string spans of a document, sorted and non-overlapping.
#[derive(Debug, Clone, Default)]
pub struct LexicalRegions {
    regions: Vec<(Range<usize>, RegionKind)>,
}

impl LexicalRegions {
    pub fn new(mut regions: Vec<(Range<usize>, RegionKind)>) -> Self {
        regions.retain(|(r, _)| r.start < r.end);
        regions.sort_by_key(|(r, _)| r.start);
        Self { regions }
    }

    pub fn kind_at(&self, offset: usize) -> Option<RegionKind> {
        let idx = self.regions.partition_point(|(r, _)| r.start <= offset);
        let (range, kind) = self.regions.get(idx.checked_sub(1)?)?;
        range.contains(&offset).then_some(*kind)
    }

    pub fn in_comment(&self, offset: usize) -> bool {
        self.kind_at(offset) == Some(RegionKind::Comment)
    }

    pub fn in_string(&self, offset: usize) -> bool {
        self.kind_at(offset) == Some(RegionKind::String)
    }

    pub fn in_string_or_comment(&self, offset: usize) -> bool {
        self.kind_at(offset).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Range<usize>, RegionKind)> {
        self.regions.iter()
    }
}

pub trait TokenClassifier: Send + Sync {
    fn classify(&self, text: &str, dialect: Dialect) -> LexicalRegions;
}

/// `import <binding> from '<specifier>'` where the specifier names a module file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStatement {
    pub binding: String,
    pub specifier: String,
    pub statement_offset: usize,
    /// Offset of the first character inside the quotes.
    pub specifier_offset: usize,
}

impl ImportStatement {
    pub fn specifier_span(&self) -> Range<usize> {
        self.specifier_offset..self.specifier_offset + self.specifier.len()
    }
}

pub trait ImportExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Vec<ImportStatement>;
}

/// Class selectors of one selector string as `(local offset, name)` pairs.
/// The offset points at the first character of the name, after the dot.
/// Attribute brackets, quoted strings and `#{}` interpolations are skipped.
pub fn class_selectors(selector: &str) -> Vec<(usize, &str)> {
    let bytes = selector.as_bytes();
    let mut out = Vec::new();
    let mut bracket_depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match b {
            b'\\' => i += 2,
            b'"' | b'\'' => {
                quote = Some(b);
                i += 1;
            }
            b'[' => {
                bracket_depth += 1;
                i += 1;
            }
            b']' => {
                bracket_depth = bracket_depth.saturating_sub(1);
                i += 1;
            }
            b'#' if bytes.get(i + 1) == Some(&b'{') => {
                i = selector[i..].find('}').map(|p| i + p + 1).unwrap_or(bytes.len());
            }
            b'.' if bracket_depth == 0 => {
                let start = i + 1;
                let len = ident_len(&selector[start..]);
                if len > 0 {
                    out.push((start, &selector[start..start + len]));
                }
                i = start + len;
            }
            _ => i += 1,
        }
    }
    out
}

/// Length of a class identifier: a word character followed by word characters or dashes.
fn ident_len(s: &str) -> usize {
    let mut chars = s.char_indices();
    match chars.next() {
        Some((_, c)) if c.is_alphanumeric() || c == '_' => {}
        _ => return 0,
    }
    for (idx, c) in chars {
        if !(c.is_alphanumeric() || c == '_' || c == '-') {
            return idx;
        }
    }
    s.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_selectors() {
        let found = class_selectors(".btn.primary > a:not(.x), .card-body");
        let names: Vec<_> = found.iter().map(|(_, n)| *n).collect();
        assert_eq!(names, vec!["btn", "primary", "x", "card-body"]);
        assert_eq!(found[0].0, 1);
        assert_eq!(found[1].0, 5);
    }

    #[test]
    fn test_class_selectors_skip_attributes_and_strings() {
        let found = class_selectors("a[href$=\".pdf\"] .real, .a-#{$x}");
        let names: Vec<_> = found.iter().map(|(_, n)| *n).collect();
        assert_eq!(names, vec!["real", "a-"]);
    }

    #[test]
    fn test_regions_lookup() {
        let regions = LexicalRegions::new(vec![
            (10..20, RegionKind::String),
            (0..5, RegionKind::Comment),
        ]);
        assert!(regions.in_comment(0));
        assert!(regions.in_comment(4));
        assert!(!regions.in_comment(5));
        assert!(regions.in_string(10));
        assert!(!regions.in_string(20));
        assert_eq!(regions.kind_at(7), None);
    }
}
