use super::cache::{BoundedCache, Lru};
use crate::document::{Dialect, LineIndex};
use crate::model::{ClassTable, PathId};
use crate::syntax::{StylesheetParser, TokenClassifier, class_selectors};
use std::sync::Arc;

/// Recently used class tables, keyed by module path id.
#[derive(Debug)]
pub struct SymbolIndex {
    cache: BoundedCache<PathId, Arc<ClassTable>, Lru>,
    capacity: usize,
}

impl SymbolIndex {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            cache: BoundedCache::new(Lru::new(capacity)),
            capacity,
        }
    }

    pub fn get(&mut self, id: PathId) -> Option<Arc<ClassTable>> {
        self.cache.get(&id).cloned()
    }

    pub fn peek(&self, id: PathId) -> Option<&Arc<ClassTable>> {
        self.cache.peek(&id)
    }

    /// Stores a table as most recent; returns the ids evicted to make room.
    pub fn set(&mut self, id: PathId, table: Arc<ClassTable>) -> Vec<PathId> {
        self.cache
            .insert(id, table)
            .into_iter()
            .map(|(evicted, _)| evicted)
            .collect()
    }

    pub fn invalidate(&mut self, id: PathId) -> bool {
        self.cache.remove(&id).is_some()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Oldest to newest.
    pub fn entries(&self) -> impl Iterator<Item = (PathId, &Arc<ClassTable>)> {
        self.cache.iter().map(|(id, table)| (*id, table))
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

/// Builds the class table of a stylesheet.
///
/// Every class selector of every rule is recorded with the range of its
/// identifier. Rules the classifier places inside a comment are skipped. A
/// parser error yields an empty table.
pub fn extract_class_table(
    text: &str,
    dialect: Dialect,
    parser: &dyn StylesheetParser,
    classifier: &dyn TokenClassifier,
) -> ClassTable {
    let rules = match parser.parse(text, dialect) {
        Ok(rules) => rules,
        Err(e) => {
            tracing::debug!("Stylesheet parse failed, treating as empty: {}", e);
            return ClassTable::new();
        }
    };

    let regions = classifier.classify(text, dialect);
    let lines = LineIndex::new(text);
    let mut table = ClassTable::new();

    for rule in rules {
        if regions.in_comment(rule.selector_offset) {
            continue;
        }
        for (local, name) in class_selectors(&rule.selector) {
            let start = rule.selector_offset + local;
            table.add(name, lines.range(start, start + name.len()));
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, StylescopeError};
    use crate::model::{Position, TextRange};
    use crate::syntax::{LexicalClassifier, SafeCssParser, StyleRule};

    struct FailingParser;

    impl StylesheetParser for FailingParser {
        fn parse(&self, _text: &str, _dialect: Dialect) -> Result<Vec<StyleRule>> {
            Err(StylescopeError::Parsing("boom".into()))
        }
    }

    fn extract(text: &str, dialect: Dialect) -> ClassTable {
        extract_class_table(text, dialect, &SafeCssParser, &LexicalClassifier)
    }

    #[test]
    fn test_extracts_every_occurrence() {
        let table = extract(".btn { }\n.card .btn:hover { }\n", Dialect::Css);
        assert_eq!(table.class_names().collect::<Vec<_>>(), vec!["btn", "card"]);
        let ranges = table.ranges("btn");
        assert_eq!(ranges.len(), 2);
        assert_eq!(
            ranges[0].range,
            TextRange::new(Position::new(0, 1), Position::new(0, 4))
        );
        assert_eq!(
            ranges[1].range,
            TextRange::new(Position::new(1, 7), Position::new(1, 10))
        );
    }

    #[test]
    fn test_commented_rules_are_ignored() {
        let table = extract("// .ghost { }\n.real { }", Dialect::Scss);
        assert!(!table.contains("ghost"));
        assert!(table.contains("real"));
    }

    #[test]
    fn test_parse_failure_is_empty() {
        let table = extract_class_table(".a {}", Dialect::Css, &FailingParser, &LexicalClassifier);
        assert!(table.is_empty());
    }

    #[test]
    fn test_symbol_index_is_bounded() {
        let mut index = SymbolIndex::new(2);
        let table = Arc::new(ClassTable::new());
        index.set(PathId(0), table.clone());
        index.set(PathId(1), table.clone());
        assert!(index.get(PathId(0)).is_some());
        assert_eq!(index.set(PathId(2), table), vec![PathId(1)]);
        let ids: Vec<_> = index.entries().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![PathId(0), PathId(2)]);
        assert!(index.invalidate(PathId(0)));
        assert_eq!(index.len(), 1);
    }
}
