use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Interned id of a workspace-relative path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathId(pub u32);

impl PathId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Zero-based line and UTF-16 character offset, as editors count them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TextRange {
    pub start: Position,
    pub end: Position,
}

impl TextRange {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

/// One occurrence of a class selector in a module file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRange {
    pub range: TextRange,
}

/// Class name -> every range where a rule selects it, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassTable(IndexMap<String, Vec<ClassRange>>);

impl ClassTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, range: TextRange) {
        self.0
            .entry(name.to_string())
            .or_default()
            .push(ClassRange { range });
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn ranges(&self, name: &str) -> &[ClassRange] {
        self.0.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ClassRange])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Vec<ClassRange>)> for ClassTable {
    fn from_iter<I: IntoIterator<Item = (String, Vec<ClassRange>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
