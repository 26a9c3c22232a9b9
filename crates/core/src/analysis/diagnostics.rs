use crate::model::TextRange;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticKind {
    /// The import target does not exist on disk.
    ModuleNotFound,
    /// A referenced class is missing from the module's symbol table.
    UndefinedClass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Severity {
    Error,
    Warning,
}

impl DiagnosticKind {
    pub fn severity(self) -> Severity {
        match self {
            DiagnosticKind::ModuleNotFound => Severity::Error,
            DiagnosticKind::UndefinedClass => Severity::Warning,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub range: TextRange,
    pub message: String,
}

impl Diagnostic {
    pub fn module_not_found(range: TextRange, specifier: &str) -> Self {
        Self {
            kind: DiagnosticKind::ModuleNotFound,
            range,
            message: format!("Cannot find module '{specifier}'"),
        }
    }

    pub fn undefined_class(range: TextRange, class_name: &str, specifier: &str) -> Self {
        Self {
            kind: DiagnosticKind::UndefinedClass,
            range,
            message: format!("Class \"{class_name}\" is not defined in {specifier}"),
        }
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

/// Receiver of per-document diagnostics. Each publish replaces the whole
/// previous set for that document.
#[async_trait]
pub trait DiagnosticSink: Send + Sync {
    async fn publish(&self, path: &Path, diagnostics: Vec<Diagnostic>);
}

/// In-memory sink, used by the CLI and tests.
#[derive(Debug, Default)]
pub struct DiagnosticStore {
    by_path: DashMap<PathBuf, Vec<Diagnostic>>,
}

impl DiagnosticStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Vec<Diagnostic> {
        self.by_path
            .get(path)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Whether anything was ever published for the path.
    pub fn contains(&self, path: &Path) -> bool {
        self.by_path.contains_key(path)
    }
}

#[async_trait]
impl DiagnosticSink for DiagnosticStore {
    async fn publish(&self, path: &Path, diagnostics: Vec<Diagnostic>) {
        self.by_path.insert(path.to_path_buf(), diagnostics);
    }
}
