//! Diagnostics for script documents: missing module files and class names
//! a module does not define.

pub mod diagnostics;
pub mod usage;

pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, DiagnosticStore, Severity};
pub use usage::{ClassUsage, find_usages};

use crate::document::TextDocument;
use crate::index::WorkspaceIndex;
use crate::runtime::DocumentAnalyzer;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

pub struct DocumentChecker {
    index: Arc<WorkspaceIndex>,
    sink: Arc<dyn DiagnosticSink>,
}

impl DocumentChecker {
    pub fn new(index: Arc<WorkspaceIndex>, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self { index, sink }
    }

    /// Full diagnostic set of one script document. Non-script documents
    /// have none.
    pub fn check(&self, doc: &TextDocument) -> Vec<Diagnostic> {
        if !doc.dialect.is_script() {
            return Vec::new();
        }

        let regions = self.index.classifier().classify(&doc.text, doc.dialect);
        let lines = doc.line_index();
        let resolver = self.index.resolver();
        let mut diagnostics = Vec::new();

        for import in self.index.imports_of(doc, &regions) {
            let target = resolver.resolve_import(&doc.path, &import.specifier);
            if !self.index.content().exists(&target) {
                let span = import.specifier_span();
                diagnostics.push(Diagnostic::module_not_found(
                    lines.range(span.start, span.end),
                    &import.specifier,
                ));
                continue;
            }

            let table = self.index.symbols(&target);
            for usage in find_usages(&doc.text, &import.binding, &regions) {
                if !table.contains(&usage.name) {
                    diagnostics.push(Diagnostic::undefined_class(
                        lines.range(usage.offset, usage.offset + usage.name.len()),
                        &usage.name,
                        &import.specifier,
                    ));
                }
            }
        }

        diagnostics
    }
}

#[async_trait]
impl DocumentAnalyzer<PathBuf> for DocumentChecker {
    async fn analyze(&self, path: PathBuf) {
        if !self.index.resolver().is_script_path(&path) {
            return;
        }
        let Some(text) = self.index.content().read(&path) else {
            tracing::debug!("Clearing diagnostics of unreadable {}", path.display());
            self.sink.publish(&path, Vec::new()).await;
            return;
        };
        let doc = TextDocument::new(path, text, 0);

        let diagnostics = self.check(&doc);
        tracing::debug!(
            "{} diagnostics for {}",
            diagnostics.len(),
            doc.path.display()
        );
        self.sink.publish(&doc.path, diagnostics).await;
    }
}
