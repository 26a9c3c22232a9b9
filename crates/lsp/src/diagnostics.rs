use std::path::Path;
use stylescope_core::analysis::{self, DiagnosticKind, DiagnosticSink, Severity};
use stylescope_core::model::TextRange;
use tower_lsp::Client;
use tower_lsp::async_trait;
use tower_lsp::lsp_types::{
    Diagnostic, DiagnosticSeverity, NumberOrString, Position, Range, Url,
};

pub const DIAGNOSTIC_SOURCE: &str = "stylescope";

/// Publishes analysis results to the editor.
pub struct LspDiagnosticSink {
    client: Client,
}

impl LspDiagnosticSink {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DiagnosticSink for LspDiagnosticSink {
    async fn publish(&self, path: &Path, diagnostics: Vec<analysis::Diagnostic>) {
        let Ok(uri) = Url::from_file_path(path) else {
            tracing::warn!("Cannot publish diagnostics for {}", path.display());
            return;
        };
        let diagnostics = diagnostics.iter().map(to_lsp_diagnostic).collect();
        self.client.publish_diagnostics(uri, diagnostics, None).await;
    }
}

pub fn to_lsp_range(range: TextRange) -> Range {
    Range::new(
        Position::new(range.start.line, range.start.character),
        Position::new(range.end.line, range.end.character),
    )
}

pub fn to_lsp_diagnostic(diagnostic: &analysis::Diagnostic) -> Diagnostic {
    let severity = match diagnostic.severity() {
        Severity::Error => DiagnosticSeverity::ERROR,
        Severity::Warning => DiagnosticSeverity::WARNING,
    };
    let code = match diagnostic.kind {
        DiagnosticKind::ModuleNotFound => "module-not-found",
        DiagnosticKind::UndefinedClass => "undefined-class",
    };
    Diagnostic {
        range: to_lsp_range(diagnostic.range),
        severity: Some(severity),
        code: Some(NumberOrString::String(code.to_string())),
        source: Some(DIAGNOSTIC_SOURCE.to_string()),
        message: diagnostic.message.clone(),
        ..Default::default()
    }
}
