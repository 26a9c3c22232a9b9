pub mod capabilities;
pub mod diagnostics;
pub mod documents;

use crate::capabilities::RESET_CACHE_COMMAND;
use crate::diagnostics::LspDiagnosticSink;
use crate::documents::OpenDocuments;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use stylescope_core::config::IndexConfig;
use stylescope_core::content::ContentSource;
use stylescope_core::document::TextDocument;
use stylescope_core::StylescopeEngine;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tower_lsp::jsonrpc::{Error, Result};
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

pub struct LspServer {
    client: Client,
    pub engine: Arc<RwLock<Option<Arc<StylescopeEngine>>>>,
    pub documents: Arc<OpenDocuments>,
    cancel_token: CancellationToken,
}

impl LspServer {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            engine: Arc::new(RwLock::new(None)),
            documents: Arc::new(OpenDocuments::new()),
            cancel_token: CancellationToken::new(),
        }
    }

    async fn engine(&self) -> Option<Arc<StylescopeEngine>> {
        self.engine.read().await.clone()
    }

    fn build_engine(&self, root: PathBuf, options: Option<Value>) -> StylescopeEngine {
        let config = match options {
            Some(value) if !value.is_null() => IndexConfig::from_json_value_or_default(Some(value)),
            _ => IndexConfig::load_or_default(&root),
        };
        StylescopeEngine::builder(root)
            .with_config(config)
            .with_content_source(self.documents.clone())
            .with_diagnostic_sink(Arc::new(LspDiagnosticSink::new(self.client.clone())))
            .build()
    }
}

fn root_from_params(params: &InitializeParams) -> Option<PathBuf> {
    #[allow(deprecated)]
    let root_uri = params.root_uri.as_ref();
    root_uri
        .or_else(|| {
            params
                .workspace_folders
                .as_ref()
                .and_then(|folders| folders.first())
                .map(|folder| &folder.uri)
        })
        .and_then(|uri| uri.to_file_path().ok())
}

fn uri_to_path(uri: &Url) -> Option<PathBuf> {
    uri.to_file_path().ok()
}

fn file_uri_to_path(uri: &str) -> Option<PathBuf> {
    Url::parse(uri).ok().and_then(|uri| uri.to_file_path().ok())
}

#[tower_lsp::async_trait]
impl LanguageServer for LspServer {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        match root_from_params(&params) {
            Some(root) => {
                tracing::info!("Initializing workspace {}", root.display());
                let engine = self.build_engine(root, params.initialization_options.clone());
                *self.engine.write().await = Some(Arc::new(engine));
            }
            None => tracing::warn!("No workspace root given; running without an index"),
        }

        Ok(InitializeResult {
            server_info: Some(ServerInfo {
                name: "Stylescope".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            capabilities: capabilities::server_capabilities(),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        let Some(engine) = self.engine().await else {
            return;
        };
        let client = self.client.clone();
        let documents = self.documents.clone();
        let cancel = self.cancel_token.clone();

        tokio::spawn(async move {
            let start = std::time::Instant::now();
            let loaded = tokio::select! {
                _ = cancel.cancelled() => return,
                result = engine.initialize() => result,
            };
            let message = match loaded {
                Ok(true) => format!("Stylescope loaded cached index in {:?}", start.elapsed()),
                Ok(false) => {
                    let stats = engine.stats();
                    format!(
                        "Stylescope indexed {} files ({} dependency edges) in {:?}",
                        stats.paths,
                        stats.dependency_edges,
                        start.elapsed()
                    )
                }
                Err(e) => {
                    client
                        .log_message(MessageType::ERROR, format!("Initial indexing failed: {}", e))
                        .await;
                    return;
                }
            };
            client.log_message(MessageType::INFO, message).await;

            for doc in documents.all() {
                engine.on_document_opened(&doc);
            }
        });
    }

    async fn shutdown(&self) -> Result<()> {
        self.cancel_token.cancel();
        if let Some(engine) = self.engine().await {
            engine.shutdown().await;
        }
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let Some(path) = uri_to_path(&params.text_document.uri) else {
            return;
        };
        let doc = self.documents.open(
            path,
            params.text_document.text,
            params.text_document.version,
        );
        if let Some(engine) = self.engine().await {
            engine.on_document_opened(&doc);
        }
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let Some(path) = uri_to_path(&params.text_document.uri) else {
            return;
        };
        let Some(doc) = self.documents.apply_changes(
            &path,
            &params.content_changes,
            params.text_document.version,
        ) else {
            tracing::debug!("Change for unopened document {}", path.display());
            return;
        };
        if let Some(engine) = self.engine().await {
            engine.on_document_changed(&doc);
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let Some(path) = uri_to_path(&params.text_document.uri) else {
            return;
        };
        let doc = match (params.text, self.documents.get(&path)) {
            (Some(text), Some(open)) => self.documents.open(path, text, open.version),
            (None, Some(open)) => open,
            (text, None) => {
                let Some(text) = text.or_else(|| std::fs::read_to_string(&path).ok()) else {
                    return;
                };
                TextDocument::new(path, text, 0)
            }
        };
        if let Some(engine) = self.engine().await {
            engine.on_document_saved(&doc);
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let Some(path) = uri_to_path(&params.text_document.uri) else {
            return;
        };
        self.documents.close(&path);
        if let Some(engine) = self.engine().await {
            engine.on_document_closed(&path);
        }
    }

    async fn did_create_files(&self, params: CreateFilesParams) {
        let Some(engine) = self.engine().await else {
            return;
        };
        for path in params.files.iter().filter_map(|f| file_uri_to_path(&f.uri)) {
            engine.on_file_created(&path);
        }
    }

    async fn did_delete_files(&self, params: DeleteFilesParams) {
        let Some(engine) = self.engine().await else {
            return;
        };
        for path in params.files.iter().filter_map(|f| file_uri_to_path(&f.uri)) {
            engine.on_file_deleted(&path);
        }
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        let Some(engine) = self.engine().await else {
            return;
        };
        for change in params.changes {
            let Some(path) = uri_to_path(&change.uri) else {
                continue;
            };
            if change.typ == FileChangeType::DELETED {
                engine.on_file_deleted(&path);
            } else if !self.documents.is_open(&path) {
                // Open buffers are authoritative; disk changes only matter for closed files.
                engine.on_file_created(&path);
            }
        }
    }

    async fn execute_command(&self, params: ExecuteCommandParams) -> Result<Option<Value>> {
        if params.command != RESET_CACHE_COMMAND {
            return Err(Error::invalid_params(format!(
                "Unknown command: {}",
                params.command
            )));
        }
        let Some(engine) = self.engine().await else {
            return Ok(None);
        };

        tracing::info!("Resetting cache for {}", engine.root_path().display());
        if let Err(e) = engine.reset_cache().await {
            self.client
                .log_message(MessageType::ERROR, format!("Cache reset failed: {}", e))
                .await;
            return Ok(None);
        }
        for doc in self.documents.all() {
            engine.on_document_opened(&doc);
        }
        self.client
            .log_message(MessageType::INFO, "Stylescope cache reset")
            .await;
        Ok(None)
    }
}

pub async fn run_server() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = tower_lsp::LspService::new(LspServer::new);
    tower_lsp::Server::new(stdin, stdout, socket)
        .serve(service)
        .await;

    Ok(())
}
