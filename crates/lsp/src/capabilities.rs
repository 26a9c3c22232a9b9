use tower_lsp::lsp_types::*;

pub const RESET_CACHE_COMMAND: &str = "stylescope.resetCache";

pub fn server_capabilities() -> ServerCapabilities {
    let file_filter = FileOperationRegistrationOptions {
        filters: vec![FileOperationFilter {
            scheme: Some("file".to_string()),
            pattern: FileOperationPattern {
                glob: "**/*".to_string(),
                matches: Some(FileOperationPatternKind::File),
                options: None,
            },
        }],
    };

    ServerCapabilities {
        text_document_sync: Some(TextDocumentSyncCapability::Options(
            TextDocumentSyncOptions {
                open_close: Some(true),
                change: Some(TextDocumentSyncKind::FULL),
                save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                    include_text: Some(false),
                })),
                ..Default::default()
            },
        )),
        execute_command_provider: Some(ExecuteCommandOptions {
            commands: vec![RESET_CACHE_COMMAND.to_string()],
            work_done_progress_options: Default::default(),
        }),
        workspace: Some(WorkspaceServerCapabilities {
            workspace_folders: None,
            file_operations: Some(WorkspaceFileOperationsServerCapabilities {
                did_create: Some(file_filter.clone()),
                did_delete: Some(file_filter),
                ..Default::default()
            }),
        }),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advertises_reset_command_and_file_operations() {
        let caps = server_capabilities();
        let commands = caps.execute_command_provider.unwrap().commands;
        assert_eq!(commands, vec![RESET_CACHE_COMMAND.to_string()]);

        let file_ops = caps.workspace.unwrap().file_operations.unwrap();
        assert!(file_ops.did_create.is_some());
        assert!(file_ops.did_delete.is_some());
        assert!(file_ops.will_rename.is_none());
    }
}
