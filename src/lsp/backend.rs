//! LSP backend: test code lenses and the run commands

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tower_lsp::jsonrpc::{Error, Result};
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

use crate::config::RunnerSettings;
use crate::lsp::convert::{CommandArgs, definition_to_code_lens, parse_command_args};
use crate::scanner::scan;
use crate::session::{ActiveDocument, TestAction, TestSession};
use crate::terminal::{ShellOutput, ShellTerminal};
use crate::workspace::{is_test_module, language_id_for, workspace_root_for};

/// Name of the terminal session the commands are sent to.
pub const TERMINAL_NAME: &str = "djangoTestRunner";

/// Document state stored by the LSP
#[derive(Debug, Clone)]
pub struct OpenDocument {
    pub text: String,
    pub language_id: String,
    pub version: i32,
}

/// Django test runner language server
pub struct DjangoTestServer {
    client: Client,
    documents: Arc<RwLock<HashMap<Url, OpenDocument>>>,
    settings: Arc<RwLock<RunnerSettings>>,
    workspace_folders: Arc<RwLock<Vec<PathBuf>>>,
    session: Arc<Mutex<TestSession<ShellTerminal>>>,
}

impl DjangoTestServer {
    pub fn new(client: Client) -> Self {
        let terminal = ShellTerminal::new(TERMINAL_NAME).with_output(ShellOutput::Stderr);
        Self::with_terminal(client, terminal)
    }

    /// Server sending its runs to `terminal`.
    pub fn with_terminal(client: Client, terminal: ShellTerminal) -> Self {
        Self {
            client,
            documents: Arc::new(RwLock::new(HashMap::new())),
            settings: Arc::new(RwLock::new(RunnerSettings::default())),
            workspace_folders: Arc::new(RwLock::new(Vec::new())),
            session: Arc::new(Mutex::new(TestSession::new(terminal))),
        }
    }

    async fn update_settings(&self, value: &Value) {
        match RunnerSettings::from_json(value) {
            Ok(settings) => {
                tracing::debug!(?settings, "settings updated");
                *self.settings.write().await = settings;
            }
            Err(e) => {
                self.client.log_message(MessageType::WARNING, e.to_string()).await;
            }
        }
    }

    /// Build the active document a command refers to.
    ///
    /// Open documents come from the editor's buffer; anything else is read
    /// from disk.
    async fn active_document(&self, args: &CommandArgs) -> Option<ActiveDocument> {
        let path = args.uri.to_file_path().ok()?;
        let open = self.documents.read().await.get(&args.uri).cloned();
        let (text, language_id) = match open {
            Some(doc) => (doc.text, doc.language_id),
            None => {
                let text = tokio::fs::read_to_string(&path).await.ok()?;
                (text, language_id_for(&path).to_string())
            }
        };

        let folders = self.workspace_folders.read().await;
        Some(ActiveDocument {
            workspace_root: workspace_root_for(&path, &folders),
            path,
            text,
            cursor_line: args.cursor_line(),
            language_id,
        })
    }
}

/// Code lenses for a document, or `None` when it is not a Python test module.
pub fn code_lenses_for(uri: &Url, document: &OpenDocument) -> Option<Vec<CodeLens>> {
    if document.language_id != "python" || !is_test_module(Path::new(uri.path())) {
        return None;
    }
    Some(
        scan(&document.text)
            .iter()
            .map(|definition| definition_to_code_lens(uri, definition))
            .collect(),
    )
}

fn folder_paths(folders: &[WorkspaceFolder]) -> Vec<PathBuf> {
    folders
        .iter()
        .filter_map(|folder| folder.uri.to_file_path().ok())
        .collect()
}

#[tower_lsp::async_trait]
impl LanguageServer for DjangoTestServer {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let mut folders = params.workspace_folders.as_deref().map(folder_paths).unwrap_or_default();
        #[allow(deprecated)]
        let root_uri = params.root_uri.clone();
        if folders.is_empty() {
            if let Some(root) = root_uri.and_then(|uri| uri.to_file_path().ok()) {
                folders.push(root);
            }
        }

        if let Some(first) = folders.first() {
            self.session.lock().await.terminal_mut().set_working_dir(first);
        }
        *self.workspace_folders.write().await = folders;

        if let Some(options) = &params.initialization_options {
            self.update_settings(options).await;
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                // Full text so lenses and resolution see the unsaved buffer
                text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
                code_lens_provider: Some(CodeLensOptions {
                    resolve_provider: Some(false),
                }),
                execute_command_provider: Some(ExecuteCommandOptions {
                    commands: TestAction::ALL
                        .iter()
                        .map(|action| action.command_id().to_string())
                        .collect(),
                    work_done_progress_options: WorkDoneProgressOptions::default(),
                }),
                workspace: Some(WorkspaceServerCapabilities {
                    workspace_folders: Some(WorkspaceFoldersServerCapabilities {
                        supported: Some(true),
                        change_notifications: Some(OneOf::Left(true)),
                    }),
                    file_operations: None,
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "djtest-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "Django test runner initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;
        self.documents.write().await.insert(
            doc.uri,
            OpenDocument {
                text: doc.text,
                language_id: doc.language_id,
                version: doc.version,
            },
        );
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        // We use FULL sync, so there's only one change with the full content
        let Some(change) = params.content_changes.into_iter().next() else {
            return;
        };
        let mut docs = self.documents.write().await;
        if let Some(doc) = docs.get_mut(&params.text_document.uri) {
            doc.text = change.text;
            doc.version = params.text_document.version;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.documents.write().await.remove(&params.text_document.uri);
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        self.update_settings(&params.settings).await;
    }

    async fn did_change_workspace_folders(&self, params: DidChangeWorkspaceFoldersParams) {
        let removed = folder_paths(&params.event.removed);
        let added = folder_paths(&params.event.added);
        let mut folders = self.workspace_folders.write().await;
        folders.retain(|folder| !removed.contains(folder));
        folders.extend(added);
    }

    async fn code_lens(&self, params: CodeLensParams) -> Result<Option<Vec<CodeLens>>> {
        let uri = params.text_document.uri;
        let docs = self.documents.read().await;
        Ok(docs.get(&uri).and_then(|doc| code_lenses_for(&uri, doc)))
    }

    async fn execute_command(&self, params: ExecuteCommandParams) -> Result<Option<Value>> {
        let action: TestAction = params
            .command
            .parse()
            .map_err(|e: crate::session::UnknownAction| Error::invalid_params(e.to_string()))?;
        let args = parse_command_args(&params.arguments).map_err(|e| Error::invalid_params(e.to_string()))?;

        let document = match &args {
            Some(args) if action != TestAction::RunPrevious => self.active_document(args).await,
            _ => None,
        };
        let bound = args.as_ref().and_then(CommandArgs::bound);
        let settings = self.settings.read().await.clone();

        let result = {
            let mut session = self.session.lock().await;
            if let Some(root) = document.as_ref().and_then(|doc| doc.workspace_root.as_ref()) {
                session.terminal_mut().set_working_dir(root);
            }
            session.run(action, document.as_ref(), &settings, bound)
        };

        match result {
            Ok(test_path) => Ok(Some(Value::String(test_path))),
            Err(e) => {
                tracing::warn!(%action, error = %e, "test command failed");
                self.client.show_message(MessageType::ERROR, e.to_string()).await;
                Ok(None)
            }
        }
    }
}
