//! In-process language server tests
//!
//! Requests go through tower-lsp's `LspService`, and whatever the server
//! sends back to the editor is read from the client socket.

use std::path::Path;
use std::time::Duration;

use futures::StreamExt;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tower::{Service, ServiceExt};
use tower_lsp::LspService;
use tower_lsp::jsonrpc::Request;
use tower_lsp::lsp_types::Url;

use djtest::lsp::DjangoTestServer;
use djtest::lsp::backend::TERMINAL_NAME;
use djtest::terminal::{ShellOutput, ShellTerminal};

struct Harness {
    service: LspService<DjangoTestServer>,
    messages: mpsc::UnboundedReceiver<Request>,
    next_id: i64,
}

impl Harness {
    /// Start a server whose terminal echoes commands to stderr instead of running them.
    async fn start(folders: Value) -> Self {
        let (service, socket) = LspService::new(|client| {
            let terminal = ShellTerminal::with_shell(TERMINAL_NAME, "cat", Vec::new()).with_output(ShellOutput::Stderr);
            DjangoTestServer::with_terminal(client, terminal)
        });

        let (tx, messages) = mpsc::unbounded_channel();
        let (mut requests, _responses) = socket.split();
        tokio::spawn(async move {
            while let Some(request) = requests.next().await {
                let _ = tx.send(request);
            }
        });

        let mut harness = Self {
            service,
            messages,
            next_id: 0,
        };
        harness
            .request(
                "initialize",
                json!({ "processId": null, "capabilities": {}, "workspaceFolders": folders }),
            )
            .await
            .unwrap();
        harness
    }

    async fn request(&mut self, method: &str, params: Value) -> Result<Value, tower_lsp::jsonrpc::Error> {
        self.next_id += 1;
        let request: Request = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": self.next_id,
            "method": method,
            "params": params,
        }))
        .unwrap();
        let response = self.service.ready().await.unwrap().call(request).await.unwrap().unwrap();
        let (_, result) = response.into_parts();
        result
    }

    async fn notify(&mut self, method: &str, params: Value) {
        let notification: Request = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        }))
        .unwrap();
        let response = self.service.ready().await.unwrap().call(notification).await.unwrap();
        assert!(response.is_none());
    }

    async fn execute(&mut self, command: &str, arguments: Value) -> Result<Value, tower_lsp::jsonrpc::Error> {
        self.request("workspace/executeCommand", json!({ "command": command, "arguments": arguments }))
            .await
    }

    /// Next `window/showMessage` params, or `None` if none arrives shortly.
    async fn show_message(&mut self) -> Option<Value> {
        loop {
            let next = tokio::time::timeout(Duration::from_millis(500), self.messages.recv()).await;
            match next {
                Ok(Some(request)) if request.method() == "window/showMessage" => {
                    return request.params().cloned();
                }
                Ok(Some(_)) => continue,
                Ok(None) | Err(_) => return None,
            }
        }
    }
}

fn fixture_root() -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/site")
}

fn fixture_folders() -> Value {
    let uri = Url::from_directory_path(fixture_root()).unwrap();
    json!([{ "uri": uri, "name": "site" }])
}

#[tokio::test]
async fn test_previous_without_history_shows_error() {
    let mut server = Harness::start(Value::Null).await;

    let result = server.execute("python.djangoTestRunner.runPreviousTests", json!([])).await;
    assert_eq!(result.unwrap(), Value::Null);

    let message = server.show_message().await.expect("showMessage notification");
    assert_eq!(message, json!({ "type": 1, "message": "No previous tests!" }));
}

#[tokio::test]
async fn test_method_without_document_shows_error() {
    let mut server = Harness::start(Value::Null).await;

    let result = server.execute("python.djangoTestRunner.runMethodTests", json!([])).await;
    assert_eq!(result.unwrap(), Value::Null);

    let message = server.show_message().await.expect("showMessage notification");
    assert_eq!(message["type"], json!(1));
    assert_eq!(
        message["message"],
        json!("python.djangoTestRunner.runMethodTests needs an active document")
    );
}

#[tokio::test]
async fn test_unknown_command_is_rejected() {
    let mut server = Harness::start(Value::Null).await;
    let err = server.execute("python.djangoTestRunner.runEverything", json!([])).await.unwrap_err();
    assert!(err.message.contains("runEverything"));
    assert!(server.show_message().await.is_none());
}

#[cfg(unix)]
#[tokio::test]
async fn test_lens_command_runs_and_is_replayed() {
    let mut server = Harness::start(fixture_folders()).await;
    let path = fixture_root().join("blog/tests/test_articles.py");
    let uri = Url::from_file_path(&path).unwrap();
    server
        .notify(
            "textDocument/didOpen",
            json!({
                "textDocument": {
                    "uri": uri,
                    "languageId": "python",
                    "version": 1,
                    "text": std::fs::read_to_string(&path).unwrap(),
                }
            }),
        )
        .await;

    // Arguments exactly as the lens on `test_slug` (line 12) sends them
    let lenses = server
        .request("textDocument/codeLens", json!({ "textDocument": { "uri": uri } }))
        .await
        .unwrap();
    let lens = lenses
        .as_array()
        .unwrap()
        .iter()
        .find(|lens| lens["range"]["start"]["line"] == json!(12))
        .unwrap()
        .clone();
    let command = &lens["command"];

    let result = server
        .execute(command["command"].as_str().unwrap(), command["arguments"].clone())
        .await;
    assert_eq!(
        result.unwrap(),
        json!("blog.tests.test_articles.ArticleModelTests.test_slug")
    );

    let result = server.execute("python.djangoTestRunner.runPreviousTests", json!([])).await;
    assert_eq!(
        result.unwrap(),
        json!("blog.tests.test_articles.ArticleModelTests.test_slug")
    );

    let result = server
        .execute(
            "python.djangoTestRunner.runFileTests",
            json!([{ "uri": uri, "position": { "line": 3, "character": 0 } }]),
        )
        .await;
    assert_eq!(result.unwrap(), json!("blog.tests.test_articles"));
    assert!(server.show_message().await.is_none());
}
