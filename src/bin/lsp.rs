//! Django test runner language server entry point
//!
//! Run with: djtest-lsp
//!
//! The LSP communicates via stdin/stdout using the Language Server Protocol,
//! so logs go to stderr.

use djtest::lsp::DjangoTestServer;
use tower_lsp::{LspService, Server};

#[tokio::main]
async fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(DjangoTestServer::new);

    Server::new(stdin, stdout, socket).serve(service).await;
}
