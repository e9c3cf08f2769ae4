#![forbid(unsafe_code)]
//! Django test runner for editors
//!
//! Works out which Django test the cursor is in (method, class, file or the
//! whole project) and sends the matching `manage.py test` command to a
//! terminal. The same logic backs two front ends: a CLI (`djtest`) and a
//! language server (`djtest-lsp`) that adds "run this" code lenses to
//! `test_*.py` files.
//!
//! ## Layout
//!
//! - `text` - line/column ranges and search bounds
//! - `resolver` - upward scan for the enclosing test, module paths, identifiers
//! - `scanner` - test/class definitions for code lenses
//! - `command` - the `manage.py test` command line
//! - `terminal` - shell sessions that receive commands
//! - `session` - run intents and the "run previous" memory
//! - `config` - runner settings
//! - `workspace` - workspace and project root lookup
//!
//! ## Panic Policy
//!
//! Production code returns `Result` or degrades to empty values. Regex
//! constants use `.expect("INVARIANT: reason")`. `.unwrap()` is fine in tests.

pub mod cli;
pub mod command;
pub mod config;
pub mod lsp;
pub mod resolver;
pub mod scanner;
pub mod session;
pub mod terminal;
pub mod text;
pub mod workspace;

pub use config::RunnerSettings;
pub use resolver::{NamingConvention, ResolvedIdentity, resolve};
pub use scanner::{DefinitionKind, DefinitionMatch, scan};
pub use session::{ActiveDocument, SessionError, TestAction, TestSession};
pub use terminal::{EchoTerminal, ShellTerminal, Terminal, TerminalError};
pub use text::{SearchBound, TextRange};
