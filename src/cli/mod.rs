//! CLI module for djtest
//!
//! Runs the Django test under a given file and line from a shell, a Makefile
//! or an editor task, using the same resolution as the language server.
//!
//! ## Commands
//!
//! - `method <file> --line N` - Run the test method enclosing line N
//! - `class <file> --line N` - Run the test class enclosing line N
//! - `file <file>` - Run every test in the file
//! - `app [path]` - Run the whole project's tests
//! - `lenses <file>` - List the runnable definitions in a file
//!
//! ## Design
//!
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};

use crate::config::{DEFAULT_PYTHON, RunnerSettings};

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }

    /// Render a diagnostic through miette's report handler.
    pub fn report(error: impl miette::Diagnostic + Send + Sync + 'static) -> Self {
        Self::failure(format!("{:?}", miette::Report::new(error)))
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Run Django tests for the method, class or file under the cursor
#[derive(Parser, Debug)]
#[command(name = "djtest")]
#[command(version = VERSION)]
#[command(about = "Run Django tests for the method, class or file under the cursor", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub options: GlobalOptions,
}

/// Settings shared by every subcommand. Each one can also come from the
/// environment.
#[derive(Args, Debug, Clone)]
pub struct GlobalOptions {
    /// Project root (default: nearest directory with manage.py, else the current directory)
    #[arg(long, global = true, env = "DJTEST_WORKSPACE_ROOT", value_name = "DIR")]
    pub workspace_root: Option<PathBuf>,

    /// Module prefix stripped from test paths (e.g. `src`)
    #[arg(long, global = true, env = "DJTEST_TESTS_ROOT_DIR", default_value = "", hide_default_value = true)]
    pub tests_root_dir: String,

    /// Format test paths for django-nose (`module:Class.method`)
    #[arg(long, global = true, env = "DJTEST_DJANGO_NOSE")]
    pub django_nose: bool,

    /// Interpreter used to run manage.py
    #[arg(long, global = true, env = "DJTEST_PYTHON_PATH", default_value = DEFAULT_PYTHON)]
    pub python_path: String,

    /// Command placed before the interpreter (e.g. `docker compose run web`)
    #[arg(long, global = true, env = "DJTEST_PREFIX_COMMAND", default_value = "", hide_default_value = true)]
    pub prefix_command: String,

    /// Extra arguments for `manage.py test`
    #[arg(
        long,
        global = true,
        env = "DJTEST_FLAGS",
        default_value = "",
        hide_default_value = true,
        allow_hyphen_values = true
    )]
    pub flags: String,

    /// Print the command instead of running it
    #[arg(short = 'n', long, global = true)]
    pub dry_run: bool,
}

impl GlobalOptions {
    pub fn settings(&self) -> RunnerSettings {
        RunnerSettings::new()
            .with_tests_root_dir(self.tests_root_dir.clone())
            .with_django_nose(self.django_nose)
            .with_python_path(self.python_path.clone())
            .with_prefix_command(self.prefix_command.clone())
            .with_flags(self.flags.clone())
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the test method enclosing a line
    Method {
        /// Python test file
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Cursor line (1-based)
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
        line: u32,
    },

    /// Run the test class enclosing a line
    Class {
        /// Python test file
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Cursor line (1-based)
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
        line: u32,
    },

    /// Run every test in a file
    File {
        /// Python test file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Run all tests of the project
    App {
        /// Any path inside the project
        #[arg(value_name = "PATH", default_value = ".")]
        path: PathBuf,
    },

    /// List runnable test definitions in a file
    Lenses {
        /// Python test file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    use crate::session::TestAction;

    let options = &cli.options;
    match cli.command {
        Command::Method { file, line } => commands::run_tests(TestAction::RunMethod, &file, line - 1, options),
        Command::Class { file, line } => commands::run_tests(TestAction::RunClass, &file, line - 1, options),
        Command::File { file } => commands::run_tests(TestAction::RunFile, &file, 0, options),
        Command::App { path } => commands::run_tests(TestAction::RunApp, &path, 0, options),
        Command::Lenses { file } => commands::list_lenses(&file),
    }
}

// ============================================================================
// Tests
// ============================================================================
