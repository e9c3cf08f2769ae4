//! CLI command implementations
//!
//! All functions return `CliResult<ExitCode>` instead of calling `process::exit`.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{CliError, CliResult, ExitCode, GlobalOptions};
use crate::scanner::scan;
use crate::session::{ActiveDocument, TestAction, TestSession};
use crate::terminal::{EchoTerminal, ShellTerminal};
use crate::workspace::{find_project_root, language_id_for};

/// Resolve `action` for `path` at `cursor_line` (0-based) and run it.
///
/// The shell's exit status becomes the CLI's exit code.
pub fn run_tests(action: TestAction, path: &Path, cursor_line: u32, options: &GlobalOptions) -> CliResult<ExitCode> {
    let document = load_document(path, cursor_line, options)?;
    let settings = options.settings();
    tracing::debug!(%action, path = %document.path.display(), cursor_line, "resolving");

    if options.dry_run {
        let mut session = TestSession::new(EchoTerminal::new(io::stdout()));
        session
            .run(action, Some(&document), &settings, None)
            .map_err(CliError::report)?;
        return Ok(ExitCode::SUCCESS);
    }

    let mut terminal = ShellTerminal::new("djtest");
    if let Some(root) = &document.workspace_root {
        terminal.set_working_dir(root);
    }
    let mut session = TestSession::new(terminal);
    let test_path = session
        .run(action, Some(&document), &settings, None)
        .map_err(CliError::report)?;
    if test_path.is_empty() {
        eprintln!("\x1b[1mRunning all tests\x1b[0m");
    } else {
        eprintln!("\x1b[1mRunning {}\x1b[0m", test_path);
    }

    let status = session.terminal_mut().close().map_err(CliError::report)?;
    Ok(match status.and_then(|status| status.code()) {
        Some(code) => ExitCode(code),
        None => ExitCode::FAILURE,
    })
}

/// Print the runnable definitions of a file, one per line.
pub fn list_lenses(file: &Path) -> CliResult<ExitCode> {
    let source = fs::read_to_string(file)
        .map_err(|e| CliError::failure(format!("Error reading '{}': {}", file.display(), e)))?;

    let definitions = scan(&source);
    if definitions.is_empty() {
        eprintln!("No test definitions found in '{}'", file.display());
        return Ok(ExitCode::SUCCESS);
    }

    let lines: Vec<&str> = source.lines().collect();
    for definition in definitions {
        let text = lines
            .get(definition.line_index as usize)
            .map(|line| line.trim())
            .unwrap_or_default();
        println!(
            "{}:{}: {} ({})",
            file.display(),
            definition.line_index + 1,
            definition.action.title,
            text
        );
    }
    Ok(ExitCode::SUCCESS)
}

/// Build the document for a CLI invocation.
///
/// Directories (for `app`) become an empty document.
fn load_document(path: &Path, cursor_line: u32, options: &GlobalOptions) -> CliResult<ActiveDocument> {
    let path = absolute(path)?;
    let text = if path.is_dir() {
        String::new()
    } else {
        fs::read_to_string(&path)
            .map_err(|e| CliError::failure(format!("Error reading '{}': {}", path.display(), e)))?
    };

    let workspace_root = match &options.workspace_root {
        Some(root) => absolute(root)?,
        None => match find_project_root(&path) {
            Some(root) => root,
            None => env::current_dir()
                .map_err(|e| CliError::failure(format!("Error reading current directory: {}", e)))?,
        },
    };

    Ok(ActiveDocument {
        language_id: language_id_for(&path).to_string(),
        path,
        text,
        cursor_line,
        workspace_root: Some(workspace_root),
    })
}

fn absolute(path: &Path) -> CliResult<PathBuf> {
    std::path::absolute(path).map_err(|e| CliError::failure(format!("Error resolving '{}': {}", path.display(), e)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    const SOURCE: &str = "class Foo:\n    def test_bar(self):\n        pass\n";

    fn options(root: &Path) -> GlobalOptions {
        let root = root.to_string_lossy().to_string();
        Cli::try_parse_from(["djtest", "app", "--workspace-root", root.as_str()])
            .unwrap()
            .options
    }

    #[test]
    fn test_load_document_uses_explicit_root() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("test_x.py");
        fs::write(&file, SOURCE).unwrap();

        let doc = load_document(&file, 1, &options(dir.path())).unwrap();
        assert_eq!(doc.text, SOURCE);
        assert_eq!(doc.cursor_line, 1);
        assert_eq!(doc.language_id, "python");
        assert_eq!(doc.workspace_root.as_deref(), Some(dir.path()));
    }

    #[test]
    fn test_load_document_finds_manage_py() {
        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("blog");
        fs::create_dir_all(&app).unwrap();
        fs::write(dir.path().join("manage.py"), "").unwrap();
        let file = app.join("test_views.py");
        fs::write(&file, SOURCE).unwrap();

        let mut opts = options(dir.path());
        opts.workspace_root = None;
        let doc = load_document(&file, 0, &opts).unwrap();
        assert_eq!(doc.workspace_root.as_deref(), Some(dir.path()));
    }

    #[test]
    fn test_load_directory_for_app_runs() {
        let dir = tempfile::tempdir().unwrap();
        let doc = load_document(dir.path(), 0, &options(dir.path())).unwrap();
        assert!(doc.text.is_empty());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_document(&dir.path().join("nope.py"), 0, &options(dir.path())).unwrap_err();
        assert_eq!(err.exit_code, ExitCode::FAILURE);
        assert!(err.message.contains("nope.py"));
    }

    #[test]
    fn test_dry_run_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("test_x.py");
        fs::write(&file, SOURCE).unwrap();
        let mut opts = options(dir.path());
        opts.dry_run = true;
        let code = run_tests(TestAction::RunMethod, &file, 2, &opts).unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
    }

    #[test]
    fn test_list_lenses_missing_file() {
        let err = list_lenses(Path::new("/definitely/not/here/test_x.py")).unwrap_err();
        assert_eq!(err.exit_code, ExitCode::FAILURE);
    }
}
