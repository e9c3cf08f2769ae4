//! Session controller
//!
//! Ties resolution, command building and the terminal together, and
//! remembers the last test path it ran so "run previous tests" can replay it.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use miette::Diagnostic;
use thiserror::Error;

use crate::command::command_line;
use crate::config::RunnerSettings;
use crate::resolver::{self, ResolvedIdentity};
use crate::terminal::{Terminal, TerminalError};
use crate::text::SearchBound;

/// The run intents exposed to the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestAction {
    RunMethod,
    RunClass,
    RunFile,
    RunApp,
    RunPrevious,
}

impl TestAction {
    pub const ALL: [TestAction; 5] = [
        TestAction::RunMethod,
        TestAction::RunClass,
        TestAction::RunFile,
        TestAction::RunApp,
        TestAction::RunPrevious,
    ];

    /// Command identifier the editor invokes.
    pub fn command_id(self) -> &'static str {
        match self {
            TestAction::RunMethod => "python.djangoTestRunner.runMethodTests",
            TestAction::RunClass => "python.djangoTestRunner.runClassTests",
            TestAction::RunFile => "python.djangoTestRunner.runFileTests",
            TestAction::RunApp => "python.djangoTestRunner.runAppTests",
            TestAction::RunPrevious => "python.djangoTestRunner.runPreviousTests",
        }
    }

    /// Whether the action honours a search bound from its caller.
    pub fn accepts_bound(self) -> bool {
        matches!(self, TestAction::RunMethod | TestAction::RunClass)
    }
}

impl fmt::Display for TestAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command_id())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown test command `{0}`")]
pub struct UnknownAction(pub String);

impl FromStr for TestAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TestAction::ALL
            .into_iter()
            .find(|action| action.command_id() == s)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}

/// The document a command was invoked from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveDocument {
    pub path: PathBuf,
    pub text: String,
    /// Zero-based cursor line.
    pub cursor_line: u32,
    pub language_id: String,
    /// Root of the workspace folder holding the document, if any.
    pub workspace_root: Option<PathBuf>,
}

impl ActiveDocument {
    pub fn is_python(&self) -> bool {
        self.language_id == "python"
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum SessionError {
    #[error("No previous tests!")]
    #[diagnostic(code(djtest::session::no_previous_run), help("run a test method, class or file first"))]
    NoPreviousRun,

    #[error("{action} needs an active document")]
    #[diagnostic(code(djtest::session::no_document))]
    NoActiveDocument { action: TestAction },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Terminal(#[from] TerminalError),
}

/// Per-process controller; state lives only as long as the session.
#[derive(Debug)]
pub struct TestSession<T> {
    terminal: T,
    last_ran_test_path: Option<String>,
    target_range: Option<SearchBound>,
}

impl<T: Terminal> TestSession<T> {
    pub fn new(terminal: T) -> Self {
        Self {
            terminal,
            last_ran_test_path: None,
            target_range: None,
        }
    }

    pub fn last_ran_test_path(&self) -> Option<&str> {
        self.last_ran_test_path.as_deref()
    }

    /// Bound requested by the most recent invocation.
    pub fn target_range(&self) -> Option<SearchBound> {
        self.target_range
    }

    pub fn terminal(&self) -> &T {
        &self.terminal
    }

    pub fn terminal_mut(&mut self) -> &mut T {
        &mut self.terminal
    }

    pub fn into_terminal(self) -> T {
        self.terminal
    }

    /// Dispatch an action. Returns the test path that was sent.
    ///
    /// Bounds are only kept for method and class runs; other actions clear
    /// the stored bound.
    pub fn run(
        &mut self,
        action: TestAction,
        document: Option<&ActiveDocument>,
        settings: &RunnerSettings,
        bound: Option<SearchBound>,
    ) -> Result<String, SessionError> {
        self.target_range = if action.accepts_bound() { bound } else { None };

        if action == TestAction::RunPrevious {
            return self.run_previous(settings);
        }

        let document = document.ok_or(SessionError::NoActiveDocument { action })?;
        let identity = self.resolve(document, settings);
        let test_path = match action {
            TestAction::RunMethod => identity.method_identifier(),
            TestAction::RunClass => identity.class_identifier(),
            TestAction::RunFile => identity.file_identifier(),
            TestAction::RunApp | TestAction::RunPrevious => identity.app_identifier(),
        };

        self.run_tests(&test_path, settings)?;
        Ok(test_path)
    }

    pub fn run_method(
        &mut self,
        document: &ActiveDocument,
        settings: &RunnerSettings,
        bound: Option<SearchBound>,
    ) -> Result<String, SessionError> {
        self.run(TestAction::RunMethod, Some(document), settings, bound)
    }

    pub fn run_class(
        &mut self,
        document: &ActiveDocument,
        settings: &RunnerSettings,
        bound: Option<SearchBound>,
    ) -> Result<String, SessionError> {
        self.run(TestAction::RunClass, Some(document), settings, bound)
    }

    pub fn run_file(&mut self, document: &ActiveDocument, settings: &RunnerSettings) -> Result<String, SessionError> {
        self.run(TestAction::RunFile, Some(document), settings, None)
    }

    pub fn run_app(&mut self, document: &ActiveDocument, settings: &RunnerSettings) -> Result<String, SessionError> {
        self.run(TestAction::RunApp, Some(document), settings, None)
    }

    /// Replay the last test path.
    pub fn run_previous(&mut self, settings: &RunnerSettings) -> Result<String, SessionError> {
        self.target_range = None;
        let test_path = self
            .last_ran_test_path
            .clone()
            .filter(|path| !path.is_empty())
            .ok_or(SessionError::NoPreviousRun)?;
        self.run_tests(&test_path, settings)?;
        Ok(test_path)
    }

    /// Resolve the identity for a document using the stored bound.
    ///
    /// Class and method names are only looked up in Python documents that
    /// belong to a workspace; the file segment needs the workspace root.
    pub fn resolve(&self, document: &ActiveDocument, settings: &RunnerSettings) -> ResolvedIdentity {
        let convention = settings.naming_convention();
        let Some(root) = &document.workspace_root else {
            tracing::debug!(path = %document.path.display(), "document is outside any workspace");
            return ResolvedIdentity {
                convention,
                ..Default::default()
            };
        };

        let file_path = resolver::module_path(&document.path, root, &settings.tests_root_dir);
        if !document.is_python() {
            return ResolvedIdentity {
                file_path,
                convention,
                ..Default::default()
            };
        }

        resolver::resolve(
            &document.text,
            document.cursor_line,
            self.target_range,
            convention,
            file_path,
        )
    }

    /// Send the command for `test_path` and remember it.
    pub fn run_tests(&mut self, test_path: &str, settings: &RunnerSettings) -> Result<(), SessionError> {
        self.last_ran_test_path = Some(test_path.to_string());
        let line = command_line(settings, test_path);
        tracing::info!(test_path, command = %line, "running tests");

        self.terminal.ensure_alive()?;
        self.terminal.send(&line)?;
        Ok(())
    }
}
