//! Runner settings
//!
//! The editor hands these over as JSON (LSP initialization options and
//! `workspace/didChangeConfiguration`), nested the same way they appear in
//! the editor's settings file:
//!
//! ```json
//! {
//!   "python": {
//!     "pythonPath": "venv/bin/python",
//!     "djangoTestRunner": {
//!       "testsRootDir": "src",
//!       "djangoNose": false,
//!       "prefixCommand": "docker compose run web",
//!       "flags": "--keepdb"
//!     }
//!   }
//! }
//! ```
//!
//! The CLI builds the same struct from flags and `DJTEST_*` variables.

use miette::Diagnostic;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::resolver::NamingConvention;

/// Interpreter used when no python path is configured.
pub const DEFAULT_PYTHON: &str = "python";

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("invalid djtest settings: {0}")]
    #[diagnostic(
        code(djtest::config::invalid),
        help("settings live under `python.djangoTestRunner`; strings for paths and flags, a boolean for `djangoNose`")
    )]
    Invalid(#[from] serde_json::Error),
}

/// Settings that shape the test command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerSettings {
    /// Dotted (or slash separated) prefix removed from module paths.
    pub tests_root_dir: String,
    /// Format identifiers as `file:Class.method`.
    pub django_nose: bool,
    /// Interpreter that runs `manage.py`.
    pub python_path: String,
    /// Command placed before the interpreter, e.g. `docker compose run web`.
    pub prefix_command: String,
    /// Extra arguments passed to `manage.py test`.
    pub flags: String,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            tests_root_dir: String::new(),
            django_nose: false,
            python_path: DEFAULT_PYTHON.to_string(),
            prefix_command: String::new(),
            flags: String::new(),
        }
    }
}

impl RunnerSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tests_root_dir(mut self, dir: impl Into<String>) -> Self {
        self.tests_root_dir = dir.into();
        self
    }

    pub fn with_django_nose(mut self, django_nose: bool) -> Self {
        self.django_nose = django_nose;
        self
    }

    pub fn with_python_path(mut self, path: impl Into<String>) -> Self {
        self.python_path = path.into();
        self
    }

    pub fn with_prefix_command(mut self, command: impl Into<String>) -> Self {
        self.prefix_command = command.into();
        self
    }

    pub fn with_flags(mut self, flags: impl Into<String>) -> Self {
        self.flags = flags.into();
        self
    }

    pub fn naming_convention(&self) -> NamingConvention {
        NamingConvention::from_django_nose(self.django_nose)
    }

    /// Read settings from editor JSON. Missing or `null` keys fall back to
    /// the defaults.
    pub fn from_json(value: &Value) -> Result<Self, ConfigError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        let host = HostSettings::deserialize(value)?;
        Ok(host.into())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct HostSettings {
    python: PythonSettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PythonSettings {
    python_path: Option<String>,
    default_interpreter_path: Option<String>,
    django_test_runner: DjangoTestRunnerSettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct DjangoTestRunnerSettings {
    tests_root_dir: Option<String>,
    django_nose: Option<bool>,
    prefix_command: Option<String>,
    flags: Option<String>,
}

impl From<HostSettings> for RunnerSettings {
    fn from(host: HostSettings) -> Self {
        let python = host.python;
        let runner = python.django_test_runner;
        let python_path = python
            .python_path
            .filter(|path| !path.is_empty())
            .or(python.default_interpreter_path.filter(|path| !path.is_empty()))
            .unwrap_or_else(|| DEFAULT_PYTHON.to_string());

        Self {
            tests_root_dir: runner.tests_root_dir.unwrap_or_default(),
            django_nose: runner.django_nose.unwrap_or(false),
            python_path,
            prefix_command: runner.prefix_command.unwrap_or_default(),
            flags: runner.flags.unwrap_or_default(),
        }
    }
}
