//! Test path resolution
//!
//! Works out which test the cursor is in by scanning upward from the cursor:
//! the nearest `def test_*` line above it names the method, and the nearest
//! `class` line above that names the class. The scan stops at the first class
//! it meets, so a cursor on a class header (or between a class header and its
//! first test) resolves to the class alone.
//!
//! The file segment comes from the document path relative to its workspace
//! root, turned into a dotted Python module path.
//!
//! Nothing here fails: an unresolved segment is an empty string.

use std::path::Path;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use crate::text::SearchBound;

// Captures the full function name, `test_` included: Django addresses methods by it.
static METHOD_DEFINITION: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"^\s*(?:async\s+)?def\s+(test_\w+)\s?\(")
        .case_insensitive(true)
        .build()
        .expect("INVARIANT: method definition pattern is valid")
});

static CLASS_DEFINITION: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"^\s*class\s+(\w+)")
        .case_insensitive(true)
        .build()
        .expect("INVARIANT: class definition pattern is valid")
});

static LINE_BREAKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\r\n]+").expect("INVARIANT: line break pattern is valid"));

/// Separator scheme used to format a test identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamingConvention {
    /// `app.tests.test_models.Class.method`
    #[default]
    Standard,
    /// `app.tests.test_models:Class.method`
    DjangoNose,
}

impl NamingConvention {
    pub fn from_django_nose(django_nose: bool) -> Self {
        if django_nose {
            NamingConvention::DjangoNose
        } else {
            NamingConvention::Standard
        }
    }

    /// Separator between the module path and the class name.
    pub fn module_separator(self) -> char {
        match self {
            NamingConvention::Standard => '.',
            NamingConvention::DjangoNose => ':',
        }
    }
}

/// Enclosing method/class names recovered from the text above the cursor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnclosingTest {
    pub method_name: String,
    pub class_name: String,
}

/// Everything needed to address a test: where it lives and what encloses it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedIdentity {
    pub method_name: String,
    pub class_name: String,
    /// Dotted module path of the file, e.g. `app.tests.test_models`.
    pub file_path: String,
    pub convention: NamingConvention,
}

impl ResolvedIdentity {
    /// `file.Class.method` (or `file:Class.method`).
    pub fn method_identifier(&self) -> String {
        format!(
            "{}{}{}.{}",
            self.file_path,
            self.convention.module_separator(),
            self.class_name,
            self.method_name
        )
    }

    /// `file.Class` (or `file:Class`).
    pub fn class_identifier(&self) -> String {
        format!("{}{}{}", self.file_path, self.convention.module_separator(), self.class_name)
    }

    pub fn file_identifier(&self) -> String {
        self.file_path.clone()
    }

    /// App-level identifier. Always empty: the command builder then drops it
    /// and `manage.py test` runs the whole project.
    pub fn app_identifier(&self) -> String {
        String::new()
    }
}

/// Resolve the identity of the test enclosing `cursor_line`.
///
/// `bound` overrides the scan window; without it the window runs from the
/// top of the file through the cursor line.
pub fn resolve(
    source: &str,
    cursor_line: u32,
    bound: Option<SearchBound>,
    convention: NamingConvention,
    file_path: impl Into<String>,
) -> ResolvedIdentity {
    let enclosing = find_enclosing(source, cursor_line, bound);
    ResolvedIdentity {
        method_name: enclosing.method_name,
        class_name: enclosing.class_name,
        file_path: file_path.into(),
        convention,
    }
}

/// Find the enclosing test method and class for a cursor line.
pub fn find_enclosing(source: &str, cursor_line: u32, bound: Option<SearchBound>) -> EnclosingTest {
    let window = bound.unwrap_or_else(|| SearchBound::through_line(cursor_line));
    let text = window.slice(source);
    let lines: Vec<&str> = LINE_BREAKS.split(text).collect();

    let enclosing = scan_upward(lines.into_iter().rev());
    tracing::debug!(
        cursor_line,
        method = %enclosing.method_name,
        class = %enclosing.class_name,
        "resolved enclosing test"
    );
    enclosing
}

/// Walk lines nearest-first, stopping at the first class header.
///
/// Only the first `def test_*` is kept; the method line itself is never
/// treated as a class candidate.
pub fn scan_upward<'a>(lines: impl IntoIterator<Item = &'a str>) -> EnclosingTest {
    let mut enclosing = EnclosingTest::default();

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }

        if enclosing.method_name.is_empty() {
            if let Some(captures) = METHOD_DEFINITION.captures(line) {
                enclosing.method_name = captures[1].to_string();
                continue;
            }
        }

        if let Some(captures) = CLASS_DEFINITION.captures(line) {
            enclosing.class_name = captures[1].to_string();
            break;
        }
    }

    enclosing
}

/// Dotted module path of `file` relative to `workspace_root`.
///
/// Strips `.py`, turns both kinds of path separators into dots and removes a
/// leading `tests_root` segment (only on a whole-segment match).
pub fn module_path(file: &Path, workspace_root: &Path, tests_root: &str) -> String {
    let relative = match file.strip_prefix(workspace_root) {
        Ok(relative) => relative.to_string_lossy(),
        Err(_) => file.to_string_lossy(),
    };
    let relative = relative.strip_suffix(".py").unwrap_or(&relative);

    let dotted = dot_separators(relative);
    let dotted = dotted.strip_prefix('.').unwrap_or(&dotted);
    strip_tests_root(dotted, tests_root).to_string()
}

/// Remove `tests_root` from the front of a dotted path when it is followed by
/// a `.` boundary. `app` strips from `app.tests` but not from `application`.
pub fn strip_tests_root<'a>(dotted: &'a str, tests_root: &str) -> &'a str {
    let prefix = dot_separators(tests_root);
    let prefix = prefix.trim_matches('.');
    if prefix.is_empty() {
        return dotted;
    }

    dotted
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('.'))
        .unwrap_or(dotted)
}

fn dot_separators(path: &str) -> String {
    path.chars()
        .map(|c| if c == '/' || c == '\\' { '.' } else { c })
        .collect()
}
