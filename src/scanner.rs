//! Test definition scanner
//!
//! Finds every `def test_*` and `class` header in a file so the editor can
//! put a "run this" lens above each one. Each match carries the search bound
//! that ends right after its own line, so running the lens later resolves to
//! that definition no matter where the cursor has moved since.

use std::sync::LazyLock;

use regex::Regex;

use crate::session::TestAction;
use crate::text::{SearchBound, TextRange, line_width};

static DEFINITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:async\s+)?(?:(?P<def>def)\s+test_\w+|(?P<class>class)\s+\w+)[:(]")
        .expect("INVARIANT: definition pattern is valid")
});

/// What kind of definition a line starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionKind {
    Method,
    Class,
}

impl DefinitionKind {
    /// Label shown on the lens.
    pub fn title(self) -> &'static str {
        match self {
            DefinitionKind::Method => "Test this method",
            DefinitionKind::Class => "Test this entire class",
        }
    }

    pub fn action(self) -> TestAction {
        match self {
            DefinitionKind::Method => TestAction::RunMethod,
            DefinitionKind::Class => TestAction::RunClass,
        }
    }
}

/// The "run this" affordance attached to a definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDescriptor {
    pub title: &'static str,
    pub action: TestAction,
    /// Scan window handed back to the resolver when the action runs.
    pub bound: SearchBound,
}

/// A line that starts a test method or a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionMatch {
    pub kind: DefinitionKind,
    pub line_index: u32,
    pub line_span: TextRange,
    pub action: ActionDescriptor,
}

/// Classify a single line.
pub fn match_definition(line: &str) -> Option<DefinitionKind> {
    let captures = DEFINITION.captures(line)?;
    if captures.name("def").is_some() {
        Some(DefinitionKind::Method)
    } else {
        Some(DefinitionKind::Class)
    }
}

/// Scan a whole document, top to bottom.
pub fn scan(source: &str) -> Vec<DefinitionMatch> {
    let matches: Vec<DefinitionMatch> = source
        .lines()
        .enumerate()
        .filter_map(|(index, line)| {
            let kind = match_definition(line)?;
            let line_index = u32::try_from(index).ok()?;
            Some(DefinitionMatch {
                kind,
                line_index,
                line_span: TextRange::whole_line(line_index, line_width(line)),
                action: ActionDescriptor {
                    title: kind.title(),
                    action: kind.action(),
                    bound: SearchBound::through_line(line_index),
                },
            })
        })
        .collect();

    tracing::debug!(definitions = matches.len(), "scanned test definitions");
    matches
}
