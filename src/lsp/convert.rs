//! Conversions between djtest types and LSP types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_lsp::lsp_types::{CodeLens, Command, Position, Range, Url};

use crate::scanner::DefinitionMatch;
use crate::text::{LinePosition, TextRange};

/// Argument object for the run commands.
///
/// Lenses send `{ uri, range }`; editor keybindings send `{ uri, position }`
/// with the cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandArgs {
    pub uri: Url,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Range>,
}

impl CommandArgs {
    /// Cursor line: the explicit position, else the last line of the range.
    pub fn cursor_line(&self) -> u32 {
        self.position
            .map(|position| position.line)
            .or(self.range.map(|range| range.end.line))
            .unwrap_or(0)
    }

    pub fn bound(&self) -> Option<TextRange> {
        self.range.map(from_lsp_range)
    }
}

pub fn to_lsp_position(position: LinePosition) -> Position {
    Position::new(position.line, position.column)
}

pub fn from_lsp_position(position: Position) -> LinePosition {
    LinePosition::new(position.line, position.character)
}

pub fn to_lsp_range(range: TextRange) -> Range {
    Range::new(to_lsp_position(range.start), to_lsp_position(range.end))
}

pub fn from_lsp_range(range: Range) -> TextRange {
    TextRange {
        start: from_lsp_position(range.start),
        end: from_lsp_position(range.end),
    }
}

/// Lens for one scanned definition, pointing its command at `uri`.
pub fn definition_to_code_lens(uri: &Url, definition: &DefinitionMatch) -> CodeLens {
    let args = CommandArgs {
        uri: uri.clone(),
        position: None,
        range: Some(to_lsp_range(definition.action.bound)),
    };
    let arguments = serde_json::to_value(&args).ok().map(|value| vec![value]);

    CodeLens {
        range: to_lsp_range(definition.line_span),
        command: Some(Command {
            title: definition.action.title.to_string(),
            command: definition.action.action.command_id().to_string(),
            arguments,
        }),
        data: None,
    }
}

/// Read the first command argument, if one was sent.
pub fn parse_command_args(arguments: &[Value]) -> Result<Option<CommandArgs>, serde_json::Error> {
    match arguments.first() {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone()).map(Some),
    }
}
