//! Line/column ranges over source text
//!
//! Positions are zero-based lines and UTF-16 code unit columns, the same shape
//! the editor uses for cursors and code lens ranges. A range that reaches past the
//! end of the text is clamped to the end, so `(0,0)..(n+1,0)` always means
//! "everything up to and including line `n`".

/// Zero-based line and UTF-16 column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct LinePosition {
    pub line: u32,
    pub column: u32,
}

impl LinePosition {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// A start/end pair of positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextRange {
    pub start: LinePosition,
    pub end: LinePosition,
}

/// Line range limiting how far upward the resolver scans.
pub type SearchBound = TextRange;

impl TextRange {
    pub fn new(start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> Self {
        Self {
            start: LinePosition::new(start_line, start_column),
            end: LinePosition::new(end_line, end_column),
        }
    }

    /// The window from the top of the file through the end of `line`.
    pub fn through_line(line: u32) -> Self {
        Self::new(0, 0, line.saturating_add(1), 0)
    }

    /// Span covering one whole line `width` columns wide.
    pub fn whole_line(line: u32, width: u32) -> Self {
        Self::new(line, 0, line, width)
    }

    /// Borrow the part of `source` covered by this range.
    ///
    /// Reversed ranges are normalized.
    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        let start = offset_of(source, self.start);
        let end = offset_of(source, self.end);
        if start <= end {
            &source[start..end]
        } else {
            &source[end..start]
        }
    }
}

/// Byte offset of a position, clamped to the text.
fn offset_of(source: &str, position: LinePosition) -> usize {
    let mut offset = 0;
    for _ in 0..position.line {
        match source[offset..].find('\n') {
            Some(newline) => offset += newline + 1,
            None => return source.len(),
        }
    }

    let line_end = source[offset..]
        .find('\n')
        .map_or(source.len(), |newline| offset + newline);
    let mut column = 0;
    for (index, ch) in source[offset..line_end].char_indices() {
        if column >= position.column as usize {
            return offset + index;
        }
        column += ch.len_utf16();
    }
    line_end
}

/// Width of a line in UTF-16 code units, ignoring a trailing carriage return.
pub fn line_width(line: &str) -> u32 {
    let line = line.strip_suffix('\r').unwrap_or(line);
    u32::try_from(line.encode_utf16().count()).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "class Foo:\n    def test_bar(self):\n        x = 1\n";

    #[test]
    fn test_through_line_includes_the_line() {
        let range = TextRange::through_line(1);
        assert_eq!(range.slice(SOURCE), "class Foo:\n    def test_bar(self):\n");
    }

    #[test]
    fn test_through_last_line_clamps_to_end() {
        let range = TextRange::through_line(10);
        assert_eq!(range.slice(SOURCE), SOURCE);
    }

    #[test]
    fn test_columns_inside_a_line() {
        let range = TextRange::new(1, 4, 1, 7);
        assert_eq!(range.slice(SOURCE), "def");
    }

    #[test]
    fn test_column_past_line_end_clamps_to_line_end() {
        let range = TextRange::new(0, 0, 0, 99);
        assert_eq!(range.slice(SOURCE), "class Foo:");
    }

    #[test]
    fn test_reversed_range_is_normalized() {
        let range = TextRange::new(1, 0, 0, 0);
        assert_eq!(range.slice(SOURCE), "class Foo:\n");
    }

    #[test]
    fn test_multibyte_columns() {
        let range = TextRange::new(0, 1, 0, 3);
        assert_eq!(range.slice("éàü"), "àü");
    }

    #[test]
    fn test_astral_characters_take_two_columns() {
        let line = "class Café🎉Tests:";
        assert_eq!(line_width(line), 18);
        assert_eq!(TextRange::new(0, 12, 0, 18).slice(line), "Tests:");
        assert_eq!(TextRange::whole_line(0, line_width(line)).slice(line), line);
    }

    #[test]
    fn test_line_width_ignores_carriage_return() {
        assert_eq!(line_width("class Foo:\r"), 10);
        assert_eq!(line_width(""), 0);
    }
}
