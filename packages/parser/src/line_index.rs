use serde::{Deserialize, Serialize};

/// 1-indexed line and column, columns counted in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

/// Maps byte offsets to line/column positions
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        Self {
            source,
            line_starts,
        }
    }

    fn line_of(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        }
    }

    /// Position of the character starting at `offset`
    pub fn start_position(&self, offset: usize) -> Position {
        let offset = offset.min(self.source.len());
        let line = self.line_of(offset);
        let column = self.source[self.line_starts[line]..offset].chars().count() + 1;
        Position {
            line: line + 1,
            column,
        }
    }

    /// Position of the last character of a range ending (exclusively) at
    /// `offset`. The column equals the 0-based exclusive end column.
    pub fn end_position(&self, offset: usize) -> Position {
        let offset = offset.min(self.source.len());
        if offset == 0 {
            return Position { line: 1, column: 0 };
        }
        let line = self.line_of(offset - 1);
        let column = self.source[self.line_starts[line]..offset].chars().count();
        Position {
            line: line + 1,
            column,
        }
    }

    /// Byte offset of a start position, if it lies inside the source
    pub fn offset_of_start(&self, position: Position) -> Option<usize> {
        let line_start = *self.line_starts.get(position.line.checked_sub(1)?)?;
        self.advance_chars(line_start, position.column.checked_sub(1)?)
    }

    /// Byte offset just past the character at an end position
    pub fn offset_of_end(&self, position: Position) -> Option<usize> {
        let line_start = *self.line_starts.get(position.line.checked_sub(1)?)?;
        self.advance_chars(line_start, position.column)
    }

    fn advance_chars(&self, from: usize, count: usize) -> Option<usize> {
        let rest = self.source.get(from..)?;
        if count == 0 {
            return Some(from);
        }
        let mut chars = rest.char_indices();
        let mut offset = from;
        for _ in 0..count {
            let (i, c) = chars.next()?;
            offset = from + i + c.len_utf8();
        }
        Some(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions() {
        let source = "ab\n  <div/>\n";
        let index = LineIndex::new(source);

        let start = source.find('<').unwrap();
        let end = start + "<div/>".len();

        assert_eq!(index.start_position(start), Position { line: 2, column: 3 });
        assert_eq!(index.end_position(end), Position { line: 2, column: 8 });
        assert_eq!(index.offset_of_start(Position { line: 2, column: 3 }), Some(start));
        assert_eq!(index.offset_of_end(Position { line: 2, column: 8 }), Some(end));
    }

    #[test]
    fn test_multibyte_columns() {
        let source = "é<a/>";
        let index = LineIndex::new(source);
        let start = source.find('<').unwrap();
        assert_eq!(index.start_position(start).column, 2);
        assert_eq!(index.end_position(source.len()).column, 5);
    }
}
