//! Editor abstraction
//!
//! The host editor owns the document. The paste handler only needs a small,
//! line-oriented surface: read lines, replace a range, replace the selection.
//! [`TextBuffer`] is an in-memory implementation used by the CLI host and
//! tests; it maps its selection through edits the way a real editor does, so
//! a replacement above the cursor keeps the cursor on the same text.

use std::fmt;

/// A position in the document.
///
/// `ch` counts Unicode scalar values from the start of the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Position {
    pub line: usize,
    pub ch: usize,
}

impl Position {
    pub fn new(line: usize, ch: usize) -> Self {
        Self { line, ch }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.ch)
    }
}

/// Operations the paste handler needs from the host editor
pub trait Editor {
    /// Number of lines (an empty document has one empty line)
    fn line_count(&self) -> usize;

    /// Text of line `line` without its terminator, or `None` past the end
    fn get_line(&self, line: usize) -> Option<String>;

    /// Replace the text between `from` and `to` with `text`
    fn replace_range(&mut self, text: &str, from: Position, to: Position);

    /// Replace the current selection (or insert at the cursor) with `text`
    fn replace_selection(&mut self, text: &str);

    /// Currently selected text
    fn get_selection(&self) -> String;

    /// Cursor (selection head) position
    fn cursor(&self) -> Position;
}

/// In-memory document with a single selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBuffer {
    text: String,
    /// Byte offset of each line start
    line_starts: Vec<usize>,
    /// Byte offsets into `text`
    anchor: usize,
    head: usize,
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new(String::new())
    }
}

fn line_starts(text: &str) -> Vec<usize> {
    std::iter::once(0)
        .chain(text.match_indices('\n').map(|(idx, _)| idx + 1))
        .collect()
}

impl TextBuffer {
    /// Create a buffer with the cursor at the end of `text`
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let end = text.len();
        Self {
            line_starts: line_starts(&text),
            text,
            anchor: end,
            head: end,
        }
    }

    /// Full document text
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    /// Place the cursor, collapsing any selection
    pub fn set_cursor(&mut self, pos: Position) {
        let offset = self.offset_of(pos);
        self.anchor = offset;
        self.head = offset;
    }

    /// Select the text between `anchor` and `head`
    pub fn set_selection(&mut self, anchor: Position, head: Position) {
        self.anchor = self.offset_of(anchor);
        self.head = self.offset_of(head);
    }

    /// Byte offset of `pos`, clamped to the document and line bounds
    fn offset_of(&self, pos: Position) -> usize {
        let Some(&line_start) = self.line_starts.get(pos.line) else {
            return self.text.len();
        };
        let line = &self.text[line_start..self.line_end(pos.line)];
        let ch_offset = line
            .char_indices()
            .nth(pos.ch)
            .map_or(line.len(), |(idx, _)| idx);
        line_start + ch_offset
    }

    /// Byte offset just past the last character of `line` (before its `\n`)
    fn line_end(&self, line: usize) -> usize {
        self.line_starts
            .get(line + 1)
            .map_or(self.text.len(), |next| next - 1)
    }

    fn position_of(&self, offset: usize) -> Position {
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let line_start = self.line_starts[line];
        Position {
            line,
            ch: self.text[line_start..offset].chars().count(),
        }
    }

    /// Replace `start..end` (byte offsets) and map the selection through the edit
    fn splice(&mut self, start: usize, end: usize, text: &str) {
        self.text.replace_range(start..end, text);
        self.line_starts = line_starts(&self.text);
        let map = |offset: usize| {
            if offset >= end {
                offset - (end - start) + text.len()
            } else if offset > start {
                start + text.len()
            } else {
                offset
            }
        };
        self.anchor = map(self.anchor);
        self.head = map(self.head);
    }

    fn selection_range(&self) -> (usize, usize) {
        (self.anchor.min(self.head), self.anchor.max(self.head))
    }
}

impl Editor for TextBuffer {
    fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    fn get_line(&self, line: usize) -> Option<String> {
        let start = *self.line_starts.get(line)?;
        Some(self.text[start..self.line_end(line)].to_string())
    }

    fn replace_range(&mut self, text: &str, from: Position, to: Position) {
        let (from, to) = if to < from { (to, from) } else { (from, to) };
        let start = self.offset_of(from);
        let end = self.offset_of(to);
        self.splice(start, end, text);
    }

    fn replace_selection(&mut self, text: &str) {
        let (start, end) = self.selection_range();
        self.splice(start, end, text);
        // Collapse to the end of the inserted text
        let cursor = start + text.len();
        self.anchor = cursor;
        self.head = cursor;
    }

    fn get_selection(&self) -> String {
        let (start, end) = self.selection_range();
        self.text[start..end].to_string()
    }

    fn cursor(&self) -> Position {
        self.position_of(self.head)
    }
}
