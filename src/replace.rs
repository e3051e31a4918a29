//! First-match text replacement over an [`Editor`]
//!
//! Replacing a placeholder means finding it again in a document that may have
//! changed since it was inserted. The search is deliberately simple:
//!
//! - lines are scanned top to bottom, each line left to right
//! - the first line containing the target wins; only that occurrence is replaced
//! - a match never spans lines, so a target containing `\n` never matches
//! - no match is a silent no-op
//!
//! [`Locator::with_hint`] starts the scan at a remembered line (where the
//! placeholder was inserted) and falls back to the full scan, which keeps
//! large documents cheap while preserving first-match-wins for the common case.

use crate::editor::{Editor, Position};

/// Replace the first occurrence of `target` (trimmed) with `replacement`.
///
/// Returns the start position of the replaced text, or `None` if the target
/// was not found. An empty target never matches.
pub fn replace_first<E: Editor + ?Sized>(
    editor: &mut E,
    target: &str,
    replacement: &str,
) -> Option<Position> {
    Locator::new().replace(editor, target, replacement)
}

/// Find the first occurrence of `target` (not trimmed) in the given lines.
///
/// Returns the match start and end positions.
pub fn locate<E: Editor + ?Sized>(
    editor: &E,
    target: &str,
    lines: impl IntoIterator<Item = usize>,
) -> Option<(Position, Position)> {
    if target.is_empty() || target.contains('\n') {
        return None;
    }

    lines.into_iter().find_map(|line_no| {
        let line = editor.get_line(line_no)?;
        let byte_idx = line.find(target)?;
        let ch = line[..byte_idx].chars().count();
        Some((
            Position::new(line_no, ch),
            Position::new(line_no, ch + target.chars().count()),
        ))
    })
}

/// Configurable placeholder search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Locator {
    hint: Option<usize>,
}

impl Locator {
    /// Full top-to-bottom scan
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan from `line` downwards first, then from the top
    pub fn with_hint(line: usize) -> Self {
        Self { hint: Some(line) }
    }

    /// Locate `target` (trimmed) and replace that span with `replacement`
    pub fn replace<E: Editor + ?Sized>(
        &self,
        editor: &mut E,
        target: &str,
        replacement: &str,
    ) -> Option<Position> {
        let target = target.trim();
        let (from, to) = self.find(editor, target)?;
        editor.replace_range(replacement, from, to);
        Some(from)
    }

    fn find<E: Editor + ?Sized>(&self, editor: &E, target: &str) -> Option<(Position, Position)> {
        let line_count = editor.line_count();
        match self.hint {
            Some(hint) if hint < line_count => {
                locate(editor, target, hint..line_count).or_else(|| locate(editor, target, 0..hint))
            }
            _ => locate(editor, target, 0..line_count),
        }
    }
}
