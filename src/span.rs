//! Source positions for diagnostics.

use std::fmt;

/// Inclusive source range, 1-based lines and columns. Attached to every parsed
/// construct; used only for diagnostics, never for semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceRange {
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl SourceRange {
    pub fn new(start_line: usize, start_column: usize, end_line: usize, end_column: usize) -> Self {
        SourceRange { start_line, start_column, end_line, end_column }
    }

    /// Build a range from a pest span, shifted into whole-file coordinates.
    /// pest end positions are exclusive; ranges here are inclusive.
    pub fn from_span(span: &pest::Span, offset: Offset) -> Self {
        let (sl, sc) = span.start_pos().line_col();
        let (el, ec) = span.end_pos().line_col();
        let (sl, sc) = offset.apply(sl, sc);
        let (el, ec) = offset.apply(el, ec);
        SourceRange::new(sl, sc, el, ec.saturating_sub(1).max(1))
    }
}

impl fmt::Display for SourceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start_line == self.end_line {
            write!(f, "[{}:{}-{}]", self.start_line, self.start_column, self.end_column)
        } else {
            write!(
                f,
                "[{}:{}-{}:{}]",
                self.start_line, self.start_column, self.end_line, self.end_column
            )
        }
    }
}

/// Position offset for text parsed out of a larger document (section bodies,
/// embedded-data bodies). Lines shift by `line - 1`; the column shift applies
/// only to the first line of the fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offset {
    pub line: usize,
    pub column: usize,
}

impl Offset {
    /// Fragment starting at the top of the document.
    pub fn none() -> Self {
        Offset { line: 1, column: 1 }
    }

    pub fn at(line: usize, column: usize) -> Self {
        Offset { line, column }
    }

    /// Offset for a fragment nested at `(line, column)` of this fragment.
    pub fn nested(&self, line: usize, column: usize) -> Offset {
        let (l, c) = self.apply(line, column);
        Offset::at(l, c)
    }

    fn apply(&self, line: usize, column: usize) -> (usize, usize) {
        if line == 1 {
            (self.line, self.column + column - 1)
        } else {
            (self.line + line - 1, column)
        }
    }
}
