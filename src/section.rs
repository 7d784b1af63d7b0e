//! Split raw source into section blocks on `###Name` marker lines.
//!
//! The splitter is a pure transformation: it never interprets section bodies,
//! it only tracks names and source positions so downstream parsers can report
//! diagnostics in whole-file coordinates.

use crate::error::ParseError;
use crate::span::SourceRange;

/// Name of the implicit section that owns text appearing before the first
/// `###` marker.
pub const DEFAULT_SECTION: &str = "Pure";

/// One marker-delimited block of source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionBlock {
    pub name: String,
    /// Raw body text, marker line excluded.
    pub body: String,
    /// 1-based line where the body starts.
    pub body_start_line: usize,
    /// Marker line through last body line (whole block for diagnostics).
    pub range: SourceRange,
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Split source text into section blocks. Text before the first marker becomes
/// an implicit `Pure` block. A `###` line whose remainder is not a single
/// identifier is a malformed marker.
///
/// Splitting is strictly line-based: a line starting with `###` is a marker
/// even inside a quoted payload string, so such content cannot survive a
/// round trip.
pub fn split(source: &str) -> Result<Vec<SectionBlock>, ParseError> {
    let mut blocks: Vec<SectionBlock> = Vec::new();
    // (name, marker line, body lines, body start line)
    let mut current: Option<(String, usize, Vec<&str>, usize)> = None;
    let mut preamble: Vec<&str> = Vec::new();

    for (idx, line) in source.lines().enumerate() {
        let line_no = idx + 1;
        if let Some(rest) = line.strip_prefix("###") {
            let name = rest.trim();
            if !is_identifier(name) {
                return Err(ParseError::new(
                    format!("Invalid section marker '{}'", line.trim_end()),
                    SourceRange::new(line_no, 1, line_no, line.len().max(1)),
                ));
            }
            if let Some(block) = current.take() {
                blocks.push(finish(block, line_no - 1));
            } else if preamble.iter().any(|l| !l.trim().is_empty()) {
                blocks.push(finish(
                    (DEFAULT_SECTION.to_string(), 1, std::mem::take(&mut preamble), 1),
                    line_no - 1,
                ));
            }
            current = Some((name.to_string(), line_no, Vec::new(), line_no + 1));
        } else {
            match &mut current {
                Some((_, _, body, _)) => body.push(line),
                None => preamble.push(line),
            }
        }
    }

    let last_line = source.lines().count();
    if let Some(block) = current.take() {
        blocks.push(finish(block, last_line));
    } else if preamble.iter().any(|l| !l.trim().is_empty()) {
        blocks.push(finish((DEFAULT_SECTION.to_string(), 1, preamble, 1), last_line));
    }
    Ok(blocks)
}

fn finish(
    (name, marker_line, body_lines, body_start_line): (String, usize, Vec<&str>, usize),
    end_line: usize,
) -> SectionBlock {
    let body = body_lines.join("\n");
    let end_column = body_lines.last().map(|l| l.len()).unwrap_or(0).max(1);
    SectionBlock {
        name,
        body,
        body_start_line,
        range: SourceRange::new(marker_line, 1, end_line.max(marker_line), end_column),
    }
}
