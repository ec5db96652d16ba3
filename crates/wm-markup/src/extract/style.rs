//! Style blocks: `%%class` ... `/%`, possibly nested.
//!
//! Openers and closers are paired once for the whole source with a stack, so
//! an unclosed opener never triggers a rescan. Block content is extracted in
//! place: inner wiki markup gets the next ids and markers of the same token.

use std::collections::HashMap;
use std::ops::Range;

use super::fence::FenceTracker;
use super::{Extractor, line_end, next_line};
use crate::element::{ElementKind, ExtractedElement, StyleBlock, StyleContent, TableRow};

impl Extractor<'_> {
    /// Extract a style block opening on the line at `pos`. Returns the offset
    /// after its closing line.
    ///
    /// The marker is written as a paragraph of its own so the block never
    /// joins surrounding text.
    pub(super) fn style_block(
        &mut self,
        pos: usize,
        line: &str,
        out: &mut String,
    ) -> Option<usize> {
        let class_name = style_open(line)?;
        let Some(close) = self.matching_close(pos) else {
            self.warn(pos, "style block without closing `/%` left as text");
            return None;
        };
        let close_end = line_end(self.source, close);

        let id = self.elements.len();
        if !(out.is_empty() || out.ends_with("\n\n")) {
            out.push('\n');
        }
        out.push_str(&self.token.marker(id));
        out.push_str("\n\n");

        // Reserve the id before inner elements take theirs.
        self.elements.push(ExtractedElement {
            id,
            offset: pos,
            original_syntax: self.source[pos..close_end].to_owned(),
            kind: ElementKind::Style {
                block: StyleBlock {
                    class_name: class_name.to_owned(),
                    content: Vec::new(),
                },
            },
        });
        let block = self.style_content(class_name, pos, close);
        tracing::trace!(id, offset = pos, "extracted style block");
        self.elements[id].kind = ElementKind::Style { block };

        Some(next_line(self.source, close_end))
    }

    /// Content between the opening line at `open` and the closing line at
    /// `close`.
    fn style_content(&mut self, class_name: &str, open: usize, close: usize) -> StyleBlock {
        let source = self.source;
        let mut content = Vec::new();
        let mut fence = FenceTracker::new();
        let mut pos = next_line(source, line_end(source, open));
        let mut text_start = pos;

        while pos < close {
            let end = line_end(source, pos);
            let line = &source[pos..end];

            if fence.observe(line) {
                pos = next_line(source, end);
                continue;
            }

            if let Some(name) = style_open(line)
                && let Some(nested_close) = self.matching_close(pos)
            {
                self.push_text(text_start..pos, &mut content);
                let block = self.style_content(name, pos, nested_close);
                content.push(StyleContent::Block(block));
                pos = next_line(source, line_end(source, nested_close));
                text_start = pos;
            } else if is_table_row(line) {
                self.push_text(text_start..pos, &mut content);
                let mut rows = Vec::new();
                while pos < close {
                    let end = line_end(source, pos);
                    if !is_table_row(&source[pos..end]) {
                        break;
                    }
                    rows.push(self.table_row(pos, end));
                    pos = next_line(source, end);
                }
                content.push(StyleContent::Table(rows));
                text_start = pos;
            } else {
                pos = next_line(source, end);
            }
        }
        self.push_text(text_start..close, &mut content);

        StyleBlock {
            class_name: class_name.to_owned(),
            content,
        }
    }

    fn push_text(&mut self, range: Range<usize>, content: &mut Vec<StyleContent>) {
        if self.source[range.clone()].trim().is_empty() {
            return;
        }
        let mut text = String::with_capacity(range.len());
        self.scan_blocks(range.start, range.end, &mut text);
        content.push(StyleContent::Text(text));
    }

    fn table_row(&mut self, start: usize, end: usize) -> TableRow {
        let source = self.source;
        let line = &source[start..end];
        let row_start = start + (line.len() - line.trim_start().len());
        let row = line.trim();
        let header = row.starts_with("||");
        let delimiter = if header { "||" } else { "|" };

        let cells = split_cells(row, delimiter)
            .into_iter()
            .map(|cell| {
                let cell_start = row_start + cell.start;
                let cell_end = row_start + cell.end;
                self.line_start = cell_start;
                let mut text = String::with_capacity(cell.len());
                self.scan_line(cell_start, cell_end, &mut text);
                text
            })
            .collect();

        TableRow { header, cells }
    }

    fn matching_close(&mut self, open: usize) -> Option<usize> {
        let source = self.source;
        self.style_pairs
            .get_or_insert_with(|| style_pairs(source))
            .get(&open)
            .copied()
    }
}

/// Pair every opening line with its closing line, keyed by line start.
/// Lines inside fenced code are ignored.
fn style_pairs(source: &str) -> HashMap<usize, usize> {
    let mut pairs = HashMap::new();
    let mut open = Vec::new();
    let mut fence = FenceTracker::new();
    let mut pos = 0;

    while pos < source.len() {
        let end = line_end(source, pos);
        let line = &source[pos..end];
        if !fence.observe(line) {
            if style_open(line).is_some() {
                open.push(pos);
            } else if is_style_close(line)
                && let Some(start) = open.pop()
            {
                pairs.insert(start, pos);
            }
        }
        pos = next_line(source, end);
    }
    pairs
}

/// Line content after at most three spaces of indentation.
fn block_line(line: &str) -> Option<&str> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    (indent <= 3).then(|| &line[indent..])
}

/// Class name of a `%%class-name` opening line.
fn style_open(line: &str) -> Option<&str> {
    let name = block_line(line)?.strip_prefix("%%")?.trim_end();
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    valid.then_some(name)
}

fn is_style_close(line: &str) -> bool {
    block_line(line).is_some_and(|rest| rest.trim_end() == "/%")
}

fn is_table_row(line: &str) -> bool {
    line.trim_start().starts_with('|')
}

/// Trimmed cell ranges of a row, splitting on `delimiter` outside brackets
/// so `[Display|Target]` stays in one cell. The empty piece before the
/// leading delimiter and after a trailing one is dropped.
fn split_cells(row: &str, delimiter: &str) -> Vec<Range<usize>> {
    let bytes = row.as_bytes();
    let mut pieces = Vec::new();
    let mut depth = 0_usize;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'[' => depth += 1,
            b']' => depth = depth.saturating_sub(1),
            _ if depth == 0 && bytes[i..].starts_with(delimiter.as_bytes()) => {
                pieces.push(start..i);
                i += delimiter.len();
                start = i;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    pieces.push(start..bytes.len());

    let trimmed: Vec<Range<usize>> = pieces
        .into_iter()
        .map(|range| trim_range(row, range))
        .collect();
    let mut cells = trimmed.as_slice();
    if let [first, rest @ ..] = cells
        && first.is_empty()
    {
        cells = rest;
    }
    if let [rest @ .., last] = cells
        && last.is_empty()
    {
        cells = rest;
    }
    cells.to_vec()
}

fn trim_range(s: &str, range: Range<usize>) -> Range<usize> {
    let piece = &s[range.clone()];
    let start = range.start + (piece.len() - piece.trim_start().len());
    let end = range.end - (piece.len() - piece.trim_end().len());
    start..end.max(start)
}
