//! Extraction of wiki markup from hybrid source text.
//!
//! A single forward scan replaces every wiki-markup element with a marker and
//! records it as an [`ExtractedElement`]. At a `[` the candidates are tested in
//! priority order: escape, variable, plugin, link. The first match wins and
//! the cursor jumps past it, so escaped ranges are never rescanned. Anything
//! that does not match is copied as literal text for the Markdown renderer.
//!
//! Fenced code blocks and inline code spans are copied verbatim. Style blocks
//! (`%%class` ... `/%`) are recognized at the start of a line and may nest.
//!
//! Every search either consumes what it covers or is memoized, so extraction
//! stays linear in the input length.

mod fence;
mod lookahead;
mod style;

use std::collections::HashMap;

use crate::element::{ElementKind, ExtractedElement};
use crate::marker::CorrelationToken;

use fence::FenceTracker;
use lookahead::{LineCounter, Lookahead};

/// Result of extracting wiki markup from a source text.
#[derive(Debug)]
pub struct Extraction {
    /// Source with every element replaced by its marker.
    pub text: String,
    /// Elements in scan order; `elements[i].id == i`.
    pub elements: Vec<ExtractedElement>,
    /// Namespace of this extraction's markers.
    pub token: CorrelationToken,
    /// Diagnostics for malformed constructs left as literal text.
    pub warnings: Vec<String>,
}

/// Extract wiki markup from `source` under a freshly generated token.
///
/// Never fails: malformed constructs stay in the text as literals.
///
/// # Example
///
/// ```
/// use wm_markup::{ElementKind, extract};
///
/// let extraction = extract("Hello [{$username}], see [HomePage].");
/// assert_eq!(extraction.elements.len(), 2);
/// assert!(matches!(extraction.elements[1].kind, ElementKind::Link { .. }));
/// assert!(!extraction.text.contains("[HomePage]"));
/// ```
#[must_use]
pub fn extract(source: &str) -> Extraction {
    extract_with_token(source, CorrelationToken::generate())
}

/// Extract wiki markup using the given token.
#[must_use]
pub fn extract_with_token(source: &str, token: CorrelationToken) -> Extraction {
    Extractor::new(source, token).run()
}

/// Outcome of scanning at a `[`.
enum Scan {
    /// A wiki-markup element ending at the given byte offset.
    Element { kind: ElementKind, end: usize },
    /// Markdown syntax to copy unchanged up to the given byte offset.
    Verbatim(usize),
    /// Not markup: emit the bracket and continue after it.
    Literal,
}

struct Extractor<'a> {
    source: &'a str,
    token: CorrelationToken,
    elements: Vec<ExtractedElement>,
    warnings: Vec<String>,
    /// Start of the line (or table cell) being scanned.
    line_start: usize,
    lines: LineCounter,
    close_brace: Lookahead,
    close_bracket: Lookahead,
    newline: Lookahead,
    /// Backtick run lengths known to have no closing run before the bound.
    unclosed_runs: HashMap<usize, usize>,
    /// Opening line start to closing line start, computed on first use.
    style_pairs: Option<HashMap<usize, usize>>,
}

impl<'a> Extractor<'a> {
    fn new(source: &'a str, token: CorrelationToken) -> Self {
        Self {
            source,
            token,
            elements: Vec::new(),
            warnings: Vec::new(),
            line_start: 0,
            lines: LineCounter::new(),
            close_brace: Lookahead::new(b'}'),
            close_bracket: Lookahead::new(b']'),
            newline: Lookahead::new(b'\n'),
            unclosed_runs: HashMap::new(),
            style_pairs: None,
        }
    }

    fn run(mut self) -> Extraction {
        let mut text = String::with_capacity(self.source.len());
        self.scan_blocks(0, self.source.len(), &mut text);

        Extraction {
            text,
            elements: self.elements,
            token: self.token,
            warnings: self.warnings,
        }
    }

    /// Scan whole lines of `source[start..limit]`, handling fences and style
    /// blocks at line starts.
    fn scan_blocks(&mut self, start: usize, limit: usize, out: &mut String) {
        let source = self.source;
        let mut fence = FenceTracker::new();
        let mut pos = start;

        while pos < limit {
            self.line_start = pos;
            let end = line_end(source, pos).min(limit);
            let line = &source[pos..end];

            if fence.observe(line) {
                let next = next_line(source, end).min(limit);
                out.push_str(&source[pos..next]);
                pos = next;
            } else if let Some(next) = self.style_block(pos, line, out) {
                pos = next;
            } else {
                pos = self.scan_line(pos, limit, out);
            }
        }
    }

    /// Scan inline content up to and including the next newline. Elements
    /// may span lines. Returns the offset where scanning stopped.
    fn scan_line(&mut self, mut pos: usize, limit: usize, out: &mut String) -> usize {
        let source = self.source;
        let bytes = source.as_bytes();

        while pos < limit {
            match bytes[pos] {
                b'\n' => {
                    out.push('\n');
                    return pos + 1;
                }
                b'`' => pos = self.code_span(pos, limit, out),
                b'[' => pos = self.bracket(pos, limit, out),
                _ => {
                    let end = source[pos..limit]
                        .find(['\n', '`', '['])
                        .map_or(limit, |i| pos + i);
                    out.push_str(&source[pos..end]);
                    pos = end;
                }
            }
        }
        pos
    }

    /// Copy an inline code span, or just its opening backticks if unclosed.
    fn code_span(&mut self, pos: usize, limit: usize, out: &mut String) -> usize {
        let source = self.source;
        let run = source[pos..limit].bytes().take_while(|&b| b == b'`').count();
        let bound = self
            .newline
            .next(source.as_bytes(), pos)
            .map_or(limit, |nl| nl.min(limit));

        let close = if self.unclosed_runs.get(&run) == Some(&bound) {
            None
        } else {
            let found = closing_backticks(&source[pos + run..bound], run);
            if found.is_none() {
                self.unclosed_runs.insert(run, bound);
            }
            found
        };

        let end = close.map_or(pos + run, |close| pos + run + close);
        out.push_str(&source[pos..end]);
        end
    }

    fn bracket(&mut self, pos: usize, limit: usize, out: &mut String) -> usize {
        match self.scan_bracket(pos, limit) {
            Scan::Element { kind, end } => {
                self.push_element(pos, end, kind, out);
                end
            }
            Scan::Verbatim(end) => {
                out.push_str(&self.source[pos..end]);
                end
            }
            Scan::Literal => {
                out.push('[');
                pos + 1
            }
        }
    }

    fn scan_bracket(&mut self, pos: usize, limit: usize) -> Scan {
        if let Some(end) = self.escape_end(pos, limit) {
            return Scan::Element {
                kind: ElementKind::Escaped {
                    literal: self.source[pos + 1..end].to_owned(),
                },
                end,
            };
        }
        if self.source[pos..limit].starts_with("[{") {
            return self.scan_brace(pos, limit);
        }
        self.scan_link(pos, limit)
    }

    /// End of an escape `[[...]` at `pos`: the first `]` on the line, with
    /// something before it.
    fn escape_end(&mut self, pos: usize, limit: usize) -> Option<usize> {
        if !self.source[pos..limit].starts_with("[[") {
            return None;
        }
        let bytes = self.source.as_bytes();
        let close = self.close_bracket.next(bytes, pos + 2)?;
        let newline = self.newline.next(bytes, pos + 2).unwrap_or(bytes.len());
        (close > pos + 2 && close < newline && close < limit).then_some(close + 1)
    }

    /// Variable `[{$name}]` or plugin `[{Name params}]`.
    fn scan_brace(&mut self, pos: usize, limit: usize) -> Scan {
        let close = self
            .close_brace
            .next(self.source.as_bytes(), pos + 2)
            .filter(|&close| close < limit);
        let Some(close) = close else {
            self.warn(pos, "unterminated `[{` left as text");
            return Scan::Literal;
        };
        if !self.source[close..limit].starts_with("}]") {
            self.warn(pos, "`[{` not closed by `}]`, left as text");
            return Scan::Literal;
        }

        let content = self.source[pos + 2..close].trim();
        let end = close + 2;

        if let Some(name) = content.strip_prefix('$') {
            if is_variable_name(name.trim_start()) {
                return Scan::Element {
                    kind: ElementKind::Variable {
                        name: content.to_owned(),
                    },
                    end,
                };
            }
            self.warn(pos, "invalid variable name, left as text");
            return Scan::Literal;
        }

        if content.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return Scan::Element {
                kind: ElementKind::Plugin {
                    invocation: content.to_owned(),
                },
                end,
            };
        }

        Scan::Literal
    }

    /// Wiki link `[Target]` / `[Display|Target]`, excluding Markdown's own
    /// bracket syntax (inline links, reference links and definitions,
    /// footnotes, task list checkboxes).
    fn scan_link(&self, pos: usize, limit: usize) -> Scan {
        let inner = &self.source[pos + 1..limit];

        if inner.starts_with(['[', '{', '^', ']']) {
            return Scan::Literal;
        }
        let Some(close) = inner.find([']', '[', '\n']) else {
            return Scan::Literal;
        };
        if inner.as_bytes()[close] != b']' {
            return Scan::Literal;
        }

        let content = &inner[..close];
        if content.trim().is_empty() || self.is_task_checkbox(pos, content) {
            return Scan::Literal;
        }

        let end = pos + 1 + close + 1;
        match self.source[end..limit].chars().next() {
            Some('(') => return Scan::Literal,
            Some('[') => {
                // `[text][label]` or `[text][]`
                let label = &self.source[end + 1..limit];
                return match label.find([']', '\n']) {
                    Some(i) if label.as_bytes()[i] == b']' => Scan::Verbatim(end + 1 + i + 1),
                    _ => Scan::Literal,
                };
            }
            Some(':') if self.at_definition_start(pos) => return Scan::Verbatim(end),
            _ => {}
        }

        Scan::Element {
            kind: ElementKind::Link {
                target: content.trim().to_owned(),
            },
            end,
        }
    }

    /// `[ ]`, `[x]` or `[X]` directly after a list item marker.
    fn is_task_checkbox(&self, pos: usize, content: &str) -> bool {
        if !matches!(content, " " | "x" | "X") {
            return false;
        }
        let prefix = self.source[self.line_start..pos].trim();
        matches!(prefix, "-" | "*" | "+")
            || prefix
                .strip_suffix(['.', ')'])
                .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
    }

    /// Bracket starts a line (up to three spaces of indentation).
    fn at_definition_start(&self, pos: usize) -> bool {
        let prefix = &self.source[self.line_start..pos];
        prefix.len() <= 3 && prefix.bytes().all(|b| b == b' ')
    }

    fn push_element(&mut self, start: usize, end: usize, kind: ElementKind, out: &mut String) {
        let id = self.elements.len();
        out.push_str(&self.token.marker(id));
        self.elements.push(ExtractedElement {
            id,
            offset: start,
            original_syntax: self.source[start..end].to_owned(),
            kind,
        });
        tracing::trace!(id, offset = start, "extracted wiki element");
    }

    fn warn(&mut self, offset: usize, message: &str) {
        let line = self.lines.line_at(self.source, offset);
        tracing::debug!(line, "{message}");
        self.warnings.push(format!("line {line}: {message}"));
    }
}

fn is_variable_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

/// Offset just past a backtick run of exactly `len` in `s`.
fn closing_backticks(s: &str, len: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'`' {
            let run = bytes[i..].iter().take_while(|&&b| b == b'`').count();
            if run == len {
                return Some(i + run);
            }
            i += run;
        } else {
            i += 1;
        }
    }
    None
}

/// Offset of the newline ending the line at `pos`, or the end of input.
fn line_end(s: &str, pos: usize) -> usize {
    s[pos..].find('\n').map_or(s.len(), |i| pos + i)
}

/// Offset of the next line's start given a line end.
fn next_line(s: &str, end: usize) -> usize {
    if end < s.len() { end + 1 } else { end }
}
