//! Markdown-to-HTML collaborator.
//!
//! The pipeline renders the marker-substituted text once, plus once per
//! style block text and table cell. Markers are HTML comments. The
//! CommonMark renderer treats a comment that fits on one line as inline
//! HTML wherever it appears, so a marker at the start of a line stays part
//! of its paragraph instead of opening an HTML block.

use std::fmt::Write;

use pulldown_cmark::{
    CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd, TextMergeStream, html,
};

/// Placeholder delimiters. Private-use characters parse as plain text.
const OPEN: char = '\u{E000}';
const CLOSE: char = '\u{E001}';

/// Converts Markdown text to HTML.
pub trait MarkdownRenderer: Send + Sync {
    fn render(&self, text: &str) -> String;
}

impl<F> MarkdownRenderer for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn render(&self, text: &str) -> String {
        self(text)
    }
}

/// CommonMark renderer with tables, strikethrough and task lists.
#[derive(Clone, Copy, Debug, Default)]
pub struct CommonMarkRenderer;

impl CommonMarkRenderer {
    fn options() -> Options {
        Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
    }
}

impl MarkdownRenderer for CommonMarkRenderer {
    fn render(&self, text: &str) -> String {
        let mut output = String::with_capacity(text.len() * 3 / 2);
        if let Some(comments) = InlineComments::protect(text) {
            let parser = Parser::new_ext(&comments.text, Self::options());
            html::push_html(&mut output, comments.restore(parser));
        } else {
            html::push_html(&mut output, Parser::new_ext(text, Self::options()));
        }
        output
    }
}

/// Text with every single-line HTML comment swapped for a placeholder.
struct InlineComments {
    text: String,
    comments: Vec<String>,
}

enum Piece<'s> {
    Text(&'s str),
    Comment(&'s str),
}

impl InlineComments {
    /// `None` when the text has no comment to protect, or already contains
    /// placeholder characters.
    fn protect(source: &str) -> Option<Self> {
        if !source.contains("<!--") || source.contains([OPEN, CLOSE]) {
            return None;
        }

        let mut text = String::with_capacity(source.len());
        let mut comments = Vec::new();
        let mut pos = 0;
        let mut line_end = 0;

        while let Some(found) = source[pos..].find("<!--") {
            let start = pos + found;
            let body = start + "<!--".len();
            if is_escaped(source, start) {
                text.push_str(&source[pos..body]);
                pos = body;
                continue;
            }
            if start >= line_end {
                line_end = source[start..].find('\n').map_or(source.len(), |i| start + i);
            }

            if let Some(close) = source[body..line_end].find("-->") {
                let end = body + close + "-->".len();
                text.push_str(&source[pos..start]);
                let _ = write!(text, "{OPEN}{}{CLOSE}", comments.len());
                comments.push(source[start..end].to_owned());
                pos = end;
            } else {
                text.push_str(&source[pos..line_end]);
                pos = line_end;
            }
        }

        if comments.is_empty() {
            return None;
        }
        text.push_str(&source[pos..]);
        Some(Self { text, comments })
    }

    /// Put the comments back: as inline HTML in running text, verbatim
    /// everywhere else so literal contexts escape them as before.
    fn restore<'a>(
        &'a self,
        events: impl Iterator<Item = Event<'a>> + 'a,
    ) -> impl Iterator<Item = Event<'a>> + 'a {
        let mut in_code_block = false;
        TextMergeStream::new(events).flat_map(move |event| {
            let mut out = Vec::with_capacity(1);
            match event {
                Event::Text(text) if !in_code_block && text.contains(OPEN) => {
                    for piece in self.pieces(&text) {
                        out.push(match piece {
                            Piece::Text(text) => Event::Text(text.to_owned().into()),
                            Piece::Comment(html) => Event::InlineHtml(html.to_owned().into()),
                        });
                    }
                }
                Event::Text(text) => out.push(Event::Text(self.restore_str(text))),
                Event::Code(code) => out.push(Event::Code(self.restore_str(code))),
                Event::Html(html) => out.push(Event::Html(self.restore_str(html))),
                Event::InlineHtml(html) => out.push(Event::InlineHtml(self.restore_str(html))),
                Event::Start(Tag::CodeBlock(kind)) => {
                    in_code_block = true;
                    let kind = match kind {
                        CodeBlockKind::Fenced(info) => {
                            CodeBlockKind::Fenced(self.restore_str(info))
                        }
                        CodeBlockKind::Indented => CodeBlockKind::Indented,
                    };
                    out.push(Event::Start(Tag::CodeBlock(kind)));
                }
                Event::End(TagEnd::CodeBlock) => {
                    in_code_block = false;
                    out.push(Event::End(TagEnd::CodeBlock));
                }
                Event::Start(Tag::Link {
                    link_type,
                    dest_url,
                    title,
                    id,
                }) => out.push(Event::Start(Tag::Link {
                    link_type,
                    dest_url: self.restore_str(dest_url),
                    title: self.restore_str(title),
                    id,
                })),
                Event::Start(Tag::Image {
                    link_type,
                    dest_url,
                    title,
                    id,
                }) => out.push(Event::Start(Tag::Image {
                    link_type,
                    dest_url: self.restore_str(dest_url),
                    title: self.restore_str(title),
                    id,
                })),
                other => out.push(other),
            }
            out
        })
    }

    fn restore_str<'a>(&self, s: CowStr<'a>) -> CowStr<'a> {
        if !s.contains(OPEN) {
            return s;
        }
        let mut out = String::with_capacity(s.len());
        for piece in self.pieces(&s) {
            match piece {
                Piece::Text(text) | Piece::Comment(text) => out.push_str(text),
            }
        }
        out.into()
    }

    fn pieces<'s>(&'s self, s: &'s str) -> Vec<Piece<'s>> {
        let mut pieces = Vec::new();
        let mut rest = s;
        while let Some(at) = rest.find(OPEN) {
            let Some((comment, len)) = self.placeholder(&rest[at..]) else {
                let next = at + OPEN.len_utf8();
                pieces.push(Piece::Text(&rest[..next]));
                rest = &rest[next..];
                continue;
            };
            if at > 0 {
                pieces.push(Piece::Text(&rest[..at]));
            }
            pieces.push(Piece::Comment(comment));
            rest = &rest[at + len..];
        }
        if !rest.is_empty() {
            pieces.push(Piece::Text(rest));
        }
        pieces
    }

    /// Comment for the placeholder at the start of `s`, and the
    /// placeholder's length.
    fn placeholder(&self, s: &str) -> Option<(&str, usize)> {
        let rest = s.strip_prefix(OPEN)?;
        let digits = rest.find(CLOSE)?;
        let comment = self.comments.get(rest[..digits].parse::<usize>().ok()?)?;
        Some((comment, OPEN.len_utf8() + digits + CLOSE.len_utf8()))
    }
}

/// Whether the byte at `at` follows an odd number of backslashes.
fn is_escaped(source: &str, at: usize) -> bool {
    let backslashes = source.as_bytes()[..at]
        .iter()
        .rev()
        .take_while(|&&b| b == b'\\')
        .count();
    backslashes % 2 == 1
}
