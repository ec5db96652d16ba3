//! Elements pulled out of the source by the extractor.

use std::fmt;

/// Kind-specific payload of an extracted element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ElementKind {
    /// Escaped syntax `[[...]`, rendered literally.
    Escaped {
        /// Original syntax with the leading `[` removed.
        literal: String,
    },
    /// Variable reference `[{$name}]`.
    Variable {
        /// Variable name, possibly still carrying its `$` sigil.
        name: String,
    },
    /// Plugin invocation `[{Name key=value}]`.
    Plugin {
        /// Plugin name followed by the raw parameter string.
        invocation: String,
    },
    /// Wiki link `[Target]` or `[Display|Target]`.
    Link {
        /// Bare target or `display|target` pair.
        target: String,
    },
    /// Style block `%%class` ... `/%`, nested blocks included.
    Style {
        /// Outermost block.
        block: StyleBlock,
    },
}

/// A `%%class` ... `/%` block.
///
/// Wiki markup inside the block is extracted in the same pass as the rest of
/// the page, so text and cells hold markers of the inner elements.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StyleBlock {
    /// Class name from the opening line.
    pub class_name: String,
    /// Content in source order.
    pub content: Vec<StyleContent>,
}

impl StyleBlock {
    /// Whether a table row appears anywhere in this block.
    #[must_use]
    pub fn has_table(&self) -> bool {
        self.content.iter().any(|part| match part {
            StyleContent::Table(_) => true,
            StyleContent::Block(block) => block.has_table(),
            StyleContent::Text(_) => false,
        })
    }
}

/// Part of a style block's content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StyleContent {
    /// Markdown lines.
    Text(String),
    /// Consecutive `|` and `||` rows.
    Table(Vec<TableRow>),
    /// Nested block.
    Block(StyleBlock),
}

/// Row of a style block table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableRow {
    /// Row written with `||` delimiters.
    pub header: bool,
    /// Trimmed cell text.
    pub cells: Vec<String>,
}

/// Payload-free tag of an [`ElementKind`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ElementType {
    Escaped,
    Variable,
    Plugin,
    Link,
    Style,
}

impl ElementType {
    /// Lowercase name used in logs and statistics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Escaped => "escaped",
            Self::Variable => "variable",
            Self::Plugin => "plugin",
            Self::Link => "link",
            Self::Style => "style",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A wiki-markup element recorded during extraction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractedElement {
    /// Position in scan order, shared across all kinds. Used as the marker key.
    pub id: usize,
    /// Byte offset of the match in the source.
    pub offset: usize,
    /// Exact source text that was matched.
    pub original_syntax: String,
    /// Kind and payload.
    pub kind: ElementKind,
}

impl ExtractedElement {
    /// Tag of this element's kind.
    #[must_use]
    pub fn element_type(&self) -> ElementType {
        match self.kind {
            ElementKind::Escaped { .. } => ElementType::Escaped,
            ElementKind::Variable { .. } => ElementType::Variable,
            ElementKind::Plugin { .. } => ElementType::Plugin,
            ElementKind::Link { .. } => ElementType::Link,
            ElementKind::Style { .. } => ElementType::Style,
        }
    }
}
