//! Detached node tree used by resolvers to build fragments.

use std::fmt::Write;

/// Elements serialized without a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose text content is emitted unescaped.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Block-level tags that force a `div` wrapper around plugin output.
const BLOCK_ELEMENTS: &[&str] = &[
    "div",
    "p",
    "table",
    "ul",
    "ol",
    "pre",
    "blockquote",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
];

/// A node of a fragment tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    /// Element with tag, attributes and children.
    Element(Element),
    /// Text, escaped on serialization.
    Text(String),
    /// HTML comment.
    Comment(String),
}

impl Node {
    /// Create a text node.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Whether this node contributes to output: elements always, text only
    /// when it has non-whitespace content.
    #[must_use]
    pub fn is_significant(&self) -> bool {
        match self {
            Self::Element(_) => true,
            Self::Text(text) => !text.trim().is_empty(),
            Self::Comment(_) => false,
        }
    }

    /// Whether this node is a block-level element.
    #[must_use]
    pub fn is_block(&self) -> bool {
        matches!(self, Self::Element(el) if BLOCK_ELEMENTS.contains(&el.tag.as_str()))
    }

    /// Serialize to HTML.
    #[must_use]
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out, false);
        out
    }

    fn write_html(&self, out: &mut String, raw_text: bool) {
        match self {
            Self::Element(el) => el.write_html(out),
            Self::Text(text) if raw_text => out.push_str(text),
            Self::Text(text) => out.push_str(&escape_html(text)),
            Self::Comment(text) => {
                let _ = write!(out, "<!--{text}-->");
            }
        }
    }
}

impl From<Element> for Node {
    fn from(el: Element) -> Self {
        Self::Element(el)
    }
}

/// An HTML element under construction.
///
/// # Example
///
/// ```
/// use wm_markup::Element;
///
/// let link = Element::new("a")
///     .attr("href", "/wiki/Home")
///     .attr("class", "wiki-link")
///     .text("Home & Away");
/// assert_eq!(
///     link.to_html(),
///     r#"<a href="/wiki/Home" class="wiki-link">Home &amp; Away</a>"#
/// );
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    /// Lowercase tag name.
    pub tag: String,
    /// Attributes in insertion order.
    pub attrs: Vec<(String, String)>,
    /// Child nodes.
    pub children: Vec<Node>,
}

impl Element {
    /// Create an element without attributes or children.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder form of [`set_attr`](Self::set_attr).
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Set an attribute, replacing an existing value in place.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name, value)),
        }
    }

    /// Get an attribute value.
    #[must_use]
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Append a text child.
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::text(text));
        self
    }

    /// Append a child node.
    #[must_use]
    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node.into());
        self
    }

    /// Append several child nodes.
    #[must_use]
    pub fn children(mut self, nodes: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(nodes);
        self
    }

    /// Concatenated text of all descendants.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }

    /// Serialize to HTML.
    #[must_use]
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        for (name, value) in &self.attrs {
            let _ = write!(out, r#" {name}="{}""#, escape_html(value));
        }
        out.push('>');

        if VOID_ELEMENTS.contains(&self.tag.as_str()) {
            return;
        }

        let raw_text = RAW_TEXT_ELEMENTS.contains(&self.tag.as_str());
        for child in &self.children {
            child.write_html(out, raw_text);
        }
        let _ = write!(out, "</{}>", self.tag);
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Element(el) => collect_text(&el.children, out),
            Node::Text(text) => out.push_str(text),
            Node::Comment(_) => {}
        }
    }
}

/// Escape text for HTML content and attribute values.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#x27;&amp;&#x27;&lt;/a&gt;"
        );
        assert_eq!(escape_html("{$user}"), "{$user}");
    }

    #[test]
    fn test_nested_serialization() {
        let table = Element::new("table").attr("class", "table").child(
            Element::new("tr")
                .child(Element::new("td").text("a < b"))
                .child(Element::new("td").text("c")),
        );
        assert_eq!(
            table.to_html(),
            r#"<table class="table"><tr><td>a &lt; b</td><td>c</td></tr></table>"#
        );
    }

    #[test]
    fn test_void_elements() {
        let img = Element::new("img").attr("src", "a.png").attr("alt", "x\"y");
        assert_eq!(img.to_html(), r#"<img src="a.png" alt="x&quot;y">"#);
        assert_eq!(Element::new("br").to_html(), "<br>");
    }

    #[test]
    fn test_set_attr_replaces_in_place() {
        let mut el = Element::new("a").attr("class", "wiki-link").attr("href", "#");
        el.set_attr("class", "wiki-link redlink");
        assert_eq!(el.get_attr("class"), Some("wiki-link redlink"));
        assert_eq!(el.attrs.len(), 2);
        assert_eq!(el.attrs[0].0, "class");
    }

    #[test]
    fn test_raw_text_elements_not_escaped() {
        let script = Element::new("script").text("if (a < b) {}");
        assert_eq!(script.to_html(), "<script>if (a < b) {}</script>");
    }

    #[test]
    fn test_significance() {
        assert!(Node::from(Element::new("span")).is_significant());
        assert!(Node::text("x").is_significant());
        assert!(!Node::text(" \n ").is_significant());
        assert!(!Node::Comment("c".to_owned()).is_significant());
    }

    #[test]
    fn test_block_detection() {
        assert!(Node::from(Element::new("table")).is_block());
        assert!(!Node::from(Element::new("span")).is_block());
        assert!(!Node::text("p").is_block());
    }

    #[test]
    fn test_text_content() {
        let el = Element::new("div")
            .text("a")
            .child(Element::new("b").text("b"))
            .child(Node::Comment("hidden".to_owned()));
        assert_eq!(el.text_content(), "ab");
    }
}
