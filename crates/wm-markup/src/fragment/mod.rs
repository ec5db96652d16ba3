//! HTML fragment construction and parsing.
//!
//! Resolvers never concatenate HTML strings. They build [`Element`] trees,
//! which escape text and attribute values on serialization, or parse
//! trusted plugin output into the same tree with [`parse_html`].

mod node;

pub use node::{Element, Node, escape_html};

use scraper::{ElementRef, Html};

/// Parse an HTML fragment into detached nodes.
///
/// Malformed markup is repaired the way browsers repair it, so this never
/// fails. Top-level text, comments and elements are preserved in order.
#[must_use]
pub fn parse_html(html: &str) -> Vec<Node> {
    let document = Html::parse_fragment(html);
    convert_children(document.root_element())
}

fn convert_children(parent: ElementRef<'_>) -> Vec<Node> {
    parent
        .children()
        .filter_map(|child| match child.value() {
            scraper::Node::Text(text) => Some(Node::Text(text.text.to_string())),
            scraper::Node::Comment(comment) => Some(Node::Comment(comment.comment.to_string())),
            scraper::Node::Element(_) => ElementRef::wrap(child).map(convert_element),
            _ => None,
        })
        .collect()
}

fn convert_element(el: ElementRef<'_>) -> Node {
    let value = el.value();
    Node::Element(Element {
        tag: value.name().to_owned(),
        attrs: value
            .attrs()
            .map(|(name, value)| (name.to_owned(), value.to_owned()))
            .collect(),
        children: convert_children(el),
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_parse_single_element() {
        let nodes = parse_html(r#"<span class="time">12:00</span>"#);
        assert_eq!(
            nodes,
            vec![Node::Element(
                Element::new("span").attr("class", "time").text("12:00")
            )]
        );
    }

    #[test]
    fn test_parse_plain_text() {
        assert_eq!(parse_html("42"), vec![Node::text("42")]);
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_html("").is_empty());
    }

    #[test]
    fn test_parse_mixed_top_level() {
        let nodes = parse_html("<b>a</b> and <i>b</i><!-- c -->");
        assert_eq!(nodes.len(), 4);
        assert!(matches!(&nodes[1], Node::Text(t) if t == " and "));
        assert!(matches!(&nodes[3], Node::Comment(c) if c == " c "));
    }

    #[test]
    fn test_parse_repairs_unclosed_tags() {
        let nodes = parse_html("<div><p>open");
        let html: String = nodes.iter().map(Node::to_html).collect();
        assert_eq!(html, "<div><p>open</p></div>");
    }

    #[test]
    fn test_parse_then_serialize_escapes_text() {
        let nodes = parse_html("<p>a &amp; b &lt; c</p>");
        assert_eq!(nodes[0].to_html(), "<p>a &amp; b &lt; c</p>");
    }

    #[test]
    fn test_parse_nested_table() {
        let nodes = parse_html("<table><tr><td>1</td></tr></table>");
        let [Node::Element(table)] = nodes.as_slice() else {
            panic!("expected single table, got {nodes:?}");
        };
        assert_eq!(table.tag, "table");
        assert_eq!(table.text_content(), "1");
        assert!(nodes[0].is_block());
    }
}
