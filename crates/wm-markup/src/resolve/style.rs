//! Style blocks: `%%class` ... `/%`.
//!
//! Table classes accumulate down nested blocks and apply to every table
//! inside. Any other class renders a `div`. Text and cells go through the
//! Markdown renderer; markers of inner elements pass through it and are
//! replaced when the page is merged.

use super::ResolvedFragment;
use crate::element::{ExtractedElement, StyleBlock, StyleContent, TableRow};
use crate::fragment::{Element, Node, parse_html};
use crate::markdown::MarkdownRenderer;

const TABLE_CLASSES: &[&str] = &[
    "sortable",
    "table-sort",
    "table-filter",
    "zebra-table",
    "table-striped",
    "table-hover",
    "table-fit",
    "table-bordered",
    "table-sm",
    "table-responsive",
    "table-condensed",
];

pub(super) fn resolve(
    element: &ExtractedElement,
    block: &StyleBlock,
    markdown: &dyn MarkdownRenderer,
) -> ResolvedFragment {
    let mut nodes: Vec<Node> = StyleRenderer { markdown }
        .block(block, &[])
        .into_iter()
        .filter(|node| !is_blank(node))
        .collect();

    let id = element.id.to_string();
    let root = match nodes.pop() {
        Some(Node::Element(el)) if nodes.is_empty() => el.attr("data-wm-id", id),
        last => Element::new("div")
            .attr("data-wm-id", id)
            .children(nodes)
            .children(last),
    };
    ResolvedFragment::node(element, root)
}

struct StyleRenderer<'m> {
    markdown: &'m dyn MarkdownRenderer,
}

impl StyleRenderer<'_> {
    fn block<'b>(&self, block: &'b StyleBlock, classes: &[&'b str]) -> Vec<Node> {
        if is_table_class(&block.class_name) && block.has_table() {
            let mut classes = classes.to_vec();
            classes.push(&block.class_name);
            return self.content(&block.content, &classes);
        }

        let div = Element::new("div")
            .attr("class", block.class_name.as_str())
            .children(self.content(&block.content, classes));
        vec![div.into()]
    }

    fn content<'b>(&self, content: &'b [StyleContent], classes: &[&'b str]) -> Vec<Node> {
        let mut nodes = Vec::new();
        for part in content {
            match part {
                StyleContent::Text(text) => {
                    nodes.extend(parse_html(&self.markdown.render(text)));
                }
                StyleContent::Table(rows) => nodes.push(self.table(rows, classes).into()),
                StyleContent::Block(block) => nodes.extend(self.block(block, classes)),
            }
        }
        nodes
    }

    fn table(&self, rows: &[TableRow], classes: &[&str]) -> Element {
        let style = TableStyle::from_classes(classes);
        let (head, body): (Vec<&TableRow>, Vec<&TableRow>) =
            rows.iter().partition(|row| row.header);

        let mut table = Element::new("table").attr("class", style.class);
        if let Some(css) = style.style {
            table = table.attr("style", css);
        }
        if !head.is_empty() {
            let rows = head.into_iter().map(|row| self.row(row));
            table = table.child(Element::new("thead").children(rows));
        }
        if !body.is_empty() {
            let rows = body.into_iter().map(|row| self.row(row));
            table = table.child(Element::new("tbody").children(rows));
        }
        table
    }

    fn row(&self, row: &TableRow) -> Node {
        let tag = if row.header { "th" } else { "td" };
        Element::new("tr")
            .children(
                row.cells
                    .iter()
                    .map(|cell| Element::new(tag).children(self.inline(cell)).into()),
            )
            .into()
    }

    /// Cell text rendered as Markdown without its paragraph wrapper.
    fn inline(&self, text: &str) -> Vec<Node> {
        if text.is_empty() {
            return Vec::new();
        }
        let mut nodes: Vec<Node> = parse_html(&self.markdown.render(text))
            .into_iter()
            .filter(|node| !is_blank(node))
            .collect();
        match nodes.as_mut_slice() {
            [Node::Element(p)] if p.tag == "p" => std::mem::take(&mut p.children),
            _ => nodes,
        }
    }
}

fn is_blank(node: &Node) -> bool {
    matches!(node, Node::Text(text) if text.trim().is_empty())
}

fn is_table_class(class_name: &str) -> bool {
    TABLE_CLASSES.contains(&class_name) || zebra_color(class_name).is_some()
}

/// Hex color of a `zebra-RRGGBB` class.
fn zebra_color(class_name: &str) -> Option<&str> {
    let hex = class_name.strip_prefix("zebra-")?;
    (hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit())).then_some(hex)
}

/// Class and optional inline style of a table.
#[derive(Debug, PartialEq, Eq)]
struct TableStyle {
    class: String,
    style: Option<String>,
}

impl TableStyle {
    fn from_classes(classes: &[&str]) -> Self {
        let mut names = vec!["table"];
        let mut styles = Vec::new();
        for &class_name in classes {
            let name = match zebra_color(class_name) {
                Some(hex) => {
                    styles.push(format!(
                        "--zebra-row-even: #{hex}; --zebra-text-color: {};",
                        contrast_color(hex)
                    ));
                    "zebra-table"
                }
                None => class_name,
            };
            if !names.contains(&name) {
                names.push(name);
            }
        }

        Self {
            class: names.join(" "),
            style: (!styles.is_empty()).then(|| styles.join(" ")),
        }
    }
}

/// Black or white, whichever reads better on the given background.
fn contrast_color(hex: &str) -> &'static str {
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_or(0.0, f64::from);
    let luminance = (0.299 * channel(0) + 0.587 * channel(2) + 0.114 * channel(4)) / 255.0;
    if luminance > 0.5 { "#000000" } else { "#ffffff" }
}
