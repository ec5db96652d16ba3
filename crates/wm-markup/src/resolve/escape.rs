//! Escaped syntax: `[[HomePage]` renders as the literal `[HomePage]`.

use super::ResolvedFragment;
use crate::element::ExtractedElement;
use crate::fragment::Element;

pub(super) fn resolve(element: &ExtractedElement, literal: &str) -> ResolvedFragment {
    let span = Element::new("span")
        .attr("class", "wiki-escaped")
        .attr("data-wm-id", element.id.to_string())
        .text(literal);
    ResolvedFragment::node(element, span)
}
