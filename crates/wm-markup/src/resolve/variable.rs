//! Variable references: `[{$pagename}]`.

use super::{FragmentOutcome, ResolveError, ResolvedFragment};
use crate::context::RenderContext;
use crate::element::ExtractedElement;
use crate::fragment::Element;
use crate::variables::{VariableRegistry, normalize_name};

pub(super) async fn resolve(
    element: &ExtractedElement,
    raw_name: &str,
    registry: &VariableRegistry,
    ctx: &RenderContext,
) -> Result<ResolvedFragment, ResolveError> {
    let name = normalize_name(raw_name);
    let value = match registry.get(&name) {
        Some(handler) => handler
            .resolve(ctx)
            .await
            .map_err(|source| ResolveError::Variable {
                name: name.clone(),
                source,
            })?,
        None => {
            tracing::debug!(id = element.id, variable = %name, "Unknown variable");
            None
        }
    };

    let span = Element::new("span")
        .attr("class", "wiki-variable")
        .attr("data-wm-id", element.id.to_string())
        .attr("data-variable", name);

    Ok(match value {
        Some(value) => ResolvedFragment::node(element, span.text(value)),
        None => ResolvedFragment::node(element, span.text(element.original_syntax.clone()))
            .with_outcome(FragmentOutcome::Unresolved),
    })
}
