//! Plugin invocations: `[{CurrentTime format='%H:%M'}]`.

use super::{ResolveError, ResolvedFragment};
use crate::context::RenderContext;
use crate::element::ExtractedElement;
use crate::fragment::{Element, Node, parse_html};
use crate::plugins::{PluginCall, PluginExecutor};

pub(super) async fn resolve(
    element: &ExtractedElement,
    invocation: &str,
    executor: &dyn PluginExecutor,
    ctx: &RenderContext,
) -> Result<ResolvedFragment, ResolveError> {
    let call = PluginCall::parse(invocation)?;
    let output = executor
        .execute(&call.name, &ctx.page_name, &call.params, ctx)
        .await
        .map_err(|source| ResolveError::Plugin {
            name: call.name.clone(),
            source,
        })?;

    let id = element.id.to_string();
    let mut nodes = parse_html(&output);
    let significant = nodes.iter().filter(|n| n.is_significant()).count();

    // A single root element is returned as is, with tracking attributes.
    if significant == 1
        && let Some(index) = nodes.iter().position(|n| matches!(n, Node::Element(_)))
        && let Node::Element(mut root) = nodes.swap_remove(index)
    {
        root.set_attr("data-wm-id", id);
        root.set_attr("data-plugin", call.name);
        return Ok(ResolvedFragment::node(element, root));
    }

    if significant == 0 {
        nodes.clear();
    }
    let tag = if nodes.iter().any(Node::is_block) {
        "div"
    } else {
        "span"
    };
    let wrapper = Element::new(tag)
        .attr("class", "wiki-plugin")
        .attr("data-wm-id", id)
        .attr("data-plugin", call.name)
        .children(nodes);

    Ok(ResolvedFragment::node(element, wrapper))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::element::ElementKind;
    use crate::plugins::{PluginError, PluginRegistry};
    use crate::resolve::tests::element;

    fn registry() -> PluginRegistry {
        let mut registry = PluginRegistry::new();
        registry.register_fn("Single", |_| Ok("<span class=\"time\">12:00</span>".to_owned()));
        registry.register_fn("Text", |_| Ok("42".to_owned()));
        registry.register_fn("Inline", |_| Ok("<b>a</b> <i>b</i>".to_owned()));
        registry.register_fn("Block", |_| Ok("<p>a</p><p>b</p>".to_owned()));
        registry.register_fn("Empty", |_| Ok(String::new()));
        registry.register_fn("Blank", |_| Ok("  \n ".to_owned()));
        registry.register_fn("Params", |input| {
            Ok(format!(
                "{}={}",
                input.page_name,
                input.params.get("max").unwrap_or("none")
            ))
        });
        registry.register_fn("Fails", |_| Err(PluginError::Failed("nope".to_owned())));
        registry
    }

    async fn run(invocation: &str) -> Result<ResolvedFragment, ResolveError> {
        let el = element(
            7,
            &format!("[{{{invocation}}}]"),
            ElementKind::Plugin {
                invocation: invocation.to_owned(),
            },
        );
        resolve(&el, invocation, &registry(), &RenderContext::new("Main")).await
    }

    async fn html(invocation: &str) -> String {
        run(invocation).await.unwrap().to_html()
    }

    #[tokio::test]
    async fn test_single_root_is_unwrapped() {
        assert_eq!(
            html("Single").await,
            r#"<span class="time" data-wm-id="7" data-plugin="Single">12:00</span>"#
        );
    }

    #[tokio::test]
    async fn test_text_output_wrapped_in_span() {
        assert_eq!(
            html("Text").await,
            r#"<span class="wiki-plugin" data-wm-id="7" data-plugin="Text">42</span>"#
        );
    }

    #[tokio::test]
    async fn test_inline_siblings_wrapped_in_span() {
        assert_eq!(
            html("Inline").await,
            r#"<span class="wiki-plugin" data-wm-id="7" data-plugin="Inline"><b>a</b> <i>b</i></span>"#
        );
    }

    #[tokio::test]
    async fn test_block_siblings_wrapped_in_div() {
        assert_eq!(
            html("Block").await,
            r#"<div class="wiki-plugin" data-wm-id="7" data-plugin="Block"><p>a</p><p>b</p></div>"#
        );
    }

    #[tokio::test]
    async fn test_empty_output() {
        let expected = r#"<span class="wiki-plugin" data-wm-id="7" data-plugin="Empty"></span>"#;
        assert_eq!(html("Empty").await, expected);
        assert_eq!(
            html("Blank").await,
            r#"<span class="wiki-plugin" data-wm-id="7" data-plugin="Blank"></span>"#
        );
    }

    #[tokio::test]
    async fn test_params_and_page_name_passed() {
        assert!(html("Params max = 3").await.contains(">Main=3<"));
    }

    #[tokio::test]
    async fn test_errors() {
        assert!(matches!(
            run("Fails").await,
            Err(ResolveError::Plugin { ref name, .. }) if name == "Fails"
        ));
        assert!(matches!(
            run("Unknown").await,
            Err(ResolveError::Plugin {
                source: PluginError::NotFound(_),
                ..
            })
        ));
        assert!(matches!(
            run("Params max='open").await,
            Err(ResolveError::Invocation(_))
        ));
    }
}
