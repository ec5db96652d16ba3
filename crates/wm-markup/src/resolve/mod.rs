//! Element resolvers.
//!
//! Each extracted element is turned into a [`ResolvedFragment`] by the
//! resolver for its kind. Resolver failures never escape this module: they
//! become visible error fragments, so one broken element cannot affect its
//! siblings or abort the render.

mod escape;
mod link;
mod plugin;
mod style;
mod variable;

use std::sync::Arc;

use tokio::time::{Instant, timeout_at};

pub use link::{LinkOptions, LinkType};

use crate::context::RenderContext;
use crate::element::{ElementKind, ElementType, ExtractedElement};
use crate::fragment::{Element, Node, escape_html};
use crate::interwiki::InterWikiTable;
use crate::markdown::MarkdownRenderer;
use crate::pages::PageResolver;
use crate::plugins::{ParamError, PluginError, PluginExecutor};
use crate::variables::{HandlerError, VariableRegistry, normalize_name};

/// Resolver failure. Converted into an error fragment before merging.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("variable `{name}` failed: {source}")]
    Variable {
        name: String,
        #[source]
        source: HandlerError,
    },
    #[error("plugin `{name}` failed: {source}")]
    Plugin {
        name: String,
        #[source]
        source: PluginError,
    },
    #[error("invalid plugin invocation: {0}")]
    Invocation(#[from] ParamError),
    #[error("empty link target")]
    EmptyLink,
    #[error("resolution deadline exceeded")]
    Timeout,
}

/// Rendered content of a fragment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FragmentContent {
    Node(Node),
    /// Plain text, escaped on serialization.
    Text(String),
    Empty,
}

/// How an element resolved, for statistics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FragmentOutcome {
    Resolved,
    /// No value was available and the original syntax is shown.
    Unresolved,
    Failed,
    /// Internal link to a page that does not exist.
    RedLink,
}

/// Output of one resolver, keyed by element id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedFragment {
    pub id: usize,
    pub kind: ElementType,
    pub original_syntax: String,
    pub content: FragmentContent,
    pub outcome: FragmentOutcome,
    /// Classification of link fragments.
    pub link_type: Option<LinkType>,
}

impl ResolvedFragment {
    fn new(element: &ExtractedElement, content: FragmentContent) -> Self {
        Self {
            id: element.id,
            kind: element.element_type(),
            original_syntax: element.original_syntax.clone(),
            content,
            outcome: FragmentOutcome::Resolved,
            link_type: None,
        }
    }

    fn node(element: &ExtractedElement, node: impl Into<Node>) -> Self {
        Self::new(element, FragmentContent::Node(node.into()))
    }

    fn with_outcome(mut self, outcome: FragmentOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    /// Whether the fragment renders a block-level element, which must not
    /// stay inside the paragraph its marker ended up in.
    #[must_use]
    pub fn is_block(&self) -> bool {
        matches!(&self.content, FragmentContent::Node(node) if node.is_block())
    }

    /// Serialized markup spliced in place of the element's marker.
    #[must_use]
    pub fn to_html(&self) -> String {
        match &self.content {
            FragmentContent::Node(node) => node.to_html(),
            FragmentContent::Text(text) => escape_html(text),
            FragmentContent::Empty => String::new(),
        }
    }
}

/// Read-only collaborators shared by all resolvers.
#[derive(Clone)]
pub(crate) struct Resolvers {
    pub(crate) pages: Arc<dyn PageResolver>,
    pub(crate) interwiki: Arc<InterWikiTable>,
    pub(crate) variables: Arc<VariableRegistry>,
    pub(crate) plugins: Arc<dyn PluginExecutor>,
    pub(crate) links: LinkOptions,
    /// Renders style block text and table cells.
    pub(crate) markdown: Arc<dyn MarkdownRenderer>,
}

impl Resolvers {
    /// Resolve an element, abandoning it at `deadline`.
    pub(crate) async fn resolve_before(
        &self,
        element: &ExtractedElement,
        ctx: &RenderContext,
        deadline: Instant,
    ) -> ResolvedFragment {
        match timeout_at(deadline, self.resolve(element, ctx)).await {
            Ok(fragment) => fragment,
            Err(_) => error_fragment(element, &ResolveError::Timeout),
        }
    }

    /// Resolve an element with the resolver for its kind.
    pub(crate) async fn resolve(
        &self,
        element: &ExtractedElement,
        ctx: &RenderContext,
    ) -> ResolvedFragment {
        let result = match &element.kind {
            ElementKind::Escaped { literal } => Ok(escape::resolve(element, literal)),
            ElementKind::Variable { name } => {
                variable::resolve(element, name, &self.variables, ctx).await
            }
            ElementKind::Plugin { invocation } => {
                plugin::resolve(element, invocation, self.plugins.as_ref(), ctx).await
            }
            ElementKind::Link { target } => link::resolve(element, target, self),
            ElementKind::Style { block } => {
                Ok(style::resolve(element, block, self.markdown.as_ref()))
            }
        };

        result.unwrap_or_else(|err| error_fragment(element, &err))
    }
}

/// Visible error fragment for a failed element.
fn error_fragment(element: &ExtractedElement, err: &ResolveError) -> ResolvedFragment {
    tracing::warn!(
        id = element.id,
        kind = %element.element_type(),
        syntax = %element.original_syntax,
        error = %err,
        "Failed to resolve element"
    );

    let node = match &element.kind {
        ElementKind::Plugin { invocation } => {
            let name = plugin_name(invocation);
            Element::new("span")
                .attr("class", "wiki-plugin-error")
                .attr("data-wm-id", element.id.to_string())
                .attr("data-plugin", name)
                .attr("title", err.to_string())
                .text(format!("[Error: {name}]"))
        }
        ElementKind::Variable { name } => {
            let name = normalize_name(name);
            Element::new("span")
                .attr("class", "wiki-error")
                .attr("data-wm-id", element.id.to_string())
                .attr("data-variable", name.clone())
                .attr("title", err.to_string())
                .text(format!("[Error: {name}]"))
        }
        _ => Element::new("span")
            .attr("class", "wiki-error")
            .attr("data-wm-id", element.id.to_string())
            .attr("title", err.to_string())
            .text(format!("[Error: {}]", element.original_syntax)),
    };

    ResolvedFragment::node(element, node).with_outcome(FragmentOutcome::Failed)
}

/// Plugin name of an invocation, for error messages.
fn plugin_name(invocation: &str) -> &str {
    invocation.split_whitespace().next().unwrap_or(invocation)
}
