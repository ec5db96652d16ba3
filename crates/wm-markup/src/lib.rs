//! Extraction-based renderer for documents mixing Markdown with wiki markup.
//!
//! Wiki markup (`[{$variable}]`, `[{Plugin key=value}]`, `[Display|Target]`,
//! `[[escaped]`, `%%class` style blocks) is never fed to the Markdown
//! renderer. Instead the pipeline runs in four stages:
//!
//! 1. [`extract`] replaces every element with an HTML-comment marker
//!    namespaced by a per-call [`CorrelationToken`];
//! 2. each element is resolved into a fragment by the resolver for its kind,
//!    with injected collaborators ([`PageResolver`], [`InterWikiTable`],
//!    [`VariableRegistry`], [`PluginExecutor`]);
//! 3. the marker-substituted text is rendered once by a [`MarkdownRenderer`];
//! 4. fragments are spliced back at their markers.
//!
//! A failing element becomes a visible error fragment; the rest of the page
//! renders normally.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use wm_markup::{AppInfo, PageIndex, PageResolver, RenderContext, VariableRegistry, WikiRenderer};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
//! let pages: Arc<dyn PageResolver> = Arc::new(PageIndex::new(["HomePage"], true));
//! let renderer = WikiRenderer::builder()
//!     .pages(Arc::clone(&pages))
//!     .variables(VariableRegistry::with_builtins(&AppInfo::default(), pages))
//!     .build();
//!
//! let result = renderer
//!     .render("## Welcome\nThis is [{$pagename}], see [HomePage].", &RenderContext::new("Intro"))
//!     .await;
//! assert!(result.html.starts_with("<h2>Welcome</h2>"));
//! assert!(result.html.contains(">Intro</span>"));
//! # });
//! ```

mod app;
mod context;
mod element;
mod extract;
mod fragment;
mod interwiki;
mod markdown;
mod marker;
mod merge;
mod pages;
pub mod plugins;
mod renderer;
mod resolve;
mod stats;
pub mod variables;

pub use app::{AppInfo, format_uptime};
pub use context::{RenderContext, RequestInfo, UserContext};
pub use element::{
    ElementKind, ElementType, ExtractedElement, StyleBlock, StyleContent, TableRow,
};
pub use extract::{Extraction, extract, extract_with_token};
pub use fragment::{Element, Node, escape_html, parse_html};
pub use interwiki::{InterWikiSite, InterWikiTable};
pub use markdown::{CommonMarkRenderer, MarkdownRenderer};
pub use marker::CorrelationToken;
pub use pages::{NameMatcher, PageIndex, PageResolver};
pub use plugins::{PluginError, PluginExecutor, PluginRegistry};
pub use renderer::{
    DEFAULT_RESOLVE_TIMEOUT, RenderError, RenderOptions, RenderResult, WikiRenderer,
    WikiRendererBuilder,
};
pub use resolve::{
    FragmentContent, FragmentOutcome, LinkOptions, LinkType, ResolveError, ResolvedFragment,
};
pub use stats::RenderStats;
pub use variables::{HandlerError, VariableHandler, VariableRegistry};
