//! The render pipeline: extract, resolve, render Markdown, merge.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::time::Instant;

use crate::context::RenderContext;
use crate::extract::extract;
use crate::fragment::{Element, escape_html};
use crate::interwiki::InterWikiTable;
use crate::markdown::{CommonMarkRenderer, MarkdownRenderer};
use crate::merge::merge;
use crate::pages::{PageIndex, PageResolver};
use crate::plugins::{PluginExecutor, PluginRegistry};
use crate::resolve::{LinkOptions, Resolvers};
use crate::stats::RenderStats;
use crate::variables::VariableRegistry;

/// Default budget for resolving all elements of one render.
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Hard render failure.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("source is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

/// Tunables of a [`WikiRenderer`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderOptions {
    /// Time allowed for resolving all elements of one render.
    pub resolve_timeout: Duration,
    /// Href prefixes for internal links.
    pub links: LinkOptions,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
            links: LinkOptions::default(),
        }
    }
}

/// Output of one render.
#[derive(Clone, Debug, Default)]
pub struct RenderResult {
    /// Final HTML with every element spliced in.
    pub html: String,
    /// Diagnostics from extraction and merging.
    pub warnings: Vec<String>,
    pub stats: RenderStats,
}

/// Renders hybrid wiki markup and Markdown to HTML.
///
/// Collaborators are shared read-only, so one renderer can serve any number
/// of concurrent renders.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use wm_markup::{PageIndex, RenderContext, WikiRenderer};
///
/// # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
/// let renderer = WikiRenderer::builder()
///     .pages(Arc::new(PageIndex::new(["HomePage"], true)))
///     .build();
///
/// let result = renderer.render("See [HomePage].", &RenderContext::new("Main")).await;
/// assert!(result.html.contains(r#"href="/wiki/HomePage""#));
/// # });
/// ```
#[derive(Clone)]
pub struct WikiRenderer {
    resolvers: Resolvers,
    markdown: Arc<dyn MarkdownRenderer>,
    options: RenderOptions,
}

impl WikiRenderer {
    #[must_use]
    pub fn builder() -> WikiRendererBuilder {
        WikiRendererBuilder::default()
    }

    #[must_use]
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render `source` to HTML.
    ///
    /// Never fails: malformed markup stays literal and failing elements
    /// become visible error fragments. Must be polled inside a Tokio runtime
    /// with the time driver enabled.
    pub async fn render(&self, source: &str, ctx: &RenderContext) -> RenderResult {
        if source.is_empty() {
            return RenderResult::default();
        }

        let extraction = extract(source);
        tracing::debug!(
            page = %ctx.page_name,
            token = %extraction.token,
            elements = extraction.elements.len(),
            "Extracted wiki markup"
        );

        let deadline = self.deadline(ctx);
        let fragments = join_all(
            extraction
                .elements
                .iter()
                .map(|element| self.resolvers.resolve_before(element, ctx, deadline)),
        )
        .await;

        let html = self.markdown.render(&extraction.text);
        let merged = merge(&html, &extraction.token, &fragments);
        let stats = RenderStats::from_fragments(&fragments);

        let mut warnings = extraction.warnings;
        warnings.extend(merged.warnings);
        for warning in &warnings {
            tracing::debug!(page = %ctx.page_name, warning, "Render warning");
        }

        RenderResult {
            html: merged.html,
            warnings,
            stats,
        }
    }

    /// Render raw bytes, failing if they are not UTF-8 text.
    pub async fn render_bytes(
        &self,
        source: &[u8],
        ctx: &RenderContext,
    ) -> Result<RenderResult, RenderError> {
        let text = std::str::from_utf8(source)?;
        Ok(self.render(text, ctx).await)
    }

    /// Render raw bytes, replacing a hard failure with an error document.
    pub async fn render_or_error_page(&self, source: &[u8], ctx: &RenderContext) -> RenderResult {
        match self.render_bytes(source, ctx).await {
            Ok(result) => result,
            Err(err) => {
                tracing::error!(page = %ctx.page_name, error = %err, "Render failed");
                RenderResult {
                    html: error_page(&err, &String::from_utf8_lossy(source)),
                    warnings: vec![err.to_string()],
                    stats: RenderStats::default(),
                }
            }
        }
    }

    /// Earlier of the context deadline and the configured timeout.
    fn deadline(&self, ctx: &RenderContext) -> Instant {
        let budget = Instant::now() + self.options.resolve_timeout;
        ctx.deadline.map_or(budget, |deadline| deadline.min(budget))
    }
}

/// Error document showing the failure and the source as plain text.
fn error_page(err: &RenderError, source: &str) -> String {
    let mut html = Element::new("div")
        .attr("class", "wiki-render-error")
        .child(Element::new("p").text(format!("Error rendering page: {err}")))
        .to_html();
    html.push_str("\n<pre>");
    html.push_str(&escape_html(source));
    html.push_str("</pre>\n");
    html
}

/// Builder for [`WikiRenderer`]. Unset collaborators default to empty ones.
#[derive(Default)]
pub struct WikiRendererBuilder {
    pages: Option<Arc<dyn PageResolver>>,
    interwiki: Option<InterWikiTable>,
    variables: Option<VariableRegistry>,
    plugins: Option<Arc<dyn PluginExecutor>>,
    markdown: Option<Arc<dyn MarkdownRenderer>>,
    options: RenderOptions,
}

impl WikiRendererBuilder {
    #[must_use]
    pub fn pages(mut self, pages: Arc<dyn PageResolver>) -> Self {
        self.pages = Some(pages);
        self
    }

    #[must_use]
    pub fn interwiki(mut self, interwiki: InterWikiTable) -> Self {
        self.interwiki = Some(interwiki);
        self
    }

    #[must_use]
    pub fn variables(mut self, variables: VariableRegistry) -> Self {
        self.variables = Some(variables);
        self
    }

    #[must_use]
    pub fn plugins(mut self, plugins: impl PluginExecutor + 'static) -> Self {
        self.plugins = Some(Arc::new(plugins));
        self
    }

    #[must_use]
    pub fn markdown(mut self, markdown: impl MarkdownRenderer + 'static) -> Self {
        self.markdown = Some(Arc::new(markdown));
        self
    }

    #[must_use]
    pub fn options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn resolve_timeout(mut self, timeout: Duration) -> Self {
        self.options.resolve_timeout = timeout;
        self
    }

    #[must_use]
    pub fn build(self) -> WikiRenderer {
        let pages = self
            .pages
            .unwrap_or_else(|| Arc::new(PageIndex::new(Vec::<String>::new(), true)));
        let markdown = self
            .markdown
            .unwrap_or_else(|| Arc::new(CommonMarkRenderer));
        WikiRenderer {
            resolvers: Resolvers {
                pages,
                interwiki: Arc::new(self.interwiki.unwrap_or_default()),
                variables: Arc::new(self.variables.unwrap_or_default()),
                plugins: self
                    .plugins
                    .unwrap_or_else(|| Arc::new(PluginRegistry::new())),
                links: self.options.links.clone(),
                markdown: Arc::clone(&markdown),
            },
            markdown,
            options: self.options,
        }
    }
}

#[cfg(test)]
mod tests {
    use futures_util::FutureExt;
    use futures_util::future::BoxFuture;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::app::AppInfo;
    use crate::context::UserContext;
    use crate::element::ElementType;
    use crate::interwiki::InterWikiSite;
    use crate::plugins::{PluginError, PluginParams};
    use crate::resolve::LinkType;

    fn renderer() -> WikiRenderer {
        let app = AppInfo::default();
        let pages: Arc<dyn PageResolver> =
            Arc::new(PageIndex::new(["HomePage", "Category", "Main"], true));

        let mut variables = VariableRegistry::with_builtins(&app, Arc::clone(&pages));
        variables.register_fn("user", |ctx| Ok(Some(ctx.user.name.clone())));
        let mut plugins = PluginRegistry::with_builtins(&app, Arc::clone(&pages));
        plugins.register_fn("Boom", |_| Err(PluginError::Failed("exploded".to_owned())));
        plugins.register_fn("Greeting", |input| {
            let name = input.params.get("name").unwrap_or("world");
            Ok(format!("<em>Hello, {}</em>", escape_html(name)))
        });

        WikiRenderer::builder()
            .pages(pages)
            .interwiki(InterWikiTable::with_defaults())
            .variables(variables)
            .plugins(plugins)
            .build()
    }

    async fn render(source: &str) -> RenderResult {
        renderer().render(source, &RenderContext::new("Main")).await
    }

    fn assert_no_markers(html: &str) {
        assert!(!html.contains("<!--WM-"), "marker leaked: {html}");
        assert!(!html.contains("&lt;!--WM-"), "escaped marker leaked: {html}");
    }

    #[tokio::test]
    async fn test_empty_input() {
        let result = render("").await;
        assert_eq!(result.html, "");
        assert!(result.warnings.is_empty());
        assert_eq!(result.stats.total(), 0);
    }

    #[tokio::test]
    async fn test_markdown_structure_preserved() {
        let result = render("## Features\n- Item").await;
        assert_eq!(result.html, "<h2>Features</h2>\n<ul>\n<li>Item</li>\n</ul>\n");
    }

    #[tokio::test]
    async fn test_valid_and_red_links() {
        let html = render("[HomePage] and [NoSuchPage]").await.html;
        assert!(html.contains(r#"<a href="/wiki/HomePage" class="wiki-link wikipage""#));
        assert!(html.contains(r#"<a href="/edit/NoSuchPage" class="wiki-link redlink""#));
        assert!(html.contains(r#"title="Create page: NoSuchPage""#));
        assert_no_markers(&html);
    }

    #[tokio::test]
    async fn test_escaped_variable_is_literal() {
        let result = render("Use [[{$user}] to show the user.").await;
        assert!(result.html.contains(r#"<span class="wiki-escaped" data-wm-id="0">[{$user}]</span>"#));
        assert!(!result.html.contains("Anonymous"));
        assert_eq!(result.stats.count(ElementType::Escaped), 1);
        assert_eq!(result.stats.count(ElementType::Variable), 0);
    }

    #[tokio::test]
    async fn test_failing_plugin_is_isolated() {
        let result = render("[{Greeting name='Ann'}] [{Boom}] [HomePage]").await;
        let html = &result.html;

        assert!(html.contains("<em data-wm-id=\"0\" data-plugin=\"Greeting\">Hello, Ann</em>"));
        assert!(html.contains("[Error: Boom]"));
        assert!(html.contains(r#"href="/wiki/HomePage""#));
        assert_eq!(result.stats.failed, 1);
        assert_no_markers(html);
    }

    #[tokio::test]
    async fn test_external_link_safety() {
        let result = render("[Display|https://example.com]").await;
        assert!(result.html.contains(concat!(
            r#"<a href="https://example.com" class="wiki-link external-link" "#,
            r#"target="_blank" rel="noopener noreferrer""#
        )));
        assert!(result.html.contains(">Display</a>"));
        assert_eq!(result.stats.link_count(LinkType::External), 1);
    }

    #[tokio::test]
    async fn test_variables_from_context() {
        let ctx = RenderContext::new("Main").with_user(UserContext::authenticated("ann"));
        let result = renderer()
            .render("Hi [{$user}] on [{$pagename}]", &ctx)
            .await;
        assert!(result.html.contains(">ann</span>"));
        assert!(result.html.contains(">Main</span>"));
    }

    #[tokio::test]
    async fn test_variable_value_not_reinterpreted() {
        let mut variables = VariableRegistry::new();
        variables.register_value("tricky", "[HomePage] **bold** <!--WM-x-0-->");
        let renderer = WikiRenderer::builder().variables(variables).build();

        let html = renderer
            .render("[{$tricky}]", &RenderContext::default())
            .await
            .html;
        assert!(html.contains("[HomePage] **bold** &lt;!--WM-x-0--&gt;"));
        assert!(!html.contains("<a "));
        assert!(!html.contains("<strong>"));
    }

    #[tokio::test]
    async fn test_code_keeps_wiki_syntax() {
        let result = render("Inline `[HomePage]`\n\n```\n[{$user}]\n```\n").await;
        assert!(result.html.contains("<code>[HomePage]</code>"));
        assert!(result.html.contains("[{$user}]\n</code></pre>"));
        assert_eq!(result.stats.total(), 0);
    }

    #[tokio::test]
    async fn test_indented_marker_restores_syntax() {
        let result = render("Intro\n\n    [HomePage]\n").await;
        assert!(result.html.contains("<pre><code>[HomePage]\n</code></pre>"));
        assert_no_markers(&result.html);
    }

    #[tokio::test]
    async fn test_interwiki_and_style_block() {
        let source = "See [Rust|Wikipedia:Rust_(programming_language)].\n\n%%sortable\n|| A ||\n| 1 |\n/%\n";
        let result = render(source).await;

        assert!(result.html.contains(
            r#"href="https://en.wikipedia.org/wiki/Rust_(programming_language)""#
        ));
        assert!(result.html.contains(r#"<table class="table sortable""#));
        assert_eq!(result.stats.link_count(LinkType::InterWiki), 1);
        assert_eq!(result.stats.count(ElementType::Style), 1);
    }

    #[tokio::test]
    async fn test_link_at_line_start_keeps_inline_markdown() {
        let html = render("[HomePage] is **important** here").await.html;
        assert!(html.starts_with(r#"<p><a href="/wiki/HomePage""#), "{html}");
        assert!(html.ends_with("</a> is <strong>important</strong> here</p>\n"));

        let html = render("Some text\n[HomePage] and *more*").await.html;
        assert_eq!(html.matches("<p>").count(), 1, "{html}");
        assert!(html.starts_with("<p>Some text\n<a "));
        assert!(html.contains("</a> and <em>more</em></p>"));
    }

    #[tokio::test]
    async fn test_nested_style_blocks_combine_classes() {
        let source = "%%zebra-table\n%%sortable\n|| H ||\n| a |\n/%\n/%";
        let result = render(source).await;

        assert!(
            result
                .html
                .starts_with(r#"<table class="table zebra-table sortable" data-wm-id="0">"#),
            "{}",
            result.html
        );
        assert!(result.html.contains("<thead><tr><th>H</th></tr></thead>"));
        assert!(!result.html.contains("/%"));
        assert!(!result.html.contains("<p><table"));
        assert_eq!(result.stats.count(ElementType::Style), 1);
    }

    #[tokio::test]
    async fn test_style_block_body_renders_markup() {
        let result = render("%%warning\n**Careful**: see [HomePage]\n/%").await;
        let html = &result.html;
        assert!(
            html.starts_with(concat!(
                r#"<div class="warning" data-wm-id="0"><p><strong>Careful</strong>: see "#,
                r#"<a href="/wiki/HomePage" class="wiki-link wikipage" data-wm-id="1""#
            )),
            "{html}"
        );
        assert!(html.ends_with(">HomePage</a></p>\n</div>\n"));
        assert_no_markers(html);
        assert_eq!(result.stats.count(ElementType::Link), 1);
    }

    #[tokio::test]
    async fn test_table_cell_renders_markup() {
        let result = render("%%sortable\n| [HomePage] | *x* | [{$pagename}] |\n/%\n").await;
        let html = &result.html;
        assert!(html.contains(r#"<td><a href="/wiki/HomePage""#), "{html}");
        assert!(html.contains("<td><em>x</em></td>"));
        assert!(html.contains(">Main</span></td>"));
        assert_no_markers(html);
    }

    #[tokio::test]
    async fn test_builtin_plugin_and_unknown_plugin() {
        let result = render("[{TotalPagesPlugin}] [{NoSuchThing}]").await;
        assert!(result.html.contains(">3</span>"));
        assert!(result.html.contains("[Error: NoSuchThing]"));
    }

    #[tokio::test]
    async fn test_unterminated_markup_is_literal() {
        let result = render("Broken [{$user and [Half").await;
        assert!(result.html.contains("Broken [{$user and [Half"));
        assert_no_markers(&result.html);
    }

    #[tokio::test]
    async fn test_concurrent_renders_do_not_interfere() {
        let renderer = renderer();
        let ctx_a = RenderContext::new("Main").with_user(UserContext::authenticated("alice"));
        let ctx_b = RenderContext::new("Main").with_user(UserContext::authenticated("bob"));

        let (a, b) = tokio::join!(
            renderer.render("[{$user}] [HomePage]", &ctx_a),
            renderer.render("[{$user}] [HomePage]", &ctx_b),
        );
        assert!(a.html.contains(">alice<") && !a.html.contains(">bob<"));
        assert!(b.html.contains(">bob<") && !b.html.contains(">alice<"));
    }

    struct SlowPlugins;

    impl PluginExecutor for SlowPlugins {
        fn execute<'a>(
            &'a self,
            name: &'a str,
            _page_name: &'a str,
            _params: &'a PluginParams,
            _ctx: &'a RenderContext,
        ) -> BoxFuture<'a, Result<String, PluginError>> {
            async move {
                if name == "Slow" {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                }
                Ok(format!("<b>{name}</b>"))
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_resolve_timeout_only_affects_slow_elements() {
        let renderer = WikiRenderer::builder()
            .plugins(SlowPlugins)
            .resolve_timeout(Duration::from_millis(20))
            .build();

        let result = renderer
            .render("[{Fast}] [{Slow}]", &RenderContext::default())
            .await;
        assert!(result.html.contains("<b data-wm-id=\"0\" data-plugin=\"Fast\">Fast</b>"));
        assert!(result.html.contains("[Error: Slow]"));
        assert_eq!(result.stats.failed, 1);
    }

    #[tokio::test]
    async fn test_context_deadline_wins_when_earlier() {
        let renderer = WikiRenderer::builder().plugins(SlowPlugins).build();
        let ctx = RenderContext::new("Main")
            .with_deadline(Instant::now() + Duration::from_millis(20));

        let result = renderer.render("[{Slow}]", &ctx).await;
        assert!(result.html.contains("[Error: Slow]"));
    }

    #[tokio::test]
    async fn test_render_bytes() {
        let renderer = renderer();
        let ctx = RenderContext::new("Main");

        let ok = renderer.render_bytes(b"*hi*", &ctx).await.unwrap();
        assert_eq!(ok.html, "<p><em>hi</em></p>\n");

        let err = renderer.render_bytes(&[0x66, 0xff, 0x6f], &ctx).await;
        assert!(matches!(err, Err(RenderError::InvalidUtf8(_))));
    }

    #[tokio::test]
    async fn test_render_or_error_page() {
        let result = renderer()
            .render_or_error_page(b"<b>\xff", &RenderContext::new("Main"))
            .await;
        assert!(result.html.starts_with(r#"<div class="wiki-render-error"><p>Error rendering page: "#));
        assert!(result.html.contains("<pre>&lt;b&gt;\u{fffd}</pre>"));
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_default_options() {
        let renderer = WikiRenderer::builder().build();
        assert_eq!(renderer.options().resolve_timeout, DEFAULT_RESOLVE_TIMEOUT);
        assert_eq!(renderer.options().links.view_prefix, "/wiki/");
    }

    #[tokio::test]
    async fn test_custom_markdown_renderer() {
        let renderer = WikiRenderer::builder()
            .markdown(|text: &str| format!("[[{text}]]"))
            .build();
        let html = renderer
            .render("x [NoSuchPage] y", &RenderContext::default())
            .await
            .html;
        assert!(html.starts_with("[[x <a href=\"/edit/NoSuchPage\""));
        assert!(html.ends_with("</a> y]]"));
    }

    #[tokio::test]
    async fn test_interwiki_site_from_table() {
        let mut interwiki = InterWikiTable::new();
        interwiki.insert("Docs", InterWikiSite::new("https://docs.test/%s").with_new_window(false));
        let renderer = WikiRenderer::builder().interwiki(interwiki).build();

        let html = renderer
            .render("[Docs:intro]", &RenderContext::default())
            .await
            .html;
        assert!(html.contains(r#"href="https://docs.test/intro""#));
        assert!(!html.contains(r#" target="_blank""#));
    }
}
