//! Property-based tests for the render pipeline
//!
//! Inputs are built from the characters that drive extraction (brackets,
//! braces, `$`, `|`, `%%` blocks, backticks, indentation and newlines) so
//! every half-open construct and every code context gets exercised.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use proptest::prelude::*;
use wm_markup::plugins::PluginParams;
use wm_markup::{
    PageIndex, PluginError, PluginExecutor, RenderContext, WikiRenderer, escape_html, extract,
};

const PIECES: &[&str] = &[
    "[", "]", "[[", "[{", "}]", "{", "}", "$", "|", "||", "%%sortable\n", "%%note\n", "/%\n", "`",
    "```\n", "\n", "\n\n", "    ", " ", "Page", "HomePage", "x", "*", "Wikipedia:",
];

/// Generate wiki-ish source text from markup fragments
fn source_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(PIECES), 0..48).prop_map(|pieces| pieces.concat())
}

/// Plugin executor whose calls finish in an order set by `delay`.
struct OrderedPlugins {
    calls: AtomicUsize,
    delay: fn(usize) -> usize,
}

impl OrderedPlugins {
    fn new(delay: fn(usize) -> usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay,
        }
    }
}

impl PluginExecutor for OrderedPlugins {
    fn execute<'a>(
        &'a self,
        name: &'a str,
        _page_name: &'a str,
        _params: &'a PluginParams,
        _ctx: &'a RenderContext,
    ) -> BoxFuture<'a, Result<String, PluginError>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let yields = (self.delay)(call);
        async move {
            for _ in 0..yields {
                tokio::task::yield_now().await;
            }
            Ok(format!("<b>{}</b>", escape_html(name)))
        }
        .boxed()
    }
}

fn renderer(plugins: OrderedPlugins) -> WikiRenderer {
    WikiRenderer::builder()
        .pages(Arc::new(PageIndex::new(["HomePage", "Page"], true)))
        .plugins(plugins)
        .build()
}

fn render(renderer: &WikiRenderer, source: &str) -> String {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
        .block_on(renderer.render(source, &RenderContext::new("Main")))
        .html
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn test_no_marker_survives_rendering(source in source_strategy()) {
        let html = render(&renderer(OrderedPlugins::new(|_| 0)), &source);
        prop_assert!(!html.contains("WM-"), "marker leaked for {:?}: {}", source, html);
    }

    #[test]
    fn test_elements_are_numbered_in_source_order(source in source_strategy()) {
        let extraction = extract(&source);
        for (index, element) in extraction.elements.iter().enumerate() {
            prop_assert_eq!(element.id, index);
        }
        for pair in extraction.elements.windows(2) {
            prop_assert!(pair[0].offset < pair[1].offset, "offsets out of order: {:?}", pair);
        }
    }

    #[test]
    fn test_output_independent_of_resolution_order(source in source_strategy()) {
        let early_first = renderer(OrderedPlugins::new(|call| call));
        let late_first = renderer(OrderedPlugins::new(|call| 64_usize.saturating_sub(call)));
        prop_assert_eq!(render(&early_first, &source), render(&late_first, &source));
    }
}

#[test]
fn test_plugins_complete_out_of_order() {
    let source = "[{First}] [{Second}] [{Third}]";
    let html = render(&renderer(OrderedPlugins::new(|call| 8 - call)), source);
    let first = html.find(">First</b>").unwrap();
    let second = html.find(">Second</b>").unwrap();
    let third = html.find(">Third</b>").unwrap();
    assert!(first < second && second < third, "{html}");
}
