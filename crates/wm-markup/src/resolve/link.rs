//! Wiki links: `[Target]`, `[Display|Target]` and `[Display|Target|attrs]`.
//!
//! Targets are classified, in order, as external URL, email, anchor,
//! InterWiki reference or internal page. Internal targets that match no
//! existing page become red links pointing at the page editor.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use super::{FragmentOutcome, ResolveError, ResolvedFragment, Resolvers};
use crate::element::ExtractedElement;
use crate::fragment::Element;
use crate::interwiki::encode_component;
use crate::plugins::PluginParams;

static INTERWIKI_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z0-9]+):(.+)$").expect("invalid interwiki regex"));

/// Attributes a link may set through its third segment.
const ALLOWED_ATTRIBUTES: &[&str] = &[
    "class", "id", "title", "target", "rel", "accesskey", "tabindex", "hreflang", "type", "dir",
    "lang",
];

const SAFE_TARGETS: &[&str] = &["_blank", "_self", "_parent", "_top"];

/// Link classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum LinkType {
    Internal,
    External,
    InterWiki,
    Email,
    Anchor,
}

impl LinkType {
    /// Value of the `data-link-type` attribute.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::External => "external",
            Self::InterWiki => "interwiki",
            Self::Email => "email",
            Self::Anchor => "anchor",
        }
    }

    /// Classify a link target.
    #[must_use]
    pub fn classify(target: &str) -> Self {
        let lower = target.to_ascii_lowercase();
        if ["http://", "https://", "ftp://"]
            .iter()
            .any(|scheme| lower.starts_with(scheme))
            || target.starts_with('/')
        {
            Self::External
        } else if lower.starts_with("mailto:") {
            Self::Email
        } else if target.starts_with('#') {
            Self::Anchor
        } else if INTERWIKI_PATTERN.is_match(target) {
            Self::InterWiki
        } else {
            Self::Internal
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Href prefixes for internal links.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkOptions {
    /// Prefix for links to existing pages.
    pub view_prefix: String,
    /// Prefix for red links to the page editor.
    pub edit_prefix: String,
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            view_prefix: "/wiki/".to_owned(),
            edit_prefix: "/edit/".to_owned(),
        }
    }
}

/// Parts of a link's bracket content.
struct LinkParts<'a> {
    display: &'a str,
    target: &'a str,
    attrs: Option<&'a str>,
}

impl<'a> LinkParts<'a> {
    fn split(content: &'a str) -> Self {
        let mut parts = content.splitn(3, '|').map(str::trim);
        let display = parts.next().unwrap_or_default();
        let target = parts.next().filter(|t| !t.is_empty()).unwrap_or(display);
        let attrs = parts.next().filter(|a| !a.is_empty());
        Self {
            display,
            target,
            attrs,
        }
    }
}

pub(super) fn resolve(
    element: &ExtractedElement,
    content: &str,
    resolvers: &Resolvers,
) -> Result<ResolvedFragment, ResolveError> {
    let parts = LinkParts::split(content);
    if parts.target.is_empty() {
        return Err(ResolveError::EmptyLink);
    }
    let display = if parts.display.is_empty() {
        parts.target
    } else {
        parts.display
    };

    let link_type = LinkType::classify(parts.target);
    let (anchor, outcome) = match link_type {
        LinkType::Internal => internal_link(parts.target, resolvers),
        LinkType::External => (
            Element::new("a")
                .attr("href", parts.target)
                .attr("class", "wiki-link external-link")
                .attr("target", "_blank")
                .attr("rel", "noopener noreferrer"),
            FragmentOutcome::Resolved,
        ),
        LinkType::InterWiki => interwiki_link(parts.target, display, resolvers),
        LinkType::Email => (
            Element::new("a")
                .attr("href", parts.target)
                .attr("class", "wiki-link email-link"),
            FragmentOutcome::Resolved,
        ),
        LinkType::Anchor => (
            Element::new("a")
                .attr("href", parts.target)
                .attr("class", "wiki-link anchor-link"),
            FragmentOutcome::Resolved,
        ),
    };

    let mut anchor = anchor
        .attr("data-wm-id", element.id.to_string())
        .attr("data-link-type", link_type.as_str())
        .attr("data-target", parts.target)
        .text(display);
    if let Some(attrs) = parts.attrs {
        apply_custom_attributes(&mut anchor, attrs);
    }

    let mut fragment = ResolvedFragment::node(element, anchor).with_outcome(outcome);
    fragment.link_type = Some(link_type);
    Ok(fragment)
}

fn internal_link(target: &str, resolvers: &Resolvers) -> (Element, FragmentOutcome) {
    let options = &resolvers.links;
    match resolvers.pages.resolve(target) {
        Some(page) => (
            Element::new("a")
                .attr(
                    "href",
                    format!("{}{}", options.view_prefix, encode_component(&page)),
                )
                .attr("class", "wiki-link wikipage"),
            FragmentOutcome::Resolved,
        ),
        None => red_link(target, options.edit_prefix.as_str()),
    }
}

fn red_link(target: &str, edit_prefix: &str) -> (Element, FragmentOutcome) {
    (
        Element::new("a")
            .attr("href", format!("{edit_prefix}{}", encode_component(target)))
            .attr("class", "wiki-link redlink")
            .attr("style", "color: red;")
            .attr("title", format!("Create page: {target}")),
        FragmentOutcome::RedLink,
    )
}

fn interwiki_link(
    target: &str,
    display: &str,
    resolvers: &Resolvers,
) -> (Element, FragmentOutcome) {
    let Some(caps) = INTERWIKI_PATTERN.captures(target) else {
        return internal_link(target, resolvers);
    };
    let (site_name, page) = (&caps[1], &caps[2]);

    let Some(site) = resolvers.interwiki.get(site_name) else {
        tracing::debug!(site = site_name, "Unknown InterWiki site");
        return red_link(target, &resolvers.links.edit_prefix);
    };

    let mut anchor = Element::new("a")
        .attr("href", site.page_url(page))
        .attr(
            "class",
            format!(
                "wiki-link interwiki-link interwiki-{}",
                site_name.to_lowercase()
            ),
        );
    if site.open_in_new_window {
        anchor = anchor
            .attr("target", "_blank")
            .attr("rel", "noopener noreferrer");
    }
    if let Some(description) = &site.description {
        anchor = anchor.attr("title", format!("{description}: {display}"));
    }
    (anchor, FragmentOutcome::Resolved)
}

/// Apply whitelisted `name='value'` attributes from the third link segment.
///
/// Classes are appended to the link's own classes; other attributes replace
/// generated ones.
fn apply_custom_attributes(anchor: &mut Element, attrs: &str) {
    let Ok(params) = PluginParams::parse(attrs) else {
        tracing::debug!(attrs, "Ignoring malformed link attributes");
        return;
    };

    for (name, value) in params.iter() {
        let name = name.to_ascii_lowercase();
        if !ALLOWED_ATTRIBUTES.contains(&name.as_str()) {
            tracing::debug!(attribute = %name, "Ignoring disallowed link attribute");
            continue;
        }
        match name.as_str() {
            "class" => {
                let class = match anchor.get_attr("class") {
                    Some(existing) => format!("{existing} {value}"),
                    None => value.to_owned(),
                };
                anchor.set_attr("class", class);
            }
            "target" if !SAFE_TARGETS.contains(&value) => {}
            _ => anchor.set_attr(name, value),
        }
    }
}
