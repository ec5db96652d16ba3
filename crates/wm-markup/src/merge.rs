//! Splices resolved fragments back into rendered HTML.

use std::collections::HashMap;

use crate::fragment::escape_html;
use crate::marker::CorrelationToken;
use crate::resolve::ResolvedFragment;

/// Result of merging fragments into HTML.
#[derive(Debug)]
pub(crate) struct Merged {
    pub(crate) html: String,
    pub(crate) warnings: Vec<String>,
}

/// Replace every marker of `token` in `html` with its fragment.
///
/// Passes repeat until one replaces nothing, so the result does not depend on
/// fragment order even if a fragment's markup contains another marker of the
/// same token. Each pass is one scan over the markers. Markers the Markdown
/// renderer escaped are replaced with the escaped original syntax. Markers
/// left over after merging are removed and reported.
pub(crate) fn merge(
    html: &str,
    token: &CorrelationToken,
    fragments: &[ResolvedFragment],
) -> Merged {
    let by_id: HashMap<usize, &ResolvedFragment> = fragments
        .iter()
        .map(|fragment| (fragment.id, fragment))
        .collect();

    let mut html = html.to_owned();
    for _ in 0..=fragments.len() {
        match substitute(&html, token, &by_id) {
            Some(next) => html = next,
            None => break,
        }
    }

    let mut warnings = Vec::new();
    let mut cleaned = String::with_capacity(html.len());
    let mut copied = 0;
    for found in token.find_markers(&html) {
        cleaned.push_str(&html[copied..found.range.start]);
        copied = found.range.end;
        tracing::warn!(id = found.id, "Removed unresolved marker");
        warnings.push(format!("Unresolved element {} removed from output", found.id));
    }
    cleaned.push_str(&html[copied..]);

    Merged {
        html: cleaned,
        warnings,
    }
}

/// One substitution pass, or `None` if no marker has a fragment.
///
/// A block fragment whose marker is the only content of a paragraph
/// replaces the whole paragraph.
fn substitute(
    html: &str,
    token: &CorrelationToken,
    fragments: &HashMap<usize, &ResolvedFragment>,
) -> Option<String> {
    let mut out = String::with_capacity(html.len());
    let mut copied = 0;
    let mut replaced = false;

    for found in token.find_markers(html) {
        let Some(fragment) = fragments.get(&found.id) else {
            continue;
        };
        out.push_str(&html[copied..found.range.start]);
        copied = found.range.end;
        replaced = true;

        if found.escaped {
            out.push_str(&escape_html(&fragment.original_syntax));
            continue;
        }
        if fragment.is_block() && out.ends_with("<p>") && html[copied..].starts_with("</p>") {
            out.truncate(out.len() - "<p>".len());
            copied += "</p>".len();
        }
        out.push_str(&fragment.to_html());
    }

    if !replaced {
        return None;
    }
    out.push_str(&html[copied..]);
    Some(out)
}
