//! Marker protocol shared by the extractor and the merger.
//!
//! A marker is the HTML comment `<!--WM-{token}-{id}-->`. Markdown renderers
//! pass comments through untouched, so a marker never influences block or
//! inline structure. No other module builds or parses markers.

use std::fmt;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

/// Number of hex characters kept from the random UUID.
const TOKEN_LEN: usize = 12;

/// Matches raw and HTML-escaped markers of any token.
static MARKER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:<|&lt;)!--WM-([0-9a-f]+)-(\d+)--(?:>|&gt;)").expect("invalid marker regex")
});

/// Random namespace for the markers of a single extraction.
///
/// A fresh token is generated for every extraction call and is never reused,
/// so markers cannot collide with user text or with markers of a concurrent
/// render.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CorrelationToken(String);

impl CorrelationToken {
    /// Generate a new random token.
    #[must_use]
    pub fn generate() -> Self {
        let mut token = Uuid::new_v4().simple().to_string();
        token.truncate(TOKEN_LEN);
        Self(token)
    }

    /// The token string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Marker for the element with the given id.
    ///
    /// # Example
    ///
    /// ```
    /// use wm_markup::CorrelationToken;
    ///
    /// let token = CorrelationToken::generate();
    /// let marker = token.marker(3);
    /// assert!(marker.starts_with("<!--WM-"));
    /// assert!(marker.ends_with("-3-->"));
    /// ```
    #[must_use]
    pub fn marker(&self, id: usize) -> String {
        format!("<!--WM-{}-{id}-->", self.0)
    }

    /// Marker as it appears after the Markdown renderer escaped it
    /// (indented code blocks and other literal contexts).
    pub(crate) fn escaped_marker(&self, id: usize) -> String {
        format!("&lt;!--WM-{}-{id}--&gt;", self.0)
    }

    /// Every marker of this token in `html`, in document order.
    pub(crate) fn find_markers<'h>(
        &self,
        html: &'h str,
    ) -> impl Iterator<Item = MarkerMatch> + 'h {
        let token = self.0.clone();
        MARKER_PATTERN
            .captures_iter(html)
            .filter(move |caps| caps[1] == *token)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                Some(MarkerMatch {
                    range: whole.range(),
                    id: caps[2].parse().ok()?,
                    escaped: whole.as_str().starts_with('&'),
                })
            })
    }
}

/// A marker found in rendered HTML.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct MarkerMatch {
    pub(crate) range: Range<usize>,
    pub(crate) id: usize,
    /// The Markdown renderer escaped the marker into literal text.
    pub(crate) escaped: bool,
}

impl fmt::Display for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_short_hex() {
        let token = CorrelationToken::generate();
        assert_eq!(token.as_str().len(), TOKEN_LEN);
        assert!(token.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_tokens_are_unique() {
        let a = CorrelationToken::generate();
        let b = CorrelationToken::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_marker_format() {
        let token = CorrelationToken("abc123def456".to_owned());
        assert_eq!(token.marker(0), "<!--WM-abc123def456-0-->");
        assert_eq!(token.escaped_marker(7), "&lt;!--WM-abc123def456-7--&gt;");
    }

    fn ids(token: &CorrelationToken, html: &str) -> Vec<usize> {
        token.find_markers(html).map(|found| found.id).collect()
    }

    #[test]
    fn test_find_markers_only_matches_own_token() {
        let ours = CorrelationToken("aaaaaaaaaaaa".to_owned());
        let theirs = CorrelationToken("bbbbbbbbbbbb".to_owned());
        let html = format!(
            "<p>{} {} {}</p>",
            ours.marker(1),
            theirs.marker(2),
            ours.escaped_marker(3)
        );

        assert_eq!(ids(&ours, &html), vec![1, 3]);
        let escaped: Vec<bool> = ours.find_markers(&html).map(|found| found.escaped).collect();
        assert_eq!(escaped, vec![false, true]);
    }

    #[test]
    fn test_find_markers_ignores_lookalikes() {
        let token = CorrelationToken("aaaaaaaaaaaa".to_owned());
        assert!(ids(&token, "<!--WM-aaaaaaaaaaaa-x-->").is_empty());
        assert!(ids(&token, "<!-- WM-aaaaaaaaaaaa-1 -->").is_empty());
    }
}
