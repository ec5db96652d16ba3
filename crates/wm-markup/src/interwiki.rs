//! InterWiki site table.
//!
//! An InterWiki link `[Wikipedia:Rust]` points at a page of another wiki. The
//! site name selects a URL template in which `%s` is replaced by the encoded
//! page name.

use std::collections::HashMap;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters left unescaped by `encodeURIComponent`: A-Z a-z 0-9 - _ . ! ~ * ' ( )
const COMPONENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a page name for use in a URL path or query.
pub(crate) fn encode_component(input: &str) -> String {
    utf8_percent_encode(input, COMPONENT_ENCODE_SET).to_string()
}

/// A remote wiki reachable through InterWiki links.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterWikiSite {
    /// URL template containing `%s`.
    pub url: String,
    /// Open links in a new window.
    pub open_in_new_window: bool,
    /// Used in the link title as `{description}: {page}`.
    pub description: Option<String>,
}

impl InterWikiSite {
    /// Create a site that opens in a new window and has no description.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            open_in_new_window: true,
            description: None,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set whether links open in a new window.
    #[must_use]
    pub fn with_new_window(mut self, open_in_new_window: bool) -> Self {
        self.open_in_new_window = open_in_new_window;
        self
    }

    /// Substitute the encoded page name into the URL template.
    ///
    /// # Example
    ///
    /// ```
    /// use wm_markup::InterWikiSite;
    ///
    /// let site = InterWikiSite::new("https://en.wikipedia.org/wiki/%s");
    /// assert_eq!(
    ///     site.page_url("Rust (language)"),
    ///     "https://en.wikipedia.org/wiki/Rust%20(language)"
    /// );
    /// ```
    #[must_use]
    pub fn page_url(&self, page: &str) -> String {
        self.url.replace("%s", &encode_component(page))
    }
}

/// Site name to [`InterWikiSite`] mapping.
#[derive(Clone, Debug, Default)]
pub struct InterWikiTable {
    sites: HashMap<String, InterWikiSite>,
}

impl InterWikiTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the commonly used public wikis.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        table.insert(
            "Wikipedia",
            InterWikiSite::new("https://en.wikipedia.org/wiki/%s")
                .with_description("Wikipedia, the free encyclopedia"),
        );
        table.insert(
            "JSPWiki",
            InterWikiSite::new("https://jspwiki-wiki.apache.org/Wiki.jsp?page=%s")
                .with_description("Apache JSPWiki Documentation"),
        );
        table.insert(
            "MeatBall",
            InterWikiSite::new("http://www.usemod.com/cgi-bin/mb.pl?%s")
                .with_description("MeatBall Wiki"),
        );
        table
    }

    /// Register or replace a site.
    pub fn insert(&mut self, name: impl Into<String>, site: InterWikiSite) {
        self.sites.insert(name.into(), site);
    }

    /// Look up a site by exact name, then by lowercase name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&InterWikiSite> {
        self.sites
            .get(name)
            .or_else(|| self.sites.get(&name.to_lowercase()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

impl FromIterator<(String, InterWikiSite)> for InterWikiTable {
    fn from_iter<I: IntoIterator<Item = (String, InterWikiSite)>>(iter: I) -> Self {
        Self {
            sites: iter.into_iter().collect(),
        }
    }
}
