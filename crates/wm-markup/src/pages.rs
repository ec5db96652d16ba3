//! Page existence lookup with case-insensitive and plural matching.

/// Resolves link targets to existing page titles.
pub trait PageResolver: Send + Sync {
    /// Canonical title of the page `candidate` refers to, if it exists.
    fn resolve(&self, candidate: &str) -> Option<String>;

    /// Number of known pages.
    fn page_count(&self) -> usize;
}

/// Generates the name forms two page names are compared by.
///
/// Names are compared lowercase. With plural matching enabled, simple English
/// singular and plural forms are added: `Categories` matches `Category`,
/// `Boxes` matches `Box`, `Pages` matches `Page`.
#[derive(Clone, Copy, Debug)]
pub struct NameMatcher {
    match_plurals: bool,
}

impl NameMatcher {
    /// Create a matcher, optionally matching English plural forms.
    #[must_use]
    pub fn new(match_plurals: bool) -> Self {
        Self { match_plurals }
    }

    /// Lowercase name followed by its singular and plural forms.
    #[must_use]
    pub fn variations(&self, name: &str) -> Vec<String> {
        let normalized = name.to_lowercase();
        if normalized.is_empty() {
            return Vec::new();
        }
        let mut variations = vec![normalized.clone()];
        if !self.match_plurals {
            return variations;
        }

        let mut push = |v: String| {
            if !variations.contains(&v) {
                variations.push(v);
            }
        };

        if let Some(base) = normalized.strip_suffix("ies").filter(|b| !b.is_empty()) {
            push(format!("{base}y"));
        } else if let Some(base) = normalized.strip_suffix('y').filter(|b| !b.is_empty()) {
            if !base.ends_with(['a', 'e', 'i', 'o', 'u']) {
                push(format!("{base}ies"));
            }
        }

        if let Some(base) = normalized.strip_suffix("es").filter(|b| !b.is_empty()) {
            push(base.to_owned());
            push(format!("{base}e"));
        }

        if let Some(base) = normalized.strip_suffix('s') {
            if !base.is_empty() && !base.ends_with('s') {
                push(base.to_owned());
            }
        } else {
            push(format!("{normalized}s"));
            if normalized.ends_with(['x', 'z'])
                || normalized.ends_with("ch")
                || normalized.ends_with("sh")
            {
                push(format!("{normalized}es"));
            }
        }

        variations
    }

    /// Find the name in `existing` that `search` refers to.
    ///
    /// An exact case-insensitive match wins over any plural match.
    pub fn find_match<'a>(&self, search: &str, existing: &'a [String]) -> Option<&'a str> {
        if search.is_empty() {
            return None;
        }
        let normalized = search.to_lowercase();
        if let Some(exact) = existing.iter().find(|n| n.to_lowercase() == normalized) {
            return Some(exact.as_str());
        }
        if !self.match_plurals {
            return None;
        }

        let wanted = self.variations(search);
        existing
            .iter()
            .find(|name| self.variations(name).iter().any(|v| wanted.contains(v)))
            .map(String::as_str)
    }
}

/// In-memory set of page names.
///
/// # Example
///
/// ```
/// use wm_markup::{PageIndex, PageResolver};
///
/// let pages = PageIndex::new(["HomePage", "Category"], true);
/// assert_eq!(pages.resolve("homepage").as_deref(), Some("HomePage"));
/// assert_eq!(pages.resolve("Categories").as_deref(), Some("Category"));
/// assert_eq!(pages.resolve("Missing"), None);
/// ```
#[derive(Clone, Debug)]
pub struct PageIndex {
    names: Vec<String>,
    matcher: NameMatcher,
}

impl PageIndex {
    /// Create an index over the given page names.
    pub fn new<I, S>(names: I, match_plurals: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            matcher: NameMatcher::new(match_plurals),
        }
    }

    /// Page names in insertion order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl PageResolver for PageIndex {
    fn resolve(&self, candidate: &str) -> Option<String> {
        self.matcher
            .find_match(candidate.trim(), &self.names)
            .map(str::to_owned)
    }

    fn page_count(&self) -> usize {
        self.names.len()
    }
}
