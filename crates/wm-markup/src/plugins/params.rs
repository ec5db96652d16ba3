//! Plugin invocation parsing.
//!
//! Parses `Name key=value key='quoted value' key = "quoted value"` into a
//! plugin name and its parameters.

use std::collections::HashMap;

/// Malformed plugin invocation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParamError {
    #[error("missing plugin name")]
    MissingName,
    #[error("unterminated quote in value of `{key}`")]
    UnterminatedQuote { key: String },
}

/// A parsed plugin invocation.
///
/// # Example
///
/// ```
/// use wm_markup::plugins::PluginCall;
///
/// let call = PluginCall::parse(r#"Search query="rust book" max = 5"#).unwrap();
/// assert_eq!(call.name, "Search");
/// assert_eq!(call.params.get("query"), Some("rust book"));
/// assert_eq!(call.params.get("max"), Some("5"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginCall {
    pub name: String,
    pub params: PluginParams,
}

impl PluginCall {
    /// Split an invocation into name and parameters.
    pub fn parse(invocation: &str) -> Result<Self, ParamError> {
        let invocation = invocation.trim();
        let name_end = invocation
            .find(char::is_whitespace)
            .unwrap_or(invocation.len());
        let name = &invocation[..name_end];
        if name.is_empty() {
            return Err(ParamError::MissingName);
        }

        Ok(Self {
            name: name.to_owned(),
            params: PluginParams::parse(&invocation[name_end..])?,
        })
    }
}

/// Plugin parameters. Later duplicates of a key replace earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginParams {
    values: HashMap<String, String>,
}

impl PluginParams {
    /// Parse a parameter string.
    ///
    /// Text that is not a `key=value` pair is skipped.
    pub fn parse(input: &str) -> Result<Self, ParamError> {
        let mut params = Self::default();
        let mut remaining = input.trim();

        while !remaining.is_empty() {
            remaining = remaining.trim_start();
            match parse_key_value(remaining)? {
                Some((key, value, rest)) => {
                    params.values.insert(key.to_owned(), value.to_owned());
                    remaining = rest;
                }
                None => {
                    // Skip one char of unrecognized text
                    let skip = remaining.chars().next().map_or(0, char::len_utf8);
                    remaining = &remaining[skip..];
                }
            }
        }

        Ok(params)
    }

    /// Get a parameter value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Set a parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over parameters in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PluginParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Parse a key-value pair at the start of `s`.
///
/// Supports `key="value"`, `key='value'` and `key=value`, with optional
/// whitespace around `=`. Returns `Ok(None)` if `s` does not start with a pair.
fn parse_key_value(s: &str) -> Result<Option<(&str, &str, &str)>, ParamError> {
    let key_end = s.find(|c: char| !is_key_char(c)).unwrap_or(s.len());
    let key = &s[..key_end];
    if key.is_empty() {
        return Ok(None);
    }

    let Some(after_eq) = s[key_end..].trim_start().strip_prefix('=') else {
        return Ok(None);
    };
    let after_eq = after_eq.trim_start();

    if let Some(quote) = after_eq.chars().next().filter(|c| *c == '"' || *c == '\'') {
        let stripped = &after_eq[1..];
        let end_quote = stripped
            .find(quote)
            .ok_or_else(|| ParamError::UnterminatedQuote {
                key: key.to_owned(),
            })?;
        let value = &stripped[..end_quote];
        let rest = &stripped[end_quote + 1..];
        Ok(Some((key, value, rest)))
    } else {
        // Unquoted value (until whitespace)
        let end = after_eq.find(char::is_whitespace).unwrap_or(after_eq.len());
        if end == 0 {
            return Ok(None);
        }
        Ok(Some((key, &after_eq[..end], &after_eq[end..])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_only() {
        let call = PluginCall::parse("TableOfContents").unwrap();
        assert_eq!(call.name, "TableOfContents");
        assert!(call.params.is_empty());
    }

    #[test]
    fn test_missing_name() {
        assert_eq!(PluginCall::parse("   "), Err(ParamError::MissingName));
    }

    #[test]
    fn test_unquoted_value() {
        let params = PluginParams::parse("max=3 show=true").unwrap();
        assert_eq!(params.get("max"), Some("3"));
        assert_eq!(params.get("show"), Some("true"));
    }

    #[test]
    fn test_quoted_values() {
        let params = PluginParams::parse(r#"title='Hello World' format="yyyy MM dd""#).unwrap();
        assert_eq!(params.get("title"), Some("Hello World"));
        assert_eq!(params.get("format"), Some("yyyy MM dd"));
    }

    #[test]
    fn test_whitespace_around_equals() {
        let params = PluginParams::parse(r#"a = 1 b= "two words" c =3"#).unwrap();
        assert_eq!(params.get("a"), Some("1"));
        assert_eq!(params.get("b"), Some("two words"));
        assert_eq!(params.get("c"), Some("3"));
    }

    #[test]
    fn test_dashed_keys() {
        let params = PluginParams::parse("page-size=10 sort_by=name").unwrap();
        assert_eq!(params.get("page-size"), Some("10"));
        assert_eq!(params.get("sort_by"), Some("name"));
    }

    #[test]
    fn test_quotes_nest_other_kind() {
        let params = PluginParams::parse(r#"q="it's" r='say "hi"'"#).unwrap();
        assert_eq!(params.get("q"), Some("it's"));
        assert_eq!(params.get("r"), Some(r#"say "hi""#));
    }

    #[test]
    fn test_unterminated_quote() {
        let err = PluginParams::parse(r#"title="open"#).unwrap_err();
        assert_eq!(
            err,
            ParamError::UnterminatedQuote {
                key: "title".to_owned()
            }
        );
    }

    #[test]
    fn test_stray_text_skipped() {
        let params = PluginParams::parse("flag max=2 = ü x=").unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("max"), Some("2"));
    }

    #[test]
    fn test_duplicate_key_last_wins() {
        let params = PluginParams::parse("a=1 a=2").unwrap();
        assert_eq!(params.get("a"), Some("2"));
    }

    #[test]
    fn test_from_iterator() {
        let params: PluginParams = [("format", "%Y")].into_iter().collect();
        assert_eq!(params.get("format"), Some("%Y"));
        assert_eq!(params.iter().count(), 1);
    }
}
