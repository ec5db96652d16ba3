//! Per-render context handed to resolvers and collaborators.
//!
//! The pipeline itself never inspects the context; it is passed by reference,
//! unmodified, to every variable handler and plugin.

use tokio::time::Instant;

/// Context of a single render call.
///
/// # Example
///
/// ```
/// use wm_markup::{RenderContext, UserContext};
///
/// let ctx = RenderContext::new("HomePage")
///     .with_user(UserContext::authenticated("alice").with_roles(["editor"]));
///
/// assert_eq!(ctx.page_name, "HomePage");
/// assert!(ctx.user.authenticated);
/// ```
#[derive(Clone, Debug, Default)]
pub struct RenderContext {
    /// Name of the page being rendered.
    pub page_name: String,
    /// Current user.
    pub user: UserContext,
    /// Request metadata, when rendering for an HTTP request.
    pub request: RequestInfo,
    /// Point in time after which pending resolutions are abandoned.
    pub deadline: Option<Instant>,
}

impl RenderContext {
    /// Create a context for an anonymous render of the given page.
    #[must_use]
    pub fn new(page_name: impl Into<String>) -> Self {
        Self {
            page_name: page_name.into(),
            ..Self::default()
        }
    }

    /// Set the current user.
    #[must_use]
    pub fn with_user(mut self, user: UserContext) -> Self {
        self.user = user;
        self
    }

    /// Set request metadata.
    #[must_use]
    pub fn with_request(mut self, request: RequestInfo) -> Self {
        self.request = request;
        self
    }

    /// Set an absolute deadline for element resolution.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// The user a page is rendered for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserContext {
    /// Login name.
    pub name: String,
    /// Human-readable name, falls back to `name` when empty.
    pub display_name: String,
    /// Assigned roles.
    pub roles: Vec<String>,
    /// Whether the user is logged in.
    pub authenticated: bool,
    /// Preferred locale, e.g. `en-US`.
    pub locale: Option<String>,
}

impl UserContext {
    /// Name used for users who are not logged in.
    pub const ANONYMOUS: &'static str = "Anonymous";

    /// Create an authenticated user.
    #[must_use]
    pub fn authenticated(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            authenticated: true,
            ..Self::default()
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    /// Set the roles.
    #[must_use]
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Set the locale.
    #[must_use]
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Display name, or the login name when no display name is set.
    #[must_use]
    pub fn display(&self) -> &str {
        if self.display_name.is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }
}

impl Default for UserContext {
    fn default() -> Self {
        Self {
            name: Self::ANONYMOUS.to_owned(),
            display_name: String::new(),
            roles: Vec::new(),
            authenticated: false,
            locale: None,
        }
    }
}

/// HTTP request metadata exposed to variables such as `$useragent`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestInfo {
    pub user_agent: Option<String>,
    pub client_ip: Option<String>,
    pub referer: Option<String>,
    pub session_id: Option<String>,
    pub accept_language: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_user_is_anonymous() {
        let ctx = RenderContext::new("Main");
        assert_eq!(ctx.user.name, "Anonymous");
        assert!(!ctx.user.authenticated);
        assert!(ctx.deadline.is_none());
    }

    #[test]
    fn test_display_falls_back_to_name() {
        let user = UserContext::authenticated("alice");
        assert_eq!(user.display(), "alice");
        let user = user.with_display_name("Alice Smith");
        assert_eq!(user.display(), "Alice Smith");
    }

    #[test]
    fn test_builders() {
        let deadline = Instant::now();
        let ctx = RenderContext::new("Page")
            .with_user(
                UserContext::authenticated("bob")
                    .with_roles(["admin", "editor"])
                    .with_locale("de-DE"),
            )
            .with_request(RequestInfo {
                client_ip: Some("10.0.0.1".to_owned()),
                ..RequestInfo::default()
            })
            .with_deadline(deadline);

        assert_eq!(ctx.user.roles, vec!["admin", "editor"]);
        assert_eq!(ctx.user.locale.as_deref(), Some("de-DE"));
        assert_eq!(ctx.request.client_ip.as_deref(), Some("10.0.0.1"));
        assert_eq!(ctx.deadline, Some(deadline));
    }
}
