//! Built-in system and contextual variables.

use std::sync::{Arc, LazyLock};

use chrono::{Datelike, Local, Utc};
use regex::Regex;

use super::VariableRegistry;
use crate::app::{AppInfo, format_uptime};
use crate::context::RenderContext;
use crate::pages::PageResolver;

static BROWSER_VERSIONS: LazyLock<[(&'static str, Regex); 5]> = LazyLock::new(|| {
    [
        ("Chrome", Regex::new(r"Chrome/(\d+)").expect("invalid regex")),
        ("Firefox", Regex::new(r"Firefox/(\d+)").expect("invalid regex")),
        ("Safari", Regex::new(r"Version/(\d+)").expect("invalid regex")),
        ("Edge", Regex::new(r"Edg/(\d+)").expect("invalid regex")),
        ("Opera", Regex::new(r"(?:OPR|Opera)/(\d+)").expect("invalid regex")),
    ]
});

impl VariableRegistry {
    /// Registry with the built-in variables.
    ///
    /// System variables describe the application (`applicationname`,
    /// `version`, `baseurl`, `totalpages`, `uptime`, date and time);
    /// contextual variables read the [`RenderContext`] (`pagename`,
    /// `username`, `loginstatus`, request headers).
    #[must_use]
    pub fn with_builtins(app: &AppInfo, pages: Arc<dyn PageResolver>) -> Self {
        let mut registry = Self::new();
        registry.register_value("applicationname", app.name.clone());
        registry.register_value("appname", app.name.clone());
        registry.register_value("version", app.version.clone());
        registry.register_value("baseurl", app.base_url.clone());

        registry.register_fn("totalpages", move |_| Ok(Some(pages.page_count().to_string())));
        let started = app.clone();
        registry.register_fn("uptime", move |_| Ok(Some(format_uptime(started.uptime()))));

        registry.register_fn("timestamp", |_| Ok(Some(Utc::now().to_rfc3339())));
        registry.register_fn("date", |_| Ok(Some(Local::now().format("%Y-%m-%d").to_string())));
        registry.register_fn("time", |_| Ok(Some(Local::now().format("%H:%M:%S").to_string())));
        registry.register_fn("year", |_| Ok(Some(Local::now().year().to_string())));
        registry.register_fn("month", |_| Ok(Some(Local::now().format("%B").to_string())));
        registry.register_fn("day", |_| Ok(Some(Local::now().day().to_string())));

        registry.register_fn("pagename", |ctx| Ok(Some(or_unknown(&ctx.page_name))));
        registry.register_fn("username", |ctx| Ok(Some(ctx.user.name.clone())));
        registry.register_fn("displayname", |ctx| Ok(Some(ctx.user.display().to_owned())));
        registry.register_fn("loginstatus", |ctx| Ok(Some(login_status(ctx).to_owned())));
        registry.register_fn("userroles", |ctx| {
            Ok(Some(if ctx.user.roles.is_empty() {
                "None".to_owned()
            } else {
                ctx.user.roles.join(", ")
            }))
        });

        registry.register_fn("useragent", |ctx| {
            Ok(Some(header_or(ctx.request.user_agent.as_deref(), "Unknown")))
        });
        registry.register_fn("browser", |ctx| {
            Ok(Some(browser_name(ctx.request.user_agent.as_deref())))
        });
        registry.register_fn("clientip", |ctx| {
            Ok(Some(header_or(ctx.request.client_ip.as_deref(), "Unknown")))
        });
        registry.register_fn("referer", |ctx| {
            Ok(Some(header_or(ctx.request.referer.as_deref(), "Direct")))
        });
        registry.register_fn("sessionid", |ctx| {
            Ok(Some(header_or(ctx.request.session_id.as_deref(), "None")))
        });
        registry.register_fn("acceptlanguage", |ctx| {
            Ok(Some(header_or(ctx.request.accept_language.as_deref(), "Unknown")))
        });

        registry
    }
}

fn or_unknown(value: &str) -> String {
    header_or(Some(value), "Unknown")
}

fn header_or(value: Option<&str>, fallback: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or(fallback)
        .to_owned()
}

fn login_status(ctx: &RenderContext) -> &'static str {
    if ctx.user.authenticated {
        "Authenticated"
    } else {
        "Anonymous"
    }
}

/// Browser family and major version from a `User-Agent` header.
fn browser_name(user_agent: Option<&str>) -> String {
    let Some(ua) = user_agent.filter(|ua| !ua.is_empty()) else {
        return "Unknown".to_owned();
    };

    let family = if ua.contains("Chrome") && !ua.contains("Edg") {
        0
    } else if ua.contains("Firefox") {
        1
    } else if ua.contains("Safari") && !ua.contains("Chrome") {
        2
    } else if ua.contains("Edg") {
        3
    } else if ua.contains("OPR") || ua.contains("Opera") {
        4
    } else {
        return "Unknown Browser".to_owned();
    };

    let (name, pattern) = &BROWSER_VERSIONS[family];
    match pattern.captures(ua) {
        Some(caps) => format!("{name} {}", &caps[1]),
        None => (*name).to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{RequestInfo, UserContext};
    use crate::pages::PageIndex;

    fn registry() -> VariableRegistry {
        let pages = Arc::new(PageIndex::new(["A", "B", "C"], true));
        VariableRegistry::with_builtins(&AppInfo::new("TestWiki", "https://wiki.test"), pages)
    }

    async fn value(registry: &VariableRegistry, name: &str, ctx: &RenderContext) -> String {
        registry
            .get(name)
            .unwrap()
            .resolve(ctx)
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_system_variables() {
        let registry = registry();
        let ctx = RenderContext::new("Main");
        assert_eq!(value(&registry, "applicationname", &ctx).await, "TestWiki");
        assert_eq!(value(&registry, "$appname", &ctx).await, "TestWiki");
        assert_eq!(value(&registry, "baseurl", &ctx).await, "https://wiki.test");
        assert_eq!(value(&registry, "totalpages", &ctx).await, "3");
        assert_eq!(value(&registry, "uptime", &ctx).await, "0m");
        assert_eq!(value(&registry, "year", &ctx).await.len(), 4);
        assert!(value(&registry, "timestamp", &ctx).await.contains('T'));
    }

    #[tokio::test]
    async fn test_user_variables() {
        let registry = registry();
        let anonymous = RenderContext::new("Main");
        assert_eq!(value(&registry, "username", &anonymous).await, "Anonymous");
        assert_eq!(value(&registry, "loginstatus", &anonymous).await, "Anonymous");
        assert_eq!(value(&registry, "userroles", &anonymous).await, "None");

        let ctx = RenderContext::new("Main").with_user(
            UserContext::authenticated("alice")
                .with_display_name("Alice")
                .with_roles(["admin", "editor"]),
        );
        assert_eq!(value(&registry, "username", &ctx).await, "alice");
        assert_eq!(value(&registry, "displayname", &ctx).await, "Alice");
        assert_eq!(value(&registry, "loginstatus", &ctx).await, "Authenticated");
        assert_eq!(value(&registry, "userroles", &ctx).await, "admin, editor");
        assert_eq!(value(&registry, "pagename", &ctx).await, "Main");
    }

    #[tokio::test]
    async fn test_request_variables_fallbacks() {
        let registry = registry();
        let ctx = RenderContext::default();
        assert_eq!(value(&registry, "pagename", &ctx).await, "Unknown");
        assert_eq!(value(&registry, "useragent", &ctx).await, "Unknown");
        assert_eq!(value(&registry, "referer", &ctx).await, "Direct");
        assert_eq!(value(&registry, "sessionid", &ctx).await, "None");

        let ctx = ctx.with_request(RequestInfo {
            client_ip: Some("10.1.2.3".to_owned()),
            accept_language: Some("en-US".to_owned()),
            ..RequestInfo::default()
        });
        assert_eq!(value(&registry, "clientip", &ctx).await, "10.1.2.3");
        assert_eq!(value(&registry, "acceptlanguage", &ctx).await, "en-US");
    }

    #[test]
    fn test_browser_name() {
        assert_eq!(browser_name(None), "Unknown");
        assert_eq!(
            browser_name(Some("Mozilla/5.0 (X11) AppleWebKit/537.36 Chrome/120.0 Safari/537.36")),
            "Chrome 120"
        );
        assert_eq!(
            browser_name(Some("Mozilla/5.0 (X11; rv:121.0) Gecko/20100101 Firefox/121.0")),
            "Firefox 121"
        );
        assert_eq!(
            browser_name(Some("Mozilla/5.0 (Macintosh) Version/17.1 Safari/605.1.15")),
            "Safari 17"
        );
        assert_eq!(
            browser_name(Some("Mozilla/5.0 Chrome/119.0 Safari/537.36 Edg/119.0")),
            "Edge 119"
        );
        assert_eq!(browser_name(Some("curl/8.0")), "Unknown Browser");
    }
}
