//! Built-in plugins.

use std::sync::Arc;

use chrono::Local;
use chrono::format::{Item, StrftimeItems};

use super::{PluginError, PluginInput, PluginRegistry};
use crate::app::{AppInfo, format_uptime};
use crate::fragment::escape_html;
use crate::pages::PageResolver;

const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

impl PluginRegistry {
    /// Registry with the built-in plugins: `CurrentTime`, `TotalPages` and
    /// `Uptime`.
    #[must_use]
    pub fn with_builtins(app: &AppInfo, pages: Arc<dyn PageResolver>) -> Self {
        let mut registry = Self::new();
        registry.register_fn("CurrentTimePlugin", current_time);
        registry.register_fn("TotalPagesPlugin", move |_| Ok(pages.page_count().to_string()));
        let app = app.clone();
        registry.register_fn("UptimePlugin", move |_| Ok(format_uptime(app.uptime())));
        registry
    }
}

/// Current local time, formatted with the `format` parameter (strftime
/// syntax) when given.
fn current_time(input: PluginInput<'_>) -> Result<String, PluginError> {
    let format = input.params.get("format").unwrap_or(DEFAULT_TIME_FORMAT);
    let items: Vec<Item<'_>> = StrftimeItems::new(format).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(PluginError::InvalidParameter {
            name: "format".to_owned(),
            message: format!("invalid time format `{format}`"),
        });
    }
    let formatted = Local::now().format_with_items(items.into_iter()).to_string();
    Ok(escape_html(&formatted))
}
