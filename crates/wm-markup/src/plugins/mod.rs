//! Plugin execution for `[{Name key=value}]` invocations.
//!
//! The renderer only consumes the [`PluginExecutor`] contract. [`PluginRegistry`]
//! is the default executor: a name-keyed table of [`Plugin`]s.

mod builtin;
mod params;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::{self, BoxFuture};

pub use params::{ParamError, PluginCall, PluginParams};

use crate::context::RenderContext;

/// Plugin execution failure.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("plugin `{0}` not found")]
    NotFound(String),
    #[error("invalid parameter `{name}`: {message}")]
    InvalidParameter { name: String, message: String },
    #[error("{0}")]
    Failed(String),
}

/// Executes plugins by name. Returns the plugin's HTML output.
pub trait PluginExecutor: Send + Sync {
    fn execute<'a>(
        &'a self,
        name: &'a str,
        page_name: &'a str,
        params: &'a PluginParams,
        ctx: &'a RenderContext,
    ) -> BoxFuture<'a, Result<String, PluginError>>;
}

/// Arguments passed to a single plugin.
#[derive(Debug, Clone, Copy)]
pub struct PluginInput<'a> {
    pub page_name: &'a str,
    pub params: &'a PluginParams,
    pub ctx: &'a RenderContext,
}

/// A single plugin.
pub trait Plugin: Send + Sync {
    fn execute<'a>(&'a self, input: PluginInput<'a>) -> BoxFuture<'a, Result<String, PluginError>>;
}

impl<F> Plugin for F
where
    F: Fn(PluginInput<'_>) -> Result<String, PluginError> + Send + Sync,
{
    fn execute<'a>(&'a self, input: PluginInput<'a>) -> BoxFuture<'a, Result<String, PluginError>> {
        future::ready(self(input)).boxed()
    }
}

/// Lookup key: lowercase, without a trailing `Plugin`.
fn registry_key(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    match lower.strip_suffix("plugin") {
        Some(base) if !base.is_empty() => base.to_owned(),
        _ => lower,
    }
}

/// Name-keyed plugin table.
///
/// Names match case-insensitively, with or without a `Plugin` suffix:
/// `CurrentTime`, `currenttime` and `CurrentTimePlugin` find the same plugin.
#[derive(Clone, Default)]
pub struct PluginRegistry {
    plugins: HashMap<String, Arc<dyn Plugin>>,
}

impl PluginRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin, replacing any plugin with a matching name.
    pub fn register(&mut self, name: &str, plugin: impl Plugin + 'static) {
        self.plugins.insert(registry_key(name), Arc::new(plugin));
    }

    /// Register a synchronous closure.
    pub fn register_fn<F>(&mut self, name: &str, f: F)
    where
        F: Fn(PluginInput<'_>) -> Result<String, PluginError> + Send + Sync + 'static,
    {
        self.register(name, f);
    }

    /// Find a plugin by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Plugin>> {
        self.plugins.get(&registry_key(name))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl PluginExecutor for PluginRegistry {
    fn execute<'a>(
        &'a self,
        name: &'a str,
        page_name: &'a str,
        params: &'a PluginParams,
        ctx: &'a RenderContext,
    ) -> BoxFuture<'a, Result<String, PluginError>> {
        match self.get(name) {
            Some(plugin) => plugin.execute(PluginInput {
                page_name,
                params,
                ctx,
            }),
            None => future::ready(Err(PluginError::NotFound(name.to_owned()))).boxed(),
        }
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.plugins.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("PluginRegistry")
            .field("plugins", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo(input: PluginInput<'_>) -> Result<String, PluginError> {
        Ok(format!(
            "{}:{}",
            input.page_name,
            input.params.get("text").unwrap_or_default()
        ))
    }

    #[test]
    fn test_registry_key() {
        assert_eq!(registry_key("CurrentTimePlugin"), "currenttime");
        assert_eq!(registry_key("CurrentTime"), "currenttime");
        assert_eq!(registry_key("Plugin"), "plugin");
    }

    #[tokio::test]
    async fn test_lookup_variants() {
        let mut registry = PluginRegistry::new();
        registry.register_fn("EchoPlugin", echo);

        let ctx = RenderContext::new("Main");
        let params: PluginParams = [("text", "hi")].into_iter().collect();
        for name in ["Echo", "echo", "ECHOPLUGIN", "EchoPlugin"] {
            let out = registry.execute(name, "Main", &params, &ctx).await.unwrap();
            assert_eq!(out, "Main:hi");
        }
    }

    #[tokio::test]
    async fn test_unknown_plugin() {
        let registry = PluginRegistry::new();
        let ctx = RenderContext::default();
        let err = registry
            .execute("Nope", "", &PluginParams::default(), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::NotFound(name) if name == "Nope"));
    }

    #[tokio::test]
    async fn test_plugin_error_propagates() {
        let mut registry = PluginRegistry::new();
        registry.register_fn("Broken", |_| Err(PluginError::Failed("boom".to_owned())));
        let ctx = RenderContext::default();
        let err = registry
            .execute("Broken", "", &PluginParams::default(), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }
}
