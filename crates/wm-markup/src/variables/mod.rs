//! Variable handlers for `[{$name}]` references.
//!
//! A [`VariableRegistry`] maps normalized names to [`VariableHandler`]s.
//! Handlers may be asynchronous; synchronous closures are registered with
//! [`VariableRegistry::register_fn`].

mod builtin;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::{self, BoxFuture};

use crate::context::RenderContext;

/// Error raised by a variable handler.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Result of a variable lookup. `Ok(None)` means the variable has no value.
pub type HandlerResult = Result<Option<String>, HandlerError>;

/// Produces the value of one variable.
pub trait VariableHandler: Send + Sync {
    /// Resolve the value for the given render.
    fn resolve<'a>(&'a self, ctx: &'a RenderContext) -> BoxFuture<'a, HandlerResult>;
}

impl<F> VariableHandler for F
where
    F: Fn(&RenderContext) -> HandlerResult + Send + Sync,
{
    fn resolve<'a>(&'a self, ctx: &'a RenderContext) -> BoxFuture<'a, HandlerResult> {
        future::ready(self(ctx)).boxed()
    }
}

/// Normalize a variable reference: trim, strip `$`, lowercase.
///
/// # Example
///
/// ```
/// use wm_markup::variables::normalize_name;
///
/// assert_eq!(normalize_name(" $UserName "), "username");
/// ```
#[must_use]
pub fn normalize_name(name: &str) -> String {
    let trimmed = name.trim();
    trimmed
        .strip_prefix('$')
        .unwrap_or(trimmed)
        .trim()
        .to_lowercase()
}

/// Registry of variable handlers keyed by normalized name.
#[derive(Clone, Default)]
pub struct VariableRegistry {
    handlers: HashMap<String, Arc<dyn VariableHandler>>,
}

impl VariableRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any handler of the same name.
    pub fn register(&mut self, name: &str, handler: impl VariableHandler + 'static) {
        self.handlers.insert(normalize_name(name), Arc::new(handler));
    }

    /// Register a synchronous closure.
    pub fn register_fn<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&RenderContext) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(name, f);
    }

    /// Register a variable with a fixed value.
    pub fn register_value(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        self.register_fn(name, move |_| Ok(Some(value.clone())));
    }

    /// Handler for a variable reference, in any spelling.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn VariableHandler>> {
        self.handlers.get(&normalize_name(name))
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for VariableRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariableRegistry")
            .field("names", &self.names())
            .finish()
    }
}
