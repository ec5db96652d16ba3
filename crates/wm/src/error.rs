//! CLI error types.

use wm_config::ConfigError;
use wm_markup::RenderError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Render(#[from] RenderError),

    #[error("Invalid pages directory pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("{0}")]
    Json(#[from] serde_json::Error),
}
