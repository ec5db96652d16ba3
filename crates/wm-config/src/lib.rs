//! Configuration management for wikimark.
//!
//! Parses `wikimark.toml` with serde and discovers it in the current
//! directory or its parents. CLI settings are applied during load via
//! [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String values support `${VAR}` and `${VAR:-default}`. Expanded fields:
//! - `app.name`
//! - `app.base_url`
//! - `pages.dir`
//! - `interwiki.<Name>.url`

mod expand;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// CLI settings that override configuration file values.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the pages directory.
    pub pages_dir: Option<PathBuf>,
    /// Override the resolve timeout.
    pub resolve_timeout_ms: Option<u64>,
    /// Override the application base URL.
    pub base_url: Option<String>,
}

const CONFIG_FILENAME: &str = "wikimark.toml";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub app: AppConfig,
    /// Pages section as written (directory relative to the config file).
    pages: PagesConfigRaw,
    pub links: LinksConfig,
    pub render: RenderConfig,
    /// InterWiki sites by name.
    pub interwiki: BTreeMap<String, InterWikiConfig>,

    /// Resolved pages configuration (set after loading).
    #[serde(skip)]
    pub pages_resolved: PagesConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// `[app]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub name: String,
    pub base_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "wikimark".to_owned(),
            base_url: "http://localhost:3000".to_owned(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct PagesConfigRaw {
    dir: Option<String>,
    match_plurals: Option<bool>,
}

/// Resolved page index configuration with an absolute directory.
#[derive(Debug, Default)]
pub struct PagesConfig {
    /// Directory of `*.md` pages.
    pub dir: PathBuf,
    /// Whether links match singular and plural page names.
    pub match_plurals: bool,
}

/// `[links]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LinksConfig {
    pub view_prefix: String,
    pub edit_prefix: String,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            view_prefix: "/wiki/".to_owned(),
            edit_prefix: "/edit/".to_owned(),
        }
    }
}

/// `[render]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Budget for resolving all elements of one page, in milliseconds.
    pub resolve_timeout_ms: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            resolve_timeout_ms: 5000,
        }
    }
}

impl RenderConfig {
    #[must_use]
    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_millis(self.resolve_timeout_ms)
    }
}

/// `[interwiki.<Name>]` section.
#[derive(Debug, Deserialize, PartialEq, Eq)]
pub struct InterWikiConfig {
    /// URL template; `%s` is replaced with the encoded page name.
    pub url: String,
    #[serde(default = "default_open_in_new_window")]
    pub open_in_new_window: bool,
    pub description: Option<String>,
}

fn default_open_in_new_window() -> bool {
    true
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Configuration error: {0}")]
    Validation(String),
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`app.base_url`").
        field: String,
        message: String,
    },
}

fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file. Otherwise searches
    /// for `wikimark.toml` in the current directory and its parents, falling
    /// back to defaults. CLI settings take precedence over file values.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(dir) = &settings.pages_dir {
            self.pages_resolved.dir.clone_from(dir);
        }
        if let Some(timeout) = settings.resolve_timeout_ms {
            self.render.resolve_timeout_ms = timeout;
        }
        if let Some(base_url) = &settings.base_url {
            self.app.base_url.clone_from(base_url);
        }
    }

    fn discover_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        Self::discover_from(&current)
    }

    /// Nearest `wikimark.toml` in `start` or its ancestors.
    fn discover_from(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILENAME))
            .find(|candidate| candidate.is_file())
    }

    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    fn default_with_base(base: &Path) -> Self {
        Self {
            app: AppConfig::default(),
            pages: PagesConfigRaw::default(),
            links: LinksConfig::default(),
            render: RenderConfig::default(),
            interwiki: BTreeMap::new(),
            pages_resolved: PagesConfig {
                dir: base.join("pages"),
                match_plurals: true,
            },
            config_path: None,
        }
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values. Called automatically after loading.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.app.name, "app.name")?;
        require_http_url(&self.app.base_url, "app.base_url")?;
        require_non_empty(&self.links.view_prefix, "links.view_prefix")?;
        require_non_empty(&self.links.edit_prefix, "links.edit_prefix")?;

        if self.render.resolve_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "render.resolve_timeout_ms must be greater than 0".to_owned(),
            ));
        }

        for (name, site) in &self.interwiki {
            let field = format!("interwiki.{name}.url");
            require_non_empty(&site.url, &field)?;
            if !site.url.contains("%s") {
                return Err(ConfigError::Validation(format!(
                    "{field} must contain %s"
                )));
            }
        }

        Ok(())
    }

    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.app.name = expand::expand_env(&self.app.name, "app.name")?;
        self.app.base_url = expand::expand_env(&self.app.base_url, "app.base_url")?;

        if let Some(ref dir) = self.pages.dir {
            self.pages.dir = Some(expand::expand_env(dir, "pages.dir")?);
        }

        for (name, site) in &mut self.interwiki {
            site.url = expand::expand_env(&site.url, &format!("interwiki.{name}.url"))?;
        }

        Ok(())
    }

    /// Resolve the pages directory relative to the config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.pages_resolved = PagesConfig {
            dir: config_dir.join(self.pages.dir.as_deref().unwrap_or("pages")),
            match_plurals: self.pages.match_plurals.unwrap_or(true),
        };
    }
}
