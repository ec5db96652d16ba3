//! CLI command implementations.

pub(crate) mod links;
pub(crate) mod render;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use wm_config::{CliSettings, Config};
use wm_markup::{
    AppInfo, InterWikiSite, InterWikiTable, LinkOptions, PageIndex, PageResolver, PluginRegistry,
    RenderContext, RenderOptions, UserContext, VariableRegistry, WikiRenderer,
};

pub(crate) use links::LinksArgs;
pub(crate) use render::RenderArgs;

use crate::error::CliError;

/// Application version from Cargo.toml.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Arguments shared by commands that render a page.
#[derive(Args)]
pub(crate) struct PageArgs {
    /// Path to the page source file.
    file: PathBuf,

    /// Page name seen by variables and plugins (default: file stem).
    #[arg(short = 'n', long)]
    page_name: Option<String>,

    /// Render as this authenticated user (default: anonymous).
    #[arg(short, long)]
    user: Option<String>,

    /// Path to configuration file (default: auto-discover wikimark.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory of existing pages (overrides config).
    #[arg(short, long)]
    pages_dir: Option<PathBuf>,

    /// Resolve timeout in milliseconds (overrides config).
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

impl PageArgs {
    fn load_config(&self) -> Result<Config, CliError> {
        let cli_settings = CliSettings {
            pages_dir: self.pages_dir.clone(),
            resolve_timeout_ms: self.timeout_ms,
            ..Default::default()
        };
        Ok(Config::load(self.config.as_deref(), Some(&cli_settings))?)
    }

    fn page_name(&self) -> String {
        self.page_name.clone().unwrap_or_else(|| {
            self.file
                .file_stem()
                .map_or_else(|| "Main".to_owned(), |s| s.to_string_lossy().into_owned())
        })
    }

    fn context(&self) -> RenderContext {
        let ctx = RenderContext::new(self.page_name());
        match &self.user {
            Some(user) => ctx.with_user(UserContext::authenticated(user)),
            None => ctx,
        }
    }

    fn read_source(&self) -> Result<Vec<u8>, CliError> {
        Ok(std::fs::read(&self.file)?)
    }

    /// Load config, build a renderer and read the page.
    fn prepare(&self) -> Result<(WikiRenderer, RenderContext, Vec<u8>), CliError> {
        let config = self.load_config()?;
        let renderer = build_renderer(&config)?;
        Ok((renderer, self.context(), self.read_source()?))
    }
}

/// Build a renderer with the built-in variables and plugins over the
/// configured pages directory.
pub(crate) fn build_renderer(config: &Config) -> Result<WikiRenderer, CliError> {
    let app = AppInfo::new(&config.app.name, &config.app.base_url).with_version(VERSION);
    let pages: Arc<dyn PageResolver> = Arc::new(PageIndex::new(
        scan_pages(&config.pages_resolved.dir)?,
        config.pages_resolved.match_plurals,
    ));

    let mut interwiki = InterWikiTable::with_defaults();
    for (name, site) in &config.interwiki {
        let mut entry = InterWikiSite::new(&site.url).with_new_window(site.open_in_new_window);
        if let Some(description) = &site.description {
            entry = entry.with_description(description);
        }
        interwiki.insert(name, entry);
    }

    let options = RenderOptions {
        resolve_timeout: config.render.resolve_timeout(),
        links: LinkOptions {
            view_prefix: config.links.view_prefix.clone(),
            edit_prefix: config.links.edit_prefix.clone(),
        },
    };

    Ok(WikiRenderer::builder()
        .pages(Arc::clone(&pages))
        .interwiki(interwiki)
        .variables(VariableRegistry::with_builtins(&app, Arc::clone(&pages)))
        .plugins(PluginRegistry::with_builtins(&app, pages))
        .options(options)
        .build())
}

/// Page names (file stems) of all `*.md` files under `dir`.
pub(crate) fn scan_pages(dir: &Path) -> Result<Vec<String>, CliError> {
    if !dir.is_dir() {
        tracing::warn!(dir = %dir.display(), "Pages directory not found, all links are red");
        return Ok(Vec::new());
    }

    let pattern = format!(
        "{}/**/*.md",
        glob::Pattern::escape(&dir.to_string_lossy())
    );
    let mut names: Vec<String> = glob::glob(&pattern)?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(err) => {
                tracing::warn!(
                    path = %err.path().display(),
                    error = %err.error(),
                    "Skipping unreadable path"
                );
                None
            }
        })
        .filter_map(|path| path.file_stem()?.to_str().map(str::to_owned))
        .collect();
    names.sort();
    names.dedup();

    tracing::info!(dir = %dir.display(), count = names.len(), "Indexed pages");
    Ok(names)
}
