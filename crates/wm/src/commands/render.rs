//! `wm render` command implementation.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Args;

use super::PageArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    #[command(flatten)]
    pub(crate) page: PageArgs,

    /// Write HTML to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Emit an error page instead of failing on unreadable input.
    #[arg(long)]
    error_page: bool,
}

impl RenderArgs {
    /// Execute the render command.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let (renderer, ctx, source) = self.page.prepare()?;

        let result = if self.error_page {
            renderer.render_or_error_page(&source, &ctx).await
        } else {
            renderer.render_bytes(&source, &ctx).await?
        };
        output.render_warnings(&ctx.page_name, &result.warnings);

        match &self.output {
            Some(path) => {
                write_file(path, &result.html)?;
                output.success(&format!(
                    "Rendered {} ({} elements) to {}",
                    ctx.page_name,
                    result.stats.total(),
                    path.display()
                ));
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(result.html.as_bytes())?;
                stdout.flush()?;
            }
        }

        Ok(())
    }
}

fn write_file(path: &Path, html: &str) -> Result<(), CliError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)?;
    Ok(())
}
