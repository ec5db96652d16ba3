//! `wm links` command implementation.

use std::fmt::Write as _;
use std::io::Write;

use clap::Args;
use wm_markup::RenderStats;

use super::PageArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the links command.
#[derive(Args)]
pub(crate) struct LinksArgs {
    #[command(flatten)]
    pub(crate) page: PageArgs,

    /// Print statistics as JSON.
    #[arg(long)]
    json: bool,
}

impl LinksArgs {
    /// Execute the links command.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let (renderer, ctx, source) = self.page.prepare()?;
        let result = renderer.render_bytes(&source, &ctx).await?;
        output.render_warnings(&ctx.page_name, &result.warnings);

        let report = if self.json {
            serde_json::to_string_pretty(&result.stats)? + "\n"
        } else {
            output.heading(&format!("Statistics for {}", ctx.page_name));
            format_stats(&result.stats)
        };

        let mut stdout = std::io::stdout().lock();
        stdout.write_all(report.as_bytes())?;
        stdout.flush()?;

        if result.stats.red_links > 0 {
            output.warning(&format!("{} red link(s)", result.stats.red_links));
        }
        Ok(())
    }
}

/// Plain-text statistics table.
fn format_stats(stats: &RenderStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "elements: {}", stats.total());
    for (kind, count) in &stats.elements {
        let _ = writeln!(out, "  {:<10} {count}", kind.as_str());
    }
    if !stats.links.is_empty() {
        let _ = writeln!(out, "links:");
        for (link_type, count) in &stats.links {
            let _ = writeln!(out, "  {:<10} {count}", link_type.as_str());
        }
    }
    let _ = writeln!(out, "red links:  {}", stats.red_links);
    let _ = writeln!(out, "unresolved: {}", stats.unresolved);
    let _ = writeln!(out, "failed:     {}", stats.failed);
    out
}
