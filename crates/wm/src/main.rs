//! wm CLI - wiki markup renderer.
//!
//! Provides commands for:
//! - `render`: Render a page to HTML
//! - `links`: Print element and link statistics for a page

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{LinksArgs, RenderArgs};
use error::CliError;
use output::Output;

/// wm - hybrid wiki markup and Markdown renderer.
#[derive(Parser)]
#[command(name = "wm", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a page to HTML.
    Render(RenderArgs),
    /// Print element and link statistics for a page.
    Links(LinksArgs),
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Self::Render(args) => args.page.verbose,
            Self::Links(args) => args.page.verbose,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.command.verbose() {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(cli.command) {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<(), CliError> {
    let rt = tokio::runtime::Runtime::new()?;
    match command {
        Commands::Render(args) => rt.block_on(args.execute()),
        Commands::Links(args) => rt.block_on(args.execute()),
    }
}
