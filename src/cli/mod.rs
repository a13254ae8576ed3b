pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

use azrg_mcp::config;

#[derive(Parser)]
#[command(
    name = "azrg-mcp",
    about = "Query Azure Resource Graph over MCP.",
    version
)]
pub struct Cli {
    /// Debug-level logging on stderr
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the query-resources tool over stdio (default)
    Serve,
    /// Run a single Resource Graph query and print the result
    Query(commands::query::QueryArgs),
    /// Show the resolved configuration
    Config(commands::config::ConfigArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, clap::ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Dispatch a CLI command.
pub fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = config::load_settings()?;

    match cli.command {
        None | Some(Commands::Serve) => crate::mcp::serve_stdio(settings),
        Some(Commands::Query(args)) => commands::query::run(args, settings),
        Some(Commands::Config(args)) => commands::config::run(args, &settings),
    }
}
