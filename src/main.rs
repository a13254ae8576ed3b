use clap::Parser;

mod cli;
mod mcp;

/// Logs go to stderr; stdout carries the MCP stream.
fn init_logging(verbose: bool) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = if verbose {
        EnvFilter::new("azrg_mcp=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("azrg_mcp=info,warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_target(false),
        )
        .init();
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let args = cli::Cli::parse();
    init_logging(args.verbose);

    cli::run(args)
}
