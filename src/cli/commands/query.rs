use std::sync::Arc;

use azrg_mcp::config::types::Settings;
use azrg_mcp::core::query::QueryResourcesArgs;

use crate::cli::OutputFormat;
use crate::cli::output::output_result;
use crate::mcp::tools::QueryServer;

#[derive(clap::Args)]
pub struct QueryArgs {
    /// Resource Graph (KQL) query; defaults to listing all resources
    pub query: Option<String>,

    /// Subscription to query instead of the configured one
    #[arg(long)]
    pub subscription_id: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "human")]
    pub format: OutputFormat,
}

pub fn run(args: QueryArgs, settings: Settings) -> anyhow::Result<()> {
    let graph = crate::mcp::init_client(&settings)?;
    let server = QueryServer::new(Arc::new(graph), settings.subscription_id);

    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(server.run_query(QueryResourcesArgs {
        subscription_id: args.subscription_id,
        query: args.query,
    }));

    output_result(&result, args.format, &mut std::io::stdout())?;

    if result.is_error == Some(true) {
        anyhow::bail!("resource graph query failed");
    }
    Ok(())
}
