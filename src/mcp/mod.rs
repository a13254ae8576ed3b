pub mod format;
pub mod tools;

use std::sync::Arc;

use rmcp::ServiceExt;
use tracing::{error, info};

use azrg_mcp::config::types::Settings;
use azrg_mcp::core::graph::ArmResourceGraph;
use tools::QueryServer;

/// Construct the Resource Graph client, logging the outcome. Failure here is
/// fatal for every caller.
pub fn init_client(settings: &Settings) -> anyhow::Result<ArmResourceGraph> {
    match ArmResourceGraph::new(settings) {
        Ok(graph) => {
            info!("Azure Resource Graph client initialized successfully");
            Ok(graph)
        }
        Err(err) => {
            error!("Failed to initialize Azure Resource Graph client: {}", err);
            Err(err.into())
        }
    }
}

/// Start the MCP server over stdio. Blocks until the connection closes.
pub fn serve_stdio(settings: Settings) -> anyhow::Result<()> {
    info!("Using subscription ID: {}", settings.subscription_id);
    let graph = init_client(&settings)?;
    let server = QueryServer::new(Arc::new(graph), settings.subscription_id);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let service = server
            .serve(rmcp::transport::stdio())
            .await
            .inspect_err(|e| error!("Fatal error in MCP transport: {}", e))?;
        info!("Azure Resource Graph MCP Server running on stdio");
        service.waiting().await?;

        Ok(())
    })
}
