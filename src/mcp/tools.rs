use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Implementation, ServerCapabilities, ServerInfo};
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use tracing::debug;

use azrg_mcp::core::graph::ResourceGraph;
use azrg_mcp::core::query::QueryResourcesArgs;

use super::format;

pub const SERVER_NAME: &str = "AzureResourceGraph";

/// MCP server exposing the `query-resources` tool.
#[derive(Clone)]
pub struct QueryServer {
    graph: Arc<dyn ResourceGraph>,
    default_subscription: String,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl QueryServer {
    pub fn new(graph: Arc<dyn ResourceGraph>, default_subscription: impl Into<String>) -> Self {
        Self {
            graph,
            default_subscription: default_subscription.into(),
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        name = "query-resources",
        description = "Retrieves resources and their details from Azure Resource Graph. Use this tool to search, filter, and analyze Azure resources across subscriptions. It supports Kusto Query Language (KQL) for complex queries to find resources by type, location, tags, or properties. Useful for infrastructure auditing, resource inventory, compliance checking, and understanding your Azure environment's current state."
    )]
    async fn query_resources(
        &self,
        Parameters(args): Parameters<QueryResourcesArgs>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.run_query(args).await)
    }
}

impl QueryServer {
    /// Apply defaults, call Resource Graph once, and wrap the outcome.
    pub async fn run_query(&self, args: QueryResourcesArgs) -> CallToolResult {
        let request = args.into_request(&self.default_subscription);
        debug!(
            "query-resources: subscriptions={:?} query={}",
            request.subscriptions, request.query
        );
        format::query_result(self.graph.resources(&request).await)
    }
}

#[tool_handler]
impl ServerHandler for QueryServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: SERVER_NAME.into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Implementation::from_build_env()
            },
            instructions: Some(
                "Azure Resource Graph: run KQL queries over your Azure resources with query-resources. Omit subscriptionId to use the configured subscription.".into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
