use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Query sent when the caller does not supply one.
pub const DEFAULT_QUERY: &str = "Resources | project id, name, type, location";

/// Arguments accepted by the `query-resources` tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryResourcesArgs {
    /// Azure subscription ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,

    /// Resource Graph query, defaults to listing all resources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

impl QueryResourcesArgs {
    /// Fill in defaults. A missing subscription falls back to
    /// `default_subscription`; a missing or empty query falls back to
    /// [`DEFAULT_QUERY`].
    pub fn into_request(self, default_subscription: &str) -> QueryRequest {
        let subscription = self
            .subscription_id
            .unwrap_or_else(|| default_subscription.to_string());
        let query = self
            .query
            .filter(|q| !q.is_empty())
            .unwrap_or_else(|| DEFAULT_QUERY.to_string());

        QueryRequest {
            subscriptions: vec![subscription],
            query,
        }
    }
}

/// Request body for the Resource Graph `resources` operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryRequest {
    pub subscriptions: Vec<String>,
    pub query: String,
}
