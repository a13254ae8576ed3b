use serde::{Deserialize, Serialize};

pub const ENV_SUBSCRIPTION_ID: &str = "SUBSCRIPTION_ID";
pub const ENV_RESOURCE_MANAGER_ENDPOINT: &str = "AZURE_RESOURCE_MANAGER_ENDPOINT";
pub const ENV_AUTHORITY_HOST: &str = "AZURE_AUTHORITY_HOST";
pub const ENV_API_VERSION: &str = "RESOURCE_GRAPH_API_VERSION";

pub const DEFAULT_RESOURCE_MANAGER_ENDPOINT: &str = "https://management.azure.com/";
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com/";
pub const DEFAULT_API_VERSION: &str = "2021-03-01";

/// Resolved process settings. Every field can come from `config.toml` and be
/// overridden by the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Subscription used when a query does not name one. Empty when unset.
    pub subscription_id: String,
    pub resource_manager_endpoint: String,
    pub authority_host: String,
    pub api_version: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            subscription_id: String::new(),
            resource_manager_endpoint: DEFAULT_RESOURCE_MANAGER_ENDPOINT.into(),
            authority_host: DEFAULT_AUTHORITY_HOST.into(),
            api_version: DEFAULT_API_VERSION.into(),
        }
    }
}

impl Settings {
    /// Overlay environment values. Empty variables count as unset.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(v) = get(ENV_SUBSCRIPTION_ID) {
            self.subscription_id = v;
        }
        if let Some(v) = get(ENV_RESOURCE_MANAGER_ENDPOINT) {
            self.resource_manager_endpoint = v;
        }
        if let Some(v) = get(ENV_AUTHORITY_HOST) {
            self.authority_host = v;
        }
        if let Some(v) = get(ENV_API_VERSION) {
            self.api_version = v;
        }
    }
}
