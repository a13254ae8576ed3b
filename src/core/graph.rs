use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::base_url;
use super::credential::{DefaultCredential, TokenCredential};
use super::query::QueryRequest;
use crate::config::types::Settings;
use crate::error::{AzrgError, Result};

/// The remote Resource Graph `resources` operation.
#[async_trait]
pub trait ResourceGraph: Send + Sync {
    /// Run a query and return the service response untouched.
    async fn resources(&self, request: &QueryRequest) -> Result<Value>;
}

#[derive(Deserialize)]
struct ArmErrorBody {
    error: ArmErrorDetail,
}

#[derive(Deserialize)]
struct ArmErrorDetail {
    #[serde(default)]
    code: Option<String>,
    message: String,
}

/// Resource Graph client that talks to Azure Resource Manager over HTTPS.
pub struct ArmResourceGraph {
    http: reqwest::Client,
    resources_url: Url,
    scope: String,
    credential: Arc<dyn TokenCredential>,
}

impl ArmResourceGraph {
    /// Build the client and the default credential chain from `settings`
    /// and the process environment.
    pub fn new(settings: &Settings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("azrg-mcp/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let authority = base_url(&settings.authority_host)?;
        let credential =
            DefaultCredential::from_lookup(http.clone(), &authority, |k| std::env::var(k).ok())?;
        debug!("credential sources: {:?}", credential.source_names());

        Self::with_credential(http, settings, Arc::new(credential))
    }

    pub fn with_credential(
        http: reqwest::Client,
        settings: &Settings,
        credential: Arc<dyn TokenCredential>,
    ) -> Result<Self> {
        let endpoint = base_url(&settings.resource_manager_endpoint)?;
        let mut resources_url = endpoint
            .join("providers/Microsoft.ResourceGraph/resources")
            .map_err(|e| AzrgError::Config(e.to_string()))?;
        resources_url
            .query_pairs_mut()
            .append_pair("api-version", &settings.api_version);

        let scope = format!("{}/.default", endpoint.as_str().trim_end_matches('/'));

        Ok(Self {
            http,
            resources_url,
            scope,
            credential,
        })
    }

    /// Token scope requested for every call.
    pub fn scope(&self) -> &str {
        &self.scope
    }
}

/// Map a failed response to an error carrying the service's own message.
fn api_error(status: StatusCode, body: &str) -> AzrgError {
    let (code, message) = match serde_json::from_str::<ArmErrorBody>(body) {
        Ok(parsed) => (parsed.error.code, parsed.error.message),
        Err(_) if !body.trim().is_empty() => (None, body.trim().to_string()),
        Err(_) => (
            None,
            status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| status.to_string()),
        ),
    };

    AzrgError::Api {
        status: status.as_u16(),
        code,
        message,
    }
}

#[async_trait]
impl ResourceGraph for ArmResourceGraph {
    async fn resources(&self, request: &QueryRequest) -> Result<Value> {
        let token = self.credential.get_token(&self.scope).await?;

        debug!(
            subscriptions = ?request.subscriptions,
            query = %request.query,
            "querying resource graph"
        );
        let response = self
            .http
            .post(self.resources_url.clone())
            .bearer_auth(&token.token)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<Value>().await?);
        }

        let body = response.text().await?;
        debug!("resource graph returned {}: {}", status, body);
        Err(api_error(status, &body))
    }
}
