//! Access-token acquisition for Azure Resource Manager.
//!
//! [`DefaultCredential`] walks the usual sources in order: client secret from
//! the environment, workload identity, managed identity, then the Azure CLI.
//! Sources that are merely unavailable are skipped; a source that is
//! configured but rejected ends the walk. The first source that produces a
//! token is remembered for later calls.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime, TimeDelta, TimeZone, Utc};
use reqwest::Url;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::base_url;
use crate::error::{AzrgError, Result};

pub const ENV_TENANT_ID: &str = "AZURE_TENANT_ID";
pub const ENV_CLIENT_ID: &str = "AZURE_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "AZURE_CLIENT_SECRET";
pub const ENV_FEDERATED_TOKEN_FILE: &str = "AZURE_FEDERATED_TOKEN_FILE";
pub const ENV_IDENTITY_ENDPOINT: &str = "IDENTITY_ENDPOINT";
pub const ENV_IDENTITY_HEADER: &str = "IDENTITY_HEADER";

const IMDS_ENDPOINT: &str = "http://169.254.169.254/";
const IMDS_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const CLI_TIMEOUT: Duration = Duration::from_secs(10);
const REFRESH_MARGIN_SECS: i64 = 300;
const JWT_BEARER: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_on: DateTime<Utc>,
}

impl AccessToken {
    /// True while the token is comfortably inside its lifetime.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_on - TimeDelta::seconds(REFRESH_MARGIN_SECS) > now
    }
}

/// Anything that can hand out bearer tokens for a scope.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    async fn get_token(&self, scope: &str) -> Result<AccessToken>;
}

/// `https://management.azure.com/.default` -> `https://management.azure.com`
fn scope_to_resource(scope: &str) -> &str {
    scope.strip_suffix("/.default").unwrap_or(scope)
}

fn epoch_to_utc(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .ok_or_else(|| AzrgError::Credential(format!("token expiry out of range: {}", secs)))
}

// --- client secret / workload identity ---

#[derive(Debug, Clone)]
pub enum ClientAuth {
    Secret(String),
    /// Path to a projected service-account token used as a client assertion.
    FederatedTokenFile(PathBuf),
}

#[derive(Deserialize)]
struct OAuthToken {
    access_token: String,
    expires_in: i64,
}

#[derive(Deserialize)]
struct OAuthError {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// OAuth2 client-credentials grant against Microsoft Entra ID.
pub struct ClientCredential {
    http: reqwest::Client,
    token_url: Url,
    client_id: String,
    auth: ClientAuth,
}

impl ClientCredential {
    pub fn new(
        http: reqwest::Client,
        authority_host: &Url,
        tenant_id: &str,
        client_id: &str,
        auth: ClientAuth,
    ) -> Result<Self> {
        let token_url = authority_host
            .join(&format!("{}/oauth2/v2.0/token", tenant_id))
            .map_err(|e| AzrgError::Config(format!("invalid tenant id '{}': {}", tenant_id, e)))?;

        Ok(Self {
            http,
            token_url,
            client_id: client_id.to_string(),
            auth,
        })
    }
}

#[async_trait]
impl TokenCredential for ClientCredential {
    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        let mut form: Vec<(&str, String)> = vec![
            ("grant_type", "client_credentials".into()),
            ("client_id", self.client_id.clone()),
            ("scope", scope.to_string()),
        ];
        match &self.auth {
            ClientAuth::Secret(secret) => form.push(("client_secret", secret.clone())),
            ClientAuth::FederatedTokenFile(path) => {
                let assertion = tokio::fs::read_to_string(path).await?;
                form.push(("client_assertion_type", JWT_BEARER.into()));
                form.push(("client_assertion", assertion.trim().to_string()));
            }
        }

        let response = self
            .http
            .post(self.token_url.clone())
            .form(&form)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = match serde_json::from_str::<OAuthError>(&body) {
                Ok(err) => match err.error_description {
                    Some(desc) => format!("{}: {}", err.error, desc),
                    None => err.error,
                },
                Err(_) => format!("token endpoint returned {}", status),
            };
            return Err(AzrgError::Credential(message));
        }

        let token: OAuthToken = serde_json::from_str(&body)?;
        Ok(AccessToken {
            token: token.access_token,
            expires_on: Utc::now() + TimeDelta::seconds(token.expires_in),
        })
    }
}

// --- managed identity ---

enum ManagedIdentitySource {
    /// App Service / Functions / Container Apps local token endpoint.
    AppService { endpoint: Url, header: String },
    /// Instance metadata service on VMs and AKS nodes.
    Imds { endpoint: Url },
}

#[derive(Deserialize)]
struct ManagedIdentityToken {
    access_token: String,
    /// Epoch seconds; IMDS sends a string, some hosts send a number.
    expires_on: serde_json::Value,
}

pub struct ManagedIdentityCredential {
    http: reqwest::Client,
    source: ManagedIdentitySource,
    client_id: Option<String>,
}

impl ManagedIdentityCredential {
    pub fn imds(http: reqwest::Client, endpoint: Url, client_id: Option<String>) -> Self {
        Self {
            http,
            source: ManagedIdentitySource::Imds { endpoint },
            client_id,
        }
    }

    pub fn app_service(
        http: reqwest::Client,
        endpoint: Url,
        header: String,
        client_id: Option<String>,
    ) -> Self {
        Self {
            http,
            source: ManagedIdentitySource::AppService { endpoint, header },
            client_id,
        }
    }
}

#[async_trait]
impl TokenCredential for ManagedIdentityCredential {
    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        let resource = scope_to_resource(scope);

        let request = match &self.source {
            ManagedIdentitySource::AppService { endpoint, header } => {
                let mut url = endpoint.clone();
                url.query_pairs_mut()
                    .append_pair("api-version", "2019-08-01")
                    .append_pair("resource", resource);
                if let Some(ref id) = self.client_id {
                    url.query_pairs_mut().append_pair("client_id", id);
                }
                self.http.get(url).header("X-IDENTITY-HEADER", header)
            }
            ManagedIdentitySource::Imds { endpoint } => {
                let mut url = endpoint
                    .join("metadata/identity/oauth2/token")
                    .map_err(|e| AzrgError::Config(e.to_string()))?;
                url.query_pairs_mut()
                    .append_pair("api-version", "2018-02-01")
                    .append_pair("resource", resource);
                if let Some(ref id) = self.client_id {
                    url.query_pairs_mut().append_pair("client_id", id);
                }
                self.http.get(url).header("Metadata", "true")
            }
        };

        let response = request.send().await.map_err(|e| {
            AzrgError::CredentialUnavailable(format!("managed identity endpoint unreachable: {}", e))
        })?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AzrgError::CredentialUnavailable(format!(
                "managed identity returned {}: {}",
                status,
                body.trim()
            )));
        }

        let token: ManagedIdentityToken = response.json().await?;
        let secs = match &token.expires_on {
            serde_json::Value::String(s) => s.parse::<i64>().ok(),
            serde_json::Value::Number(n) => n.as_i64(),
            _ => None,
        }
        .ok_or_else(|| AzrgError::Credential("managed identity token has no expiry".into()))?;

        Ok(AccessToken {
            token: token.access_token,
            expires_on: epoch_to_utc(secs)?,
        })
    }
}

// --- Azure CLI ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliToken {
    access_token: String,
    /// Local time, e.g. `2024-05-01 10:11:12.000000`. Present on every CLI version.
    #[serde(default)]
    expires_on: Option<String>,
    /// Epoch seconds. Only on CLI 2.54+.
    #[serde(default, rename = "expires_on")]
    expires_on_epoch: Option<i64>,
}

/// Parse the JSON printed by `az account get-access-token`.
pub fn parse_cli_token(stdout: &[u8]) -> Result<AccessToken> {
    let raw: CliToken = serde_json::from_slice(stdout)?;

    let expires_on = if let Some(secs) = raw.expires_on_epoch {
        epoch_to_utc(secs)?
    } else {
        let local = raw
            .expires_on
            .as_deref()
            .and_then(|s| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").ok())
            .and_then(|naive| Local.from_local_datetime(&naive).single())
            .ok_or_else(|| AzrgError::Credential("Azure CLI token has no expiry".into()))?;
        local.with_timezone(&Utc)
    };

    Ok(AccessToken {
        token: raw.access_token,
        expires_on,
    })
}

pub struct AzureCliCredential {
    program: PathBuf,
    timeout: Duration,
    tenant_id: Option<String>,
}

impl AzureCliCredential {
    pub fn new(tenant_id: Option<String>) -> Self {
        let program = if cfg!(windows) { "az.cmd" } else { "az" };
        Self {
            program: PathBuf::from(program),
            timeout: CLI_TIMEOUT,
            tenant_id,
        }
    }

    /// Run `program` instead of `az`, giving up after `timeout`.
    pub fn with_program(mut self, program: impl Into<PathBuf>, timeout: Duration) -> Self {
        self.program = program.into();
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl TokenCredential for AzureCliCredential {
    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.kill_on_drop(true);
        cmd.args([
            "account",
            "get-access-token",
            "--output",
            "json",
            "--resource",
            scope_to_resource(scope),
        ]);
        if let Some(ref tenant) = self.tenant_id {
            cmd.args(["--tenant", tenant.as_str()]);
        }

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                AzrgError::CredentialUnavailable(format!(
                    "Azure CLI did not respond within {}s",
                    self.timeout.as_secs_f32()
                ))
            })?
            .map_err(|e| AzrgError::CredentialUnavailable(format!("Azure CLI not available: {}", e)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AzrgError::CredentialUnavailable(format!(
                "Azure CLI failed: {}",
                stderr.trim()
            )));
        }

        parse_cli_token(&output.stdout)
    }
}

// --- chain ---

#[derive(Default)]
struct ChainState {
    selected: Option<usize>,
    cached: Option<(String, AccessToken)>,
}

/// Ordered credential chain with a single-scope token cache.
pub struct DefaultCredential {
    sources: Vec<(&'static str, Arc<dyn TokenCredential>)>,
    state: Mutex<ChainState>,
}

impl DefaultCredential {
    pub fn new(sources: Vec<(&'static str, Arc<dyn TokenCredential>)>) -> Self {
        Self {
            sources,
            state: Mutex::new(ChainState::default()),
        }
    }

    /// Build the chain from environment values supplied by `lookup`.
    ///
    /// Fails when client-credential variables are only partly set, since
    /// that is always a deployment mistake rather than a missing source.
    pub fn from_lookup<F>(http: reqwest::Client, authority_host: &Url, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let tenant_id = get(ENV_TENANT_ID);
        let client_id = get(ENV_CLIENT_ID);

        let mut sources: Vec<(&'static str, Arc<dyn TokenCredential>)> = Vec::new();

        for (var, name) in [
            (ENV_CLIENT_SECRET, "environment"),
            (ENV_FEDERATED_TOKEN_FILE, "workload_identity"),
        ] {
            let Some(value) = get(var) else { continue };
            let (Some(tenant), Some(client)) = (&tenant_id, &client_id) else {
                return Err(AzrgError::Config(format!(
                    "{} is set but {} and {} are both required",
                    var, ENV_TENANT_ID, ENV_CLIENT_ID
                )));
            };
            let auth = if var == ENV_CLIENT_SECRET {
                ClientAuth::Secret(value)
            } else {
                ClientAuth::FederatedTokenFile(PathBuf::from(value))
            };
            let cred = ClientCredential::new(http.clone(), authority_host, tenant, client, auth)?;
            sources.push((name, Arc::new(cred)));
        }

        match (get(ENV_IDENTITY_ENDPOINT), get(ENV_IDENTITY_HEADER)) {
            (Some(endpoint), Some(header)) => {
                let endpoint = Url::parse(&endpoint).map_err(|e| {
                    AzrgError::Config(format!("invalid {}: {}", ENV_IDENTITY_ENDPOINT, e))
                })?;
                let cred = ManagedIdentityCredential::app_service(
                    http.clone(),
                    endpoint,
                    header,
                    client_id.clone(),
                );
                sources.push(("app_service", Arc::new(cred)));
            }
            _ => {
                // Off Azure nothing answers on the link-local address, so cap
                // the connect phase without limiting a slow first token issue.
                let imds_http = reqwest::Client::builder()
                    .connect_timeout(IMDS_CONNECT_TIMEOUT)
                    .build()?;
                let cred = ManagedIdentityCredential::imds(
                    imds_http,
                    base_url(IMDS_ENDPOINT)?,
                    client_id.clone(),
                );
                sources.push(("managed_identity", Arc::new(cred)));
            }
        }
        sources.push(("azure_cli", Arc::new(AzureCliCredential::new(tenant_id))));

        Ok(Self::new(sources))
    }

    /// Source names in the order they are tried.
    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|(name, _)| *name).collect()
    }
}

#[async_trait]
impl TokenCredential for DefaultCredential {
    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        let mut state = self.state.lock().await;

        if let Some((ref cached_scope, ref token)) = state.cached {
            if cached_scope == scope && token.is_fresh(Utc::now()) {
                return Ok(token.clone());
            }
        }

        let token = match state.selected {
            Some(i) => self.sources[i].1.get_token(scope).await?,
            None => {
                let mut failures = Vec::new();
                let mut found = None;
                for (i, (name, source)) in self.sources.iter().enumerate() {
                    match source.get_token(scope).await {
                        Ok(token) => {
                            info!("Acquired Azure token from {} credential", name);
                            found = Some((i, token));
                            break;
                        }
                        Err(AzrgError::CredentialUnavailable(reason)) => {
                            debug!("{} credential unavailable: {}", name, reason);
                            failures.push(format!("{}: {}", name, reason));
                        }
                        Err(err) => {
                            // A configured source that was rejected must not
                            // fall back to some other identity.
                            warn!("{} credential failed: {}", name, err);
                            return Err(err);
                        }
                    }
                }
                let Some((i, token)) = found else {
                    return Err(AzrgError::Credential(format!(
                        "no credential source produced a token ({})",
                        failures.join("; ")
                    )));
                };
                state.selected = Some(i);
                token
            }
        };

        state.cached = Some((scope.to_string(), token.clone()));
        Ok(token)
    }
}
