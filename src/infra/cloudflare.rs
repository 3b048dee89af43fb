//! Minimal Cloudflare API client: token verification and Pages deployment lookup
//! by commit.

use std::fmt;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::info;

use crate::{
    application::publish::DeploymentApi, domain::deployment::ProviderDeployment,
    infra::error::InfraError,
};

pub const API_TOKEN_ENV: &str = "CLOUDFLARE_API_TOKEN";
pub const ACCOUNT_ID_ENV: &str = "CLOUDFLARE_ACCOUNT_ID";

#[derive(Debug, Error)]
pub enum CloudflareError {
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API token rejected: {0}")]
    Unauthorized(String),
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

/// The two out-of-band secrets the publish step needs.
#[derive(Clone)]
pub struct CloudflareCredentials {
    pub api_token: String,
    pub account_id: String,
}

impl fmt::Debug for CloudflareCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudflareCredentials")
            .field("api_token", &"<redacted>")
            .field("account_id", &self.account_id)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct TokenStatus {
    status: String,
}

#[derive(Debug, Deserialize)]
struct PagesDeployment {
    id: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    environment: Option<String>,
    #[serde(default)]
    created_on: Option<String>,
    #[serde(default)]
    deployment_trigger: Option<DeploymentTrigger>,
}

#[derive(Debug, Deserialize)]
struct DeploymentTrigger {
    #[serde(default)]
    metadata: Option<TriggerMetadata>,
}

#[derive(Debug, Deserialize)]
struct TriggerMetadata {
    #[serde(default)]
    commit_hash: Option<String>,
}

impl PagesDeployment {
    fn commit_hash(&self) -> Option<&str> {
        self.deployment_trigger
            .as_ref()?
            .metadata
            .as_ref()?
            .commit_hash
            .as_deref()
    }
}

impl From<PagesDeployment> for ProviderDeployment {
    fn from(value: PagesDeployment) -> Self {
        Self {
            id: value.id,
            url: value.url,
            environment: value.environment,
            created_on: value.created_on,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CloudflareClient {
    client: Client,
    base: Url,
    credentials: CloudflareCredentials,
}

impl CloudflareClient {
    pub fn new(api_base: &Url, credentials: CloudflareCredentials) -> Result<Self, CloudflareError> {
        let mut base = api_base.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder().user_agent(Self::user_agent()).build()?;
        Ok(Self {
            client,
            base,
            credentials,
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("sitepipe/", env!("CARGO_PKG_VERSION"))
    }

    fn url(&self, path: &str) -> Result<Url, CloudflareError> {
        self.base.join(path).map_err(CloudflareError::Url)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, CloudflareError> {
        let url = self.url(path)?;
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.credentials.api_token)
            .send()
            .await?;

        let status = resp.status();
        let bytes = resp.bytes().await?;
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let text = String::from_utf8_lossy(&bytes).into_owned();
            return Err(CloudflareError::Unauthorized(format!(
                "status {status} body {text}"
            )));
        }

        let envelope: Envelope<T> =
            serde_json::from_slice(&bytes).map_err(|err| CloudflareError::Api {
                status: status.as_u16(),
                message: format!("failed to parse body: {err}"),
            })?;

        if !status.is_success() || !envelope.success {
            let message = envelope
                .errors
                .iter()
                .map(|err| format!("[{}] {}", err.code, err.message))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(CloudflareError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(envelope.result)
    }

    pub async fn verify_token(&self) -> Result<(), CloudflareError> {
        let status: Option<TokenStatus> = self.get("user/tokens/verify").await?;
        match status {
            Some(token) if token.status == "active" => {
                info!(
                    target = "infra::cloudflare",
                    op = "cloudflare::verify_token",
                    result = "ok",
                    "Cloudflare API token verified"
                );
                Ok(())
            }
            Some(token) => Err(CloudflareError::Unauthorized(format!(
                "token status is `{}`",
                token.status
            ))),
            None => Err(CloudflareError::Unauthorized(
                "token verification returned no result".to_string(),
            )),
        }
    }

    /// Newest deployment of `project` built from `commit_sha`. Deployments of
    /// other commits, e.g. from a concurrent run, are never returned.
    pub async fn deployment_for_commit(
        &self,
        project: &str,
        commit_sha: &str,
    ) -> Result<Option<ProviderDeployment>, CloudflareError> {
        let path = format!(
            "accounts/{}/pages/projects/{project}/deployments",
            self.credentials.account_id
        );
        let deployments: Option<Vec<PagesDeployment>> = self.get(&path).await?;
        Ok(deployments
            .unwrap_or_default()
            .into_iter()
            .find(|deployment| {
                deployment
                    .commit_hash()
                    .is_some_and(|hash| hash.eq_ignore_ascii_case(commit_sha))
            })
            .map(ProviderDeployment::from))
    }
}

#[async_trait]
impl DeploymentApi for CloudflareClient {
    async fn verify_credentials(&self) -> Result<(), InfraError> {
        self.verify_token().await.map_err(InfraError::from)
    }

    async fn deployment_for_commit(
        &self,
        project_name: &str,
        commit_sha: &str,
    ) -> Result<Option<ProviderDeployment>, InfraError> {
        CloudflareClient::deployment_for_commit(self, project_name, commit_sha)
            .await
            .map_err(InfraError::from)
    }
}
