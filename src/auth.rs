//! Authentication negotiation for the session controller API.
//!
//! The workload authentication type is part of the session configuration
//! sent to the service; the access token authorizes the control-plane
//! requests themselves. Token sourcing is kept behind a trait so the
//! session controller can be exercised without any live credentials.

use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SparkConnectError};

/// Workload authentication type for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthenticationType {
    /// The session workload runs as a service account.
    ServiceAccount,
    /// The session workload runs as the end user.
    EndUserCredentials,
}

impl AuthenticationType {
    /// The wire spelling of this authentication type.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthenticationType::ServiceAccount => "SERVICE_ACCOUNT",
            AuthenticationType::EndUserCredentials => "END_USER_CREDENTIALS",
        }
    }
}

impl FromStr for AuthenticationType {
    type Err = SparkConnectError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "SERVICE_ACCOUNT" => Ok(AuthenticationType::ServiceAccount),
            "END_USER_CREDENTIALS" => Ok(AuthenticationType::EndUserCredentials),
            other => Err(SparkConnectError::InvalidAuthType(other.to_string())),
        }
    }
}

impl std::fmt::Display for AuthenticationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of OAuth2 bearer tokens for control-plane requests.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Return a currently valid access token.
    async fn access_token(&self) -> Result<String>;
}

/// Provider backed by a fixed token.
///
/// Used when the caller already holds a token, e.g. from
/// `GOOGLE_OAUTH_ACCESS_TOKEN` or an external credential helper.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl AccessTokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}

/// Provider that queries the GCE metadata server.
///
/// Works on any compute platform that exposes the standard metadata
/// endpoint (GCE, Cloud Run, Workbench instances, Colab Enterprise).
pub struct MetadataTokenProvider {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct MetadataToken {
    access_token: String,
}

impl MetadataTokenProvider {
    const DEFAULT_BASE: &'static str = "http://metadata.google.internal";

    pub fn new() -> Self {
        Self::with_base_url(Self::DEFAULT_BASE)
    }

    /// Override the metadata host, for tests.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

impl Default for MetadataTokenProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccessTokenProvider for MetadataTokenProvider {
    async fn access_token(&self) -> Result<String> {
        let url = format!(
            "{}/computeMetadata/v1/instance/service-accounts/default/token",
            self.base_url
        );
        let response = self
            .client
            .get(&url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SparkConnectError::Auth(format!(
                "metadata server returned {}",
                response.status()
            )));
        }

        let token: MetadataToken = response.json().await?;
        Ok(token.access_token)
    }
}

/// Build the default token provider chain.
///
/// Prefers an explicit `GOOGLE_OAUTH_ACCESS_TOKEN`, falling back to the
/// metadata server.
pub fn default_provider(env: &dyn Fn(&str) -> Option<String>) -> Box<dyn AccessTokenProvider> {
    match env("GOOGLE_OAUTH_ACCESS_TOKEN") {
        Some(token) if !token.is_empty() => Box::new(StaticTokenProvider::new(token)),
        _ => Box::new(MetadataTokenProvider::new()),
    }
}
