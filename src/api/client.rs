//! Session controller client.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::types::{Operation, Session};
use crate::auth::AccessTokenProvider;
use crate::error::{ApiStatus, Result, SparkConnectError};

/// Control-plane operations on managed sessions.
#[async_trait]
pub trait SessionController: Send + Sync {
    /// Create a session under `parent` with the given ID.
    async fn create_session(
        &self,
        parent: &str,
        session_id: &str,
        session: &Session,
    ) -> Result<Operation>;

    /// Fetch a session by fully-qualified resource name.
    async fn get_session(&self, name: &str) -> Result<Session>;

    /// Request termination of a session.
    async fn terminate_session(&self, name: &str) -> Result<()>;
}

/// JSON/REST implementation of [`SessionController`].
pub struct HttpSessionController {
    client: reqwest::Client,
    base_url: String,
    tokens: Box<dyn AccessTokenProvider>,
}

/// Error payload the service wraps failures in.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

impl HttpSessionController {
    /// Create a controller talking to `endpoint` (host, no scheme).
    pub fn new(endpoint: &str, tokens: Box<dyn AccessTokenProvider>) -> Self {
        Self::with_base_url(format!("https://{endpoint}"), tokens)
    }

    /// Create a controller with a full base URL, for tests.
    pub fn with_base_url(base_url: impl Into<String>, tokens: Box<dyn AccessTokenProvider>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            tokens,
        }
    }

    async fn check(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let api_status = ApiStatus::from_http(status.as_u16());
        let message = match response.json::<ApiErrorBody>().await {
            Ok(body) => body.error.message,
            Err(_) => status.to_string(),
        };
        Err(SparkConnectError::Api {
            status: api_status,
            message,
        })
    }
}

#[async_trait]
impl SessionController for HttpSessionController {
    async fn create_session(
        &self,
        parent: &str,
        session_id: &str,
        session: &Session,
    ) -> Result<Operation> {
        let url = format!(
            "{}/v1/{parent}/sessions?session_id={session_id}",
            self.base_url
        );
        debug!("POST {url}");

        let token = self.tokens.access_token().await?;
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(session)
            .send()
            .await?;

        Ok(self.check(response).await?.json().await?)
    }

    async fn get_session(&self, name: &str) -> Result<Session> {
        let url = format!("{}/v1/{name}", self.base_url);
        debug!("GET {url}");

        let token = self.tokens.access_token().await?;
        let response = self.client.get(&url).bearer_auth(token).send().await?;

        Ok(self.check(response).await?.json().await?)
    }

    async fn terminate_session(&self, name: &str) -> Result<()> {
        let url = format!("{}/v1/{name}:terminate", self.base_url);
        debug!("POST {url}");

        let token = self.tokens.access_token().await?;
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&serde_json::json!({}))
            .send()
            .await?;

        self.check(response).await?;
        Ok(())
    }
}
