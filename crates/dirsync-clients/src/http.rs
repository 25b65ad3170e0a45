//! Shared `reqwest` plumbing: client construction, auth, response handling.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::ServiceConfig;
use crate::error::{ClientError, ClientResult};

const USER_AGENT: &str = concat!("dirsync/", env!("CARGO_PKG_VERSION"));

/// A base URL plus optional bearer token over one `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    base_url: String,
    token: Option<String>,
    http_client: Client,
}

impl ServiceClient {
    pub fn new(config: &ServiceConfig) -> ClientResult<Self> {
        if config.base_url.trim().is_empty() {
            return Err(ClientError::InvalidConfig("base_url is empty".into()));
        }
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ClientError::InvalidConfig(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self::with_http_client(
            config.base_url.clone(),
            config.token.clone(),
            http_client,
        ))
    }

    /// Create a client with a pre-built `reqwest::Client` (for testing).
    #[must_use]
    pub fn with_http_client(base_url: String, token: Option<String>, http_client: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            http_client,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let url = self.url(path);
        debug!(url = %url, "GET");
        let response = self.authorize(self.http_client.get(&url)).send().await?;
        handle_response(response).await
    }

    /// POST and discard the response body.
    pub async fn post_unit<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> ClientResult<()> {
        let url = self.url(path);
        debug!(url = %url, "POST");
        let response = self
            .authorize(self.http_client.post(&url))
            .json(body)
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(error_response(response).await)
        }
    }
}

async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
    if response.status().is_success() {
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ClientError::Parse(e.to_string()))
    } else {
        Err(error_response(response).await)
    }
}

async fn error_response(response: reqwest::Response) -> ClientError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<no body>".to_string());

    match status {
        StatusCode::NOT_FOUND => ClientError::NotFound(body),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            warn!(status = %status, "Upstream rejected credentials");
            ClientError::Auth {
                status: status.as_u16(),
            }
        }
        _ => ClientError::Status {
            status: status.as_u16(),
            body: if body.is_empty() {
                format!("HTTP {status}")
            } else {
                body
            },
        },
    }
}
