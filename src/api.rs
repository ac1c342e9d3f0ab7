//! REST client for the chat service
//!
//! Covers the HTTP side of the chat API: the quick-query catalog, the
//! aggregated system status, the health document, and the one-shot
//! `POST /chat` exchange used when a persistent channel is not wanted.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::QuickQuery;
use crate::error::{OpschatError, Result};
use crate::message::MessageMetadata;
use crate::protocol::ChatRequest;
use crate::status::SystemStatus;

/// Reply body of `POST /chat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    pub session_id: String,
    pub timestamp: String,
    #[serde(default)]
    pub metadata: Option<MessageMetadata>,
    #[serde(default)]
    pub suggestions: Option<Vec<String>>,
}

/// Typed HTTP client bound to one chat service base URL.
///
/// Cloning is cheap; clones share the connection pool.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use opschat::api::ApiClient;
///
/// # #[tokio::main]
/// # async fn main() -> anyhow::Result<()> {
/// let api = ApiClient::new(url::Url::parse("http://localhost:8000")?, Duration::from_secs(30))?;
/// let queries = api.quick_queries().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ApiClient {
    http_client: reqwest::Client,
    base_url: url::Url,
}

impl ApiClient {
    /// Build a client with a per-request `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`OpschatError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: url::Url, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(OpschatError::from)?;
        Ok(Self {
            http_client,
            base_url,
        })
    }

    pub fn base_url(&self) -> &url::Url {
        &self.base_url
    }

    /// `GET /quick-queries`.
    ///
    /// # Errors
    ///
    /// Returns [`OpschatError::Fetch`] when the service is unreachable,
    /// answers with a non-success status, or sends an undecodable body.
    pub async fn quick_queries(&self) -> Result<Vec<QuickQuery>> {
        self.get_json("quick-queries").await
    }

    /// `GET /status`.
    ///
    /// # Errors
    ///
    /// Same as [`ApiClient::quick_queries`].
    pub async fn status(&self) -> Result<SystemStatus> {
        self.get_json("status").await
    }

    /// `GET /health`, returned as raw JSON.
    ///
    /// # Errors
    ///
    /// Same as [`ApiClient::quick_queries`].
    pub async fn health(&self) -> Result<serde_json::Value> {
        self.get_json("health").await
    }

    /// `POST /chat`: one request, one reply, no channel.
    ///
    /// # Errors
    ///
    /// Returns [`OpschatError::Backend`] when the service is unreachable or
    /// rejects the request. The service's `detail` field is used as the
    /// message when present.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        let url = self.endpoint("chat")?;
        tracing::debug!(url = %url, session_id = %request.session_id, "POST chat");

        let response = self
            .http_client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| OpschatError::Backend(format!("chat request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
                .unwrap_or(body);
            return Err(OpschatError::Backend(format!("HTTP {status}: {detail}")).into());
        }

        response
            .json::<ChatReply>()
            .await
            .map_err(|e| OpschatError::Backend(format!("invalid chat reply: {e}")).into())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path)?;
        tracing::debug!(url = %url, "GET");

        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| OpschatError::Fetch(format!("GET {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OpschatError::Fetch(format!("GET {url} returned HTTP {status}")).into());
        }

        response
            .json::<T>()
            .await
            .map_err(|e| OpschatError::Fetch(format!("GET {url} returned an invalid body: {e}")).into())
    }

    /// Resolve `path` relative to the base URL, keeping any base path
    /// prefix (`http://host/api` + `status` -> `http://host/api/status`).
    fn endpoint(&self, path: &str) -> Result<url::Url> {
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        base.join(path)
            .map_err(|e| OpschatError::Config(format!("invalid API path {path}: {e}")).into())
    }
}
