//! Shared HTTP plumbing for the platform clients.

use std::time::Duration;

use reqwest::Url;
use serde::de::DeserializeOwned;

use qscale_core::{ServiceError, Settings};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("qscale/", env!("CARGO_PKG_VERSION"));

/// A pooled [`reqwest::Client`] shared by the queue, worker and cache
/// clients.
#[derive(Clone)]
pub struct PlatformClient {
    client: reqwest::Client,
}

impl PlatformClient {
    /// Build a client whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        Ok(Self { client })
    }

    /// Reuse an existing client (connection pool shared with other code).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Start a request authenticated for `settings`' project.
    pub(crate) fn request(
        &self,
        method: reqwest::Method,
        settings: &Settings,
        url: Url,
    ) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header(reqwest::header::AUTHORIZATION, format!("OAuth {}", settings.token))
            .header(reqwest::header::ACCEPT, "application/json")
    }
}

/// `{base_url}/projects/{project_id}/{segments…}` with every segment
/// percent-encoded.
pub(crate) fn project_url(settings: &Settings, segments: &[&str]) -> Result<Url, ServiceError> {
    let mut url = Url::parse(&settings.base_url())
        .map_err(|e| ServiceError::Transport(format!("invalid endpoint {}: {e}", settings.base_url())))?;
    url.path_segments_mut()
        .map_err(|_| ServiceError::Transport(format!("endpoint {} cannot take a path", settings.base_url())))?
        .pop_if_empty()
        .push("projects")
        .push(&settings.project_id)
        .extend(segments);
    Ok(url)
}

pub(crate) fn transport(e: reqwest::Error) -> ServiceError {
    if e.is_decode() {
        ServiceError::Decode(e.to_string())
    } else {
        ServiceError::Transport(e.to_string())
    }
}

/// Return the response if it is 2xx, otherwise an [`ServiceError::Api`]
/// carrying the status and body text.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
    Err(ServiceError::Api {
        status: status.as_u16(),
        body,
    })
}

pub(crate) async fn parse_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ServiceError> {
    let response = ensure_success(response).await?;
    let bytes = response.bytes().await.map_err(transport)?;
    serde_json::from_slice(&bytes).map_err(|e| ServiceError::Decode(e.to_string()))
}
