//! Queue service client.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use qscale_core::{QueueInfo, QueueService, ServiceResult, Settings};

use crate::http::{PlatformClient, parse_json, project_url, transport};

#[derive(Debug, Deserialize)]
struct QueueEnvelope {
    queue: QueueBody,
}

#[derive(Debug, Deserialize)]
struct QueueBody {
    #[serde(default)]
    size: i64,
}

/// REST client for `GET /projects/{pid}/queues/{name}`.
#[derive(Clone)]
pub struct MqClient {
    http: PlatformClient,
}

impl MqClient {
    pub fn new(http: PlatformClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl QueueService for MqClient {
    async fn queue_info(&self, queue_name: &str, env: &Settings) -> ServiceResult<QueueInfo> {
        let url = project_url(env, &["queues", queue_name])?;
        debug!(%url, "fetching queue info");
        let response = self
            .http
            .request(reqwest::Method::GET, env, url)
            .send()
            .await
            .map_err(transport)?;
        let envelope: QueueEnvelope = parse_json(response).await?;
        Ok(QueueInfo {
            size: envelope.queue.size,
        })
    }
}
