//! Cache service client for queue-size history.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use qscale_core::{CacheError, CacheService, ServiceError, Settings};

use crate::http::{PlatformClient, ensure_success, project_url, transport};

#[derive(Debug, Deserialize)]
struct Item {
    value: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct PutItem {
    value: i64,
    expires_in: u64,
}

/// Client for one named cache in one project.
#[derive(Clone)]
pub struct CacheClient {
    http: PlatformClient,
    settings: Settings,
    cache_name: String,
}

impl CacheClient {
    pub fn new(http: PlatformClient, settings: Settings, cache_name: impl Into<String>) -> Self {
        Self {
            http,
            settings,
            cache_name: cache_name.into(),
        }
    }

    fn item_url(&self, key: &str) -> Result<reqwest::Url, CacheError> {
        project_url(&self.settings, &["caches", self.cache_name.as_str(), "items", key]).map_err(from_service)
    }
}

fn from_service(e: ServiceError) -> CacheError {
    match e {
        ServiceError::Transport(msg) => CacheError::Transport(msg),
        ServiceError::Api { status, body } => CacheError::Api { status, body },
        ServiceError::Decode(msg) => CacheError::Decode(msg),
    }
}

/// Cached values may come back as numbers or numeric strings.
fn parse_value(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[async_trait]
impl CacheService for CacheClient {
    async fn get(&self, key: &str) -> Result<i64, CacheError> {
        let url = self.item_url(key)?;
        let response = self
            .http
            .request(reqwest::Method::GET, &self.settings, url)
            .send()
            .await
            .map_err(|e| from_service(transport(e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!(%key, cache = %self.cache_name, "cache key not found");
            return Err(CacheError::NotFound(key.to_string()));
        }

        let response = ensure_success(response).await.map_err(from_service)?;
        let item: Item = response
            .json()
            .await
            .map_err(|e| CacheError::Decode(e.to_string()))?;
        parse_value(&item.value)
            .ok_or_else(|| CacheError::Decode(format!("non-numeric cache value {}", item.value)))
    }

    async fn set(&self, key: &str, value: i64, ttl: Duration) -> Result<(), CacheError> {
        let url = self.item_url(key)?;
        let body = PutItem {
            value,
            expires_in: ttl.as_secs(),
        };
        let response = self
            .http
            .request(reqwest::Method::PUT, &self.settings, url)
            .json(&body)
            .send()
            .await
            .map_err(|e| from_service(transport(e)))?;
        ensure_success(response).await.map_err(from_service)?;
        Ok(())
    }
}
