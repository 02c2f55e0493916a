//! Interfaces to the platform services the control loop depends on.
//!
//! Implementations live in `qscale-platform`; tests provide in-memory
//! fakes. All methods are async and the traits are object safe, so the
//! autoscaler holds them as `Arc<dyn …>`.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::env::Settings;
use crate::types::{CodePackage, CodeStats, QueueInfo, TaskSpec};

/// Result type alias for queue and worker service calls.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors from the queue and worker services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Network, DNS, TLS or timeout failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with a non-2xx status.
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The response body did not have the expected shape.
    #[error("decode error: {0}")]
    Decode(String),
}

/// Errors from the cache service.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The key is absent or expired. A normal miss, not a failure.
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("cache transport error: {0}")]
    Transport(String),

    #[error("cache API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("cache decode error: {0}")]
    Decode(String),
}

impl CacheError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound(_))
    }
}

#[async_trait]
pub trait QueueService: Send + Sync {
    async fn queue_info(&self, queue_name: &str, env: &Settings) -> ServiceResult<QueueInfo>;
}

#[async_trait]
pub trait WorkerService: Send + Sync {
    async fn list_code_packages(
        &self,
        env: &Settings,
        offset: usize,
        limit: usize,
    ) -> ServiceResult<Vec<CodePackage>>;

    async fn code_stats(&self, env: &Settings, code_id: &str) -> ServiceResult<CodeStats>;

    async fn launch_tasks(&self, env: &Settings, tasks: Vec<TaskSpec>) -> ServiceResult<()>;
}

#[async_trait]
pub trait CacheService: Send + Sync {
    async fn get(&self, key: &str) -> Result<i64, CacheError>;

    async fn set(&self, key: &str, value: i64, ttl: Duration) -> Result<(), CacheError>;
}
