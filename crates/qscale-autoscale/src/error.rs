//! Autoscaler error types.

use thiserror::Error;

use qscale_core::ServiceError;

/// Errors resolving a worker name to its code id.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("environment for worker {0:?} has no project id or token")]
    InvalidCredentials(String),

    #[error("no code package named {0:?}")]
    NotFound(String),

    #[error("worker service error: {0}")]
    Service(#[from] ServiceError),
}

pub type ResolveResult<T> = Result<T, ResolveError>;

/// Errors from a single watch cycle. None of them stop the watcher.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("could not get queue info: {0}")]
    Queue(#[source] ServiceError),

    #[error("could not get worker stats: {0}")]
    Stats(#[from] ResolveError),

    #[error("could not launch {count} tasks: {source}")]
    Launch {
        count: i64,
        #[source]
        source: ServiceError,
    },
}

pub type WatchResult<T> = Result<T, WatchError>;
