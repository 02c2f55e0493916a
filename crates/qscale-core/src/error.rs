//! Error types for configuration loading and validation.

use thiserror::Error;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Fatal configuration errors. Any of these stops the daemon at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no config provided")]
    Missing,

    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("config has no {0}")]
    Empty(&'static str),

    #[error("environment {0:?} is not defined")]
    UndefinedEnvironment(String),

    #[error("polling interval must be at least one second")]
    ZeroInterval,
}

/// A problem with a single alert. The alert is skipped; others still run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlertIssue {
    #[error("queue environment {0:?} is not defined")]
    UndefinedQueueEnv(String),

    #[error("worker environment {0:?} is not defined")]
    UndefinedWorkerEnv(String),

    #[error("{kind} trigger needs a positive value, got {value}")]
    NonPositiveValue { kind: String, value: i64 },

    #[error("fixed trigger threshold must not be negative, got {0}")]
    NegativeThreshold(i64),

    #[error("bound {name} must not be negative, got {value}")]
    NegativeBound { name: &'static str, value: i64 },

    #[error("max ({max}) is below min ({min})")]
    MaxBelowMin { min: i64, max: i64 },

    #[error("polling interval must be at least one second")]
    ZeroInterval,
}
