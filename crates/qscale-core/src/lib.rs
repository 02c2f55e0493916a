//! qscale-core — shared types for the qscale queue autoscaler.
//!
//! - [`types`]: alerts, triggers, and the records exchanged with the
//!   platform services.
//! - [`env`]: named environments layered over per-product presets.
//! - [`config`]: loading and validating the daemon configuration.
//! - [`services`]: the async traits the control loop talks through.

pub mod config;
pub mod env;
pub mod error;
pub mod services;
pub mod types;

pub use config::QscaleConfig;
pub use env::{Product, Settings};
pub use error::{AlertIssue, ConfigError, ConfigResult};
pub use services::{
    CacheError, CacheService, QueueService, ServiceError, ServiceResult, WorkerService,
};
pub use types::*;
