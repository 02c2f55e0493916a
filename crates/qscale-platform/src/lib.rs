//! qscale-platform — REST clients for the platform services.
//!
//! ```text
//! PlatformClient (shared reqwest::Client, timeout, user agent)
//!   ├── MqClient      → QueueService    GET  /3/projects/{pid}/queues/{name}
//!   ├── WorkerClient  → WorkerService   GET  /2/projects/{pid}/codes
//!   │                                   GET  /2/projects/{pid}/codes/{id}/stats
//!   │                                   POST /2/projects/{pid}/tasks
//!   └── CacheClient   → CacheService    GET/PUT /1/projects/{pid}/caches/{cache}/items/{key}
//! ```
//!
//! Requests authenticate with `Authorization: OAuth {token}`. Non-2xx
//! responses surface as `ServiceError::Api`; a 404 from the cache is a
//! plain `CacheError::NotFound`.

pub mod cache;
pub mod http;
pub mod mq;
pub mod worker;

pub use cache::CacheClient;
pub use http::{DEFAULT_TIMEOUT, PlatformClient};
pub use mq::MqClient;
pub use worker::WorkerClient;
