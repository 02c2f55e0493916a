//! qscale-autoscale — queue-driven task launching.
//!
//! # Architecture
//!
//! ```text
//! Supervisor
//!   ├── AlertWatcher task per alert (independent, never pooled)
//!   │   ├── QueueService::queue_info
//!   │   ├── PreviousSizeStore (progressive triggers only)
//!   │   ├── CodeResolver → WorkerService::code_stats
//!   │   ├── qscale_trigger::{evaluate, apply_bounds}
//!   │   └── WorkerService::launch_tasks
//!   └── watch::channel stop signal, JoinSet for shutdown
//! ```
//!
//! Watchers share only the previous-size store and the code-id cache.
//! A slow dependency stalls the watcher that called it and nothing else.

pub mod error;
pub mod resolver;
pub mod supervisor;
pub mod watcher;

pub use error::{ResolveError, ResolveResult, WatchError, WatchResult};
pub use resolver::CodeResolver;
pub use supervisor::{SkipReason, SkippedAlert, Supervisor, SupervisorReport, WatchPlan};
pub use watcher::{AlertWatcher, CycleReport, WatchContext};
