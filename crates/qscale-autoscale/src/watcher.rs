//! AlertWatcher — the polling loop for one (queue, worker pool) pair.
//!
//! Each cycle runs strictly in order and is never interrupted:
//!
//! ```text
//! Polling     queue size → previous size (progressive only) → worker stats
//! Evaluating  triggers → min/max bounds
//! Launching   only when launch > 0
//! Recording   previous size := queue size (even if the launch failed)
//! Sleeping    interval elapses → Polling, stop signal → Stopped
//! ```
//!
//! A failed fetch skips straight to Sleeping; the next tick is the retry.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use qscale_core::{Alert, CodeStats, QueueService, Settings, TaskSpec, WorkerService};
use qscale_state::PreviousSizeStore;
use qscale_trigger::{Decision, Observation, apply_bounds, evaluate};

use crate::error::{WatchError, WatchResult};
use crate::resolver::CodeResolver;

/// Collaborators shared by every watcher in the process.
#[derive(Clone)]
pub struct WatchContext {
    pub queues: Arc<dyn QueueService>,
    pub workers: Arc<dyn WorkerService>,
    pub resolver: Arc<CodeResolver>,
    pub store: PreviousSizeStore,
}

impl WatchContext {
    pub fn new(
        queues: Arc<dyn QueueService>,
        workers: Arc<dyn WorkerService>,
        store: PreviousSizeStore,
    ) -> Self {
        let resolver = Arc::new(CodeResolver::new(workers.clone()));
        Self {
            queues,
            workers,
            resolver,
            store,
        }
    }
}

/// Everything observed and decided in one successful cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub queue_size: i64,
    /// `None` when the alert has no progressive trigger or no history exists.
    pub previous_size: Option<i64>,
    pub stats: CodeStats,
    pub decision: Decision,
}

pub struct AlertWatcher {
    alert: Alert,
    queue_env: Settings,
    worker_env: Settings,
    interval: Duration,
    ctx: WatchContext,
}

impl AlertWatcher {
    pub fn new(
        alert: Alert,
        queue_env: Settings,
        worker_env: Settings,
        interval: Duration,
        ctx: WatchContext,
    ) -> Self {
        Self {
            alert,
            queue_env,
            worker_env,
            interval,
            ctx,
        }
    }

    pub fn alert(&self) -> &Alert {
        &self.alert
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one poll → evaluate → launch → record cycle.
    pub async fn poll_once(&self) -> WatchResult<CycleReport> {
        let alert = &self.alert;
        let key = alert.queue_key();

        let info = self
            .ctx
            .queues
            .queue_info(&alert.queue_name, &self.queue_env)
            .await
            .map_err(WatchError::Queue)?;

        let previous_size = if alert.needs_previous_size() {
            self.ctx.store.get_queue_size(&key).await
        } else {
            None
        };

        let stats = self
            .ctx
            .resolver
            .code_stats(&self.worker_env, &alert.worker_name)
            .await?;

        let obs = Observation {
            queued: stats.queued,
            running: stats.running,
            current_size: info.size,
            previous_size: previous_size.unwrap_or(0),
        };
        let decision = apply_bounds(evaluate(&obs, &alert.triggers), &obs, alert.min, alert.max);

        info!(
            queue = %alert.queue_name,
            size = info.size,
            prev = ?previous_size,
            worker = %alert.worker_name,
            queued = stats.queued,
            running = stats.running,
            launch = decision.launch,
            trigger = %decision.cause.map(|c| c.to_string()).unwrap_or_default(),
            "alert evaluated"
        );

        let launched = if decision.launch > 0 {
            self.launch(&decision).await
        } else {
            Ok(())
        };

        // The reading is real whether or not the launch went through.
        self.ctx.store.set_queue_size(&key, info.size).await;

        launched?;
        Ok(CycleReport {
            queue_size: info.size,
            previous_size,
            stats,
            decision,
        })
    }

    async fn launch(&self, decision: &Decision) -> WatchResult<()> {
        let payload = decision.cause.map(|c| c.payload()).unwrap_or_default();
        let task = TaskSpec {
            code_name: self.alert.worker_name.clone(),
            cluster: self.alert.cluster.clone(),
            priority: self.alert.priority,
            payload,
        };
        let tasks = vec![task; decision.launch as usize];

        self.ctx
            .workers
            .launch_tasks(&self.worker_env, tasks)
            .await
            .map_err(|source| WatchError::Launch {
                count: decision.launch,
                source,
            })?;

        debug!(worker = %self.alert.worker_name, count = decision.launch, "tasks launched");
        Ok(())
    }

    /// Poll until `shutdown` flips to `true` (or its sender is dropped).
    ///
    /// The first cycle starts immediately. The stop signal is only
    /// observed between cycles.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            queue = %self.alert.queue_name,
            worker = %self.alert.worker_name,
            interval_secs = self.interval.as_secs(),
            triggers = self.alert.triggers.len(),
            "watcher started"
        );

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }

            if let Err(e) = self.poll_once().await {
                warn!(
                    queue = %self.alert.queue_name,
                    worker = %self.alert.worker_name,
                    error = %e,
                    "watch cycle failed"
                );
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                res = shutdown.changed() => {
                    if res.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(queue = %self.alert.queue_name, "watcher stopped");
    }
}
