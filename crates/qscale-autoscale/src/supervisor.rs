//! Supervisor — one watcher task per alert, one stop signal for all.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use qscale_core::{AlertIssue, Product, QscaleConfig};

use crate::watcher::{AlertWatcher, WatchContext};

/// Why an alert gets no watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Inert alert; not an error.
    NoTriggers,
    Invalid(Vec<AlertIssue>),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NoTriggers => f.write_str("no triggers"),
            SkipReason::Invalid(issues) => {
                let joined: Vec<String> = issues.iter().map(|i| i.to_string()).collect();
                f.write_str(&joined.join("; "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedAlert {
    pub queue_name: String,
    pub worker_name: String,
    pub reason: SkipReason,
}

/// Watchers to start and alerts left out.
pub struct WatchPlan {
    pub watchers: Vec<AlertWatcher>,
    pub skipped: Vec<SkippedAlert>,
}

/// Outcome of a completed [`Supervisor::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SupervisorReport {
    pub started: usize,
    pub skipped: usize,
    /// Watchers that ended with a panic instead of observing the stop signal.
    pub failed: usize,
}

pub struct Supervisor {
    config: QscaleConfig,
    ctx: WatchContext,
}

impl Supervisor {
    pub fn new(config: QscaleConfig, ctx: WatchContext) -> Self {
        Self { config, ctx }
    }

    /// Build one watcher per runnable alert, without starting anything.
    pub fn plan(&self) -> WatchPlan {
        let mut watchers = Vec::new();
        let mut skipped = Vec::new();

        for alert in &self.config.alerts {
            let reason = if !alert.has_triggers() {
                Some(SkipReason::NoTriggers)
            } else {
                let issues = self.config.alert_issues(alert);
                (!issues.is_empty()).then_some(SkipReason::Invalid(issues))
            };

            if let Some(reason) = reason {
                skipped.push(SkippedAlert {
                    queue_name: alert.queue_name.clone(),
                    worker_name: alert.worker_name.clone(),
                    reason,
                });
                continue;
            }

            let (queue_env, _) = self.config.settings(Product::Mq, &alert.queue_env);
            let (worker_env, _) = self.config.settings(Product::Worker, &alert.worker_env);
            watchers.push(AlertWatcher::new(
                alert.clone(),
                queue_env,
                worker_env,
                self.config.alert_interval(alert),
                self.ctx.clone(),
            ));
        }

        WatchPlan { watchers, skipped }
    }

    /// Start all watchers and run until `runtime` elapses or `stop`
    /// resolves, then signal every watcher and wait for all of them.
    ///
    /// Cycles in flight when the signal arrives run to completion.
    pub async fn run<F>(self, runtime: Duration, stop: F) -> SupervisorReport
    where
        F: Future<Output = ()> + Send,
    {
        let WatchPlan { watchers, skipped } = self.plan();
        drop(self);

        for s in &skipped {
            match &s.reason {
                SkipReason::NoTriggers => {
                    info!(queue = %s.queue_name, worker = %s.worker_name, "no triggers found for alert, skipping");
                }
                reason => {
                    warn!(queue = %s.queue_name, worker = %s.worker_name, %reason, "invalid alert, skipping");
                }
            }
        }

        let mut report = SupervisorReport {
            started: watchers.len(),
            skipped: skipped.len(),
            failed: 0,
        };
        if watchers.is_empty() {
            warn!("no alerts to watch");
            return report;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut tasks = JoinSet::new();
        for watcher in watchers {
            tasks.spawn(watcher.run(shutdown_rx.clone()));
        }
        drop(shutdown_rx);

        info!(
            watchers = report.started,
            skipped = report.skipped,
            runtime_secs = runtime.as_secs(),
            "supervisor started"
        );

        tokio::select! {
            _ = tokio::time::sleep(runtime) => info!("runtime expired"),
            _ = stop => info!("stop requested"),
        }

        let _ = shutdown_tx.send(true);

        while let Some(res) = tasks.join_next().await {
            if let Err(e) = res {
                error!(error = %e, "watcher task failed");
                report.failed += 1;
            }
        }

        info!("all watchers stopped");
        report
    }
}
