//! `run` and `check` subcommands.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};

use qscale_autoscale::{Supervisor, WatchContext, WatchPlan};
use qscale_core::{CacheService, Product, QscaleConfig};
use qscale_platform::{CacheClient, DEFAULT_TIMEOUT, MqClient, PlatformClient, WorkerClient};
use qscale_state::{CacheWriterHandle, MemoryCache, PreviousSizeStore};

/// Load and validate the config; any failure here is fatal.
fn load_config(path: &Path) -> anyhow::Result<QscaleConfig> {
    let config = QscaleConfig::from_file(path)
        .with_context(|| format!("loading config from {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

fn apply_overrides(config: &mut QscaleConfig, interval: Option<u64>, runtime: Option<u64>) {
    if interval.is_some() {
        config.interval = interval;
    }
    if runtime.is_some() {
        config.runtime = runtime;
    }
}

fn context(
    http: PlatformClient,
    cache: Arc<dyn CacheService>,
) -> (WatchContext, CacheWriterHandle) {
    let (store, writer) = PreviousSizeStore::spawn(cache);
    let ctx = WatchContext::new(
        Arc::new(MqClient::new(http.clone())),
        Arc::new(WorkerClient::new(http)),
        store,
    );
    (ctx, writer)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        // Without a handler only the runtime limit ends the process.
        error!(error = %e, "failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

pub async fn run(path: &Path, interval: Option<u64>, runtime: Option<u64>) -> anyhow::Result<()> {
    let mut config = load_config(path)?;
    apply_overrides(&mut config, interval, runtime);
    config
        .validate()
        .context("invalid command-line override")?;
    let runtime = config.runtime();

    let http = PlatformClient::new(DEFAULT_TIMEOUT).context("building HTTP client")?;
    let (cache_env, _) = config.settings(Product::Cache, &config.cache_env);
    let cache = CacheClient::new(http.clone(), cache_env, config.cache_name());
    info!(
        env = %config.cache_env,
        cache = config.cache_name(),
        alerts = config.alerts.len(),
        "qscaled starting"
    );

    let (ctx, writer) = context(http, Arc::new(cache));
    let report = Supervisor::new(config, ctx)
        .run(runtime, shutdown_signal())
        .await;

    // Flush queued previous-size writes before exiting.
    writer.join().await;

    info!(
        started = report.started,
        skipped = report.skipped,
        failed = report.failed,
        "qscaled stopped"
    );
    Ok(())
}

pub async fn check(path: &Path) -> anyhow::Result<()> {
    let config = load_config(path)?;
    let http = PlatformClient::new(DEFAULT_TIMEOUT).context("building HTTP client")?;
    let (ctx, _writer) = context(http, Arc::new(MemoryCache::new()));

    let plan = Supervisor::new(config, ctx).plan();
    print!("{}", render_plan(&plan));
    Ok(())
}

fn render_plan(plan: &WatchPlan) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "watching {} alert(s)", plan.watchers.len());
    for w in &plan.watchers {
        let alert = w.alert();
        let triggers: Vec<String> = alert.triggers.iter().map(|t| t.to_string()).collect();
        let _ = write!(
            out,
            "  {} -> {} every {}s [{}]",
            alert.queue_name,
            alert.worker_name,
            w.interval().as_secs(),
            triggers.join(", ")
        );
        if let Some(min) = alert.min {
            let _ = write!(out, " min={min}");
        }
        if let Some(max) = alert.max {
            let _ = write!(out, " max={max}");
        }
        out.push('\n');
    }

    if !plan.skipped.is_empty() {
        let _ = writeln!(out, "skipping {} alert(s)", plan.skipped.len());
        for s in &plan.skipped {
            let _ = writeln!(out, "  {} -> {}: {}", s.queue_name, s.worker_name, s.reason);
        }
    }
    out
}
