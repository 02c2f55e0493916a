//! In-memory fakes of the platform services.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use qscale_autoscale::WatchContext;
use qscale_core::{
    Alert, CacheError, CacheService, CodePackage, CodeStats, QueueInfo, QueueService,
    ServiceError, ServiceResult, Settings, TaskSpec, Trigger, WorkerService,
};
use qscale_state::{CacheWriterHandle, MemoryCache, PreviousSizeStore};

pub fn env() -> Settings {
    Settings {
        project_id: "p1".to_string(),
        token: "t1".to_string(),
        scheme: "https".to_string(),
        host: "example.invalid".to_string(),
        port: None,
        api_version: "2".to_string(),
    }
}

pub fn alert(queue: &str, worker: &str, triggers: Vec<Trigger>) -> Alert {
    Alert {
        queue_name: queue.to_string(),
        queue_env: "prod".to_string(),
        worker_name: worker.to_string(),
        worker_env: "prod".to_string(),
        cluster: "mem-4g".to_string(),
        priority: 1,
        interval: Some(10),
        triggers,
        min: None,
        max: None,
    }
}

// ── Queue service ──────────────────────────────────────────────

#[derive(Default)]
pub struct FakeQueues {
    sizes: Mutex<HashMap<String, i64>>,
    failing: Mutex<HashSet<String>>,
    hanging: Mutex<HashSet<String>>,
    calls: Mutex<HashMap<String, usize>>,
    delay: Mutex<Option<Duration>>,
}

impl FakeQueues {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_size(&self, queue: &str, size: i64) {
        self.sizes.lock().unwrap().insert(queue.to_string(), size);
    }

    pub fn fail(&self, queue: &str) {
        self.failing.lock().unwrap().insert(queue.to_string());
    }

    /// Calls for `queue` never return.
    pub fn hang(&self, queue: &str) {
        self.hanging.lock().unwrap().insert(queue.to_string());
    }

    /// Every call sleeps this long before answering.
    pub fn delay(&self, d: Duration) {
        *self.delay.lock().unwrap() = Some(d);
    }

    pub fn calls(&self, queue: &str) -> usize {
        self.calls.lock().unwrap().get(queue).copied().unwrap_or(0)
    }
}

#[async_trait]
impl QueueService for FakeQueues {
    async fn queue_info(&self, queue_name: &str, _env: &Settings) -> ServiceResult<QueueInfo> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(queue_name.to_string())
            .or_insert(0) += 1;

        let hang = self.hanging.lock().unwrap().contains(queue_name);
        if hang {
            return std::future::pending().await;
        }
        let delay = *self.delay.lock().unwrap();
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        let fail = self.failing.lock().unwrap().contains(queue_name);
        if fail {
            return Err(ServiceError::Transport("connection reset".to_string()));
        }
        let size = self.sizes.lock().unwrap().get(queue_name).copied().unwrap_or(0);
        Ok(QueueInfo { size })
    }
}

// ── Worker service ─────────────────────────────────────────────

#[derive(Default)]
pub struct FakeWorkers {
    codes: Mutex<Vec<CodePackage>>,
    stats: Mutex<HashMap<String, CodeStats>>,
    launched: Mutex<Vec<TaskSpec>>,
    fail_launch: AtomicBool,
    pub list_calls: AtomicUsize,
}

impl FakeWorkers {
    pub fn new(names: &[&str]) -> Arc<Self> {
        let fake = Self::default();
        {
            let mut codes = fake.codes.lock().unwrap();
            for name in names {
                codes.push(CodePackage {
                    id: format!("code-{name}"),
                    name: name.to_string(),
                    project_id: "p1".to_string(),
                });
            }
        }
        Arc::new(fake)
    }

    pub fn set_stats(&self, worker: &str, queued: i64, running: i64) {
        self.stats
            .lock()
            .unwrap()
            .insert(format!("code-{worker}"), CodeStats { queued, running });
    }

    pub fn fail_launches(&self) {
        self.fail_launch.store(true, Ordering::SeqCst);
    }

    pub fn launched(&self) -> Vec<TaskSpec> {
        self.launched.lock().unwrap().clone()
    }

    pub fn launched_for(&self, worker: &str) -> usize {
        self.launched
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.code_name == worker)
            .count()
    }
}

#[async_trait]
impl WorkerService for FakeWorkers {
    async fn list_code_packages(
        &self,
        _env: &Settings,
        offset: usize,
        limit: usize,
    ) -> ServiceResult<Vec<CodePackage>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let codes = self.codes.lock().unwrap();
        Ok(codes.iter().skip(offset).take(limit).cloned().collect())
    }

    async fn code_stats(&self, _env: &Settings, code_id: &str) -> ServiceResult<CodeStats> {
        Ok(self
            .stats
            .lock()
            .unwrap()
            .get(code_id)
            .copied()
            .unwrap_or_default())
    }

    async fn launch_tasks(&self, _env: &Settings, tasks: Vec<TaskSpec>) -> ServiceResult<()> {
        if self.fail_launch.load(Ordering::SeqCst) {
            return Err(ServiceError::Api {
                status: 500,
                body: "launch rejected".to_string(),
            });
        }
        self.launched.lock().unwrap().extend(tasks);
        Ok(())
    }
}

// ── Caches ─────────────────────────────────────────────────────

/// Memory cache that counts lookups.
#[derive(Default)]
pub struct CountingCache {
    inner: MemoryCache,
    pub gets: AtomicUsize,
}

#[async_trait]
impl CacheService for CountingCache {
    async fn get(&self, key: &str) -> Result<i64, CacheError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: i64, ttl: Duration) -> Result<(), CacheError> {
        self.inner.set(key, value, ttl).await
    }
}

/// Cache that is unreachable.
pub struct DownCache;

#[async_trait]
impl CacheService for DownCache {
    async fn get(&self, _key: &str) -> Result<i64, CacheError> {
        Err(CacheError::Api {
            status: 503,
            body: "service unavailable".to_string(),
        })
    }

    async fn set(&self, _key: &str, _value: i64, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Transport("connection refused".to_string()))
    }
}

pub fn context(
    queues: Arc<FakeQueues>,
    workers: Arc<FakeWorkers>,
    cache: Arc<dyn CacheService>,
) -> (WatchContext, CacheWriterHandle) {
    let (store, writer) = PreviousSizeStore::spawn(cache);
    (WatchContext::new(queues, workers, store), writer)
}
