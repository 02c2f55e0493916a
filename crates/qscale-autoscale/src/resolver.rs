//! Worker-name → code-id resolution with a process-lifetime cache.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use qscale_core::{CodeStats, Settings, WorkerService};

use crate::error::{ResolveError, ResolveResult};

/// Code packages requested per list call.
pub const PAGE_SIZE: usize = 100;

/// Listing stops after this many pages even if the last one was full.
pub const MAX_PAGES: usize = 50;

fn code_key(project_id: &str, worker_name: &str) -> String {
    format!("{project_id}|{worker_name}")
}

/// Caches `{project_id}|{worker_name}` → code id.
///
/// Entries are never invalidated; a renamed or deleted package keeps its
/// stale id until the process exits.
pub struct CodeResolver {
    workers: Arc<dyn WorkerService>,
    ids: Mutex<HashMap<String, String>>,
}

impl CodeResolver {
    pub fn new(workers: Arc<dyn WorkerService>) -> Self {
        Self {
            workers,
            ids: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve `worker_name` in `env`'s project.
    ///
    /// On a miss, lists every code package in the project and caches all
    /// of them, so sibling workers resolve without another list call.
    pub async fn resolve_code_id(&self, env: &Settings, worker_name: &str) -> ResolveResult<String> {
        if !env.has_credentials() {
            return Err(ResolveError::InvalidCredentials(worker_name.to_string()));
        }

        let key = code_key(&env.project_id, worker_name);
        if let Some(id) = self.ids.lock().await.get(&key) {
            return Ok(id.clone());
        }

        let listed = self.list_all(env).await?;
        debug!(project = %env.project_id, count = listed.len(), "code packages listed");

        let mut ids = self.ids.lock().await;
        for (name, id) in listed {
            ids.insert(code_key(&env.project_id, &name), id);
        }
        ids.get(&key)
            .cloned()
            .ok_or_else(|| ResolveError::NotFound(worker_name.to_string()))
    }

    /// Queued and running counts for `worker_name`.
    pub async fn code_stats(&self, env: &Settings, worker_name: &str) -> ResolveResult<CodeStats> {
        let code_id = self.resolve_code_id(env, worker_name).await?;
        Ok(self.workers.code_stats(env, &code_id).await?)
    }

    /// Number of cached mappings.
    pub async fn cached(&self) -> usize {
        self.ids.lock().await.len()
    }

    async fn list_all(&self, env: &Settings) -> ResolveResult<Vec<(String, String)>> {
        let mut out = Vec::new();
        for page in 0..MAX_PAGES {
            let codes = self
                .workers
                .list_code_packages(env, page * PAGE_SIZE, PAGE_SIZE)
                .await?;
            let full = codes.len() == PAGE_SIZE;
            out.extend(codes.into_iter().map(|c| (c.name, c.id)));
            if !full {
                break;
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qscale_core::{CodePackage, ServiceError, ServiceResult, TaskSpec};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Packages {
        codes: Vec<CodePackage>,
        list_calls: AtomicUsize,
    }

    impl Packages {
        fn new(names: &[&str]) -> Self {
            let codes = names
                .iter()
                .enumerate()
                .map(|(i, name)| CodePackage {
                    id: format!("id-{i}"),
                    name: name.to_string(),
                    project_id: "p1".to_string(),
                })
                .collect();
            Self {
                codes,
                list_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl WorkerService for Packages {
        async fn list_code_packages(
            &self,
            _env: &Settings,
            offset: usize,
            limit: usize,
        ) -> ServiceResult<Vec<CodePackage>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.codes.iter().skip(offset).take(limit).cloned().collect())
        }

        async fn code_stats(&self, _env: &Settings, code_id: &str) -> ServiceResult<CodeStats> {
            if code_id == "id-0" {
                Ok(CodeStats { queued: 1, running: 2 })
            } else {
                Err(ServiceError::Api {
                    status: 404,
                    body: "no stats".to_string(),
                })
            }
        }

        async fn launch_tasks(&self, _env: &Settings, _tasks: Vec<TaskSpec>) -> ServiceResult<()> {
            Ok(())
        }
    }

    fn env() -> Settings {
        Settings {
            project_id: "p1".to_string(),
            token: "t1".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn miss_populates_every_package() {
        let workers = Arc::new(Packages::new(&["runner", "mailer", "indexer"]));
        let resolver = CodeResolver::new(workers.clone());

        assert_eq!(resolver.resolve_code_id(&env(), "mailer").await.unwrap(), "id-1");
        assert_eq!(resolver.cached().await, 3);

        // Siblings resolve from the cache.
        assert_eq!(resolver.resolve_code_id(&env(), "indexer").await.unwrap(), "id-2");
        assert_eq!(resolver.resolve_code_id(&env(), "runner").await.unwrap(), "id-0");
        assert_eq!(workers.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_worker_is_not_found() {
        let workers = Arc::new(Packages::new(&["runner"]));
        let resolver = CodeResolver::new(workers.clone());

        let err = resolver.resolve_code_id(&env(), "ghost").await.unwrap_err();
        assert!(matches!(err, ResolveError::NotFound(name) if name == "ghost"));

        // Each failed lookup lists again.
        let _ = resolver.resolve_code_id(&env(), "ghost").await;
        assert_eq!(workers.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn missing_credentials_fail_before_listing() {
        let workers = Arc::new(Packages::new(&["runner"]));
        let resolver = CodeResolver::new(workers.clone());

        let mut no_token = env();
        no_token.token.clear();
        let err = resolver.resolve_code_id(&no_token, "runner").await.unwrap_err();
        assert!(matches!(err, ResolveError::InvalidCredentials(_)));
        assert_eq!(workers.list_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn pages_past_the_first_hundred() {
        let names: Vec<String> = (0..230).map(|i| format!("w{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let workers = Arc::new(Packages::new(&refs));
        let resolver = CodeResolver::new(workers.clone());

        assert_eq!(resolver.resolve_code_id(&env(), "w229").await.unwrap(), "id-229");
        assert_eq!(workers.list_calls.load(Ordering::SeqCst), 3);
        assert_eq!(resolver.cached().await, 230);
    }

    #[tokio::test]
    async fn stats_go_through_resolution() {
        let workers = Arc::new(Packages::new(&["runner", "mailer"]));
        let resolver = CodeResolver::new(workers);

        let stats = resolver.code_stats(&env(), "runner").await.unwrap();
        assert_eq!(stats.in_flight(), 3);

        let err = resolver.code_stats(&env(), "mailer").await.unwrap_err();
        assert!(matches!(err, ResolveError::Service(ServiceError::Api { status: 404, .. })));
    }
}
