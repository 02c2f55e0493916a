//! Worker service client: code packages, stats and task launches.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use qscale_core::{CodePackage, CodeStats, ServiceResult, Settings, TaskSpec, WorkerService};

use crate::http::{PlatformClient, ensure_success, parse_json, project_url, transport};

#[derive(Debug, Deserialize)]
struct CodeList {
    #[serde(default)]
    codes: Vec<CodeEntry>,
}

#[derive(Debug, Deserialize)]
struct CodeEntry {
    id: String,
    name: String,
    #[serde(default)]
    project_id: String,
}

#[derive(Debug, Serialize)]
struct TaskBatch<'a> {
    tasks: Vec<TaskBody<'a>>,
}

#[derive(Debug, Serialize)]
struct TaskBody<'a> {
    code_name: &'a str,
    payload: &'a str,
    priority: i32,
    #[serde(skip_serializing_if = "str::is_empty")]
    cluster: &'a str,
}

#[derive(Clone)]
pub struct WorkerClient {
    http: PlatformClient,
}

impl WorkerClient {
    pub fn new(http: PlatformClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl WorkerService for WorkerClient {
    async fn list_code_packages(
        &self,
        env: &Settings,
        offset: usize,
        limit: usize,
    ) -> ServiceResult<Vec<CodePackage>> {
        let mut url = project_url(env, &["codes"])?;
        let page = if limit == 0 { 0 } else { offset / limit };
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("per_page", &limit.to_string());
        debug!(%url, "listing code packages");

        let response = self
            .http
            .request(reqwest::Method::GET, env, url)
            .send()
            .await
            .map_err(transport)?;
        let list: CodeList = parse_json(response).await?;

        Ok(list
            .codes
            .into_iter()
            .map(|c| CodePackage {
                id: c.id,
                name: c.name,
                // Older API versions omit the project on list entries.
                project_id: if c.project_id.is_empty() {
                    env.project_id.clone()
                } else {
                    c.project_id
                },
            })
            .collect())
    }

    async fn code_stats(&self, env: &Settings, code_id: &str) -> ServiceResult<CodeStats> {
        let url = project_url(env, &["codes", code_id, "stats"])?;
        let response = self
            .http
            .request(reqwest::Method::GET, env, url)
            .send()
            .await
            .map_err(transport)?;
        parse_json(response).await
    }

    async fn launch_tasks(&self, env: &Settings, tasks: Vec<TaskSpec>) -> ServiceResult<()> {
        let url = project_url(env, &["tasks"])?;
        let batch = TaskBatch {
            tasks: tasks
                .iter()
                .map(|t| TaskBody {
                    code_name: &t.code_name,
                    payload: &t.payload,
                    priority: t.priority,
                    cluster: &t.cluster,
                })
                .collect(),
        };
        let response = self
            .http
            .request(reqwest::Method::POST, env, url)
            .json(&batch)
            .send()
            .await
            .map_err(transport)?;
        ensure_success(response).await?;
        Ok(())
    }
}
