//! qscale configuration: named environments plus the alert list.
//!
//! JSON (camelCase keys) is the primary format; files ending in `.toml`
//! are parsed as TOML with the same key names.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::env::{Product, Settings};
use crate::error::{AlertIssue, ConfigError, ConfigResult};
use crate::types::{Alert, TriggerKind};

pub const DEFAULT_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_RUNTIME_SECS: u64 = 30 * 60;
pub const DEFAULT_CACHE_NAME: &str = "autoscale-prevs";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QscaleConfig {
    #[serde(default)]
    pub envs: HashMap<String, Settings>,
    #[serde(default)]
    pub alerts: Vec<Alert>,
    #[serde(default)]
    pub cache_env: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_name: Option<String>,
    /// Default polling interval in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
    /// Total process runtime in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<u64>,
}

impl QscaleConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        if content.trim().is_empty() {
            return Err(ConfigError::Missing);
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            _ => Self::from_json_str(&content),
        }
    }

    pub fn from_json_str(s: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_toml_str(s: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval.unwrap_or(DEFAULT_INTERVAL_SECS))
    }

    pub fn runtime(&self) -> Duration {
        Duration::from_secs(self.runtime.unwrap_or(DEFAULT_RUNTIME_SECS))
    }

    pub fn cache_name(&self) -> &str {
        self.cache_name.as_deref().unwrap_or(DEFAULT_CACHE_NAME)
    }

    /// Polling interval for one alert.
    pub fn alert_interval(&self, alert: &Alert) -> Duration {
        alert
            .interval
            .map(Duration::from_secs)
            .unwrap_or_else(|| self.interval())
    }

    /// Resolve the settings for `product` in environment `name`.
    ///
    /// Layers: product preset, then `iron_{product}`, then `name`. The
    /// flag reports whether `name` itself is defined.
    pub fn settings(&self, product: Product, name: &str) -> (Settings, bool) {
        let mut settings = product.preset();
        if let Some(product_env) = self.envs.get(&product.override_env()) {
            settings.overlay(product_env);
        }
        match self.envs.get(name) {
            Some(env) => {
                settings.overlay(env);
                (settings, true)
            }
            None => (settings, false),
        }
    }

    /// Checks whose failure stops the process.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.alerts.is_empty() {
            return Err(ConfigError::Empty("alerts"));
        }
        if self.envs.is_empty() {
            return Err(ConfigError::Empty("environments"));
        }
        if !self.envs.contains_key(&self.cache_env) {
            return Err(ConfigError::UndefinedEnvironment(self.cache_env.clone()));
        }
        if self.interval == Some(0) {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(())
    }

    /// Problems that cause a single alert to be skipped.
    pub fn alert_issues(&self, alert: &Alert) -> Vec<AlertIssue> {
        let mut issues = Vec::new();

        if !self.envs.contains_key(&alert.queue_env) {
            issues.push(AlertIssue::UndefinedQueueEnv(alert.queue_env.clone()));
        }
        if !self.envs.contains_key(&alert.worker_env) {
            issues.push(AlertIssue::UndefinedWorkerEnv(alert.worker_env.clone()));
        }

        if alert.interval == Some(0) {
            issues.push(AlertIssue::ZeroInterval);
        }

        for t in &alert.triggers {
            match t.kind {
                TriggerKind::Fixed if t.value < 0 => {
                    issues.push(AlertIssue::NegativeThreshold(t.value));
                }
                TriggerKind::Progressive | TriggerKind::Ratio if t.value <= 0 => {
                    issues.push(AlertIssue::NonPositiveValue {
                        kind: t.kind.to_string(),
                        value: t.value,
                    });
                }
                _ => {}
            }
        }

        for (name, bound) in [("min", alert.min), ("max", alert.max)] {
            if let Some(value) = bound
                && value < 0
            {
                issues.push(AlertIssue::NegativeBound { name, value });
            }
        }
        if let (Some(min), Some(max)) = (alert.min, alert.max)
            && max < min
        {
            issues.push(AlertIssue::MaxBelowMin { min, max });
        }

        issues
    }
}
