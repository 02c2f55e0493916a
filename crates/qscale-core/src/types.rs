//! Domain types shared across qscale crates.

use serde::{Deserialize, Serialize};

/// Scaling rule kinds understood by the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    /// Kick-start a single task when the pool is idle and the queue has
    /// reached the threshold.
    Fixed,
    /// One task per additional full bucket of `value` items since the
    /// previous observation.
    Progressive,
    /// Keep one runner per `value` queued items.
    Ratio,
}

impl TriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::Fixed => "fixed",
            TriggerKind::Progressive => "progressive",
            TriggerKind::Ratio => "ratio",
        }
    }
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single scaling rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    #[serde(rename = "type")]
    pub kind: TriggerKind,
    pub value: i64,
}

impl Trigger {
    pub fn fixed(value: i64) -> Self {
        Self {
            kind: TriggerKind::Fixed,
            value,
        }
    }

    pub fn progressive(value: i64) -> Self {
        Self {
            kind: TriggerKind::Progressive,
            value,
        }
    }

    pub fn ratio(value: i64) -> Self {
        Self {
            kind: TriggerKind::Ratio,
            value,
        }
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.kind, self.value)
    }
}

/// One configured (queue, worker pool) scaling rule set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub queue_name: String,
    pub queue_env: String,
    pub worker_name: String,
    pub worker_env: String,
    #[serde(default)]
    pub cluster: String,
    #[serde(default)]
    pub priority: i32,
    /// Polling interval in seconds. Falls back to the global interval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
    #[serde(default)]
    pub triggers: Vec<Trigger>,
    /// Lower bound on queued + running + launched tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    /// Upper bound on queued + running + launched tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
}

impl Alert {
    /// Key under which the previous queue size is stored: `{env}|{name}`.
    pub fn queue_key(&self) -> String {
        format!("{}|{}", self.queue_env, self.queue_name)
    }

    /// Only progressive triggers look at the previous queue size.
    pub fn needs_previous_size(&self) -> bool {
        self.triggers
            .iter()
            .any(|t| t.kind == TriggerKind::Progressive)
    }

    pub fn has_triggers(&self) -> bool {
        !self.triggers.is_empty()
    }
}

/// Snapshot of a queue as reported by the queue service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueInfo {
    pub size: i64,
}

/// A deployable worker package registered with the worker service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodePackage {
    pub id: String,
    pub name: String,
    pub project_id: String,
}

/// Task counts for a worker package.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeStats {
    #[serde(default)]
    pub queued: i64,
    #[serde(default)]
    pub running: i64,
}

impl CodeStats {
    pub fn in_flight(&self) -> i64 {
        self.queued + self.running
    }
}

/// A task launch request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub code_name: String,
    pub cluster: String,
    pub priority: i32,
    /// Serialized JSON describing why the task was launched.
    pub payload: String,
}
