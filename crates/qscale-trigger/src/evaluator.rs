//! Trigger evaluation and bound clamping.
//!
//! Everything here is pure: no I/O, no clocks. The watcher feeds in one
//! observation per cycle and acts on the returned [`Decision`].

use serde::ser::{Serialize, SerializeStruct, Serializer};
use tracing::trace;

use qscale_core::{Trigger, TriggerKind};

/// Inputs for one evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Observation {
    /// Tasks queued on the worker pool.
    pub queued: i64,
    /// Tasks running on the worker pool.
    pub running: i64,
    /// Current queue depth.
    pub current_size: i64,
    /// Queue depth at the previous observation, 0 when there is no history.
    pub previous_size: i64,
}

impl Observation {
    pub fn in_flight(&self) -> i64 {
        self.queued.saturating_add(self.running)
    }
}

/// What produced a launch decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cause {
    /// One of the alert's configured triggers.
    Trigger(Trigger),
    /// The alert's minimum bound forced the launch count up.
    Min(i64),
}

impl Cause {
    pub fn kind(&self) -> &'static str {
        match self {
            Cause::Trigger(t) => t.kind.as_str(),
            Cause::Min(_) => "min",
        }
    }

    pub fn value(&self) -> i64 {
        match self {
            Cause::Trigger(t) => t.value,
            Cause::Min(v) => *v,
        }
    }

    /// JSON payload attached to launched tasks, e.g. `{"type":"ratio","value":10}`.
    pub fn payload(&self) -> String {
        // Two scalar fields; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl Serialize for Cause {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Cause", 2)?;
        s.serialize_field("type", self.kind())?;
        s.serialize_field("value", &self.value())?;
        s.end()
    }
}

impl std::fmt::Display for Cause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.kind(), self.value())
    }
}

/// Launch decision for one alert in one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Number of tasks to launch, never negative.
    pub launch: i64,
    /// `None` only when the alert has no triggers.
    pub cause: Option<Cause>,
}

/// Candidate launch count for a single trigger. May be negative.
pub fn candidate(trigger: &Trigger, obs: &Observation) -> i64 {
    let value = trigger.value;
    match trigger.kind {
        TriggerKind::Fixed => {
            if obs.current_size >= value && obs.in_flight() == 0 {
                1
            } else {
                0
            }
        }
        TriggerKind::Progressive => {
            if value <= 0 || obs.current_size < value {
                return 0;
            }
            let previous_level = obs.previous_size / value;
            let current_level = obs.current_size / value;
            current_level.saturating_sub(previous_level)
        }
        TriggerKind::Ratio => {
            if value <= 0 {
                return 0;
            }
            // Ceiling division; zero runners only when the queue is empty.
            let expected_runners = if obs.current_size <= 0 {
                0
            } else {
                (obs.current_size - 1) / value + 1
            };
            expected_runners.saturating_sub(obs.in_flight())
        }
    }
}

/// Evaluate all triggers and keep the largest candidate.
pub fn evaluate(obs: &Observation, triggers: &[Trigger]) -> Decision {
    let mut best: Option<(i64, &Trigger)> = None;

    for trigger in triggers {
        let tlaunch = candidate(trigger, obs);
        trace!(trigger = %trigger, tlaunch, "trigger evaluated");
        match best {
            Some((max, _)) if tlaunch <= max => {}
            _ => best = Some((tlaunch, trigger)),
        }
    }

    match best {
        Some((max, trigger)) => Decision {
            launch: max.max(0),
            cause: Some(Cause::Trigger(*trigger)),
        },
        None => Decision {
            launch: 0,
            cause: None,
        },
    }
}

/// Clamp a decision so that `launch + queued + running` stays within
/// `[min, max]`. The floor is applied first; a launch forced up by the
/// floor is attributed to [`Cause::Min`]. The result is never negative.
pub fn apply_bounds(
    decision: Decision,
    obs: &Observation,
    min: Option<i64>,
    max: Option<i64>,
) -> Decision {
    let in_flight = obs.in_flight();
    let mut out = decision;

    if let Some(min) = min
        && out.launch.saturating_add(in_flight) < min
    {
        out.launch = min.saturating_sub(in_flight);
        out.cause = Some(Cause::Min(min));
    }

    if let Some(max) = max
        && out.launch.saturating_add(in_flight) > max
    {
        out.launch = max.saturating_sub(in_flight);
    }

    out.launch = out.launch.max(0);
    out
}
