//! qscale-trigger — turns queue and worker observations into a launch count.
//!
//! # Rules
//!
//! ```text
//! fixed(T):        current >= T and queued + running == 0   → 1
//! progressive(V):  current >= V → current/V - previous/V     (floor division)
//! ratio(V):        ceil(current / V) - (queued + running)
//! ```
//!
//! The alert's decision is the **maximum** candidate across its triggers
//! (floored at zero), never the sum: triggers on one alert are
//! alternative strategies. The first trigger reaching the maximum is
//! reported as the cause.
//!
//! Bounds are applied afterwards by [`apply_bounds`], min before max.

pub mod evaluator;

pub use evaluator::{Cause, Decision, Observation, apply_bounds, candidate, evaluate};
