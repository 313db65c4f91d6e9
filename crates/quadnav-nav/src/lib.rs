//! Waypoint course logic for quadruped navigation.
//!
//! - [`waypoint`]: the ordered [`WaypointRegistry`](waypoint::WaypointRegistry).
//! - [`progression`]: per-environment visited bitsets with strict in-order
//!   acceptance.
//! - [`detector`]: contact-sensor and distance-based arrival detection.
//! - [`command`]: pose commands, the shared `reached_all` criterion and the
//!   velocity command generator.

pub mod command;
pub mod detector;
pub mod progression;
pub mod waypoint;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::command::{
        CommandGenerator, GoalError, PoseCommand, ReachCriterion, VelocityCommand,
    };
    pub use crate::detector::ReachDetector;
    pub use crate::progression::{Arrival, ProgressionTracker};
    pub use crate::waypoint::{Waypoint, WaypointRegistry, MAX_WAYPOINTS};
}
