//! Shared foundation for quadruped waypoint navigation.
//!
//! Holds the types every other crate speaks: joint vectors and the policy
//! observation/action, the [`NavConfig`](config::NavConfig) table, error
//! enums, orientation math, the seed hierarchy, the batched
//! [`SimBackend`](sim::SimBackend) contract and the generic reward and
//! termination traits.

pub mod config;
pub mod error;
pub mod math;
pub mod seed;
pub mod sim;
pub mod traits;
pub mod types;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::config::{NavConfig, WaypointSpec};
    pub use crate::error::{ConfigError, NavError, SimError, ValidationError};
    pub use crate::math::{QuatXyzw, IDENTITY_QUAT};
    pub use crate::seed::SeedHierarchy;
    pub use crate::sim::{BodyId, DofLayout, GeomId, Pose, SensorId, SensorReading, SimBackend};
    pub use crate::traits::{
        CompositeReward, CompositeTermination, RewardFunction, TerminationCondition,
    };
    pub use crate::types::{Action, JointVector, Leg, Observation, NUM_JOINTS, OBS_DIM};
}
