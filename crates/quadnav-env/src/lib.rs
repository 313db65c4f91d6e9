//! Vectorized quadruped waypoint-navigation environment.
//!
//! [`NavigationEnv`](env::NavigationEnv) drives any
//! [`SimBackend`](quadnav_core::sim::SimBackend) through the full control
//! and reward loop, one batched call per step.
//!
//! - [`state`]: per-step robot state extraction with resolved-once sensors.
//! - [`episode`]: typed per-environment episode state.
//! - [`celebration`]: the scripted pose played at flagged waypoints.
//! - [`observation`]: the 54-channel policy observation.
//! - [`rewards`]: reward terms and the two-regime evaluator.
//! - [`terminations`]: timeout, base contact and yaw-rate blow-up.
//! - [`markers`]: target marker and heading arrow DOF writes.
//! - [`reset`]: seeded per-environment spawn and target sampling.
//! - [`vec_buffer`]: structure-of-arrays step output.
//! - [`plugin`]: Bevy resources for a host app.
//!
//! # Example
//!
//! ```
//! use quadnav_core::config::NavConfig;
//! use quadnav_env::prelude::*;
//! use quadnav_test_utils::MockSim;
//!
//! let mut env = NavigationEnv::new(MockSim::new(4), NavConfig::default()).unwrap();
//! env.reset_all();
//! let stats = env.step(&[[0.0; 12]; 4]);
//! assert_eq!(env.obs_buffer().as_flat().len(), 4 * 54);
//! assert!(stats.mean_reward.is_finite());
//! ```

pub mod celebration;
pub mod env;
pub mod episode;
pub mod markers;
pub mod observation;
pub mod plugin;
pub mod reset;
pub mod rewards;
pub mod state;
pub mod terminations;
pub mod vec_buffer;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::env::{NavigationEnv, StepStats};
    pub use crate::episode::{EnvEpisode, EpisodeState, EpisodeTable};
    pub use crate::plugin::NavigationPlugin;
    pub use crate::rewards::{RewardEvaluator, RewardInputs};
    pub use crate::terminations::{EndFlags, TerminationEvaluator};
    pub use crate::vec_buffer::{VecDoneBuffer, VecObsBuffer, VecRewardBuffer};
}
