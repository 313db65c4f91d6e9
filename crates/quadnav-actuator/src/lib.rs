//! Joint control for a 12-joint quadruped, with no engine dependencies.
//!
//! # Pipeline
//!
//! ```text
//! policy action → ActionFilter → AdaptivePdController → clamped torque
//!                                  ↑
//!                 TerrainClassifier (body-frame gravity)
//! ```
//!
//! # Quick Start
//!
//! ```
//! use quadnav_actuator::prelude::*;
//! use quadnav_core::config::ControlSettings;
//!
//! let controller = AdaptivePdController::new([0.0; 12], &ControlSettings::default());
//! let terrain = TerrainClassifier::default().classify(None);
//! let torques = controller.compute_torques(&[0.5; 12], &[0.0; 12], &[0.0; 12], terrain);
//! assert!(torques.iter().all(|t| t.abs() <= 34.0));
//! ```

pub mod control;
pub mod filter;
pub mod terrain;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::control::{AdaptivePdController, GainSet, TorqueLimits};
    pub use crate::filter::ActionFilter;
    pub use crate::terrain::{TerrainClass, TerrainClassifier};
}
