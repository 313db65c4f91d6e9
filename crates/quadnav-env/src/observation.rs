//! Assembly of the 54-channel policy observation.

use std::f32::consts::PI;

use quadnav_core::config::NormalizationSettings;
use quadnav_core::types::{JointVector, Observation, OBS_DIM};
use quadnav_nav::command::{GoalError, VelocityCommand};

use crate::state::RobotState;

/// Yaw rate under which a reached robot counts as settled.
pub const STOP_YAW_RATE: f32 = 0.05;
/// Distances are divided by this before clipping.
pub const DISTANCE_SCALE: f32 = 5.0;

/// Builds observations from per-step state.
///
/// Channel layout:
///
/// | range | content |
/// |-------|---------|
/// | 0..3 | base linear velocity |
/// | 3..6 | gyro |
/// | 6..9 | projected gravity |
/// | 9..21 | joint angle minus standing pose |
/// | 21..33 | joint velocity |
/// | 33..45 | current action |
/// | 45..48 | velocity command |
/// | 48..50 | position error |
/// | 50 | heading error |
/// | 51 | distance |
/// | 52 | reached flag |
/// | 53 | stop-ready flag |
#[derive(Clone, Debug, PartialEq)]
pub struct ObservationBuilder {
    scales: NormalizationSettings,
    default_pose: JointVector,
}

impl ObservationBuilder {
    pub const fn new(scales: NormalizationSettings, default_pose: JointVector) -> Self {
        Self {
            scales,
            default_pose,
        }
    }

    pub fn build(
        &self,
        state: &RobotState,
        action: &JointVector,
        command: &VelocityCommand,
        error: &GoalError,
        reached_all: bool,
    ) -> Observation {
        let s = &self.scales;
        let mut data = Vec::with_capacity(OBS_DIM);
        data.extend(state.world_lin_vel.iter().map(|v| v * s.lin_vel));
        data.extend(state.gyro.iter().map(|w| w * s.ang_vel));
        data.extend(state.gravity.iter());
        data.extend(
            state
                .joint_pos
                .iter()
                .zip(&self.default_pose)
                .map(|(q, q0)| (q - q0) * s.dof_pos),
        );
        data.extend(state.joint_vel.iter().map(|qd| qd * s.dof_vel));
        data.extend(action);
        data.extend([
            command.lin.x * s.lin_vel,
            command.lin.y * s.lin_vel,
            command.yaw_rate * s.ang_vel,
        ]);
        data.extend(error.position.iter().map(|e| e / DISTANCE_SCALE));
        data.push(error.heading / PI);
        data.push((error.distance / DISTANCE_SCALE).clamp(0.0, 1.0));
        data.push(flag(reached_all));
        data.push(flag(reached_all && state.gyro.z.abs() < STOP_YAW_RATE));
        debug_assert_eq!(data.len(), OBS_DIM);

        for v in &mut data {
            if !v.is_finite() {
                *v = 0.0;
            }
        }
        Observation::new(data)
    }
}

fn flag(b: bool) -> f32 {
    if b {
        1.0
    } else {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
