//! Pose commands, goal error and the velocity command generator.
//!
//! [`ReachCriterion::reached_all`] is the single definition of course
//! completion; commands, observation, reward and celebration all call it.

use nalgebra::Vector2;
use quadnav_core::config::{CommandSettings, ReachSettings};
use quadnav_core::math::wrap_angle;

/// Distance reported in place of a NaN distance.
pub const DISTANCE_SENTINEL: f32 = 1000.0;

// ---------------------------------------------------------------------------
// PoseCommand / GoalError
// ---------------------------------------------------------------------------

/// Target position and final heading for one environment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseCommand {
    pub target: Vector2<f32>,
    pub heading: f32,
}

impl PoseCommand {
    pub fn new(x: f32, y: f32, heading: f32) -> Self {
        Self {
            target: Vector2::new(x, y),
            heading,
        }
    }

    /// `(x, y, heading)`, the layout of the target marker DOFs.
    pub fn as_array(&self) -> [f32; 3] {
        [self.target.x, self.target.y, self.heading]
    }
}

impl Default for PoseCommand {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

/// Robot pose relative to its pose command, with NaNs replaced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalError {
    /// `target - robot` in the world plane.
    pub position: Vector2<f32>,
    pub distance: f32,
    /// `wrap(target_heading - robot_heading)`.
    pub heading: f32,
}

impl GoalError {
    pub fn between(robot_xy: &Vector2<f32>, robot_heading: f32, command: &PoseCommand) -> Self {
        let mut position = command.target - robot_xy;
        let mut distance = position.norm();
        if distance.is_nan() {
            position = Vector2::zeros();
            distance = DISTANCE_SENTINEL;
        }
        let mut heading = wrap_angle(command.heading - robot_heading);
        if heading.is_nan() {
            heading = 0.0;
        }
        Self {
            position,
            distance,
            heading,
        }
    }
}

// ---------------------------------------------------------------------------
// ReachCriterion
// ---------------------------------------------------------------------------

/// Final position and heading tolerance of the course goal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReachCriterion {
    pub position_threshold: f32,
    /// Radians.
    pub heading_threshold: f32,
}

impl ReachCriterion {
    pub fn new(settings: &ReachSettings) -> Self {
        Self {
            position_threshold: settings.position_threshold,
            heading_threshold: settings.heading_threshold(),
        }
    }

    /// Every waypoint visited and the final pose within tolerance.
    ///
    /// `course_complete` is vacuously true for a goal-only course.
    pub fn reached_all(&self, course_complete: bool, error: &GoalError) -> bool {
        course_complete
            && error.distance < self.position_threshold
            && error.heading.abs() < self.heading_threshold
    }
}

impl Default for ReachCriterion {
    fn default() -> Self {
        Self::new(&ReachSettings::default())
    }
}

// ---------------------------------------------------------------------------
// VelocityCommand
// ---------------------------------------------------------------------------

/// Desired planar velocity and yaw rate for one environment.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VelocityCommand {
    pub lin: Vector2<f32>,
    pub yaw_rate: f32,
    /// The large-turn policy was active.
    pub large_turn: bool,
}

impl VelocityCommand {
    /// `(vx, vy, yaw_rate)`.
    pub fn as_array(&self) -> [f32; 3] {
        [self.lin.x, self.lin.y, self.yaw_rate]
    }
}

// ---------------------------------------------------------------------------
// CommandGenerator
// ---------------------------------------------------------------------------

/// Proportional go-to-target commands with a turn-first policy.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandGenerator {
    position_gain: f32,
    max_lin_vel: f32,
    yaw_gain: f32,
    max_yaw_rate: f32,
    large_turn_threshold: f32,
    large_turn_speed_scale: f32,
    large_turn_yaw_amplification: f32,
    yaw_deadband: f32,
}

impl CommandGenerator {
    pub fn new(settings: &CommandSettings) -> Self {
        Self {
            position_gain: settings.position_gain,
            max_lin_vel: settings.max_lin_vel,
            yaw_gain: settings.yaw_gain,
            max_yaw_rate: settings.max_yaw_rate,
            large_turn_threshold: settings.large_turn_threshold_deg.to_radians(),
            large_turn_speed_scale: settings.large_turn_speed_scale,
            large_turn_yaw_amplification: settings.large_turn_yaw_amplification,
            yaw_deadband: settings.yaw_deadband_deg.to_radians(),
        }
    }

    /// Commands for one environment.
    ///
    /// The robot is steered toward the direction of the position error.
    /// Beyond the large-turn threshold forward speed is scaled down and the
    /// yaw gain amplified. Both commands are zero once `reached_all` holds.
    pub fn compute(
        &self,
        error: &GoalError,
        robot_heading: f32,
        reached_all: bool,
    ) -> VelocityCommand {
        if reached_all {
            return VelocityCommand::default();
        }

        let desired_heading = error.position.y.atan2(error.position.x);
        let mut to_movement = wrap_angle(desired_heading - robot_heading);
        if to_movement.is_nan() {
            to_movement = 0.0;
        }
        let large_turn = to_movement.abs() > self.large_turn_threshold;
        let (speed_factor, yaw_amp) = if large_turn {
            (self.large_turn_speed_scale, self.large_turn_yaw_amplification)
        } else {
            (1.0, 1.0)
        };

        let gain = self.position_gain * speed_factor;
        let lin = error
            .position
            .map(|e| (e * gain).clamp(-self.max_lin_vel, self.max_lin_vel));
        let yaw_rate = if to_movement.abs() < self.yaw_deadband {
            0.0
        } else {
            (to_movement * self.yaw_gain * yaw_amp).clamp(-self.max_yaw_rate, self.max_yaw_rate)
        };

        VelocityCommand {
            lin,
            yaw_rate,
            large_turn,
        }
    }
}

impl Default for CommandGenerator {
    fn default() -> Self {
        Self::new(&CommandSettings::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
