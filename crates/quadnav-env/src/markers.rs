//! Visual markers written into the DOF arrays.
//!
//! The target marker always exists and carries `(x, y, heading)` of the pose
//! command. Two heading arrows are optional; they show the base velocity
//! direction and the commanded velocity direction above the robot.

use bevy::log::warn;
use nalgebra::{Vector2, Vector3};
use quadnav_core::config::MarkerSettings;
use quadnav_core::math::{normalize_quat_or_identity, planar_yaw, yaw_quat, QuatXyzw};
use quadnav_core::sim::{DofLayout, SimBackend};
use quadnav_nav::command::PoseCommand;

/// What one environment's markers should show.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerPose {
    pub command: PoseCommand,
    pub robot_position: Vector3<f32>,
    /// World-frame base velocity in the plane.
    pub robot_velocity: Vector2<f32>,
    /// Commanded planar velocity.
    pub desired_velocity: Vector2<f32>,
}

/// Writes marker DOFs.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerWriter {
    layout: DofLayout,
    arrows: bool,
    arrow_height: f32,
    min_speed: f32,
}

impl MarkerWriter {
    /// Arrows are enabled only when both arrow bodies exist and the DOF
    /// arrays have room for them.
    pub fn resolve<S: SimBackend + ?Sized>(sim: &S, settings: &MarkerSettings) -> Self {
        let layout = DofLayout::STANDARD;
        let bodies = sim.body_id(&settings.robot_arrow_body).is_some()
            && sim.body_id(&settings.desired_arrow_body).is_some();
        let room = sim.dof_pos_len() >= layout.pos_len_with_arrows();
        if !bodies {
            warn!("heading arrow bodies not found, arrows disabled");
        } else if !room {
            warn!("DOF array too short for heading arrows, arrows disabled");
        }
        Self {
            layout,
            arrows: bodies && room,
            arrow_height: settings.arrow_height,
            min_speed: settings.min_speed,
        }
    }

    pub const fn has_arrows(&self) -> bool {
        self.arrows
    }

    /// Write the markers of `env`. The caller runs forward kinematics once
    /// after all environments are written.
    pub fn write<S: SimBackend + ?Sized>(&self, sim: &mut S, env: usize, pose: &MarkerPose) {
        let l = self.layout;
        let dofs = sim.dof_pos_mut(env);
        if let Some(slot) = dofs.get_mut(l.marker..l.marker + 3) {
            slot.copy_from_slice(&pose.command.as_array());
        }
        if !self.arrows {
            return;
        }
        let mut at = pose.robot_position;
        at.z += self.arrow_height;
        let robot_yaw = planar_yaw(&pose.robot_velocity, self.min_speed);
        let desired_yaw = planar_yaw(&pose.desired_velocity, self.min_speed);
        write_free_joint(dofs, l.robot_arrow, &at, yaw_quat(robot_yaw));
        write_free_joint(dofs, l.desired_arrow, &at, yaw_quat(desired_yaw));
    }
}

/// Position then unit quaternion, 7 slots.
fn write_free_joint(dofs: &mut [f32], at: usize, position: &Vector3<f32>, quat: QuatXyzw) {
    let Some(slot) = dofs.get_mut(at..at + 7) else {
        return;
    };
    let q = normalize_quat_or_identity(quat);
    slot[..3].copy_from_slice(position.as_slice());
    slot[3..].copy_from_slice(&q);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use quadnav_core::math::heading;
    use quadnav_test_utils::MockSim;

    use super::*;

    fn pose() -> MarkerPose {
        MarkerPose {
            command: PoseCommand::new(3.0, -1.0, 0.7),
            robot_position: Vector3::new(1.0, 1.0, 0.4),
            robot_velocity: Vector2::new(0.0, 0.5),
            desired_velocity: Vector2::zeros(),
        }
    }

    fn quat_at(dofs: &[f32], at: usize) -> QuatXyzw {
        [dofs[at + 3], dofs[at + 4], dofs[at + 5], dofs[at + 6]]
    }

    #[test]
    fn target_marker_without_arrows() {
        let mut sim = MockSim::new(2);
        let writer = MarkerWriter::resolve(&sim, &MarkerSettings::default());
        assert!(!writer.has_arrows());
        writer.write(&mut sim, 1, &pose());
        assert_eq!(&sim.dof_pos(1)[0..3], &[3.0, -1.0, 0.7]);
        assert_eq!(&sim.dof_pos(0)[0..3], &[0.0, 0.0, 0.0]);
        assert_eq!(sim.dof_pos_len(), 22);
    }

    #[test]
    fn arrows_follow_velocities() {
        let settings = MarkerSettings::default();
        let mut sim = MockSim::new(1).with_arrows(&settings.robot_arrow_body, &settings.desired_arrow_body);
        let writer = MarkerWriter::resolve(&sim, &settings);
        assert!(writer.has_arrows());
        writer.write(&mut sim, 0, &pose());

        let dofs = sim.dof_pos(0);
        let l = DofLayout::STANDARD;
        assert!((dofs[l.robot_arrow + 2] - 0.9).abs() < 1e-6);
        let robot = quat_at(dofs, l.robot_arrow);
        assert!((heading(robot) - FRAC_PI_2).abs() < 1e-5);
        // Zero desired velocity points along +x.
        let desired = quat_at(dofs, l.desired_arrow);
        assert!(heading(desired).abs() < 1e-6);
    }

    #[test]
    fn written_quaternions_are_unit() {
        let settings = MarkerSettings::default();
        let mut sim = MockSim::new(1).with_arrows(&settings.robot_arrow_body, &settings.desired_arrow_body);
        let writer = MarkerWriter::resolve(&sim, &settings);
        for k in 0..16_u8 {
            let angle = f32::from(k) * 0.4;
            let mut p = pose();
            p.robot_velocity = Vector2::new(angle.cos(), angle.sin()) * 1e-2;
            p.desired_velocity = Vector2::new(f32::NAN, 1.0);
            writer.write(&mut sim, 0, &p);
            let dofs = sim.dof_pos(0);
            for at in [DofLayout::STANDARD.robot_arrow, DofLayout::STANDARD.desired_arrow] {
                let q = quat_at(dofs, at);
                let norm = q.iter().map(|c| c * c).sum::<f32>().sqrt();
                assert!((norm - 1.0).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn degenerate_quaternion_becomes_identity() {
        let mut dofs = vec![0.0; 7];
        write_free_joint(&mut dofs, 0, &Vector3::zeros(), [0.0, 0.0, 0.0, 1e-8]);
        assert_eq!(&dofs[3..], &[0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn short_dof_array_disables_arrows() {
        let settings = MarkerSettings::default();
        let sim = MockSim::new(1)
            .with_body(&settings.robot_arrow_body, Default::default())
            .with_body(&settings.desired_arrow_body, Default::default());
        assert!(!MarkerWriter::resolve(&sim, &settings).has_arrows());
    }
}
