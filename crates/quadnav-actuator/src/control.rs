//! Terrain-adaptive PD position control for the 12 leg joints.
//!
//! The controller is stateless: each call maps normalized actions to joint
//! targets around the standing pose and returns clamped torques.

use quadnav_core::config::{ControlSettings, GainSettings, TorqueLimitSettings};
use quadnav_core::types::{JointKind, JointVector, NUM_JOINTS};

use crate::terrain::TerrainClass;

// ---------------------------------------------------------------------------
// GainSet
// ---------------------------------------------------------------------------

/// Front/rear stiffness (`Nm/rad`) and shared damping (`Nm·s/rad`).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GainSet {
    pub kp_front: f32,
    pub kp_rear: f32,
    pub kd: f32,
}

impl GainSet {
    pub const fn new(kp_front: f32, kp_rear: f32, kd: f32) -> Self {
        Self {
            kp_front,
            kp_rear,
            kd,
        }
    }

    /// Stiffness for a flat joint index.
    pub const fn stiffness(&self, joint: usize) -> f32 {
        if JointKind::leg_of(joint).is_front() {
            self.kp_front
        } else {
            self.kp_rear
        }
    }
}

impl From<GainSettings> for GainSet {
    fn from(s: GainSettings) -> Self {
        Self::new(s.kp_front, s.kp_rear, s.kd)
    }
}

// ---------------------------------------------------------------------------
// TorqueLimits
// ---------------------------------------------------------------------------

/// Symmetric per-kind torque limits (Nm).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TorqueLimits {
    pub hip: f32,
    pub thigh: f32,
    pub calf: f32,
}

impl TorqueLimits {
    pub const fn limit(&self, joint: usize) -> f32 {
        match JointKind::of(joint) {
            JointKind::Hip => self.hip,
            JointKind::Thigh => self.thigh,
            JointKind::Calf => self.calf,
        }
    }

    /// Limits expanded to one entry per joint.
    pub fn per_joint(&self) -> JointVector {
        std::array::from_fn(|j| self.limit(j))
    }

    /// Clamp a torque into `[-limit, limit]`; NaN becomes zero.
    pub fn clamp(&self, joint: usize, torque: f32) -> f32 {
        if torque.is_nan() {
            return 0.0;
        }
        let limit = self.limit(joint);
        torque.clamp(-limit, limit)
    }
}

impl Default for TorqueLimits {
    fn default() -> Self {
        Self {
            hip: 17.0,
            thigh: 17.0,
            calf: 34.0,
        }
    }
}

impl From<TorqueLimitSettings> for TorqueLimits {
    fn from(s: TorqueLimitSettings) -> Self {
        Self {
            hip: s.hip,
            thigh: s.thigh,
            calf: s.calf,
        }
    }
}

// ---------------------------------------------------------------------------
// AdaptivePdController
// ---------------------------------------------------------------------------

/// PD controller with a normal and a downhill gain set.
///
/// Downhill trades stiffness for damping so the legs absorb the descent.
#[derive(Clone, Debug, PartialEq)]
pub struct AdaptivePdController {
    default_pose: JointVector,
    action_scale: f32,
    normal: GainSet,
    downhill: GainSet,
    limits: TorqueLimits,
}

impl AdaptivePdController {
    pub fn new(default_pose: JointVector, settings: &ControlSettings) -> Self {
        Self {
            default_pose,
            action_scale: settings.action_scale,
            normal: settings.normal_gains.into(),
            downhill: settings.downhill_gains.into(),
            limits: settings.torque_limits.into(),
        }
    }

    pub const fn default_pose(&self) -> &JointVector {
        &self.default_pose
    }

    pub const fn action_scale(&self) -> f32 {
        self.action_scale
    }

    pub const fn limits(&self) -> &TorqueLimits {
        &self.limits
    }

    /// Gain set in effect for a terrain class.
    pub const fn gains(&self, terrain: TerrainClass) -> &GainSet {
        match terrain {
            TerrainClass::Normal => &self.normal,
            TerrainClass::Downhill => &self.downhill,
        }
    }

    /// Joint targets: standing pose plus scaled action.
    pub fn target_positions(&self, actions: &JointVector) -> JointVector {
        std::array::from_fn(|j| actions[j].mul_add(self.action_scale, self.default_pose[j]))
    }

    /// Clamped torques for one environment.
    pub fn compute_torques(
        &self,
        actions: &JointVector,
        joint_pos: &JointVector,
        joint_vel: &JointVector,
        terrain: TerrainClass,
    ) -> JointVector {
        let gains = self.gains(terrain);
        let targets = self.target_positions(actions);
        let mut torques = [0.0; NUM_JOINTS];
        for (j, tau) in torques.iter_mut().enumerate() {
            let raw = gains
                .stiffness(j)
                .mul_add(targets[j] - joint_pos[j], -gains.kd * joint_vel[j]);
            *tau = self.limits.clamp(j, raw);
        }
        torques
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> AdaptivePdController {
        AdaptivePdController::new([0.0; NUM_JOINTS], &ControlSettings::default())
    }

    #[test]
    fn gain_sets_by_terrain() {
        let c = controller();
        let normal = c.gains(TerrainClass::Normal);
        assert!((normal.kp_front - 85.0).abs() < f32::EPSILON);
        assert!((normal.kp_rear - 100.0).abs() < f32::EPSILON);
        assert!((normal.kd - 6.0).abs() < f32::EPSILON);
        let downhill = c.gains(TerrainClass::Downhill);
        assert!((downhill.kp_front - 65.0).abs() < f32::EPSILON);
        assert!((downhill.kp_rear - 80.0).abs() < f32::EPSILON);
        assert!((downhill.kd - 8.5).abs() < f32::EPSILON);
    }

    #[test]
    fn front_rear_split() {
        let g = GainSet::new(1.0, 2.0, 0.0);
        assert!((g.stiffness(5) - 1.0).abs() < f32::EPSILON);
        assert!((g.stiffness(6) - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn pd_law_small_error() {
        let c = controller();
        // action 0.2 * scale 0.25 = 0.05 rad target, pos 0, vel 0.5
        let mut actions = [0.0; NUM_JOINTS];
        actions[0] = 0.2;
        actions[6] = 0.2;
        let torques =
            c.compute_torques(&actions, &[0.0; NUM_JOINTS], &[0.5; NUM_JOINTS], TerrainClass::Normal);
        assert!((torques[0] - (85.0 * 0.05 - 6.0 * 0.5)).abs() < 1e-4);
        assert!((torques[6] - (100.0 * 0.05 - 6.0 * 0.5)).abs() < 1e-4);
        assert!((torques[1] + 3.0).abs() < 1e-4);
    }

    #[test]
    fn torques_are_clamped_per_kind() {
        let c = controller();
        let torques = c.compute_torques(
            &[1.0; NUM_JOINTS],
            &[-10.0; NUM_JOINTS],
            &[-50.0; NUM_JOINTS],
            TerrainClass::Downhill,
        );
        for (j, tau) in torques.iter().enumerate() {
            let limit = if j % 3 == 2 { 34.0 } else { 17.0 };
            assert!((tau - limit).abs() < f32::EPSILON, "joint {j}: {tau}");
        }
    }

    #[test]
    fn nan_state_yields_zero_torque() {
        let c = controller();
        let torques = c.compute_torques(
            &[0.0; NUM_JOINTS],
            &[f32::NAN; NUM_JOINTS],
            &[0.0; NUM_JOINTS],
            TerrainClass::Normal,
        );
        assert!(torques.iter().all(|t| t.abs() < f32::EPSILON));
    }

    #[test]
    fn targets_offset_default_pose() {
        let mut pose = [0.0; NUM_JOINTS];
        pose[1] = 0.9;
        let c = AdaptivePdController::new(pose, &ControlSettings::default());
        let targets = c.target_positions(&[-1.0; NUM_JOINTS]);
        assert!((targets[1] - 0.65).abs() < 1e-6);
        assert!((targets[0] + 0.25).abs() < 1e-6);
    }

    #[test]
    fn limits_per_joint_layout() {
        let limits = TorqueLimits::default().per_joint();
        assert_eq!(limits, [17.0, 17.0, 34.0, 17.0, 17.0, 34.0, 17.0, 17.0, 34.0, 17.0, 17.0, 34.0]);
    }
}
