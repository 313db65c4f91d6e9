//! Scripted celebration pose played after special waypoints.
//!
//! The script blends from the joint pose at trigger time into a fixed
//! target pose and back out again, expressed as normalized actions so it
//! can replace the policy's action upstream of the PD controller.

use quadnav_core::config::CelebrationSettings;
use quadnav_core::types::JointVector;

/// Per-environment celebration progress.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Celebration {
    pub active: bool,
    pub counter: u32,
    /// Joint positions when the celebration started.
    pub start_pose: JointVector,
}

impl Celebration {
    /// Begin a celebration from the given joint positions.
    pub fn trigger(&mut self, joint_pos: JointVector) {
        self.active = true;
        self.counter = 0;
        self.start_pose = joint_pos;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Shared timing and pose of the celebration.
#[derive(Clone, Debug, PartialEq)]
pub struct CelebrationScript {
    duration: u32,
    ramp_steps: u32,
    target_pose: JointVector,
    default_pose: JointVector,
    action_scale: f32,
}

impl CelebrationScript {
    pub fn new(settings: &CelebrationSettings, default_pose: JointVector, action_scale: f32) -> Self {
        Self {
            duration: settings.duration,
            ramp_steps: settings.ramp_steps,
            target_pose: settings.pose,
            default_pose,
            action_scale,
        }
    }

    pub const fn target_pose(&self) -> &JointVector {
        &self.target_pose
    }

    /// Blend weight after `counter` steps: up over the ramp, then back down.
    #[allow(clippy::cast_precision_loss)]
    pub fn alpha(&self, counter: u32) -> f32 {
        let ramp = self.ramp_steps as f32;
        let c = counter as f32;
        let alpha = if counter <= self.ramp_steps {
            c / ramp
        } else {
            2.0 - c / ramp
        };
        alpha.clamp(0.0, 1.0)
    }

    /// Advance one step and return the override action.
    ///
    /// Returns `None` when `state` is inactive. The step that reaches the
    /// duration still yields its action, then the state deactivates.
    pub fn advance(&self, state: &mut Celebration) -> Option<JointVector> {
        if !state.active {
            return None;
        }
        state.counter += 1;
        let alpha = self.alpha(state.counter);
        let action = std::array::from_fn(|j| {
            let pose = alpha.mul_add(self.target_pose[j] - state.start_pose[j], state.start_pose[j]);
            ((pose - self.default_pose[j]) / self.action_scale).clamp(-1.0, 1.0)
        });
        if state.counter >= self.duration {
            state.active = false;
            state.counter = 0;
        }
        Some(action)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT_POSE: JointVector = [0.0, 0.9, -1.8, 0.0, 0.9, -1.8, 0.0, 0.9, -1.8, 0.0, 0.9, -1.8];

    fn script() -> CelebrationScript {
        CelebrationScript::new(&CelebrationSettings::default(), DEFAULT_POSE, 0.25)
    }

    #[test]
    fn inactive_yields_nothing() {
        let mut state = Celebration::default();
        assert_eq!(script().advance(&mut state), None);
        assert_eq!(state.counter, 0);
    }

    #[test]
    fn alpha_ramps_up_and_down() {
        let s = script();
        assert!(s.alpha(0).abs() < f32::EPSILON);
        assert!((s.alpha(15) - 0.5).abs() < 1e-6);
        assert!((s.alpha(30) - 1.0).abs() < f32::EPSILON);
        assert!((s.alpha(45) - 0.5).abs() < 1e-6);
        assert!(s.alpha(60).abs() < 1e-6);
    }

    #[test]
    fn runs_for_duration_then_stops() {
        let s = script();
        let mut state = Celebration::default();
        state.trigger(DEFAULT_POSE);
        for step in 1..=60 {
            assert!(s.advance(&mut state).is_some(), "step {step}");
        }
        assert!(!state.active);
        assert_eq!(state.counter, 0);
        assert_eq!(s.advance(&mut state), None);
    }

    #[test]
    fn peak_reaches_target_pose() {
        let s = script();
        let mut state = Celebration::default();
        state.trigger(DEFAULT_POSE);
        let mut peak = None;
        for _ in 0..30 {
            peak = s.advance(&mut state);
        }
        let peak = peak.unwrap();
        // FR hip: (-0.1 - 0) / 0.25
        assert!((peak[0] + 0.4).abs() < 1e-5);
        // RR calf: (-2.0 + 1.8) / 0.25
        assert!((peak[8] + 0.8).abs() < 1e-5);
    }

    #[test]
    fn actions_are_clipped() {
        let s = script();
        let mut state = Celebration::default();
        state.trigger([3.0; 12]);
        let action = s.advance(&mut state).unwrap();
        assert!(action.iter().all(|a| (-1.0..=1.0).contains(a)));
        assert!((action[0] - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn retrigger_restarts() {
        let s = script();
        let mut state = Celebration::default();
        state.trigger(DEFAULT_POSE);
        s.advance(&mut state);
        s.advance(&mut state);
        state.trigger(DEFAULT_POSE);
        assert_eq!(state.counter, 0);
        assert!(state.active);
    }
}
