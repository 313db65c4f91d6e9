use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// Joint layout
// ---------------------------------------------------------------------------

/// Number of actuated joints (4 legs x hip/thigh/calf).
pub const NUM_JOINTS: usize = 12;

/// Number of legs.
pub const NUM_LEGS: usize = 4;

/// Width of the policy observation vector.
pub const OBS_DIM: usize = 54;

/// Width of the policy action vector.
pub const ACTION_DIM: usize = NUM_JOINTS;

/// One value per actuated joint, ordered FR, FL, RR, RL with hip/thigh/calf
/// inside each leg.
pub type JointVector = [f32; NUM_JOINTS];

/// Leg identifier, in joint-vector order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Leg {
    FrontRight,
    FrontLeft,
    RearRight,
    RearLeft,
}

impl Leg {
    pub const ALL: [Self; NUM_LEGS] = [
        Self::FrontRight,
        Self::FrontLeft,
        Self::RearRight,
        Self::RearLeft,
    ];

    /// Short prefix used in scene asset names (`FR`, `FL`, `RR`, `RL`).
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::FrontRight => "FR",
            Self::FrontLeft => "FL",
            Self::RearRight => "RR",
            Self::RearLeft => "RL",
        }
    }

    /// Position of this leg in [`Leg::ALL`].
    pub const fn index(self) -> usize {
        match self {
            Self::FrontRight => 0,
            Self::FrontLeft => 1,
            Self::RearRight => 2,
            Self::RearLeft => 3,
        }
    }

    pub const fn is_front(self) -> bool {
        matches!(self, Self::FrontRight | Self::FrontLeft)
    }

    /// Index of this leg's first joint in a [`JointVector`].
    pub const fn first_joint(self) -> usize {
        self.index() * 3
    }
}

/// Joint position within a leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JointKind {
    Hip,
    Thigh,
    Calf,
}

impl JointKind {
    /// Joint kind of a flat joint index.
    pub const fn of(joint: usize) -> Self {
        match joint % 3 {
            0 => Self::Hip,
            1 => Self::Thigh,
            _ => Self::Calf,
        }
    }

    /// Leg owning a flat joint index.
    pub const fn leg_of(joint: usize) -> Leg {
        Leg::ALL[(joint / 3) % NUM_LEGS]
    }
}

// ---------------------------------------------------------------------------
// Observation
// ---------------------------------------------------------------------------

/// Flat f32 vector handed to the policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    data: Vec<f32>,
}

impl Observation {
    pub const fn new(data: Vec<f32>) -> Self {
        Self { data }
    }

    pub fn zeros(len: usize) -> Self {
        Self {
            data: vec![0.0; len],
        }
    }

    pub const fn len(&self) -> usize {
        self.data.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }
}

impl std::ops::Index<usize> for Observation {
    type Output = f32;
    fn index(&self, i: usize) -> &f32 {
        &self.data[i]
    }
}

impl From<Vec<f32>> for Observation {
    fn from(data: Vec<f32>) -> Self {
        Self::new(data)
    }
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// Normalized joint action in `[-1, 1]` per joint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    data: Vec<f32>,
}

impl Action {
    pub const fn new(data: Vec<f32>) -> Self {
        Self { data }
    }

    pub fn zeros() -> Self {
        Self {
            data: vec![0.0; ACTION_DIM],
        }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Validate dimension and finiteness.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.data.len() != ACTION_DIM {
            return Err(ValidationError::ActionDimMismatch {
                expected: ACTION_DIM,
                got: self.data.len(),
            });
        }
        for val in &self.data {
            if val.is_nan() {
                return Err(ValidationError::ActionContainsNan);
            }
            if val.is_infinite() {
                return Err(ValidationError::ActionContainsInf);
            }
        }
        Ok(())
    }

    /// Validate and convert into a clipped [`JointVector`].
    pub fn to_joint_vector(&self) -> Result<JointVector, ValidationError> {
        self.validate()?;
        let mut out = [0.0; NUM_JOINTS];
        for (dst, src) in out.iter_mut().zip(&self.data) {
            *dst = src.clamp(-1.0, 1.0);
        }
        Ok(out)
    }
}

impl From<Vec<f32>> for Action {
    fn from(data: Vec<f32>) -> Self {
        Self::new(data)
    }
}

/// Replace non-finite entries with zero and clip to `[-1, 1]`.
pub fn sanitize_action(action: &JointVector) -> JointVector {
    action.map(|a| if a.is_finite() { a.clamp(-1.0, 1.0) } else { 0.0 })
}

// ---------------------------------------------------------------------------
// BoxSpace
// ---------------------------------------------------------------------------

/// Bounded continuous space. Follows the Gymnasium `Box` convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxSpace {
    pub low: Vec<f32>,
    pub high: Vec<f32>,
}

impl BoxSpace {
    /// Space with identical bounds on every dimension.
    pub fn uniform(dim: usize, low: f32, high: f32) -> Self {
        Self {
            low: vec![low; dim],
            high: vec![high; dim],
        }
    }

    /// Policy action space: 12 joints in `[-1, 1]`.
    pub fn action_space() -> Self {
        Self::uniform(ACTION_DIM, -1.0, 1.0)
    }

    /// Policy observation space: 54 unbounded channels.
    pub fn observation_space() -> Self {
        Self::uniform(OBS_DIM, f32::NEG_INFINITY, f32::INFINITY)
    }

    pub fn shape(&self) -> Vec<usize> {
        vec![self.low.len()]
    }

    pub fn contains(&self, values: &[f32]) -> bool {
        values.len() == self.low.len()
            && values
                .iter()
                .zip(self.low.iter().zip(self.high.iter()))
                .all(|(v, (l, h))| v >= l && v <= h)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leg_joint_ranges() {
        assert_eq!(Leg::FrontRight.first_joint(), 0);
        assert_eq!(Leg::FrontLeft.first_joint(), 3);
        assert_eq!(Leg::RearRight.first_joint(), 6);
        assert_eq!(Leg::RearLeft.first_joint(), 9);
        assert!(Leg::FrontLeft.is_front());
        assert!(!Leg::RearLeft.is_front());
    }

    #[test]
    fn joint_kind_of_index() {
        assert_eq!(JointKind::of(0), JointKind::Hip);
        assert_eq!(JointKind::of(4), JointKind::Thigh);
        assert_eq!(JointKind::of(11), JointKind::Calf);
        assert_eq!(JointKind::leg_of(7), Leg::RearRight);
    }

    #[test]
    fn observation_indexing() {
        let obs = Observation::new(vec![1.0, 2.0, 3.0]);
        assert_eq!(obs.len(), 3);
        assert!((obs[1] - 2.0).abs() < f32::EPSILON);
        assert!(!obs.is_empty());
    }

    #[test]
    fn action_validate_rejects_wrong_dim() {
        let action = Action::new(vec![0.0; 3]);
        assert_eq!(
            action.validate(),
            Err(ValidationError::ActionDimMismatch {
                expected: 12,
                got: 3
            })
        );
    }

    #[test]
    fn action_validate_rejects_nan_and_inf() {
        let mut data = vec![0.0; ACTION_DIM];
        data[5] = f32::NAN;
        assert_eq!(
            Action::new(data.clone()).validate(),
            Err(ValidationError::ActionContainsNan)
        );
        data[5] = f32::INFINITY;
        assert_eq!(
            Action::new(data).validate(),
            Err(ValidationError::ActionContainsInf)
        );
    }

    #[test]
    fn to_joint_vector_clips() {
        let mut data = vec![0.5; ACTION_DIM];
        data[0] = 3.0;
        data[11] = -2.0;
        let jv = Action::new(data).to_joint_vector().unwrap();
        assert!((jv[0] - 1.0).abs() < f32::EPSILON);
        assert!((jv[11] + 1.0).abs() < f32::EPSILON);
        assert!((jv[4] - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn sanitize_replaces_non_finite() {
        let mut a = [0.2; NUM_JOINTS];
        a[0] = f32::NAN;
        a[1] = f32::NEG_INFINITY;
        a[2] = 7.0;
        let s = sanitize_action(&a);
        assert!(s[0].abs() < f32::EPSILON);
        assert!(s[1].abs() < f32::EPSILON);
        assert!((s[2] - 1.0).abs() < f32::EPSILON);
        assert!((s[3] - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn box_space_contains() {
        let space = BoxSpace::action_space();
        assert_eq!(space.shape(), vec![12]);
        assert!(space.contains(&[0.0; 12]));
        assert!(!space.contains(&[2.0; 12]));
        assert!(!space.contains(&[0.0; 11]));
        assert_eq!(BoxSpace::observation_space().shape(), vec![OBS_DIM]);
    }
}
