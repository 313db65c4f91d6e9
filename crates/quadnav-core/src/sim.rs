//! Collaborator contract for the batched physics simulator.
//!
//! The navigation loop never owns physics. It talks to the engine through
//! [`SimBackend`]: named lookups resolved once into typed ids, batched reads
//! (one row per environment) and per-environment DOF writes.

use nalgebra::Vector3;

use crate::error::SimError;
use crate::math::{QuatXyzw, IDENTITY_QUAT};
use crate::types::JointVector;

// ---------------------------------------------------------------------------
// Ids
// ---------------------------------------------------------------------------

/// Resolved rigid-body index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyId(pub usize);

/// Resolved collision-geometry index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeomId(pub usize);

/// Resolved sensor index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SensorId(pub usize);

// ---------------------------------------------------------------------------
// Pose
// ---------------------------------------------------------------------------

/// World pose of a body in one environment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vector3<f32>,
    pub orientation: QuatXyzw,
}

impl Pose {
    pub const fn new(position: Vector3<f32>, orientation: QuatXyzw) -> Self {
        Self {
            position,
            orientation,
        }
    }

    pub fn at(x: f32, y: f32, z: f32) -> Self {
        Self::new(Vector3::new(x, y, z), IDENTITY_QUAT)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::new(Vector3::zeros(), IDENTITY_QUAT)
    }
}

// ---------------------------------------------------------------------------
// SensorReading
// ---------------------------------------------------------------------------

/// Row-major sensor output with shape `[rows, width]`.
///
/// A well-formed reading has one row per environment. A single-row reading
/// is broadcast to every environment.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    data: Vec<f32>,
    rows: usize,
    width: usize,
}

impl SensorReading {
    /// # Panics
    ///
    /// Panics if `data.len() != rows * width`.
    pub fn new(data: Vec<f32>, rows: usize, width: usize) -> Self {
        assert_eq!(data.len(), rows * width, "sensor data shape mismatch");
        Self { data, rows, width }
    }

    /// A single scalar, broadcast to all environments.
    pub fn scalar(value: f32) -> Self {
        Self::new(vec![value], 1, 1)
    }

    /// One 3-vector per environment.
    pub fn from_vec3s(rows: &[Vector3<f32>]) -> Self {
        let data = rows.iter().flat_map(|v| [v.x, v.y, v.z]).collect();
        Self::new(data, rows.len(), 3)
    }

    pub const fn rows(&self) -> usize {
        self.rows
    }

    pub const fn width(&self) -> usize {
        self.width
    }

    /// Row for `env`, broadcasting row 0 when the reading is not per-env.
    pub fn row(&self, env: usize) -> &[f32] {
        let r = if env < self.rows { env } else { 0 };
        let start = r * self.width;
        self.data.get(start..start + self.width).unwrap_or(&[])
    }

    /// Whether any channel of `env`'s row exceeds `threshold` in magnitude.
    pub fn any_above(&self, env: usize, threshold: f32) -> bool {
        self.row(env).iter().any(|v| v.abs() > threshold)
    }

    /// First three channels of `env`'s row.
    pub fn vec3(&self, env: usize) -> Option<Vector3<f32>> {
        match self.row(env) {
            [x, y, z, ..] => Some(Vector3::new(*x, *y, *z)),
            _ => None,
        }
    }

    /// Check the row count against the environment count.
    ///
    /// Scalar (single-row) readings are accepted and broadcast.
    pub fn check_rows(&self, num_envs: usize, name: &str) -> Result<(), SimError> {
        if self.rows == num_envs || self.rows == 1 {
            Ok(())
        } else {
            Err(SimError::SensorShape {
                name: name.to_owned(),
                expected: num_envs,
                got: self.rows,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// DofLayout
// ---------------------------------------------------------------------------

/// Offsets into the per-environment DOF arrays of the navigation scene.
///
/// Position array: target marker `(x, y, yaw)`, base free joint
/// `(pos, quat)`, 12 joints, then two optional arrow free joints.
/// Velocity array: marker `(3)`, base `(lin 3, ang 3)`, joints, arrows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DofLayout {
    pub marker: usize,
    pub base_pos: usize,
    pub base_quat: usize,
    pub joint_pos: usize,
    pub robot_arrow: usize,
    pub desired_arrow: usize,
    pub base_vel: usize,
    pub joint_vel: usize,
}

impl DofLayout {
    pub const STANDARD: Self = Self {
        marker: 0,
        base_pos: 3,
        base_quat: 6,
        joint_pos: 10,
        robot_arrow: 22,
        desired_arrow: 29,
        base_vel: 3,
        joint_vel: 9,
    };

    /// Position-array length without arrows.
    pub const fn pos_len_without_arrows(&self) -> usize {
        self.joint_pos + crate::types::NUM_JOINTS
    }

    /// Position-array length with both arrows.
    pub const fn pos_len_with_arrows(&self) -> usize {
        self.desired_arrow + 7
    }
}

impl Default for DofLayout {
    fn default() -> Self {
        Self::STANDARD
    }
}

// ---------------------------------------------------------------------------
// SimBackend
// ---------------------------------------------------------------------------

/// Batched simulator the navigation loop drives.
///
/// Batched reads return one entry per environment, indexed by env slot.
pub trait SimBackend: Send + Sync + 'static {
    /// Human-readable engine name.
    fn name(&self) -> &str;

    /// Number of parallel environments.
    fn num_envs(&self) -> usize;

    // -- model lookups --

    fn body_id(&self, name: &str) -> Option<BodyId>;
    fn geom_id(&self, name: &str) -> Option<GeomId>;
    fn sensor_id(&self, name: &str) -> Option<SensorId>;

    /// All geometry names in the model.
    fn geom_names(&self) -> Vec<String>;

    /// Actuator names in joint-vector order.
    fn actuator_names(&self) -> Vec<String>;

    /// Length of each environment's DOF position array.
    fn dof_pos_len(&self) -> usize;

    /// Length of each environment's DOF velocity array.
    fn dof_vel_len(&self) -> usize;

    // -- batched state reads --

    fn body_poses(&self, body: BodyId) -> Result<Vec<Pose>, SimError>;
    fn geom_positions(&self, geom: GeomId) -> Result<Vec<Vector3<f32>>, SimError>;
    fn read_sensor(&self, sensor: SensorId) -> Result<SensorReading, SimError>;
    fn joint_positions(&self) -> Vec<JointVector>;
    fn joint_velocities(&self) -> Vec<JointVector>;
    fn actuator_controls(&self) -> Vec<JointVector>;

    /// Per environment: whether any of `pairs` is currently in contact.
    fn colliding_pairs(&self, pairs: &[(GeomId, GeomId)]) -> Vec<bool>;

    // -- per-environment writes --

    fn dof_pos(&self, env: usize) -> &[f32];
    fn dof_vel(&self, env: usize) -> &[f32];
    fn dof_pos_mut(&mut self, env: usize) -> &mut [f32];
    fn dof_vel_mut(&mut self, env: usize) -> &mut [f32];
    fn set_actuator_controls(&mut self, env: usize, controls: &JointVector);

    /// Recompute derived body poses after DOF positions were written.
    fn forward_kinematics(&mut self);

    /// Advance physics by one control step.
    fn step(&mut self);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
