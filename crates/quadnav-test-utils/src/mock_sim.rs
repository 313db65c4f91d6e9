//! In-memory [`SimBackend`] for tests.
//!
//! The base body's pose and the joint state are read straight from the DOF
//! arrays, so writing DOFs (as reset does) moves the robot. Every other body,
//! geom and sensor holds whatever the test puts there.

use std::collections::HashSet;

use nalgebra::Vector3;
use quadnav_core::error::SimError;
use quadnav_core::math::IDENTITY_QUAT;
use quadnav_core::sim::{BodyId, DofLayout, GeomId, Pose, SensorId, SensorReading, SimBackend};
use quadnav_core::types::{JointVector, Leg, NUM_JOINTS};

/// Body name that [`MockSim`] derives from the base DOFs.
pub const BASE_BODY: &str = "base";

struct MockBody {
    name: String,
    poses: Vec<Pose>,
}

struct MockGeom {
    name: String,
    positions: Vec<Vector3<f32>>,
}

struct MockSensor {
    name: String,
    rows: Vec<Vec<f32>>,
    width: usize,
}

/// Configurable batched simulator stand-in.
pub struct MockSim {
    num_envs: usize,
    layout: DofLayout,
    bodies: Vec<MockBody>,
    geoms: Vec<MockGeom>,
    sensors: Vec<MockSensor>,
    actuators: Vec<String>,
    dof_pos: Vec<Vec<f32>>,
    dof_vel: Vec<Vec<f32>>,
    controls: Vec<JointVector>,
    contacts: HashSet<(usize, GeomId, GeomId)>,
    failing_bodies: HashSet<BodyId>,
    failing_sensors: HashSet<SensorId>,
    /// Number of `step` calls.
    pub steps: usize,
    /// Number of `forward_kinematics` calls.
    pub fk_calls: usize,
}

impl MockSim {
    /// Scene with a base body, 12 named actuators, `base` and `ground` geoms,
    /// and zeroed `local_linvel`, `gyro` and upright `gravity_projection`
    /// sensors. No arrow bodies.
    pub fn new(num_envs: usize) -> Self {
        let layout = DofLayout::STANDARD;
        let actuators = Leg::ALL
            .iter()
            .flat_map(|leg| {
                ["hip", "thigh", "calf"]
                    .iter()
                    .map(move |joint| format!("{}_{joint}", leg.prefix()))
            })
            .collect();
        let mut dof_pos = vec![0.0; layout.pos_len_without_arrows()];
        dof_pos[layout.base_quat + 3] = 1.0;
        let mut sim = Self {
            num_envs,
            layout,
            bodies: vec![MockBody {
                name: BASE_BODY.into(),
                poses: Vec::new(),
            }],
            geoms: Vec::new(),
            sensors: Vec::new(),
            actuators,
            dof_pos: vec![dof_pos; num_envs],
            dof_vel: vec![vec![0.0; layout.joint_vel + NUM_JOINTS]; num_envs],
            controls: vec![[0.0; NUM_JOINTS]; num_envs],
            contacts: HashSet::new(),
            failing_bodies: HashSet::new(),
            failing_sensors: HashSet::new(),
            steps: 0,
            fk_calls: 0,
        };
        sim = sim
            .with_geom(BASE_BODY, Vector3::zeros())
            .with_geom("ground", Vector3::zeros())
            .with_vec3_sensor("local_linvel", Vector3::zeros())
            .with_vec3_sensor("gyro", Vector3::zeros())
            .with_vec3_sensor("gravity_projection", Vector3::new(0.0, 0.0, -1.0));
        sim
    }

    // -- builders --

    /// Add the two heading-arrow bodies and their DOF slots.
    #[must_use]
    pub fn with_arrows(mut self, robot_arrow: &str, desired_arrow: &str) -> Self {
        let len = self.layout.pos_len_with_arrows();
        for row in &mut self.dof_pos {
            row.resize(len, 0.0);
        }
        for row in &mut self.dof_vel {
            row.resize(self.layout.joint_vel + NUM_JOINTS + 12, 0.0);
        }
        self.with_body(robot_arrow, Pose::default())
            .with_body(desired_arrow, Pose::default())
    }

    /// Add a body with the same pose in every environment.
    #[must_use]
    pub fn with_body(mut self, name: &str, pose: Pose) -> Self {
        self.bodies.push(MockBody {
            name: name.into(),
            poses: vec![pose; self.num_envs],
        });
        self
    }

    /// Add a geom with the same position in every environment.
    #[must_use]
    pub fn with_geom(mut self, name: &str, position: Vector3<f32>) -> Self {
        self.geoms.push(MockGeom {
            name: name.into(),
            positions: vec![position; self.num_envs],
        });
        self
    }

    /// Add a per-env 3-channel sensor with the same value in every row.
    #[must_use]
    pub fn with_vec3_sensor(self, name: &str, value: Vector3<f32>) -> Self {
        self.with_sensor(name, vec![value.x, value.y, value.z])
    }

    /// Add a per-env sensor with the same row in every environment.
    #[must_use]
    pub fn with_sensor(mut self, name: &str, row: Vec<f32>) -> Self {
        self.sensors.push(MockSensor {
            name: name.into(),
            width: row.len(),
            rows: vec![row; self.num_envs],
        });
        self
    }

    /// Add a sensor that reports a single broadcast scalar.
    #[must_use]
    pub fn with_scalar_sensor(mut self, name: &str, value: f32) -> Self {
        self.sensors.push(MockSensor {
            name: name.into(),
            rows: vec![vec![value]],
            width: 1,
        });
        self
    }

    // -- mutation --

    pub fn set_body_pose(&mut self, name: &str, env: usize, pose: Pose) {
        if let Some(body) = self.bodies.iter_mut().find(|b| b.name == name) {
            if let Some(slot) = body.poses.get_mut(env) {
                *slot = pose;
            }
        }
    }

    pub fn set_sensor_row(&mut self, name: &str, env: usize, row: &[f32]) {
        if let Some(sensor) = self.sensors.iter_mut().find(|s| s.name == name) {
            let idx = if sensor.rows.len() == 1 { 0 } else { env };
            sensor.rows[idx] = row.to_vec();
            sensor.width = row.len();
        }
    }

    pub fn set_vec3_sensor(&mut self, name: &str, env: usize, value: Vector3<f32>) {
        self.set_sensor_row(name, env, &[value.x, value.y, value.z]);
    }

    /// Make every read of `name` fail.
    pub fn fail_sensor(&mut self, name: &str) {
        if let Some(id) = self.sensor_id(name) {
            self.failing_sensors.insert(id);
        }
    }

    /// Make every pose lookup of `name` fail.
    pub fn fail_body(&mut self, name: &str) {
        if let Some(id) = self.body_id(name) {
            self.failing_bodies.insert(id);
        }
    }

    pub fn restore_body(&mut self, name: &str) {
        if let Some(id) = self.body_id(name) {
            self.failing_bodies.remove(&id);
        }
    }

    pub fn set_base_position(&mut self, env: usize, position: Vector3<f32>) {
        let at = self.layout.base_pos;
        self.dof_pos[env][at..at + 3].copy_from_slice(position.as_slice());
    }

    pub fn set_base_orientation(&mut self, env: usize, quat: [f32; 4]) {
        let at = self.layout.base_quat;
        self.dof_pos[env][at..at + 4].copy_from_slice(&quat);
    }

    pub fn set_joint_positions(&mut self, env: usize, q: &JointVector) {
        let at = self.layout.joint_pos;
        self.dof_pos[env][at..at + NUM_JOINTS].copy_from_slice(q);
    }

    /// World-frame base linear velocity.
    pub fn set_base_velocity(&mut self, env: usize, v: Vector3<f32>) {
        let at = self.layout.base_vel;
        self.dof_vel[env][at..at + 3].copy_from_slice(v.as_slice());
    }

    pub fn set_joint_velocities(&mut self, env: usize, qd: &JointVector) {
        let at = self.layout.joint_vel;
        self.dof_vel[env][at..at + NUM_JOINTS].copy_from_slice(qd);
    }

    /// Mark a geom pair as touching in one environment.
    pub fn set_contact(&mut self, env: usize, a: &str, b: &str) {
        if let (Some(ga), Some(gb)) = (self.geom_id(a), self.geom_id(b)) {
            self.contacts.insert((env, ga, gb));
        }
    }

    pub fn clear_contacts(&mut self) {
        self.contacts.clear();
    }

    /// Last torques written for `env`.
    pub fn controls(&self, env: usize) -> JointVector {
        self.controls[env]
    }

    fn base_pose(&self, env: usize) -> Pose {
        let row = &self.dof_pos[env];
        let p = self.layout.base_pos;
        let q = self.layout.base_quat;
        Pose::new(
            Vector3::new(row[p], row[p + 1], row[p + 2]),
            [row[q], row[q + 1], row[q + 2], row[q + 3]],
        )
    }

    fn joint_slice(row: &[f32], at: usize) -> JointVector {
        let mut out = [0.0; NUM_JOINTS];
        out.copy_from_slice(&row[at..at + NUM_JOINTS]);
        out
    }
}

impl SimBackend for MockSim {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "mock"
    }

    fn num_envs(&self) -> usize {
        self.num_envs
    }

    fn body_id(&self, name: &str) -> Option<BodyId> {
        self.bodies.iter().position(|b| b.name == name).map(BodyId)
    }

    fn geom_id(&self, name: &str) -> Option<GeomId> {
        self.geoms.iter().position(|g| g.name == name).map(GeomId)
    }

    fn sensor_id(&self, name: &str) -> Option<SensorId> {
        self.sensors.iter().position(|s| s.name == name).map(SensorId)
    }

    fn geom_names(&self) -> Vec<String> {
        self.geoms.iter().map(|g| g.name.clone()).collect()
    }

    fn actuator_names(&self) -> Vec<String> {
        self.actuators.clone()
    }

    fn dof_pos_len(&self) -> usize {
        self.dof_pos.first().map_or(0, Vec::len)
    }

    fn dof_vel_len(&self) -> usize {
        self.dof_vel.first().map_or(0, Vec::len)
    }

    fn body_poses(&self, body: BodyId) -> Result<Vec<Pose>, SimError> {
        let entry = self
            .bodies
            .get(body.0)
            .ok_or_else(|| SimError::BodyNotFound(format!("#{}", body.0)))?;
        if self.failing_bodies.contains(&body) {
            return Err(SimError::LookupFailed {
                name: entry.name.clone(),
                reason: "mock failure".into(),
            });
        }
        if entry.name == BASE_BODY {
            return Ok((0..self.num_envs).map(|env| self.base_pose(env)).collect());
        }
        Ok(entry.poses.clone())
    }

    fn geom_positions(&self, geom: GeomId) -> Result<Vec<Vector3<f32>>, SimError> {
        self.geoms
            .get(geom.0)
            .map(|g| g.positions.clone())
            .ok_or_else(|| SimError::GeomNotFound(format!("#{}", geom.0)))
    }

    fn read_sensor(&self, sensor: SensorId) -> Result<SensorReading, SimError> {
        let entry = self
            .sensors
            .get(sensor.0)
            .ok_or_else(|| SimError::SensorNotFound(format!("#{}", sensor.0)))?;
        if self.failing_sensors.contains(&sensor) {
            return Err(SimError::LookupFailed {
                name: entry.name.clone(),
                reason: "mock failure".into(),
            });
        }
        let data = entry.rows.iter().flatten().copied().collect();
        Ok(SensorReading::new(data, entry.rows.len(), entry.width))
    }

    fn joint_positions(&self) -> Vec<JointVector> {
        self.dof_pos
            .iter()
            .map(|row| Self::joint_slice(row, self.layout.joint_pos))
            .collect()
    }

    fn joint_velocities(&self) -> Vec<JointVector> {
        self.dof_vel
            .iter()
            .map(|row| Self::joint_slice(row, self.layout.joint_vel))
            .collect()
    }

    fn actuator_controls(&self) -> Vec<JointVector> {
        self.controls.clone()
    }

    fn colliding_pairs(&self, pairs: &[(GeomId, GeomId)]) -> Vec<bool> {
        (0..self.num_envs)
            .map(|env| {
                pairs.iter().any(|&(a, b)| {
                    self.contacts.contains(&(env, a, b)) || self.contacts.contains(&(env, b, a))
                })
            })
            .collect()
    }

    fn dof_pos(&self, env: usize) -> &[f32] {
        &self.dof_pos[env]
    }

    fn dof_vel(&self, env: usize) -> &[f32] {
        &self.dof_vel[env]
    }

    fn dof_pos_mut(&mut self, env: usize) -> &mut [f32] {
        &mut self.dof_pos[env]
    }

    fn dof_vel_mut(&mut self, env: usize) -> &mut [f32] {
        &mut self.dof_vel[env]
    }

    fn set_actuator_controls(&mut self, env: usize, controls: &JointVector) {
        self.controls[env] = *controls;
    }

    fn forward_kinematics(&mut self) {
        self.fk_calls += 1;
    }

    fn step(&mut self) {
        self.steps += 1;
    }
}
