//! Per-step robot state extraction.
//!
//! Optional scene capabilities (sensors, foot bodies, ground geoms) are
//! resolved once into [`SceneHandles`]. [`SceneHandles::extract`] then reads
//! each batched source once per step and splits it into one [`RobotState`]
//! per environment.

use bevy::log::{info, warn};
use nalgebra::{Vector2, Vector3};
use quadnav_core::config::{CourseSettings, SensorNames};
use quadnav_core::math::{heading, normalize_quat_or_identity, projected_gravity, world_to_body, QuatXyzw};
use quadnav_core::sim::{BodyId, DofLayout, GeomId, SensorId, SensorReading, SimBackend};
use quadnav_core::types::{JointVector, Leg, NUM_LEGS};

// ---------------------------------------------------------------------------
// RobotState
// ---------------------------------------------------------------------------

/// Snapshot of one environment after a physics step.
#[derive(Debug, Clone, PartialEq)]
pub struct RobotState {
    pub position: Vector3<f32>,
    /// Unit `[x, y, z, w]`.
    pub orientation: QuatXyzw,
    pub heading: f32,
    /// Base linear velocity in the world frame.
    pub world_lin_vel: Vector3<f32>,
    /// Base linear velocity in the body frame.
    pub local_lin_vel: Vector3<f32>,
    /// Body angular velocity.
    pub gyro: Vector3<f32>,
    /// Projected gravity computed from the orientation.
    pub gravity: Vector3<f32>,
    /// Gravity sensor reading; `None` when the sensor is missing or failed.
    pub gravity_reading: Option<Vector3<f32>>,
    /// Projected gravity used for slope reward features: the sensor reading,
    /// else the orientation-derived gravity.
    pub slope_gravity: Vector3<f32>,
    pub joint_pos: JointVector,
    pub joint_vel: JointVector,
    /// Actuator torques of the last step.
    pub torques: JointVector,
    /// World foot positions in [`Leg::ALL`] order; `None` when unresolved.
    pub feet: [Option<Vector3<f32>>; NUM_LEGS],
}

impl RobotState {
    pub fn planar_position(&self) -> Vector2<f32> {
        self.position.xy()
    }

    /// All four feet resolved.
    pub fn all_feet(&self) -> Option<[Vector3<f32>; NUM_LEGS]> {
        let [fr, fl, rr, rl] = self.feet;
        Some([fr?, fl?, rr?, rl?])
    }
}

// ---------------------------------------------------------------------------
// SceneHandles
// ---------------------------------------------------------------------------

/// Where a foot position comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FootHandle {
    Sensor(SensorId),
    Body(BodyId),
    Missing,
}

/// Optional scene capabilities resolved at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneHandles {
    pub layout: DofLayout,
    pub local_linvel: Option<SensorId>,
    pub gyro: Option<SensorId>,
    pub gravity: Option<SensorId>,
    pub base_contact: Option<SensorId>,
    pub feet: [FootHandle; NUM_LEGS],
    pub goal: Option<BodyId>,
    /// Base geom / ground geom pairs that count as a fall.
    pub base_ground_pairs: Vec<(GeomId, GeomId)>,
}

impl SceneHandles {
    pub fn resolve<S: SimBackend + ?Sized>(
        sim: &S,
        sensors: &SensorNames,
        course: &CourseSettings,
    ) -> Self {
        let local_linvel = sim.sensor_id(&sensors.local_linvel);
        let gyro = sim.sensor_id(&sensors.gyro);
        let gravity = sim.sensor_id(&sensors.projected_gravity);
        let base_contact = sim.sensor_id(&sensors.base_contact);

        let feet = Leg::ALL.map(|leg| {
            let sensor = format!("{}{}", leg.prefix(), sensors.foot_pos_suffix);
            let body = format!("{}{}", leg.prefix(), sensors.foot_body_suffix);
            sim.sensor_id(&sensor)
                .map(FootHandle::Sensor)
                .or_else(|| sim.body_id(&body).map(FootHandle::Body))
                .unwrap_or(FootHandle::Missing)
        });

        let goal = sim.body_id(&course.goal_body);
        let base_ground_pairs = resolve_ground_pairs(sim, course);

        let handles = Self {
            layout: DofLayout::STANDARD,
            local_linvel,
            gyro,
            gravity,
            base_contact,
            feet,
            goal,
            base_ground_pairs,
        };
        handles.log_missing(sensors, course);
        handles
    }

    fn log_missing(&self, sensors: &SensorNames, course: &CourseSettings) {
        if self.local_linvel.is_none() {
            warn!("sensor {} not found, rotating the world velocity instead", sensors.local_linvel);
        }
        if self.gyro.is_none() {
            warn!("sensor {} not found, using base angular DOF velocity", sensors.gyro);
        }
        if self.gravity.is_none() {
            warn!("sensor {} not found, slope from base orientation", sensors.projected_gravity);
        }
        if self.base_contact.is_none() {
            warn!("sensor {} not found, base contact termination disabled", sensors.base_contact);
        }
        if self.goal.is_none() {
            warn!("goal body {} not found", course.goal_body);
        }
        let feet = self
            .feet
            .iter()
            .filter(|f| !matches!(f, FootHandle::Missing))
            .count();
        if feet < NUM_LEGS {
            warn!("{feet}/{NUM_LEGS} feet resolved, gait terms disabled");
        }
        if self.base_ground_pairs.is_empty() {
            warn!("no base/ground geom pairs resolved");
        }
        info!(
            "scene: {feet} feet, {} base/ground pairs, gravity sensor {}",
            self.base_ground_pairs.len(),
            self.gravity.is_some()
        );
    }

    /// Read every source once and split into per-environment snapshots.
    pub fn extract<S: SimBackend + ?Sized>(&self, sim: &S) -> Vec<RobotState> {
        let num_envs = sim.num_envs();
        let local_linvel = read_vec3(sim, self.local_linvel, num_envs);
        let gyro = read_vec3(sim, self.gyro, num_envs);
        let gravity = read_vec3(sim, self.gravity, num_envs);
        let feet = self.feet.map(|handle| FootSource::read(sim, handle, num_envs));
        let joint_pos = sim.joint_positions();
        let joint_vel = sim.joint_velocities();
        let torques = sim.actuator_controls();

        (0..num_envs)
            .map(|env| {
                let pos = sim.dof_pos(env);
                let vel = sim.dof_vel(env);
                let l = &self.layout;
                let position = vec3_at(pos, l.base_pos);
                let orientation = normalize_quat_or_identity(quat_at(pos, l.base_quat));
                let world_lin_vel = vec3_at(vel, l.base_vel);
                let body_ang_vel = vec3_at(vel, l.base_vel + 3);
                let quat_gravity = projected_gravity(orientation);
                let gravity_reading = gravity.as_ref().and_then(|r| r.vec3(env));

                RobotState {
                    position,
                    orientation,
                    heading: heading(orientation),
                    world_lin_vel,
                    local_lin_vel: local_linvel
                        .as_ref()
                        .and_then(|r| r.vec3(env))
                        .unwrap_or_else(|| world_to_body(orientation, &world_lin_vel)),
                    gyro: gyro.as_ref().and_then(|r| r.vec3(env)).unwrap_or(body_ang_vel),
                    gravity: quat_gravity,
                    gravity_reading,
                    slope_gravity: gravity_reading.unwrap_or(quat_gravity),
                    joint_pos: joint_pos.get(env).copied().unwrap_or_default(),
                    joint_vel: joint_vel.get(env).copied().unwrap_or_default(),
                    torques: torques.get(env).copied().unwrap_or_default(),
                    feet: feet.each_ref().map(|f| f.get(env)),
                }
            })
            .collect()
    }
}

fn resolve_ground_pairs<S: SimBackend + ?Sized>(sim: &S, course: &CourseSettings) -> Vec<(GeomId, GeomId)> {
    let ground: Vec<GeomId> = sim
        .geom_names()
        .iter()
        .filter(|name| {
            *name == &course.ground_name
                || course.ground_prefixes.iter().any(|p| name.starts_with(p.as_str()))
        })
        .filter_map(|name| sim.geom_id(name))
        .collect();
    course
        .base_geoms
        .iter()
        .filter_map(|name| sim.geom_id(name))
        .flat_map(|base| ground.iter().map(move |&g| (base, g)))
        .collect()
}

fn read_vec3<S: SimBackend + ?Sized>(
    sim: &S,
    sensor: Option<SensorId>,
    num_envs: usize,
) -> Option<SensorReading> {
    sim.read_sensor(sensor?)
        .ok()
        .filter(|r| r.width() >= 3 && r.check_rows(num_envs, "vec3").is_ok())
}

fn vec3_at(row: &[f32], at: usize) -> Vector3<f32> {
    match row.get(at..at + 3) {
        Some([x, y, z]) => Vector3::new(*x, *y, *z),
        _ => Vector3::zeros(),
    }
}

fn quat_at(row: &[f32], at: usize) -> QuatXyzw {
    match row.get(at..at + 4) {
        Some([x, y, z, w]) => [*x, *y, *z, *w],
        _ => [0.0; 4],
    }
}

/// One foot's batched positions for the current step.
enum FootSource {
    Reading(SensorReading),
    Poses(Vec<Vector3<f32>>),
    None,
}

impl FootSource {
    fn read<S: SimBackend + ?Sized>(sim: &S, handle: FootHandle, num_envs: usize) -> Self {
        match handle {
            FootHandle::Sensor(id) => {
                read_vec3(sim, Some(id), num_envs).map_or(Self::None, Self::Reading)
            }
            FootHandle::Body(id) => sim.body_poses(id).map_or(Self::None, |poses| {
                Self::Poses(poses.into_iter().map(|p| p.position).collect())
            }),
            FootHandle::Missing => Self::None,
        }
    }

    fn get(&self, env: usize) -> Option<Vector3<f32>> {
        match self {
            Self::Reading(r) => r.vec3(env),
            Self::Poses(p) => p.get(env).copied(),
            Self::None => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
