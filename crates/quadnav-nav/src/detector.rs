//! Waypoint arrival detection: contact sensor first, root distance second.
//!
//! Every optional handle (contact sensor, waypoint body, trigger geom) is
//! resolved once when the detector is built. Per step the detector only
//! branches on which handles exist.

use bevy::log::warn;
use nalgebra::{Vector2, Vector3};
use quadnav_core::config::{CourseSettings, DetectionSettings, SensorNames};
use quadnav_core::sim::{BodyId, GeomId, SensorId, SimBackend};

use crate::progression::ProgressionTracker;
use crate::waypoint::WaypointRegistry;

/// Resolved capabilities of one waypoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct WaypointHandles {
    name: String,
    contact: Option<SensorId>,
    body: Option<BodyId>,
    trigger: Option<GeomId>,
}

/// Decides, per environment, whether the robot has reached a waypoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ReachDetector {
    waypoints: Vec<WaypointHandles>,
    contact_threshold: f32,
    fallback_radius: f32,
}

impl ReachDetector {
    /// Resolve the handles of every registered waypoint.
    ///
    /// Missing handles are logged once here; detection then degrades to
    /// whatever remains.
    pub fn resolve<S: SimBackend + ?Sized>(
        sim: &S,
        registry: &WaypointRegistry,
        course: &CourseSettings,
        sensors: &SensorNames,
        detection: &DetectionSettings,
    ) -> Self {
        let waypoints = registry
            .iter()
            .map(|wp| {
                let contact_name = format!("{}{}", wp.name, sensors.waypoint_contact_suffix);
                let contact = sim.sensor_id(&contact_name);
                if contact.is_none() {
                    warn!("waypoint {}: no contact sensor {contact_name}, using distance only", wp.name);
                }
                let body = sim.body_id(&wp.name);
                if body.is_none() {
                    warn!("waypoint {}: body not found, distance fallback disabled", wp.name);
                }
                let trigger = course
                    .trigger_suffix
                    .trigger_name(&wp.name)
                    .and_then(|geom| sim.geom_id(&geom));
                WaypointHandles {
                    name: wp.name.clone(),
                    contact,
                    body,
                    trigger,
                }
            })
            .collect();
        Self {
            waypoints,
            contact_threshold: detection.contact_threshold,
            fallback_radius: detection.fallback_radius,
        }
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Number of waypoints with a resolved contact sensor.
    pub fn contact_sensor_count(&self) -> usize {
        self.waypoints.iter().filter(|p| p.contact.is_some()).count()
    }

    /// Raw reached mask for `waypoint`.
    ///
    /// Contact counts when any sensor channel exceeds the threshold in
    /// magnitude. Environments not caught by contact and not in `already`
    /// fall back to `|root - waypoint| < radius`. A sensor read failure
    /// falls through to distance silently; a body pose failure skips the
    /// fallback for this call only.
    pub fn detect<S: SimBackend + ?Sized>(
        &self,
        sim: &S,
        waypoint: usize,
        robot_positions: &[Vector3<f32>],
        already: &[bool],
    ) -> Vec<bool> {
        let num_envs = robot_positions.len();
        let mut reached = vec![false; num_envs];
        let Some(handles) = self.waypoints.get(waypoint) else {
            return reached;
        };

        if let Some(reading) = handles
            .contact
            .and_then(|id| sim.read_sensor(id).ok())
            .filter(|r| r.check_rows(num_envs, &handles.name).is_ok())
        {
            for (env, slot) in reached.iter_mut().enumerate() {
                *slot = reading.any_above(env, self.contact_threshold);
            }
        }

        let pending: Vec<bool> = (0..num_envs)
            .map(|env| !reached[env] && !already.get(env).copied().unwrap_or(false))
            .collect();
        if !pending.contains(&true) {
            return reached;
        }
        let Some(body) = handles.body else {
            return reached;
        };
        let poses = match sim.body_poses(body) {
            Ok(poses) => poses,
            Err(err) => {
                warn!("waypoint {}: position lookup failed, skipping fallback: {err}", handles.name);
                return reached;
            }
        };
        for (env, slot) in reached.iter_mut().enumerate() {
            if !pending[env] {
                continue;
            }
            if let Some(pose) = poses.get(env) {
                *slot = (robot_positions[env] - pose.position).norm() < self.fallback_radius;
            }
        }
        reached
    }

    /// Planar goal position of `waypoint` in `env`.
    ///
    /// Prefers the trigger geom, then the body. Non-finite positions count
    /// as unresolved.
    pub fn waypoint_position<S: SimBackend + ?Sized>(
        &self,
        sim: &S,
        waypoint: usize,
        env: usize,
    ) -> Option<Vector2<f32>> {
        let handles = self.waypoints.get(waypoint)?;
        handles
            .trigger
            .and_then(|g| sim.geom_positions(g).ok())
            .and_then(|p| p.get(env).map(|p| p.xy()))
            .filter(|p| finite(p))
            .or_else(|| self.body_position(sim, waypoint, env))
    }

    /// Planar position of `waypoint`'s body in `env`, ignoring the trigger
    /// geom. Reset targets are drawn around this.
    pub fn body_position<S: SimBackend + ?Sized>(
        &self,
        sim: &S,
        waypoint: usize,
        env: usize,
    ) -> Option<Vector2<f32>> {
        let body = self.waypoints.get(waypoint)?.body?;
        sim.body_poses(body)
            .ok()
            .and_then(|p| p.get(env).map(|pose| pose.position.xy()))
            .filter(|p| finite(p))
    }

    /// Position of the first unvisited waypoint for `env` that resolves.
    ///
    /// Unresolvable waypoints are skipped over; `None` once nothing
    /// unvisited resolves.
    pub fn next_goal<S: SimBackend + ?Sized>(
        &self,
        sim: &S,
        tracker: &ProgressionTracker,
        env: usize,
    ) -> Option<Vector2<f32>> {
        (0..self.waypoints.len())
            .filter(|&wp| !tracker.is_visited(env, wp))
            .find_map(|wp| self.waypoint_position(sim, wp, env))
    }
}

fn finite(p: &Vector2<f32>) -> bool {
    p.iter().all(|c| c.is_finite())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
