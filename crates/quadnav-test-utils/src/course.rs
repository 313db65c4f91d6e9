//! Ready-made obstacle courses: a config plus a matching [`MockSim`].

use nalgebra::Vector3;
use quadnav_core::config::{NavConfig, WaypointSpec};
use quadnav_core::sim::Pose;

use crate::mock_sim::MockSim;

/// Base height the robot spawns at with the default config.
pub const ROBOT_HEIGHT: f32 = 0.5;

/// Body name of waypoint `i`.
pub fn waypoint_name(i: usize) -> String {
    format!("wp{i}_body")
}

/// Contact sensor name of waypoint `i`.
pub fn contact_sensor_name(i: usize) -> String {
    format!("{}_contact", waypoint_name(i))
}

/// Config with `n` waypoints in order `0..n` and jitter-free resets.
pub fn course_config(n: usize) -> NavConfig {
    let waypoints = (0..n).map(|i| WaypointSpec::new(waypoint_name(i), i)).collect();
    let mut config = NavConfig::default().with_waypoints(waypoints);
    config.init_state.spawn_range = [0.0, 0.0];
    config.init_state.target_pos_range = [0.0, 0.0];
    config.commands.heading_range = [0.0, 0.0];
    config
}

/// Mock scene with one body and one zeroed contact sensor per waypoint,
/// placed at `positions` at base height, plus a `goal` body at `goal`.
pub fn course_sim(num_envs: usize, positions: &[[f32; 2]], goal: [f32; 2]) -> MockSim {
    let mut sim = MockSim::new(num_envs).with_body("goal", Pose::at(goal[0], goal[1], 0.0));
    for (i, [x, y]) in positions.iter().enumerate() {
        sim = sim
            .with_body(&waypoint_name(i), Pose::at(*x, *y, ROBOT_HEIGHT))
            .with_sensor(&contact_sensor_name(i), vec![0.0]);
    }
    sim
}

/// Touch waypoint `i`'s contact sensor in `env` (or release it).
pub fn touch(sim: &mut MockSim, i: usize, env: usize, on: bool) {
    sim.set_sensor_row(&contact_sensor_name(i), env, &[if on { 1.0 } else { 0.0 }]);
}

/// Teleport the robot base in `env`.
pub fn place_robot(sim: &mut MockSim, env: usize, x: f32, y: f32) {
    sim.set_base_position(env, Vector3::new(x, y, ROBOT_HEIGHT));
}
