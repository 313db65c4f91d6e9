//! Shared test fixtures for quadnav crates.
//!
//! [`MockSim`] stands in for the physics engine; [`course`] builds matching
//! configs and scenes; [`rng`] gives deterministic randomness.

pub mod course;
pub mod mock_sim;
pub mod rng;

pub use course::{course_config, course_sim, place_robot, touch, waypoint_name};
pub use mock_sim::{MockSim, BASE_BODY};
pub use rng::{random_joint_vectors, seeded_rng};
