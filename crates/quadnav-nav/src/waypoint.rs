//! Ordered waypoint metadata.
//!
//! The registry is built once from configuration and never changes. Hot-path
//! code refers to waypoints by their index, which equals their order.

use std::collections::HashSet;

use bevy::prelude::Resource;
use quadnav_core::config::{NavConfig, WaypointSpec};
use quadnav_core::error::ConfigError;

/// Waypoints per course; one bit each in a `u64` progression word.
pub const MAX_WAYPOINTS: usize = 64;

// ---------------------------------------------------------------------------
// Waypoint
// ---------------------------------------------------------------------------

/// A named trigger region on the course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Waypoint {
    /// Body name in the scene.
    pub name: String,
    /// Traversal position, equal to the registry index.
    pub order: usize,
    /// Play the celebration pose when reached.
    pub requires_action: bool,
}

// ---------------------------------------------------------------------------
// WaypointRegistry
// ---------------------------------------------------------------------------

/// Waypoints sorted by order index.
///
/// # Example
///
/// ```
/// use quadnav_core::config::WaypointSpec;
/// use quadnav_nav::waypoint::WaypointRegistry;
///
/// let specs = vec![WaypointSpec::new("b_body", 1), WaypointSpec::new("a_body", 0)];
/// let registry = WaypointRegistry::from_specs(&specs).unwrap();
/// assert_eq!(registry.get(0).unwrap().name, "a_body");
/// assert_eq!(registry.index_of("b_body"), Some(1));
/// ```
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq)]
pub struct WaypointRegistry {
    waypoints: Vec<Waypoint>,
}

impl WaypointRegistry {
    /// Build from configuration entries.
    ///
    /// Names must be unique and order indices must be exactly `0..n`.
    pub fn from_specs(specs: &[WaypointSpec]) -> Result<Self, ConfigError> {
        if specs.len() > MAX_WAYPOINTS {
            return Err(ConfigError::TooManyWaypoints {
                count: specs.len(),
                limit: MAX_WAYPOINTS,
            });
        }

        let mut names = HashSet::with_capacity(specs.len());
        for spec in specs {
            if !names.insert(spec.name.as_str()) {
                return Err(ConfigError::DuplicateWaypoint(spec.name.clone()));
            }
        }

        let mut waypoints: Vec<Waypoint> = specs
            .iter()
            .map(|s| Waypoint {
                name: s.name.clone(),
                order: s.order,
                requires_action: s.requires_action,
            })
            .collect();
        waypoints.sort_by_key(|w| w.order);

        for (expected, wp) in waypoints.iter().enumerate() {
            if wp.order != expected {
                return Err(ConfigError::NonContiguousOrder(expected));
            }
        }

        Ok(Self { waypoints })
    }

    /// Build from the course section of a [`NavConfig`].
    pub fn from_config(config: &NavConfig) -> Result<Self, ConfigError> {
        Self::from_specs(&config.course.waypoints)
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Waypoint> {
        self.waypoints.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Waypoint> {
        self.waypoints.iter()
    }

    /// Index of the waypoint named `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.waypoints.iter().position(|w| w.name == name)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
