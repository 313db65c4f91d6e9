//! Bevy integration: exposes the navigation configuration as resources.

use bevy::prelude::*;
use quadnav_core::config::NavConfig;
use quadnav_core::error::ConfigError;
use quadnav_core::seed::SeedHierarchy;
use quadnav_nav::waypoint::WaypointRegistry;

/// Inserts [`NavConfig`], the built [`WaypointRegistry`] and the run's
/// [`SeedHierarchy`] so systems of a host app can read them.
pub struct NavigationPlugin {
    config: NavConfig,
    registry: WaypointRegistry,
}

impl NavigationPlugin {
    /// Validate `config` and build its registry.
    pub fn new(config: NavConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let registry = WaypointRegistry::from_config(&config)?;
        Ok(Self { config, registry })
    }
}

impl Plugin for NavigationPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(self.config.clone())
            .insert_resource(self.registry.clone())
            .insert_resource(SeedHierarchy::new(self.config.seed));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
