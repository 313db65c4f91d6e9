//! Instantaneous terrain classification from body-frame gravity.

use nalgebra::Vector3;
use quadnav_core::math::signed_slope;

/// Terrain regime selecting the controller gain set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TerrainClass {
    #[default]
    Normal,
    Downhill,
}

impl TerrainClass {
    pub const fn is_downhill(self) -> bool {
        matches!(self, Self::Downhill)
    }
}

/// Classifies signed slope against an open downhill band.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TerrainClassifier {
    low: f32,
    high: f32,
}

impl TerrainClassifier {
    /// Band bounds in radians; downhill iff `low < slope < high`.
    pub const fn new(low: f32, high: f32) -> Self {
        Self { low, high }
    }

    pub fn from_degrees(band: [f32; 2]) -> Self {
        Self::new(band[0].to_radians(), band[1].to_radians())
    }

    pub fn classify_slope(&self, slope: f32) -> TerrainClass {
        if self.low < slope && slope < self.high {
            TerrainClass::Downhill
        } else {
            TerrainClass::Normal
        }
    }

    /// Classify from a gravity reading. A missing or corrupt reading is
    /// treated as normal terrain.
    pub fn classify(&self, gravity: Option<&Vector3<f32>>) -> TerrainClass {
        match gravity {
            Some(g) if g.iter().all(|c| c.is_finite()) => self.classify_slope(signed_slope(g)),
            _ => TerrainClass::Normal,
        }
    }
}

impl Default for TerrainClassifier {
    fn default() -> Self {
        Self::from_degrees([-45.0, -5.0])
    }
}
