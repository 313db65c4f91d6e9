use thiserror::Error;

/// Top-level error type for quadnav.
#[derive(Debug, Error)]
pub enum NavError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Simulation error: {0}")]
    Simulation(#[from] SimError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Duplicate waypoint name: {0}")]
    DuplicateWaypoint(String),

    #[error("Waypoint order indices must be contiguous from 0: missing index {0}")]
    NonContiguousOrder(usize),

    #[error("Too many waypoints: {count} (limit {limit})")]
    TooManyWaypoints { count: usize, limit: usize },
}

impl ConfigError {
    /// Shorthand for [`ConfigError::InvalidValue`].
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_owned(),
            message: message.into(),
        }
    }
}

/// Simulator lookup and read errors.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Body not found: {0}")]
    BodyNotFound(String),

    #[error("Geom not found: {0}")]
    GeomNotFound(String),

    #[error("Sensor not found: {0}")]
    SensorNotFound(String),

    #[error("Lookup failed for {name}: {reason}")]
    LookupFailed { name: String, reason: String },

    #[error("Sensor {name} has {got} rows, expected {expected} or 1")]
    SensorShape {
        name: String,
        expected: usize,
        got: usize,
    },
}

/// Action validation errors.
///
/// Copy + static messages for cheap propagation in hot paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Action dimension mismatch: expected {expected}, got {got}")]
    ActionDimMismatch { expected: usize, got: usize },

    #[error("Action batch size mismatch: expected {expected}, got {got}")]
    BatchSizeMismatch { expected: usize, got: usize },

    #[error("Action contains NaN")]
    ActionContainsNan,

    #[error("Action contains Inf")]
    ActionContainsInf,
}
