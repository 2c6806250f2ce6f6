//! Configuration / loading errors. Nothing in the per-tick path returns these.

use thiserror::Error;

use crate::dynamics::types::Corner;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unsupported config version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f32 },

    #[error("{field} must be within [{min}, {max}], got {value}")]
    OutOfRange { field: &'static str, value: f32, min: f32, max: f32 },

    #[error("gearbox needs at least one forward gear")]
    NoGears,

    #[error("gearbox has {count} forward gears; at most {max} are supported")]
    TooManyGears { count: usize, max: u8 },

    #[error("idle rpm {idle} must be below max rpm {max}")]
    RpmBounds { idle: f32, max: f32 },

    #[error("wheel {0} has no physical parameters; it will contribute no force")]
    MissingWheel(Corner),

    #[error("wheel {corner} is invalid ({reason}); it will contribute no force")]
    InvalidWheel { corner: Corner, reason: &'static str },

    #[error("wheel {0} is configured more than once")]
    DuplicateWheel(Corner),
}

impl ConfigError {
    /// Per-wheel issues disable one wheel; everything else rejects the config.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ConfigError::MissingWheel(_) | ConfigError::InvalidWheel { .. })
    }
}

/// Errors on the host's loading path.
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to parse vehicle config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read vehicle config: {0}")]
    Io(#[from] std::io::Error),
}
