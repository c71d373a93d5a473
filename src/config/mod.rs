//! Configuration module
//!
//! Holds the motion profile that shapes a session, its key/value option
//! form used by presentation layers, and the validation rules applied
//! before a session is allowed to start.

pub mod options;
pub mod profile;

pub use options::{parse_assignment, OPTION_KEYS};
pub use profile::{
    IntervalWindow, JitterSettings, MotionProfile, StanceSettings, WalkaboutSettings,
};

/// Configuration errors
///
/// Any of these keeps the session idle.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name}: window minimum {min} exceeds maximum {max}")]
    InvalidWindow { name: &'static str, min: f64, max: f64 },
    #[error("{field} must not be negative (got {value})")]
    Negative { field: &'static str, value: f64 },
    #[error("{field} must be a finite number (got {value})")]
    NotFinite { field: &'static str, value: f64 },
    #[error(
        "orbit radius {radius} px plus margin {margin} px exceeds half the usable screen ({limit} px)"
    )]
    RadiusExceedsScreen { radius: f64, margin: f64, limit: f64 },
    #[error("Unknown option: {0}")]
    UnknownOption(String),
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
    #[error("Expected key=value, got {0:?}")]
    MalformedAssignment(String),
    #[error("Failed to access profile file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse profile: {0}")]
    Parse(#[from] serde_json::Error),
}
