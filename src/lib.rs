//! Idle Orbit - procedural idle-presence pointer choreography
//!
//! This library moves the pointer along a slowly drifting orbit around the
//! point where it was engaged, interleaves sparse key taps and small jitter
//! nudges on independent cadences, and stops within one tick of a cancel
//! request.
//!
//! ## Layout
//!
//! - `config`: the motion profile and its key/value option contract
//! - `motion`: smooth noise, the orbit path and screen clamping
//! - `cadence`: scheduling of walkabout, jitter and stance events
//! - `input`: the desktop injection seam, with simulated and Windows backends
//! - `engine`: the session loop, cancellation, telemetry and the control deck

pub mod cadence;
pub mod config;
pub mod engine;
pub mod input;
pub mod motion;

pub use config::{ConfigError, MotionProfile};
pub use engine::{
    CancelToken, ControlDeck, EngageError, Session, SessionPlan, SessionReport, SessionState,
    Telemetry, TelemetryFeed,
};
pub use input::{Desktop, SimulatedDesktop};
pub use motion::{OrbitPath, Point};
