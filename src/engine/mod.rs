//! Session engine
//!
//! Runs one choreography session at a time: countdown, the fixed-rate tick
//! loop, cancellation and release of held input. Presentation layers drive
//! it through the `ControlDeck` and read the `TelemetryFeed`.

pub mod cancel;
pub mod clock;
pub mod deck;
pub mod session;
pub mod state;
pub mod telemetry;

use crate::config::ConfigError;
use crate::input::EnvironmentError;

pub use cancel::{arm_console_break, disarm_console_break, CancelToken};
pub use clock::{MonotonicClock, TickClock, TickPacer, VirtualClock, MIN_TICK_PERIOD};
pub use deck::ControlDeck;
pub use session::{Session, SessionPlan, SessionReport, DEFAULT_TICK_PERIOD};
pub use state::{SessionState, StateMachine};
pub use telemetry::{LastEvent, Telemetry, TelemetryFeed};

/// Reasons a session could not start; the engine stays idle
#[derive(Debug, thiserror::Error)]
pub enum EngageError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Environment unavailable: {0}")]
    Environment(#[from] EnvironmentError),
    #[error("A session is already running")]
    AlreadyRunning,
    #[error("Failed to start session thread: {0}")]
    Spawn(#[source] std::io::Error),
}
