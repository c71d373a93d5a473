//! Event cadence module
//!
//! Schedules the intermittent events layered on top of the orbit:
//! - Walkabout: short directional key taps
//! - Jitter: micro-saccade pointer nudges
//! - Stance: a long periodic key hold
//!
//! Each event owns its own interval draw, so the cadences never lock step
//! with each other or with the tick rate.

pub mod scheduler;

use serde::{Deserialize, Serialize};

pub use scheduler::{CadenceAction, CadenceScheduler, FiredEvent, ScheduledEvent};

/// Kinds of scheduled events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Directional key tap
    Walkabout,
    /// Micro-saccade nudge
    Jitter,
    /// Long key hold
    Stance,
}

impl EventKind {
    /// All kinds, in polling order
    pub const ALL: [EventKind; 3] = [EventKind::Walkabout, EventKind::Jitter, EventKind::Stance];

    /// Short label for status lines
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::Walkabout => "walkabout",
            EventKind::Jitter => "micro-saccade",
            EventKind::Stance => "stance",
        }
    }
}
