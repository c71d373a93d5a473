//! Live session telemetry
//!
//! The session thread publishes a snapshot every tick; presentation layers
//! read copies whenever they like. Readers never hold the lock across a
//! tick.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

use super::SessionState;
use crate::cadence::EventKind;
use crate::motion::Point;

/// Most recent scheduled event
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LastEvent {
    pub kind: EventKind,
    /// Session time it fired (seconds)
    pub at: f64,
}

/// Snapshot of a session's progress
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Telemetry {
    pub state: SessionState,
    /// Seconds since the orbit started
    pub elapsed: f64,
    /// Seconds left before the orbit starts
    pub countdown_remaining: f64,
    /// Displacement of the pointer from the focal point
    pub offset: Point,
    /// Clamped pointer target
    pub position: Point,
    pub last_event: Option<LastEvent>,
    pub ticks: u64,
    pub injection_failures: u64,
    /// Human-readable status, also used to surface rejected starts
    pub status: String,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self {
            state: SessionState::Idle,
            elapsed: 0.0,
            countdown_remaining: 0.0,
            offset: Point::default(),
            position: Point::default(),
            last_event: None,
            ticks: 0,
            injection_failures: 0,
            status: "Idle".to_string(),
        }
    }
}

impl Telemetry {
    /// One-line summary for the console
    pub fn status_line(&self) -> String {
        match self.state {
            SessionState::CountingDown => {
                format!("Starting in {:.1}s", self.countdown_remaining.max(0.0))
            }
            SessionState::Running => {
                let last = self
                    .last_event
                    .map(|event| format!("{} at {:.1}s", event.kind.label(), event.at))
                    .unwrap_or_else(|| "none".to_string());
                format!(
                    "t={:.1}s offset=({:+.0}, {:+.0}) last event: {} failures: {}",
                    self.elapsed,
                    self.offset.x,
                    self.offset.y,
                    last,
                    self.injection_failures
                )
            }
            _ => self.status.clone(),
        }
    }
}

/// Shared, lock-protected telemetry slot
#[derive(Debug, Clone, Default)]
pub struct TelemetryFeed {
    inner: Arc<Mutex<Telemetry>>,
}

impl TelemetryFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot
    pub fn publish(&self, telemetry: Telemetry) {
        *self.lock() = telemetry;
    }

    /// Modify the snapshot in place
    pub fn update(&self, f: impl FnOnce(&mut Telemetry)) {
        f(&mut self.lock());
    }

    /// Copy of the latest snapshot
    pub fn snapshot(&self) -> Telemetry {
        self.lock().clone()
    }

    /// Latest snapshot as JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&*self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Telemetry> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_shares_snapshots() {
        let feed = TelemetryFeed::new();
        let reader = feed.clone();

        feed.update(|t| {
            t.state = SessionState::Running;
            t.ticks = 42;
        });

        let snapshot = reader.snapshot();
        assert_eq!(snapshot.state, SessionState::Running);
        assert_eq!(snapshot.ticks, 42);
    }

    #[test]
    fn test_status_line_by_state() {
        let mut t = Telemetry {
            state: SessionState::CountingDown,
            countdown_remaining: 3.3,
            ..Telemetry::default()
        };
        assert_eq!(t.status_line(), "Starting in 3.3s");

        t.state = SessionState::Running;
        t.elapsed = 12.0;
        t.last_event = Some(LastEvent {
            kind: EventKind::Walkabout,
            at: 10.5,
        });
        let line = t.status_line();
        assert!(line.contains("walkabout at 10.5s"));

        t.state = SessionState::Idle;
        t.status = "Start rejected".to_string();
        assert_eq!(t.status_line(), "Start rejected");
    }

    #[test]
    fn test_telemetry_serializes() {
        let feed = TelemetryFeed::new();
        let json = feed.to_json().unwrap();
        assert!(json.contains("\"state\":\"Idle\""));
        assert!(json.contains("\"last_event\":null"));
    }
}
