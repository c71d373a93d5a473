//! Session state machine
//!
//! Tracks where a session is in its lifecycle. The only way into Stopped is
//! through Stopping, which is where held input gets released.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Nothing engaged
    Idle,
    /// Engaged, waiting out the countdown
    CountingDown,
    /// Tick loop is moving the pointer
    Running,
    /// Draining the last tick and releasing keys
    Stopping,
    /// Session finished
    Stopped,
}

impl SessionState {
    /// Whether a session occupies the engine in this state
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SessionState::CountingDown | SessionState::Running | SessionState::Stopping
        )
    }

    /// Whether `next` is a legal successor
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        matches!(
            (self, next),
            (SessionState::Idle | SessionState::Stopped, SessionState::CountingDown)
                | (SessionState::CountingDown, SessionState::Running)
                | (SessionState::CountingDown | SessionState::Running, SessionState::Stopping)
                | (SessionState::Stopping, SessionState::Stopped)
        )
    }

    /// Lowercase label for status lines
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::CountingDown => "counting down",
            SessionState::Running => "running",
            SessionState::Stopping => "stopping",
            SessionState::Stopped => "stopped",
        }
    }
}

/// Current state plus transition bookkeeping
#[derive(Debug, Clone)]
pub struct StateMachine {
    state: SessionState,
    previous: SessionState,
    transitions: u32,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self {
            state: SessionState::Idle,
            previous: SessionState::Idle,
            transitions: 0,
        }
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn previous(&self) -> SessionState {
        self.previous
    }

    /// Number of accepted transitions
    pub fn transitions(&self) -> u32 {
        self.transitions
    }

    /// Move to `next` if legal; illegal requests are refused and logged
    pub fn advance(&mut self, next: SessionState) -> bool {
        if !self.state.can_transition_to(next) {
            log::warn!(
                "Refused session transition {} -> {}",
                self.state.label(),
                next.label()
            );
            return false;
        }

        log::info!("Session {} -> {}", self.state.label(), next.label());
        self.previous = self.state;
        self.state = next;
        self.transitions += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_lifecycle() {
        let mut machine = StateMachine::new();
        assert_eq!(machine.state(), SessionState::Idle);

        assert!(machine.advance(SessionState::CountingDown));
        assert!(machine.advance(SessionState::Running));
        assert!(machine.advance(SessionState::Stopping));
        assert!(machine.advance(SessionState::Stopped));

        assert_eq!(machine.previous(), SessionState::Stopping);
        assert_eq!(machine.transitions(), 4);
    }

    #[test]
    fn test_stopped_only_through_stopping() {
        for from in [
            SessionState::Idle,
            SessionState::CountingDown,
            SessionState::Running,
        ] {
            assert!(!from.can_transition_to(SessionState::Stopped));
        }
        assert!(SessionState::Stopping.can_transition_to(SessionState::Stopped));
    }

    #[test]
    fn test_abort_during_countdown() {
        let mut machine = StateMachine::new();
        machine.advance(SessionState::CountingDown);
        assert!(machine.advance(SessionState::Stopping));
        assert!(!machine.advance(SessionState::Running));
        assert_eq!(machine.state(), SessionState::Stopping);
    }

    #[test]
    fn test_active_states() {
        assert!(!SessionState::Idle.is_active());
        assert!(SessionState::CountingDown.is_active());
        assert!(SessionState::Running.is_active());
        assert!(SessionState::Stopping.is_active());
        assert!(!SessionState::Stopped.is_active());
    }
}
