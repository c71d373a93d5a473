//! Input injection module
//!
//! The engine only talks to the desktop through two small traits:
//! - `InputInjector`: relative pointer moves and key presses
//! - `DisplayReader`: pointer position and monitor geometry
//!
//! Input sent this way may not reach foreground applications running with
//! higher privileges or in exclusive full-screen mode. That is an OS
//! privilege boundary and is not worked around here.

pub mod simulated;
#[cfg(windows)]
pub mod windows;

use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::motion::{DisplayArea, Point};

pub use simulated::{KeyEvent, SimulatedDesktop};

/// Keys the engine may press
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Key {
    W,
    A,
    S,
    D,
    B,
}

impl Key {
    /// Windows virtual-key code
    pub fn virtual_code(&self) -> u16 {
        match self {
            Key::W => 0x57,
            Key::A => 0x41,
            Key::S => 0x53,
            Key::D => 0x44,
            Key::B => 0x42,
        }
    }

    /// Single-letter label
    pub fn label(&self) -> char {
        match self {
            Key::W => 'W',
            Key::A => 'A',
            Key::S => 'S',
            Key::D => 'D',
            Key::B => 'B',
        }
    }
}

/// Delivers synthetic input to the OS
pub trait InputInjector {
    /// Move the pointer by a relative offset
    fn move_relative(&mut self, dx: i32, dy: i32) -> Result<(), InjectionError>;

    /// Press a key and leave it down
    fn key_down(&mut self, key: Key) -> Result<(), InjectionError>;

    /// Release a key
    fn key_up(&mut self, key: Key) -> Result<(), InjectionError>;

    /// Press and release a key, blocking for `duration`
    ///
    /// The release is attempted even if the press failed, so a key is never
    /// left down by this call.
    fn tap_key(&mut self, key: Key, duration: Duration) -> Result<(), InjectionError> {
        let pressed = self.key_down(key);
        if pressed.is_ok() {
            thread::sleep(duration);
        }
        let released = self.key_up(key);
        pressed.and(released)
    }
}

/// Reads pointer and monitor state
pub trait DisplayReader {
    /// Current pointer position
    fn cursor_position(&self) -> Result<Point, EnvironmentError>;

    /// Geometry of the active monitor
    fn display_area(&self) -> Result<DisplayArea, EnvironmentError>;
}

/// A complete desktop backend the engine can own on its loop thread
pub trait Desktop: InputInjector + DisplayReader + Send {}

impl<T: InputInjector + DisplayReader + Send> Desktop for T {}

/// A single input call was refused
#[derive(Debug, Clone, thiserror::Error)]
pub enum InjectionError {
    #[error("Input rejected: {0}")]
    Rejected(String),
    #[error("OS error during {action}: {message}")]
    Os {
        action: &'static str,
        message: String,
    },
}

/// The desktop could not be inspected
#[derive(Debug, Clone, thiserror::Error)]
pub enum EnvironmentError {
    #[error("Cursor position unavailable: {0}")]
    CursorUnavailable(String),
    #[error("Display metrics unavailable: {0}")]
    DisplayUnavailable(String),
    #[error("Hotkey registration failed: {0}")]
    Hotkey(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_codes_match_letters() {
        for key in [Key::W, Key::A, Key::S, Key::D, Key::B] {
            assert_eq!(key.virtual_code(), key.label() as u16);
        }
    }

    #[test]
    fn test_tap_key_releases() {
        let desktop = SimulatedDesktop::new(DisplayArea::sized(800.0, 600.0), Point::new(10.0, 10.0));
        let mut injector = desktop.clone();
        injector.tap_key(Key::A, Duration::from_millis(1)).unwrap();

        assert!(desktop.held_keys().is_empty());
        assert_eq!(
            desktop.key_log(),
            vec![KeyEvent::Down(Key::A), KeyEvent::Up(Key::A)]
        );
    }

    #[test]
    fn test_tap_key_releases_after_failed_press() {
        let desktop = SimulatedDesktop::new(DisplayArea::sized(800.0, 600.0), Point::new(10.0, 10.0));
        desktop.fail_next_keys(1);
        let mut injector = desktop.clone();

        assert!(injector.tap_key(Key::D, Duration::from_millis(1)).is_err());
        assert!(desktop.held_keys().is_empty());
        assert_eq!(desktop.key_log(), vec![KeyEvent::Up(Key::D)]);
    }
}
