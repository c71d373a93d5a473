//! In-memory desktop backend
//!
//! Tracks a virtual pointer and keyboard so sessions can run without
//! touching the real OS: used by dry runs and by the tests. Clones share
//! the same state, so a caller can keep a handle while the engine owns the
//! other one.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{DisplayReader, EnvironmentError, InjectionError, InputInjector, Key};
use crate::motion::{DisplayArea, Point};

/// A key transition that reached the virtual keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Down(Key),
    Up(Key),
}

type MoveHook = Box<dyn FnMut(u64) + Send>;

struct SimState {
    area: DisplayArea,
    cursor: Point,
    moves: u64,
    trail: Vec<Point>,
    held: BTreeSet<Key>,
    key_log: Vec<KeyEvent>,
    failing_moves: u32,
    failing_keys: u32,
    cursor_error: bool,
    display_error: bool,
    on_move: Option<MoveHook>,
}

/// Shared virtual desktop
#[derive(Clone)]
pub struct SimulatedDesktop {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedDesktop {
    /// Create a desktop with the pointer at `cursor`
    pub fn new(area: DisplayArea, cursor: Point) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                area,
                cursor,
                moves: 0,
                trail: Vec::new(),
                held: BTreeSet::new(),
                key_log: Vec::new(),
                failing_moves: 0,
                failing_keys: 0,
                cursor_error: false,
                display_error: false,
                on_move: None,
            })),
        }
    }

    /// Primary 1920x1080 monitor with the pointer in the middle
    pub fn full_hd() -> Self {
        let area = DisplayArea::sized(1920.0, 1080.0);
        Self::new(area, area.center())
    }

    /// Current virtual pointer position
    pub fn cursor(&self) -> Point {
        self.lock().cursor
    }

    /// Number of accepted pointer moves
    pub fn moves(&self) -> u64 {
        self.lock().moves
    }

    /// Pointer position after every accepted move
    pub fn trail(&self) -> Vec<Point> {
        self.lock().trail.clone()
    }

    /// Keys currently down
    pub fn held_keys(&self) -> Vec<Key> {
        self.lock().held.iter().copied().collect()
    }

    /// Every accepted key transition in order
    pub fn key_log(&self) -> Vec<KeyEvent> {
        self.lock().key_log.clone()
    }

    /// Reject the next `count` pointer moves
    pub fn fail_next_moves(&self, count: u32) {
        self.lock().failing_moves = count;
    }

    /// Reject the next `count` key transitions
    pub fn fail_next_keys(&self, count: u32) {
        self.lock().failing_keys = count;
    }

    /// Make cursor queries fail
    pub fn lose_cursor(&self) {
        self.lock().cursor_error = true;
    }

    /// Make display queries fail
    pub fn lose_display(&self) {
        self.lock().display_error = true;
    }

    /// Run `hook` with the running move count after every accepted move
    pub fn on_move(&self, hook: impl FnMut(u64) + Send + 'static) {
        self.lock().on_move = Some(Box::new(hook));
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        // A panicking test thread must not hide the state from the others
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn key_transition(&mut self, event: KeyEvent) -> Result<(), InjectionError> {
        let mut state = self.lock();
        if state.failing_keys > 0 {
            state.failing_keys -= 1;
            return Err(InjectionError::Rejected(format!("{:?}", event)));
        }
        match event {
            KeyEvent::Down(key) => state.held.insert(key),
            KeyEvent::Up(key) => state.held.remove(&key),
        };
        state.key_log.push(event);
        Ok(())
    }
}

impl InputInjector for SimulatedDesktop {
    fn move_relative(&mut self, dx: i32, dy: i32) -> Result<(), InjectionError> {
        let (count, mut hook) = {
            let mut state = self.lock();
            if state.failing_moves > 0 {
                state.failing_moves -= 1;
                return Err(InjectionError::Rejected(format!("move by ({}, {})", dx, dy)));
            }

            // The OS keeps the pointer on the monitor
            let area = state.area;
            let x = (state.cursor.x + dx as f64).clamp(area.x, area.x + area.width - 1.0);
            let y = (state.cursor.y + dy as f64).clamp(area.y, area.y + area.height - 1.0);
            state.cursor = Point::new(x, y);
            state.moves += 1;
            let cursor = state.cursor;
            state.trail.push(cursor);
            (state.moves, state.on_move.take())
        };

        // Called outside the lock so the hook may inspect the desktop
        if let Some(hook) = hook.as_mut() {
            hook(count);
        }
        if let Some(hook) = hook {
            self.lock().on_move.get_or_insert(hook);
        }
        Ok(())
    }

    fn key_down(&mut self, key: Key) -> Result<(), InjectionError> {
        self.key_transition(KeyEvent::Down(key))
    }

    fn key_up(&mut self, key: Key) -> Result<(), InjectionError> {
        self.key_transition(KeyEvent::Up(key))
    }
}

impl DisplayReader for SimulatedDesktop {
    fn cursor_position(&self) -> Result<Point, EnvironmentError> {
        let state = self.lock();
        if state.cursor_error {
            return Err(EnvironmentError::CursorUnavailable(
                "simulated cursor lost".to_string(),
            ));
        }
        Ok(state.cursor)
    }

    fn display_area(&self) -> Result<DisplayArea, EnvironmentError> {
        let state = self.lock();
        if state.display_error {
            return Err(EnvironmentError::DisplayUnavailable(
                "simulated display lost".to_string(),
            ));
        }
        Ok(state.area)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn test_moves_update_cursor() {
        let mut desktop = SimulatedDesktop::full_hd();
        desktop.move_relative(10, -5).unwrap();
        desktop.move_relative(-3, 2).unwrap();

        assert_eq!(desktop.cursor(), Point::new(967.0, 537.0));
        assert_eq!(desktop.moves(), 2);
        assert_eq!(desktop.trail().len(), 2);
    }

    #[test]
    fn test_cursor_stays_on_monitor() {
        let mut desktop = SimulatedDesktop::new(DisplayArea::sized(100.0, 100.0), Point::new(50.0, 50.0));
        desktop.move_relative(500, -500).unwrap();
        assert_eq!(desktop.cursor(), Point::new(99.0, 0.0));
    }

    #[test]
    fn test_failed_moves_leave_cursor() {
        let mut desktop = SimulatedDesktop::full_hd();
        desktop.fail_next_moves(2);

        assert!(desktop.move_relative(5, 5).is_err());
        assert!(desktop.move_relative(5, 5).is_err());
        assert!(desktop.move_relative(5, 5).is_ok());
        assert_eq!(desktop.cursor(), Point::new(965.0, 545.0));
        assert_eq!(desktop.moves(), 1);
    }

    #[test]
    fn test_held_keys_tracked() {
        let mut desktop = SimulatedDesktop::full_hd();
        desktop.key_down(Key::W).unwrap();
        desktop.key_down(Key::B).unwrap();
        desktop.key_up(Key::W).unwrap();

        assert_eq!(desktop.held_keys(), vec![Key::B]);
    }

    #[test]
    fn test_move_hook_sees_count() {
        let mut desktop = SimulatedDesktop::full_hd();
        let seen = Arc::new(AtomicU64::new(0));
        let sink = Arc::clone(&seen);
        desktop.on_move(move |count| sink.store(count, Ordering::SeqCst));

        for _ in 0..3 {
            desktop.move_relative(1, 1).unwrap();
        }
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_display_read_failures() {
        let desktop = SimulatedDesktop::full_hd();
        assert!(desktop.cursor_position().is_ok());
        desktop.lose_cursor();
        assert!(desktop.cursor_position().is_err());
        desktop.lose_display();
        assert!(matches!(
            desktop.display_area(),
            Err(EnvironmentError::DisplayUnavailable(_))
        ));
    }
}
