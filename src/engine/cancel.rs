//! Cancellation signal
//!
//! A session observes a single atomic flag at the top of every tick. The
//! hotkey listener and the console break handler set it from their own
//! threads; nothing else is shared with the loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use once_cell::sync::OnceCell;

/// Shared stop flag
///
/// One token lives as long as its deck; it is cleared when a session is
/// engaged, so handles taken earlier keep working.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the session to stop
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Clear a previous stop request
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Token the console break currently targets
///
/// `ctrlc` only allows one handler per process, so the handler is installed
/// once and reads whichever token is armed.
static BREAK_TARGET: OnceCell<Mutex<Option<CancelToken>>> = OnceCell::new();

/// Route Ctrl+C to `token`
///
/// With no token armed, Ctrl+C exits the process.
pub fn arm_console_break(token: &CancelToken) -> Result<(), ctrlc::Error> {
    let slot = BREAK_TARGET.get_or_try_init(|| {
        ctrlc::set_handler(on_console_break)?;
        Ok::<_, ctrlc::Error>(Mutex::new(None))
    })?;

    if let Ok(mut target) = slot.lock() {
        *target = Some(token.clone());
    }
    Ok(())
}

/// Stop routing Ctrl+C to a session
pub fn disarm_console_break() {
    if let Some(slot) = BREAK_TARGET.get() {
        if let Ok(mut target) = slot.lock() {
            *target = None;
        }
    }
}

fn on_console_break() {
    let armed = BREAK_TARGET
        .get()
        .and_then(|slot| slot.lock().ok().and_then(|target| target.clone()));

    match armed {
        Some(token) => {
            log::info!("Console break received, stopping session");
            token.cancel();
        }
        None => std::process::exit(130),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_token_starts_clear() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_cancel_seen_by_clones() {
        let token = CancelToken::new();
        let remote = token.clone();

        thread::spawn(move || remote.cancel()).join().unwrap();

        assert!(token.is_cancelled());
    }

    #[test]
    fn test_reset_clears_every_clone() {
        let token = CancelToken::new();
        let remote = token.clone();
        remote.cancel();

        token.reset();

        assert!(!remote.is_cancelled());
        remote.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_tokens_are_independent() {
        let a = CancelToken::new();
        let b = CancelToken::new();
        a.cancel();
        assert!(!b.is_cancelled());
    }
}
