//! Control deck
//!
//! The surface a presentation layer drives: edit the pending profile,
//! engage, abort, read telemetry. Profile edits never touch a running
//! session; they take effect on the next engage.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::{
    CancelToken, EngageError, Session, SessionPlan, SessionReport, SessionState, Telemetry,
    TelemetryFeed, DEFAULT_TICK_PERIOD, MIN_TICK_PERIOD,
};
use crate::config::{ConfigError, MotionProfile};
use crate::input::Desktop;

/// Owner of the pending profile and the session thread
pub struct ControlDeck {
    pending: MotionProfile,
    feed: TelemetryFeed,
    cancel: CancelToken,
    worker: Option<JoinHandle<SessionReport>>,
    last_report: Option<SessionReport>,
    seed: Option<u64>,
    tick_period: Duration,
    time_limit: Option<f64>,
}

impl ControlDeck {
    pub fn new(profile: MotionProfile) -> Self {
        Self {
            pending: profile,
            feed: TelemetryFeed::new(),
            cancel: CancelToken::new(),
            worker: None,
            last_report: None,
            seed: None,
            tick_period: DEFAULT_TICK_PERIOD,
            time_limit: None,
        }
    }

    /// Use a fixed seed instead of a random one per engage
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Periods below `MIN_TICK_PERIOD` are raised to it
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period.max(MIN_TICK_PERIOD);
        self
    }

    /// Sessions stop on their own after `seconds` of orbit
    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit = Some(seconds);
        self
    }

    /// Profile the next engage will use
    pub fn profile(&self) -> &MotionProfile {
        &self.pending
    }

    /// Edit the pending profile; an invalid result is rejected and the
    /// previous profile kept
    pub fn edit(&mut self, f: impl FnOnce(&mut MotionProfile)) -> Result<(), ConfigError> {
        let mut candidate = self.pending.clone();
        f(&mut candidate);
        self.replace_profile(candidate)
    }

    /// Apply one `key=value` style option to the pending profile
    pub fn set_option(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut candidate = self.pending.clone();
        candidate.apply_option(key, value)?;
        self.replace_profile(candidate)
    }

    /// Swap in a whole profile after validating it
    pub fn replace_profile(&mut self, profile: MotionProfile) -> Result<(), ConfigError> {
        if let Err(e) = profile.validate() {
            log::warn!("Profile edit rejected: {}", e);
            self.feed
                .update(|t| t.status = format!("Profile edit rejected: {}", e));
            return Err(e);
        }
        if self.is_active() {
            log::info!("Profile updated; takes effect on the next engage");
        }
        self.pending = profile;
        Ok(())
    }

    /// Start a session on `desktop`, returning its seed
    ///
    /// Validation and the desktop query happen here, so a rejected start
    /// leaves the deck idle and the error in hand.
    pub fn engage(&mut self, desktop: Box<dyn Desktop>) -> Result<u64, EngageError> {
        if self.is_active() {
            return Err(EngageError::AlreadyRunning);
        }
        self.reap();

        let seed = self.seed.unwrap_or_else(rand::random);
        let plan = match SessionPlan::prepare(&self.pending, desktop.as_ref(), seed) {
            Ok(plan) => plan,
            Err(e) => {
                self.reject(&e);
                return Err(e);
            }
        };

        self.cancel.reset();
        let cancel = self.cancel.clone();
        self.feed.publish(Telemetry {
            state: SessionState::Idle,
            status: "Engaging".to_string(),
            ..Telemetry::default()
        });

        let feed = self.feed.clone();
        let period = self.tick_period;
        let limit = self.time_limit;
        let spawned = thread::Builder::new()
            .name("orbit-session".to_string())
            .spawn(move || {
                let mut session = Session::new(plan, desktop, cancel, feed).with_tick_period(period);
                if let Some(limit) = limit {
                    session = session.with_time_limit(limit);
                }
                session.run()
            });

        match spawned {
            Ok(handle) => {
                log::info!("Engaged session with seed {}", seed);
                self.worker = Some(handle);
                Ok(seed)
            }
            Err(e) => {
                let error = EngageError::Spawn(e);
                self.reject(&error);
                Err(error)
            }
        }
    }

    /// Ask the running session to stop; no-op when idle
    ///
    /// The session publishes Stopping itself on its next tick.
    pub fn abort(&self) {
        if self.is_active() {
            log::info!("Abort requested");
        }
        self.cancel.cancel();
    }

    /// Whether a session thread is still working
    pub fn is_active(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Token that stops whichever session is running, for hotkey and
    /// console wiring; valid for the deck's whole lifetime
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn telemetry(&self) -> Telemetry {
        self.feed.snapshot()
    }

    pub fn feed(&self) -> TelemetryFeed {
        self.feed.clone()
    }

    /// Block until the current session finishes
    pub fn wait(&mut self) -> Option<SessionReport> {
        self.reap();
        self.last_report.clone()
    }

    /// Report of the most recently finished session
    pub fn last_report(&self) -> Option<&SessionReport> {
        self.last_report.as_ref()
    }

    fn reap(&mut self) {
        if let Some(handle) = self.worker.take() {
            match handle.join() {
                Ok(report) => self.last_report = Some(report),
                Err(_) => {
                    log::error!("Session thread panicked");
                    self.feed.update(|t| {
                        t.state = SessionState::Stopped;
                        t.status = "Session failed".to_string();
                    });
                }
            }
        }
    }

    fn reject(&self, error: &EngageError) {
        log::warn!("Start rejected: {}", error);
        self.feed.update(|t| {
            t.state = SessionState::Idle;
            t.status = format!("Start rejected: {}", error);
        });
    }
}

impl Drop for ControlDeck {
    fn drop(&mut self) {
        // Keys must not stay down after the deck goes away
        self.cancel.cancel();
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}
