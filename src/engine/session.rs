//! Session loop
//!
//! One session runs on its own thread: a countdown, then a fixed-rate loop
//! that moves the pointer along the orbit, fires scheduled events and
//! publishes telemetry. Cancellation is observed at the top of every tick
//! and between countdown slices, and every exit path goes through Stopping,
//! which releases any key the session still holds.

use std::time::Duration;

use serde::Serialize;

use super::{
    CancelToken, EngageError, LastEvent, MonotonicClock, SessionState, StateMachine, Telemetry,
    TelemetryFeed, TickClock, TickPacer, MIN_TICK_PERIOD,
};
use crate::cadence::{CadenceAction, CadenceScheduler, EventKind, FiredEvent};
use crate::config::MotionProfile;
use crate::input::{Desktop, DisplayReader, EnvironmentError, InputInjector, Key};
use crate::motion::{OrbitPath, Point, ScreenBounds};

/// 100 Hz
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(10);

/// Time for the orbit to grow from the focal point to full radius
const ENGAGE_RAMP_SECS: f64 = 1.5;
/// Exponential relaxation rate of a saccade offset (1/s)
const SACCADE_DECAY_RATE: f64 = 6.0;
/// Below this fraction the saccade offset is dropped
const SACCADE_SETTLED: f64 = 0.01;
/// Attempts per key when releasing on shutdown
const RELEASE_ATTEMPTS: u32 = 3;

/// Everything captured at engage time
#[derive(Debug, Clone)]
pub struct SessionPlan {
    pub profile: MotionProfile,
    /// Pointer position when the session was engaged
    pub focal: Point,
    pub bounds: ScreenBounds,
    pub seed: u64,
}

impl SessionPlan {
    /// Validate the profile against the live desktop and capture the focal point
    pub fn prepare<P>(profile: &MotionProfile, display: &P, seed: u64) -> Result<Self, EngageError>
    where
        P: DisplayReader + ?Sized,
    {
        profile.validate()?;

        let area = display.display_area()?;
        if !area.is_usable() {
            return Err(EnvironmentError::DisplayUnavailable(format!(
                "display area {}x{} is empty",
                area.width, area.height
            ))
            .into());
        }
        profile.validate_for_display(area.width, area.height)?;

        let focal = display.cursor_position()?;
        let bounds = ScreenBounds::from_display(area, profile.margin);

        log::debug!(
            "Prepared session seed={} focal=({:.0}, {:.0}) display={}x{}",
            seed,
            focal.x,
            focal.y,
            area.width,
            area.height
        );

        Ok(Self {
            profile: profile.clone(),
            focal,
            bounds,
            seed,
        })
    }
}

/// Summary of a finished session
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionReport {
    pub seed: u64,
    pub final_state: Option<SessionState>,
    /// Whether the session ended on a stop request
    pub cancelled: bool,
    pub ticks: u64,
    /// Seconds of orbit (excludes the countdown)
    pub elapsed: f64,
    pub walkabouts: u64,
    pub saccades: u64,
    pub stances: u64,
    pub injection_failures: u64,
    /// Ticks that overran by more than a full period
    pub overruns: u64,
    /// Keys that could not be released on shutdown
    pub stuck_keys: Vec<Key>,
}

impl SessionReport {
    /// Events fired of `kind`
    pub fn events(&self, kind: EventKind) -> u64 {
        match kind {
            EventKind::Walkabout => self.walkabouts,
            EventKind::Jitter => self.saccades,
            EventKind::Stance => self.stances,
        }
    }

    fn record(&mut self, kind: EventKind) {
        match kind {
            EventKind::Walkabout => self.walkabouts += 1,
            EventKind::Jitter => self.saccades += 1,
            EventKind::Stance => self.stances += 1,
        }
    }
}

/// A key pressed by the session and when to let go of it
#[derive(Debug, Clone, Copy)]
struct HeldKey {
    key: Key,
    release_at: f64,
}

/// Micro-saccade offset relaxing back toward the orbit
#[derive(Debug, Clone, Copy)]
struct Saccade {
    dx: f64,
    dy: f64,
    started: f64,
}

impl Saccade {
    fn weight(&self, now: f64) -> f64 {
        (-SACCADE_DECAY_RATE * (now - self.started).max(0.0)).exp()
    }
}

/// A single engaged session
pub struct Session {
    plan: SessionPlan,
    desktop: Box<dyn Desktop>,
    cancel: CancelToken,
    feed: TelemetryFeed,
    clock: Box<dyn TickClock>,
    tick_period: Duration,
    time_limit: Option<f64>,
    machine: StateMachine,
    path: OrbitPath,
    cadence: CadenceScheduler,
    held: Vec<HeldKey>,
    saccade: Option<Saccade>,
    /// Where the injected deltas have taken the pointer, with sub-pixel remainder
    injected: Point,
    telemetry: Telemetry,
    report: SessionReport,
}

impl Session {
    pub fn new(
        plan: SessionPlan,
        desktop: Box<dyn Desktop>,
        cancel: CancelToken,
        feed: TelemetryFeed,
    ) -> Self {
        let path = OrbitPath::new(&plan.profile, plan.focal, plan.seed);
        let cadence = CadenceScheduler::new(&plan.profile, plan.seed);
        let report = SessionReport {
            seed: plan.seed,
            ..SessionReport::default()
        };

        Self {
            injected: plan.focal,
            desktop,
            cancel,
            feed,
            clock: Box::new(MonotonicClock::new()),
            tick_period: DEFAULT_TICK_PERIOD,
            time_limit: None,
            machine: StateMachine::new(),
            path,
            cadence,
            held: Vec::new(),
            saccade: None,
            telemetry: Telemetry::default(),
            report,
            plan,
        }
    }

    /// Use a different time source
    pub fn with_clock(mut self, clock: impl TickClock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Periods below `MIN_TICK_PERIOD` are raised to it
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period.max(MIN_TICK_PERIOD);
        self
    }

    /// Stop on its own after `seconds` of orbit
    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit = Some(seconds);
        self
    }

    /// Run to completion; always ends in Stopped
    pub fn run(mut self) -> SessionReport {
        self.transition(SessionState::CountingDown, "Counting down");

        if self.count_down() {
            self.transition(SessionState::Running, "Running");
            self.orbit();
        }

        self.shut_down();
        self.report
    }

    /// Wait out the countdown in tick-sized slices; false if cancelled
    fn count_down(&mut self) -> bool {
        let total = Duration::try_from_secs_f64(self.plan.profile.countdown.max(0.0))
            .unwrap_or(Duration::MAX);
        let start = self.clock.now();
        let end = start.saturating_add(total);

        loop {
            if self.cancel.is_cancelled() {
                return false;
            }

            let now = self.clock.now();
            let remaining = end.saturating_sub(now);
            self.telemetry.countdown_remaining = remaining.as_secs_f64();
            self.telemetry.status = format!("Starting in {:.1}s", remaining.as_secs_f64());
            self.feed.publish(self.telemetry.clone());

            if remaining.is_zero() {
                return true;
            }
            self.clock.sleep_until((now + self.tick_period).min(end));
        }
    }

    fn orbit(&mut self) {
        let start = self.clock.now();
        let mut pacer = TickPacer::new(self.tick_period, start);

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let elapsed = self.clock.now().saturating_sub(start).as_secs_f64();
            if self.time_limit.is_some_and(|limit| elapsed >= limit) {
                log::info!("Time limit reached after {:.1}s", elapsed);
                break;
            }

            self.tick(elapsed);
            pacer.wait(self.clock.as_mut());
        }

        self.report.overruns = pacer.overruns();
    }

    fn tick(&mut self, now: f64) {
        self.release_expired(now);

        let target = self.target(now);
        self.steer_to(target);

        for event in self.cadence.poll(now) {
            self.apply(event);
        }

        self.report.ticks += 1;
        self.report.elapsed = now;

        self.telemetry.elapsed = now;
        self.telemetry.ticks = self.report.ticks;
        self.telemetry.injection_failures = self.report.injection_failures;
        self.telemetry.position = target;
        self.telemetry.offset = target.delta_from(self.plan.focal);
        if self.cancel.is_cancelled() {
            self.telemetry.status = "Stopping".to_string();
        }
        self.feed.publish(self.telemetry.clone());
    }

    /// Clamped pointer target at session time `now`
    fn target(&mut self, now: f64) -> Point {
        let focal = self.plan.focal;
        let orbit = self.path.position(now).delta_from(focal);
        let ramp = engagement_ramp(now);
        let mut offset = Point::new(orbit.x * ramp, orbit.y * ramp);

        if let Some(saccade) = self.saccade {
            let weight = saccade.weight(now);
            if weight < SACCADE_SETTLED {
                self.saccade = None;
            } else {
                offset = offset.offset_by(Point::new(saccade.dx * weight, saccade.dy * weight));
            }
        }

        self.plan.bounds.clamp(focal.offset_by(offset))
    }

    /// Inject the whole-pixel part of the move toward `target`
    fn steer_to(&mut self, target: Point) {
        let delta = target.delta_from(self.injected);
        let dx = delta.x.round() as i32;
        let dy = delta.y.round() as i32;
        if dx == 0 && dy == 0 {
            return;
        }

        match self.desktop.move_relative(dx, dy) {
            Ok(()) => {
                self.injected = self.injected.offset_by(Point::new(dx as f64, dy as f64));
            }
            Err(e) => {
                self.report.injection_failures += 1;
                log::warn!("Pointer move ({}, {}) failed: {}", dx, dy, e);
            }
        }
    }

    fn apply(&mut self, event: FiredEvent) {
        self.report.record(event.kind);
        self.telemetry.last_event = Some(LastEvent {
            kind: event.kind,
            at: event.at,
        });

        match event.action {
            CadenceAction::Walkabout { key, hold } | CadenceAction::Stance { key, hold } => {
                self.press(key, event.at + hold);
            }
            CadenceAction::Saccade { dx, dy } => {
                self.saccade = Some(Saccade {
                    dx,
                    dy,
                    started: event.at,
                });
                let nudged = self
                    .plan
                    .bounds
                    .clamp(self.injected.offset_by(Point::new(dx, dy)));
                self.steer_to(nudged);
            }
        }
    }

    /// Press `key`, or keep it down longer if it is already held
    fn press(&mut self, key: Key, release_at: f64) {
        if let Some(held) = self.held.iter_mut().find(|held| held.key == key) {
            held.release_at = held.release_at.max(release_at);
            return;
        }

        match self.desktop.key_down(key) {
            Ok(()) => self.held.push(HeldKey { key, release_at }),
            Err(e) => {
                self.report.injection_failures += 1;
                log::warn!("Key {} down failed: {}", key.label(), e);
            }
        }
    }

    fn release_expired(&mut self, now: f64) {
        let mut index = 0;
        while index < self.held.len() {
            let held = self.held[index];
            if held.release_at > now {
                index += 1;
                continue;
            }
            match self.desktop.key_up(held.key) {
                Ok(()) => {
                    self.held.swap_remove(index);
                }
                Err(e) => {
                    // Still down as far as the OS knows; retried next tick
                    self.report.injection_failures += 1;
                    log::warn!("Key {} up failed: {}", held.key.label(), e);
                    index += 1;
                }
            }
        }
    }

    fn shut_down(&mut self) {
        self.report.cancelled = self.cancel.is_cancelled();
        self.transition(SessionState::Stopping, "Stopping");

        for held in std::mem::take(&mut self.held) {
            let released = (0..RELEASE_ATTEMPTS).any(|attempt| match self.desktop.key_up(held.key) {
                Ok(()) => true,
                Err(e) => {
                    self.report.injection_failures += 1;
                    log::warn!(
                        "Releasing key {} failed (attempt {}): {}",
                        held.key.label(),
                        attempt + 1,
                        e
                    );
                    false
                }
            });
            if !released {
                log::error!("Key {} may still be held down", held.key.label());
                self.report.stuck_keys.push(held.key);
            }
        }

        self.transition(SessionState::Stopped, "Stopped");
        self.report.final_state = Some(self.machine.state());
        log::info!(
            "Session finished after {:.1}s: {} ticks, {} walkabouts, {} saccades, {} stances, {} failures",
            self.report.elapsed,
            self.report.ticks,
            self.report.walkabouts,
            self.report.saccades,
            self.report.stances,
            self.report.injection_failures
        );
    }

    fn transition(&mut self, next: SessionState, status: &str) {
        if self.machine.advance(next) {
            self.telemetry.state = next;
            self.telemetry.status = status.to_string();
            if next != SessionState::CountingDown {
                self.telemetry.countdown_remaining = 0.0;
            }
            self.telemetry.injection_failures = self.report.injection_failures;
            self.feed.publish(self.telemetry.clone());
        }
    }
}

/// Smoothstep from 0 to 1 over the engagement ramp
fn engagement_ramp(now: f64) -> f64 {
    let t = (now / ENGAGE_RAMP_SECS).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}
