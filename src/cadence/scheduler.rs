//! Cadence scheduler
//!
//! Draws every interval uniformly from its configured window and fires an
//! event on the first poll at or after its due time. Due times accumulate
//! from the previous due time rather than from the poll that noticed them,
//! so tick granularity never stretches the cadence.

use std::f64::consts::TAU;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::EventKind;
use crate::config::{IntervalWindow, MotionProfile};
use crate::input::Key;

/// Salt separating the cadence seed stream from the path stream
const CADENCE_SEED_SALT: u64 = 0x55AA_55AA_0A0B_0C0D;

/// Saccade magnitude as a fraction of the noise amplitude
const SACCADE_MIN_FRACTION: f64 = 0.35;
const SACCADE_MAX_FRACTION: f64 = 0.9;

/// Saccades are flatter vertically than horizontally
const SACCADE_VERTICAL_SCALE: f64 = 0.65;

/// Keys a walkabout tap picks from
pub const WALKABOUT_KEYS: [Key; 4] = [Key::W, Key::A, Key::S, Key::D];

/// Key held by the utility stance
pub const STANCE_KEY: Key = Key::B;

/// One independently scheduled event stream
#[derive(Debug, Clone)]
pub struct ScheduledEvent {
    /// Event kind
    pub kind: EventKind,
    /// Whether the stream fires at all
    pub enabled: bool,
    /// Interval window (seconds)
    pub window: IntervalWindow,
    /// Session time the next firing is due
    pub next_fire: f64,
    /// Session time of the last firing
    pub last_fire: Option<f64>,
    /// Number of firings so far
    pub fired: u64,
}

impl ScheduledEvent {
    /// Create a stream and draw its first due time from `now`
    fn seeded(kind: EventKind, enabled: bool, window: IntervalWindow, now: f64, rng: &mut StdRng) -> Self {
        let mut event = Self {
            kind,
            enabled,
            window,
            next_fire: f64::INFINITY,
            last_fire: None,
            fired: 0,
        };
        if enabled {
            event.next_fire = now + draw(window, rng);
        }
        event
    }

    /// Whether the event should fire at `now`
    pub fn is_due(&self, now: f64) -> bool {
        self.enabled && now >= self.next_fire
    }

    /// Record a firing and draw the next due time
    fn fire(&mut self, now: f64, rng: &mut StdRng) {
        self.last_fire = Some(now);
        self.fired += 1;

        let next = self.next_fire + draw(self.window, rng);
        // After a stall, restart from now instead of bursting to catch up
        self.next_fire = if next > now {
            next
        } else {
            now + draw(self.window, rng)
        };
    }
}

/// What a fired event asks the engine to inject
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CadenceAction {
    /// Press `key` now and release it after `hold` seconds
    Walkabout { key: Key, hold: f64 },
    /// Jump the pointer by an offset that then relaxes back to the orbit
    Saccade { dx: f64, dy: f64 },
    /// Hold `key` for `hold` seconds
    Stance { key: Key, hold: f64 },
}

/// An event that fired during a poll
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FiredEvent {
    /// Event kind
    pub kind: EventKind,
    /// Session time it fired
    pub at: f64,
    /// Input to inject
    pub action: CadenceAction,
}

/// Scheduler for all event streams of one session
pub struct CadenceScheduler {
    walkabout: ScheduledEvent,
    jitter: ScheduledEvent,
    stance: ScheduledEvent,
    /// Tap-duration window for walkabout
    tap: IntervalWindow,
    /// Stance hold duration (seconds)
    stance_hold: f64,
    /// Noise amplitude the saccade size is derived from (px)
    amplitude: f64,
    rng: StdRng,
}

impl CadenceScheduler {
    /// Seed every stream for a session starting at time zero
    pub fn new(profile: &MotionProfile, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed ^ CADENCE_SEED_SALT);

        let walkabout = ScheduledEvent::seeded(
            EventKind::Walkabout,
            profile.walkabout.enabled,
            profile.walkabout.interval,
            0.0,
            &mut rng,
        );
        let jitter = ScheduledEvent::seeded(
            EventKind::Jitter,
            profile.jitter.enabled,
            profile.jitter.interval,
            0.0,
            &mut rng,
        );
        let stance = ScheduledEvent::seeded(
            EventKind::Stance,
            profile.stance.enabled,
            IntervalWindow::fixed(profile.stance.interval),
            0.0,
            &mut rng,
        );

        Self {
            walkabout,
            jitter,
            stance,
            tap: profile.walkabout.tap,
            stance_hold: profile.stance.hold,
            amplitude: profile.noise_amplitude.max(0.0),
            rng,
        }
    }

    /// Fire every event due at `now`
    pub fn poll(&mut self, now: f64) -> Vec<FiredEvent> {
        let mut fired = Vec::new();

        if self.walkabout.is_due(now) {
            self.walkabout.fire(now, &mut self.rng);
            let key = *WALKABOUT_KEYS.choose(&mut self.rng).unwrap_or(&Key::W);
            let hold = draw(self.tap, &mut self.rng);
            fired.push(FiredEvent {
                kind: EventKind::Walkabout,
                at: now,
                action: CadenceAction::Walkabout { key, hold },
            });
        }

        if self.jitter.is_due(now) {
            self.jitter.fire(now, &mut self.rng);
            let (dx, dy) = self.saccade();
            fired.push(FiredEvent {
                kind: EventKind::Jitter,
                at: now,
                action: CadenceAction::Saccade { dx, dy },
            });
        }

        if self.stance.is_due(now) {
            self.stance.fire(now, &mut self.rng);
            fired.push(FiredEvent {
                kind: EventKind::Stance,
                at: now,
                action: CadenceAction::Stance {
                    key: STANCE_KEY,
                    hold: self.stance_hold,
                },
            });
        }

        if !fired.is_empty() {
            log::debug!(
                "Fired {} at {:.2}s",
                fired.iter().map(|e| e.kind.label()).collect::<Vec<_>>().join(", "),
                now
            );
        }

        fired
    }

    /// State of one event stream
    pub fn event(&self, kind: EventKind) -> &ScheduledEvent {
        match kind {
            EventKind::Walkabout => &self.walkabout,
            EventKind::Jitter => &self.jitter,
            EventKind::Stance => &self.stance,
        }
    }

    /// Earliest pending due time across all streams
    pub fn next_due(&self) -> f64 {
        EventKind::ALL
            .iter()
            .map(|&kind| self.event(kind).next_fire)
            .fold(f64::INFINITY, f64::min)
    }

    /// Random nudge whose size is a fraction of the noise amplitude
    fn saccade(&mut self) -> (f64, f64) {
        if self.amplitude == 0.0 {
            return (0.0, 0.0);
        }
        let magnitude =
            self.amplitude * self.rng.gen_range(SACCADE_MIN_FRACTION..=SACCADE_MAX_FRACTION);
        let direction = self.rng.gen_range(0.0..TAU);
        (
            magnitude * direction.cos(),
            magnitude * direction.sin() * SACCADE_VERTICAL_SCALE,
        )
    }
}

/// Uniform draw from a window; a fixed window yields its value
fn draw<R: Rng + ?Sized>(window: IntervalWindow, rng: &mut R) -> f64 {
    if window.is_fixed() {
        window.min
    } else {
        rng.gen_range(window.min..=window.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{JitterSettings, StanceSettings, WalkaboutSettings};

    const TICK: f64 = 0.01;

    fn walkabout_only(interval: IntervalWindow, tap: IntervalWindow) -> MotionProfile {
        MotionProfile {
            walkabout: WalkaboutSettings {
                enabled: true,
                interval,
                tap,
            },
            jitter: JitterSettings {
                enabled: false,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn run(scheduler: &mut CadenceScheduler, seconds: f64) -> Vec<FiredEvent> {
        let ticks = (seconds / TICK).round() as u64;
        (0..=ticks)
            .flat_map(|i| scheduler.poll(i as f64 * TICK))
            .collect()
    }

    #[test]
    fn test_walkabout_count_over_ten_minutes() {
        let profile = walkabout_only(IntervalWindow::new(30.0, 60.0), IntervalWindow::new(0.1, 0.3));

        for seed in 0..50 {
            let mut scheduler = CadenceScheduler::new(&profile, seed);
            let fired = run(&mut scheduler, 600.0);
            assert!(
                (10..=20).contains(&fired.len()),
                "seed {} fired {} times",
                seed,
                fired.len()
            );
        }
    }

    #[test]
    fn test_count_bounded_by_window() {
        let profile = MotionProfile {
            walkabout: WalkaboutSettings {
                enabled: false,
                ..Default::default()
            },
            jitter: JitterSettings {
                enabled: true,
                interval: IntervalWindow::new(2.0, 5.0),
            },
            ..Default::default()
        };
        let mut scheduler = CadenceScheduler::new(&profile, 8);
        let fired = run(&mut scheduler, 300.0);

        // Between span/max and span/min firings
        assert!(fired.len() >= 60);
        assert!(fired.len() <= 150);
        assert!(fired.iter().all(|e| e.kind == EventKind::Jitter));
    }

    #[test]
    fn test_spacing_respects_window() {
        let profile = walkabout_only(IntervalWindow::new(3.0, 4.0), IntervalWindow::new(0.05, 0.1));
        let mut scheduler = CadenceScheduler::new(&profile, 21);
        let fired = run(&mut scheduler, 200.0);

        for pair in fired.windows(2) {
            let gap = pair[1].at - pair[0].at;
            assert!(gap >= 3.0 - TICK && gap <= 4.0 + TICK, "gap {}", gap);
        }
    }

    #[test]
    fn test_fixed_window_is_periodic() {
        let profile = walkabout_only(IntervalWindow::fixed(5.0), IntervalWindow::fixed(0.1));
        let mut scheduler = CadenceScheduler::new(&profile, 3);
        let fired = run(&mut scheduler, 32.0);

        assert_eq!(fired.len(), 6);
        for (i, event) in fired.iter().enumerate() {
            assert!((event.at - 5.0 * (i + 1) as f64).abs() < TICK + 1e-9);
            if let CadenceAction::Walkabout { hold, .. } = event.action {
                assert_eq!(hold, 0.1);
            }
        }
    }

    #[test]
    fn test_walkabout_tap_drawn_from_window() {
        let tap = IntervalWindow::new(0.1, 0.3);
        let profile = walkabout_only(IntervalWindow::new(1.0, 2.0), tap);
        let mut scheduler = CadenceScheduler::new(&profile, 99);

        for event in run(&mut scheduler, 120.0) {
            match event.action {
                CadenceAction::Walkabout { key, hold } => {
                    assert!(WALKABOUT_KEYS.contains(&key));
                    assert!(tap.contains(hold));
                }
                other => panic!("Unexpected action {:?}", other),
            }
        }
    }

    #[test]
    fn test_disabled_streams_never_fire() {
        let profile = MotionProfile {
            walkabout: WalkaboutSettings {
                enabled: false,
                ..Default::default()
            },
            jitter: JitterSettings {
                enabled: false,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut scheduler = CadenceScheduler::new(&profile, 1);
        assert!(run(&mut scheduler, 120.0).is_empty());
        assert_eq!(scheduler.next_due(), f64::INFINITY);
    }

    #[test]
    fn test_saccade_is_fraction_of_amplitude() {
        let profile = MotionProfile {
            noise_amplitude: 8.0,
            walkabout: WalkaboutSettings {
                enabled: false,
                ..Default::default()
            },
            jitter: JitterSettings {
                enabled: true,
                interval: IntervalWindow::new(0.5, 1.0),
            },
            ..Default::default()
        };
        let mut scheduler = CadenceScheduler::new(&profile, 5);

        let fired = run(&mut scheduler, 60.0);
        assert!(!fired.is_empty());
        for event in fired {
            if let CadenceAction::Saccade { dx, dy } = event.action {
                let size = dx.hypot(dy);
                assert!(size <= 8.0 * SACCADE_MAX_FRACTION + 1e-9);
                assert!(size > 0.0);
            }
        }
    }

    #[test]
    fn test_stance_fires_on_fixed_cadence() {
        let profile = MotionProfile {
            walkabout: WalkaboutSettings {
                enabled: false,
                ..Default::default()
            },
            jitter: JitterSettings {
                enabled: false,
                ..Default::default()
            },
            stance: StanceSettings {
                enabled: true,
                interval: 20.0,
                hold: 4.0,
            },
            ..Default::default()
        };
        let mut scheduler = CadenceScheduler::new(&profile, 4);
        let fired = run(&mut scheduler, 61.0);

        assert_eq!(fired.len(), 3);
        assert_eq!(
            fired[0].action,
            CadenceAction::Stance {
                key: STANCE_KEY,
                hold: 4.0
            }
        );
    }

    #[test]
    fn test_stall_does_not_burst() {
        let profile = walkabout_only(IntervalWindow::new(1.0, 2.0), IntervalWindow::fixed(0.1));
        let mut scheduler = CadenceScheduler::new(&profile, 12);

        // One poll after a long gap fires once, not once per missed interval
        assert_eq!(scheduler.poll(100.0).len(), 1);
        let next = scheduler.event(EventKind::Walkabout).next_fire;
        assert!(next > 100.0 && next <= 102.0);
        assert_eq!(scheduler.event(EventKind::Walkabout).last_fire, Some(100.0));
    }

    #[test]
    fn test_seed_reproduces_schedule() {
        let profile = MotionProfile::default();
        let mut a = CadenceScheduler::new(&profile, 31);
        let mut b = CadenceScheduler::new(&profile, 31);
        assert_eq!(run(&mut a, 90.0), run(&mut b, 90.0));
    }
}
