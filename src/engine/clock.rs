//! Tick timing
//!
//! The session loop paces itself against absolute deadlines, so per-tick
//! processing time never accumulates into drift. A missed deadline
//! resynchronizes to the present instead of bursting through the backlog.

use std::thread;
use std::time::{Duration, Instant};

/// Shortest tick period a session accepts
pub const MIN_TICK_PERIOD: Duration = Duration::from_micros(100);

/// Source of session time and of the inter-tick sleep
pub trait TickClock: Send {
    /// Time since the clock's origin
    fn now(&self) -> Duration;

    /// Block until `deadline` (measured from the origin)
    fn sleep_until(&mut self, deadline: Duration);
}

/// Wall clock backed by `Instant`
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TickClock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep_until(&mut self, deadline: Duration) {
        let now = self.now();
        if deadline > now {
            thread::sleep(deadline - now);
        }
    }
}

/// Simulated clock that jumps straight to each deadline
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    now: Duration,
    sleeps: u64,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward without sleeping, e.g. to fake a stall
    pub fn advance(&mut self, by: Duration) {
        self.now += by;
    }

    /// Number of sleeps requested
    pub fn sleeps(&self) -> u64 {
        self.sleeps
    }
}

impl TickClock for VirtualClock {
    fn now(&self) -> Duration {
        self.now
    }

    fn sleep_until(&mut self, deadline: Duration) {
        self.sleeps += 1;
        if deadline > self.now {
            self.now = deadline;
        }
    }
}

/// Absolute-deadline tick pacer
#[derive(Debug, Clone)]
pub struct TickPacer {
    period: Duration,
    next_deadline: Duration,
    ticks: u64,
    overruns: u64,
}

impl TickPacer {
    /// First deadline is one period after `start`
    pub fn new(period: Duration, start: Duration) -> Self {
        let period = period.max(MIN_TICK_PERIOD);
        Self {
            period,
            next_deadline: start + period,
            ticks: 0,
            overruns: 0,
        }
    }

    /// Ticks completed
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Deadlines missed by more than a full period
    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    /// Sleep until the next deadline and schedule the one after it
    pub fn wait(&mut self, clock: &mut dyn TickClock) {
        let now = clock.now();
        if now < self.next_deadline {
            clock.sleep_until(self.next_deadline);
        } else if now - self.next_deadline > self.period {
            // Stalled: skip the backlog rather than firing it all at once
            self.overruns += 1;
            log::debug!(
                "Tick overran by {:.1} ms, resynchronizing",
                (now - self.next_deadline).as_secs_f64() * 1000.0
            );
            self.next_deadline = now;
        }
        self.next_deadline += self.period;
        self.ticks += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: Duration = Duration::from_millis(10);

    #[test]
    fn test_pacer_hits_absolute_deadlines() {
        let mut clock = VirtualClock::new();
        let mut pacer = TickPacer::new(PERIOD, clock.now());

        for _ in 0..100 {
            // Some processing time each tick
            clock.advance(Duration::from_millis(3));
            pacer.wait(&mut clock);
        }

        assert_eq!(clock.now(), Duration::from_millis(1000));
        assert_eq!(pacer.ticks(), 100);
        assert_eq!(pacer.overruns(), 0);
    }

    #[test]
    fn test_pacer_resyncs_after_stall() {
        let mut clock = VirtualClock::new();
        let mut pacer = TickPacer::new(PERIOD, clock.now());

        pacer.wait(&mut clock);
        clock.advance(Duration::from_millis(250));
        pacer.wait(&mut clock);
        assert_eq!(pacer.overruns(), 1);

        // Next tick is a full period later, not an immediate catch-up
        let before = clock.now();
        pacer.wait(&mut clock);
        assert_eq!(clock.now() - before, PERIOD);
    }

    #[test]
    fn test_pacer_floors_zero_period() {
        let mut clock = VirtualClock::new();
        let mut pacer = TickPacer::new(Duration::ZERO, clock.now());

        pacer.wait(&mut clock);
        pacer.wait(&mut clock);
        assert_eq!(clock.now(), MIN_TICK_PERIOD * 2);
    }

    #[test]
    fn test_monotonic_clock_sleeps() {
        let mut clock = MonotonicClock::new();
        let target = clock.now() + Duration::from_millis(5);
        clock.sleep_until(target);
        assert!(clock.now() >= target);
    }

    #[test]
    fn test_virtual_clock_never_goes_back() {
        let mut clock = VirtualClock::new();
        clock.advance(Duration::from_secs(2));
        clock.sleep_until(Duration::from_secs(1));
        assert_eq!(clock.now(), Duration::from_secs(2));
        assert_eq!(clock.sleeps(), 1);
    }
}
