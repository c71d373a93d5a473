//! Orbit path function
//!
//! Maps elapsed session time to an absolute target around the focal point:
//!
//! ```text
//! R(t)     = radius + radiusOffset(t)
//! theta(t) = phase + pace * t + angleOffset(t) + bias(t)
//! pos(t)   = focal + center(t) + R(t) * (cos theta, e(t) * sin theta)
//! ```
//!
//! The bias term moves on a much slower timescale than the others, so each
//! revolution lands a little off the previous one instead of retracing it.

use std::f64::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::noise::DriftGenerator;
use super::Point;
use crate::config::MotionProfile;

/// Salt separating the path's seed stream from the cadence stream
const PATH_SEED_SALT: u64 = 0x13579BDF_2468ACE0;

/// Orbit around a fixed focal point for one session
#[derive(Debug, Clone)]
pub struct OrbitPath {
    focal: Point,
    radius: f64,
    pace: f64,
    phase: f64,
    drift: DriftGenerator,
}

impl OrbitPath {
    /// Build the session's path from a profile, focal point and seed
    pub fn new(profile: &MotionProfile, focal: Point, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed ^ PATH_SEED_SALT);
        let phase = rng.gen_range(0.0..TAU);
        let drift_seed = rng.gen();

        Self {
            focal,
            radius: profile.radius,
            pace: profile.pace,
            phase,
            drift: DriftGenerator::new(drift_seed, profile.noise_amplitude, profile.bias_drift_rate),
        }
    }

    /// Override the starting phase
    pub fn with_phase(mut self, phase: f64) -> Self {
        self.phase = phase;
        self
    }

    /// Offset from the focal point at `t`
    pub fn offset(&self, t: f64) -> Point {
        let drift = self.drift.sample(t);
        let radius = (self.radius + drift.radius).max(0.0);
        let theta = self.phase + self.pace * t + drift.angle + drift.bias;

        Point::new(
            drift.center_x + radius * theta.cos(),
            drift.center_y + radius * drift.ellipse * theta.sin(),
        )
    }

    /// Absolute target position at `t`
    pub fn position(&self, t: f64) -> Point {
        self.focal.offset_by(self.offset(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pure_circle(radius: f64, pace: f64) -> MotionProfile {
        MotionProfile {
            radius,
            pace,
            noise_amplitude: 0.0,
            bias_drift_rate: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_pure_circle_closes_after_one_revolution() {
        let profile = pure_circle(100.0, 0.5);
        let focal = Point::new(960.0, 540.0);
        let path = OrbitPath::new(&profile, focal, 11);

        let period = profile.revolution_period().unwrap();
        let start = path.position(0.0);
        let end = path.position(period);

        assert!(start.distance_to(end) < 1e-6);
        assert!((start.distance_to(focal) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_pure_circle_keeps_radius() {
        let path = OrbitPath::new(&pure_circle(150.0, 1.0), Point::new(0.0, 0.0), 5);
        for i in 0..200 {
            let p = path.offset(i as f64 * 0.05);
            assert!((p.x.hypot(p.y) - 150.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_phase_override() {
        let path = OrbitPath::new(&pure_circle(100.0, 0.5), Point::new(0.0, 0.0), 1).with_phase(0.0);
        let p = path.offset(0.0);
        assert!((p.x - 100.0).abs() < 1e-9);
        assert!(p.y.abs() < 1e-9);
    }

    #[test]
    fn test_noisy_orbit_never_retraces() {
        let profile = MotionProfile::default();
        let path = OrbitPath::new(&profile, Point::new(960.0, 540.0), 2024);
        let period = profile.revolution_period().unwrap();

        for i in 0..100 {
            let t = i as f64 * 0.37;
            for lap in 1..4 {
                let later = t + period * lap as f64;
                assert!(
                    path.position(t).distance_to(path.position(later)) > 1e-3,
                    "arc repeated at t={} lap={}",
                    t,
                    lap
                );
            }
        }
    }

    #[test]
    fn test_same_seed_same_path_different_seed_different_path() {
        let profile = MotionProfile::default();
        let focal = Point::new(500.0, 500.0);
        let a = OrbitPath::new(&profile, focal, 9);
        let b = OrbitPath::new(&profile, focal, 9);
        let c = OrbitPath::new(&profile, focal, 10);

        assert_eq!(a.position(3.0), b.position(3.0));
        assert!(a.position(3.0).distance_to(c.position(3.0)) > 1e-6);
    }

    #[test]
    fn test_consecutive_ticks_are_close() {
        let profile = MotionProfile::lively();
        let path = OrbitPath::new(&profile, Point::new(800.0, 450.0), 77);
        let dt = 0.01;
        // Tangential speed is about radius * pace plus the noise terms
        let bound = (profile.radius + 60.0) * (profile.pace + 1.0) * dt;

        for i in 0..5_000 {
            let t = i as f64 * dt;
            let step = path.position(t).distance_to(path.position(t + dt));
            assert!(step < bound, "step {} at t={}", step, t);
        }
    }
}
