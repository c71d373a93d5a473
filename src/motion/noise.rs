//! Smooth noise and drift generation
//!
//! Signals are built from value noise on an integer lattice, interpolated
//! with Catmull-Rom splines so the curve and its first derivative stay
//! continuous. Lattice values come from a hash of (seed, index), which makes
//! every sample a pure function of time and seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Catmull-Rom overshoots to at most 1.25 for lattice values in [-1, 1]
const SPLINE_NORMALIZE: f64 = 0.8;

/// Radius wobble (px) per px of noise amplitude
pub const RADIUS_GAIN: f64 = 1.0;
/// Angular wobble (rad) per px of noise amplitude
pub const ANGLE_GAIN: f64 = 0.04;
/// Slow bias sway (rad) per px of noise amplitude
pub const BIAS_SWAY_GAIN: f64 = 0.05;
/// Vertical squash of the orbit per px of noise amplitude
pub const ELLIPSE_GAIN: f64 = 0.025;
/// Orbit center wander (px) per px of noise amplitude
pub const CENTER_GAIN: f64 = 1.0;

// Lattice cells per second for each channel. Bias is the slowest.
const RADIUS_RATE: f64 = 0.12;
const ANGLE_RATE: f64 = 0.11;
const ELLIPSE_RATE: f64 = 0.08;
const CENTER_RATE: f64 = 0.03;
const BIAS_RATE: f64 = 0.02;

/// One-dimensional smooth noise in [-1, 1]
#[derive(Debug, Clone, Copy)]
pub struct SmoothNoise {
    seed: u64,
}

impl SmoothNoise {
    /// Create a noise curve for a seed
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Sample the curve at `position` (lattice units)
    pub fn sample(&self, position: f64) -> f64 {
        let base = position.floor();
        let t = position - base;
        let index = base as i64;

        let p0 = self.lattice(index - 1);
        let p1 = self.lattice(index);
        let p2 = self.lattice(index + 1);
        let p3 = self.lattice(index + 2);

        catmull_rom(p0, p1, p2, p3, t) * SPLINE_NORMALIZE
    }

    /// Lattice value in [-1, 1]
    fn lattice(&self, index: i64) -> f64 {
        let bits = splitmix64(self.seed ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
        // Top 53 bits to a unit float
        let unit = (bits >> 11) as f64 / (1u64 << 53) as f64;
        unit * 2.0 - 1.0
    }
}

/// Catmull-Rom interpolation between p1 and p2
fn catmull_rom(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * ((2.0 * p1)
        + (-p0 + p2) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * t3)
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Perturbations of the orbit at one instant
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DriftSample {
    /// Added to the base radius (px)
    pub radius: f64,
    /// Added to the orbit angle (rad)
    pub angle: f64,
    /// Slow phase bias (rad)
    pub bias: f64,
    /// Vertical scale of the orbit (1.0 = circle)
    pub ellipse: f64,
    /// Offset of the orbit center from the focal point (px)
    pub center_x: f64,
    /// Offset of the orbit center from the focal point (px)
    pub center_y: f64,
}

/// A noise channel with its own curve and per-session rate
#[derive(Debug, Clone, Copy)]
struct Channel {
    noise: SmoothNoise,
    rate: f64,
    // Keeps channels from sharing a lattice alignment at t = 0
    shift: f64,
}

impl Channel {
    fn draw(rng: &mut StdRng, base_rate: f64) -> Self {
        Self {
            noise: SmoothNoise::new(rng.gen()),
            rate: base_rate * rng.gen_range(0.8..1.25),
            shift: rng.gen_range(0.0..1024.0),
        }
    }

    fn at(&self, t: f64) -> f64 {
        self.noise.sample(self.shift + t * self.rate)
    }
}

/// Per-session drift generator
///
/// The radius and center offsets stay within the configured amplitude in
/// px; the angular terms are scaled by their gains. Every output changes
/// smoothly with time. At zero amplitude and zero bias rate all
/// offsets vanish and the ellipse is a circle.
#[derive(Debug, Clone)]
pub struct DriftGenerator {
    amplitude: f64,
    bias_rate: f64,
    radius: Channel,
    angle: Channel,
    bias: Channel,
    ellipse: Channel,
    center_x: Channel,
    center_y: Channel,
}

impl DriftGenerator {
    /// Create a generator seeded for one session
    pub fn new(seed: u64, amplitude: f64, bias_rate: f64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self {
            amplitude: amplitude.max(0.0),
            bias_rate,
            radius: Channel::draw(&mut rng, RADIUS_RATE),
            angle: Channel::draw(&mut rng, ANGLE_RATE),
            bias: Channel::draw(&mut rng, BIAS_RATE),
            ellipse: Channel::draw(&mut rng, ELLIPSE_RATE),
            center_x: Channel::draw(&mut rng, CENTER_RATE),
            center_y: Channel::draw(&mut rng, CENTER_RATE),
        }
    }

    /// Sample all perturbations at elapsed time `t` (seconds)
    pub fn sample(&self, t: f64) -> DriftSample {
        let a = self.amplitude;
        DriftSample {
            radius: a * RADIUS_GAIN * self.radius.at(t),
            angle: a * ANGLE_GAIN * self.angle.at(t),
            bias: self.bias_rate * t + a * BIAS_SWAY_GAIN * self.bias.at(t),
            ellipse: (1.0 + a * ELLIPSE_GAIN * self.ellipse.at(t)).clamp(0.3, 1.7),
            center_x: a * CENTER_GAIN * self.center_x.at(t),
            center_y: a * CENTER_GAIN * self.center_y.at(t),
        }
    }
}
