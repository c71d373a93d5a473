//! Procedural motion module
//!
//! Everything that decides where the pointer should be:
//! - Smooth value noise and the per-session drift generator
//! - The orbit path function around the focal point
//! - The bounds guard that keeps targets on screen

pub mod bounds;
pub mod noise;
pub mod orbit;

use serde::{Deserialize, Serialize};

pub use bounds::{DisplayArea, ScreenBounds};
pub use noise::{DriftGenerator, DriftSample, SmoothNoise};
pub use orbit::OrbitPath;

/// Screen coordinate in pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Create a point
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Component-wise sum
    pub fn offset_by(self, other: Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }

    /// Component-wise difference `self - other`
    pub fn delta_from(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    /// Euclidean distance to another point
    pub fn distance_to(self, other: Point) -> f64 {
        let d = self.delta_from(other);
        d.x.hypot(d.y)
    }
}
