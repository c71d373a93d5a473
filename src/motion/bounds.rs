//! Screen bounds guard
//!
//! Keeps targets inside the active monitor shrunk by the configured margin.
//! Out-of-range targets are projected per axis onto the nearest edge, so
//! motion slides along the border instead of snapping.

use serde::{Deserialize, Serialize};

use super::Point;

/// Monitor rectangle as reported by the display
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayArea {
    /// Left edge (px)
    pub x: f64,
    /// Top edge (px)
    pub y: f64,
    /// Width (px)
    pub width: f64,
    /// Height (px)
    pub height: f64,
}

impl DisplayArea {
    /// Primary-monitor area at the origin
    pub const fn sized(width: f64, height: f64) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width,
            height,
        }
    }

    /// Whether the area has a usable, finite extent
    pub fn is_usable(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
            && self.width > 0.0
            && self.height > 0.0
    }

    /// Center of the area
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }
}

/// Usable rectangle after the margin is removed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenBounds {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl ScreenBounds {
    /// Shrink a display area by `margin` on every side
    ///
    /// A margin wider than half the area collapses that axis to its center
    /// line rather than inverting the rectangle.
    pub fn from_display(area: DisplayArea, margin: f64) -> Self {
        let margin = margin.max(0.0);
        let (left, right) = shrink(area.x, area.width, margin);
        let (top, bottom) = shrink(area.y, area.height, margin);
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Project a candidate onto the rectangle
    pub fn clamp(&self, candidate: Point) -> Point {
        Point::new(
            candidate.x.clamp(self.left, self.right),
            candidate.y.clamp(self.top, self.bottom),
        )
    }

    /// Whether a point lies inside (edges included)
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left && point.x <= self.right && point.y >= self.top && point.y <= self.bottom
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }
}

fn shrink(start: f64, extent: f64, margin: f64) -> (f64, f64) {
    let low = start + margin;
    let high = start + extent - margin;
    if low <= high {
        (low, high)
    } else {
        let mid = start + extent * 0.5;
        (mid, mid)
    }
}
