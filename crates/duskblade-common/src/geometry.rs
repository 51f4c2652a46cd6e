//! Screen-space geometry.
//!
//! This module provides:
//! - `Rect`, an axis-aligned box in screen pixels (y grows downward)
//! - Overlap tests where zero-size boxes never collide
//! - Edge and center accessors used for sprite placement

use serde::{Deserialize, Serialize};

pub use glam::Vec2;

/// Axis-aligned rectangle in screen space.
///
/// `x`/`y` is the top-left corner. Width and height may be zero; such a
/// rectangle is valid but never intersects anything.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Horizontal extent.
    pub width: f32,
    /// Vertical extent.
    pub height: f32,
}

impl Rect {
    /// Creates a rectangle from its top-left corner and size.
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates a rectangle centered on `center`.
    #[must_use]
    pub fn from_center(center: Vec2, size: Vec2) -> Self {
        Self::new(
            center.x - size.x / 2.0,
            center.y - size.y / 2.0,
            size.x,
            size.y,
        )
    }

    /// Creates a rectangle whose bottom edge midpoint sits at `midbottom`.
    #[must_use]
    pub fn from_midbottom(midbottom: Vec2, size: Vec2) -> Self {
        Self::new(midbottom.x - size.x / 2.0, midbottom.y - size.y, size.x, size.y)
    }

    /// Left edge.
    #[must_use]
    pub fn left(&self) -> f32 {
        self.x
    }

    /// Right edge.
    #[must_use]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Top edge.
    #[must_use]
    pub fn top(&self) -> f32 {
        self.y
    }

    /// Bottom edge.
    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Horizontal center.
    #[must_use]
    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    /// Vertical center.
    #[must_use]
    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }

    /// Center point.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.center_x(), self.center_y())
    }

    /// Size as a vector.
    #[must_use]
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    /// Moves the rectangle by the given offset.
    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.x += dx;
        self.y += dy;
    }

    /// Moves the rectangle so its left edge is at `left`.
    pub fn set_left(&mut self, left: f32) {
        self.x = left;
    }

    /// Moves the rectangle so its right edge is at `right`.
    pub fn set_right(&mut self, right: f32) {
        self.x = right - self.width;
    }

    /// Moves the rectangle so its bottom edge is at `bottom`.
    pub fn set_bottom(&mut self, bottom: f32) {
        self.y = bottom - self.height;
    }

    /// Moves the rectangle so its horizontal center is at `center_x`.
    pub fn set_center_x(&mut self, center_x: f32) {
        self.x = center_x - self.width / 2.0;
    }

    /// Returns true if either dimension is zero or negative.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Strict overlap test. Touching edges do not count and degenerate
    /// rectangles never intersect.
    #[must_use]
    pub fn intersects(&self, other: &Rect) -> bool {
        if self.is_degenerate() || other.is_degenerate() {
            return false;
        }
        self.left() < other.right()
            && self.right() > other.left()
            && self.top() < other.bottom()
            && self.bottom() > other.top()
    }

    /// Shrinks each side independently. The result never has negative size.
    #[must_use]
    pub fn inset(&self, left: f32, right: f32, top: f32, bottom: f32) -> Self {
        Self::new(
            self.x + left,
            self.y + top,
            (self.width - left - right).max(0.0),
            (self.height - top - bottom).max(0.0),
        )
    }
}
