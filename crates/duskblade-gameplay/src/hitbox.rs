//! Attack hitbox geometry.
//!
//! A hitbox is described relative to its owner's center so the same
//! description works for either facing direction.

use duskblade_common::{Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Offset and size of an attack hitbox relative to the owner's center.
///
/// `offset_x` points in the facing direction and is mirrored when the
/// owner faces left. `offset_y` is never mirrored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitboxGeometry {
    /// Forward offset from the owner's center.
    pub offset_x: f32,
    /// Vertical offset from the owner's center (positive is down).
    pub offset_y: f32,
    /// Hitbox width.
    pub width: f32,
    /// Hitbox height.
    pub height: f32,
}

impl Default for HitboxGeometry {
    fn default() -> Self {
        Self::new(0.0, 0.0, 50.0, 50.0)
    }
}

impl HitboxGeometry {
    /// Create a hitbox description.
    #[must_use]
    pub const fn new(offset_x: f32, offset_y: f32, width: f32, height: f32) -> Self {
        Self {
            offset_x,
            offset_y,
            width,
            height,
        }
    }

    /// Place the hitbox in screen space for an owner with the given bounds.
    #[must_use]
    pub fn to_rect(&self, owner: &Rect, facing_left: bool) -> Rect {
        let forward = if facing_left {
            -self.offset_x
        } else {
            self.offset_x
        };
        let center = owner.center() + Vec2::new(forward, self.offset_y);
        Rect::from_center(center, Vec2::new(self.width, self.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hitbox_faces_right() {
        let owner = Rect::new(0.0, 0.0, 100.0, 100.0);
        let rect = HitboxGeometry::new(60.0, 0.0, 70.0, 50.0).to_rect(&owner, false);
        assert_eq!(rect.center(), Vec2::new(110.0, 50.0));
        assert_eq!(rect.left(), 75.0);
        assert_eq!(rect.top(), 25.0);
    }

    #[test]
    fn test_hitbox_mirrors_when_facing_left() {
        let owner = Rect::new(0.0, 0.0, 100.0, 100.0);
        let geometry = HitboxGeometry::new(40.0, -30.0, 80.0, 70.0);
        let right = geometry.to_rect(&owner, false);
        let left = geometry.to_rect(&owner, true);
        assert_eq!(right.center_x() - 50.0, 50.0 - left.center_x());
        assert_eq!(right.center_y(), left.center_y());
        assert_eq!(left.center_y(), 20.0);
    }

    #[test]
    fn test_zero_size_hitbox_never_collides() {
        let owner = Rect::new(0.0, 0.0, 100.0, 100.0);
        let rect = HitboxGeometry::new(0.0, 0.0, 0.0, 0.0).to_rect(&owner, false);
        assert!(!rect.intersects(&owner));
    }
}
