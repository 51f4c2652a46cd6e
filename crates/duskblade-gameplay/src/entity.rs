//! Actor bodies and health.
//!
//! Every actor has a visual rect (where its sprite is drawn) and a separate
//! collision hitbox derived from it by per-side insets. Moving the visual
//! rect moves the hitbox with it; changing the insets never moves the sprite.

use duskblade_common::{Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Which edge stays put when a hitbox is shrunk vertically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HitboxAlign {
    /// Shrink equally from top and bottom.
    #[default]
    Center,
    /// Keep the bottom edge (feet) and shrink from the top.
    Bottom,
}

/// Distance from each visual edge to the matching hitbox edge.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HitboxInsets {
    /// Left inset.
    pub left: f32,
    /// Right inset.
    pub right: f32,
    /// Top inset.
    pub top: f32,
    /// Bottom inset.
    pub bottom: f32,
}

impl HitboxInsets {
    /// Create insets.
    #[must_use]
    pub const fn new(left: f32, right: f32, top: f32, bottom: f32) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
        }
    }
}

/// Visual bounds plus collision insets.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Body {
    rect: Rect,
    insets: HitboxInsets,
}

impl Body {
    /// Create a body whose hitbox matches its visual rect.
    #[must_use]
    pub fn new(rect: Rect) -> Self {
        Self {
            rect,
            insets: HitboxInsets::default(),
        }
    }

    /// Visual bounds.
    #[must_use]
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Mutable visual bounds.
    pub fn rect_mut(&mut self) -> &mut Rect {
        &mut self.rect
    }

    /// Center of the visual bounds.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        self.rect.center()
    }

    /// Collision hitbox.
    #[must_use]
    pub fn hitbox(&self) -> Rect {
        self.rect.inset(
            self.insets.left,
            self.insets.right,
            self.insets.top,
            self.insets.bottom,
        )
    }

    /// Current insets.
    #[must_use]
    pub fn insets(&self) -> HitboxInsets {
        self.insets
    }

    /// Make the hitbox `width` narrower and `height` shorter than the sprite.
    pub fn reduce_hitbox(&mut self, width: f32, height: f32, align: HitboxAlign) {
        let side = width / 2.0;
        let (top, bottom) = match align {
            HitboxAlign::Center => (height / 2.0, height / 2.0),
            HitboxAlign::Bottom => (height, 0.0),
        };
        self.insets = HitboxInsets::new(side, side, top, bottom);
    }

    /// Set each hitbox side independently.
    pub fn adjust_hitbox_sides(&mut self, left: f32, right: f32, top: f32, bottom: f32) {
        self.insets = HitboxInsets::new(left, right, top, bottom);
    }
}

/// Hit points, floored at zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Health {
    current: f32,
    max: f32,
}

impl Health {
    /// Full health.
    #[must_use]
    pub const fn new(max: f32) -> Self {
        Self { current: max, max }
    }

    /// Current health.
    #[must_use]
    pub const fn current(&self) -> f32 {
        self.current
    }

    /// Maximum health.
    #[must_use]
    pub const fn max(&self) -> f32 {
        self.max
    }

    /// Current health as a fraction of max.
    #[must_use]
    pub fn ratio(&self) -> f32 {
        if self.max <= 0.0 {
            0.0
        } else {
            self.current / self.max
        }
    }

    /// Apply damage.
    pub fn damage(&mut self, amount: f32) {
        self.current = (self.current - amount).max(0.0);
    }

    /// Restore to full.
    pub fn restore(&mut self) {
        self.current = self.max;
    }

    /// Whether any damage has been taken.
    #[must_use]
    pub fn is_damaged(&self) -> bool {
        self.current < self.max
    }

    /// Checks if dead.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.current <= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduce_hitbox_bottom_aligned() {
        let mut body = Body::new(Rect::new(0.0, 0.0, 100.0, 120.0));
        body.reduce_hitbox(40.0, 20.0, HitboxAlign::Bottom);
        let hitbox = body.hitbox();
        assert_eq!(hitbox, Rect::new(20.0, 20.0, 60.0, 100.0));
        assert_eq!(hitbox.bottom(), body.rect().bottom());
    }

    #[test]
    fn test_reduce_hitbox_centered() {
        let mut body = Body::new(Rect::new(0.0, 0.0, 40.0, 40.0));
        body.reduce_hitbox(20.0, 20.0, HitboxAlign::Center);
        assert_eq!(body.hitbox(), Rect::new(10.0, 10.0, 20.0, 20.0));
        assert_eq!(body.hitbox().center(), body.center());
    }

    #[test]
    fn test_hitbox_follows_rect() {
        let mut body = Body::new(Rect::new(0.0, 0.0, 700.0, 200.0));
        body.adjust_hitbox_sides(315.0, 315.0, 150.0, 0.0);
        body.rect_mut().translate(10.0, 5.0);
        assert_eq!(body.hitbox(), Rect::new(325.0, 155.0, 70.0, 50.0));
    }

    #[test]
    fn test_health_floors_at_zero() {
        let mut health = Health::new(30.0);
        health.damage(7.5);
        assert!((health.current() - 22.5).abs() < 1e-5);
        assert!(health.is_damaged());
        health.damage(100.0);
        assert_eq!(health.current(), 0.0);
        assert!(health.is_dead());
        health.restore();
        assert_eq!(health.ratio(), 1.0);
    }
}
