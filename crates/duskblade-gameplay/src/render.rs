//! Rendering and asset collaborator seams.
//!
//! The gameplay core never decodes or draws images. It receives opaque
//! frame handles from a [`FrameSource`] once, at construction, and hands a
//! chosen frame plus a destination rect to a [`SpriteRenderer`] each draw.

use duskblade_common::{Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Fully opaque draw alpha.
pub const OPAQUE: u8 = 255;

/// Handle to one decoded animation frame owned by the asset side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpriteFrame {
    /// Asset-side identifier.
    pub id: u32,
    /// Frame width in screen pixels.
    pub width: f32,
    /// Frame height in screen pixels.
    pub height: f32,
}

impl SpriteFrame {
    /// Create a frame handle.
    #[must_use]
    pub const fn new(id: u32, width: f32, height: f32) -> Self {
        Self { id, width, height }
    }

    /// Frame size as a vector.
    #[must_use]
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }
}

/// Supplies ordered animation frames for a directory or file pattern.
///
/// Missing files are the source's problem: it may return fewer frames than
/// expected (or none) and the core clamps every index it uses.
pub trait FrameSource {
    /// Load the frames matching `pattern`, in playback order.
    fn animation_frames(&mut self, pattern: &str) -> Vec<SpriteFrame>;
}

/// Draws frames chosen by the core.
pub trait SpriteRenderer {
    /// Draw `frame` into `dest`, mirrored horizontally when `flip_x` is set.
    fn draw_sprite(&mut self, frame: &SpriteFrame, dest: Rect, flip_x: bool, alpha: u8);

    /// Draw a health bar over `bounds`, filled to `fill` (0.0-1.0).
    fn draw_bar(&mut self, _bounds: Rect, _fill: f32) {}
}
