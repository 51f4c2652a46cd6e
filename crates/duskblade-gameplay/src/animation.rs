//! Animation plumbing.
//!
//! This module provides:
//! - `FrameSet`: an immutable, shared list of frames with clamped lookup
//! - `FrameClock`: a per-tick fractional frame index that reports when a
//!   non-looping clip finishes
//! - `Animation` / `Animator`: time-based clips for scripted actors

use crate::render::{FrameSource, SpriteFrame};
use ahash::AHashMap;
use duskblade_common::Vec2;
use std::sync::Arc;
use tracing::warn;

// ============================================================================
// Frame Sets
// ============================================================================

/// Ordered frames of one clip. Cloning shares the underlying list.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSet {
    frames: Arc<[SpriteFrame]>,
}

impl Default for FrameSet {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl FrameSet {
    /// Wrap a list of frames.
    #[must_use]
    pub fn new(frames: Vec<SpriteFrame>) -> Self {
        Self {
            frames: frames.into(),
        }
    }

    /// Load frames from an asset source. An empty result is logged, not fatal.
    pub fn load(source: &mut dyn FrameSource, pattern: &str) -> Self {
        let frames = source.animation_frames(pattern);
        if frames.is_empty() {
            warn!("No frames found for '{pattern}'");
        }
        Self::new(frames)
    }

    /// Number of frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the set has no frames.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frame at `index`, clamped to the last frame.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&SpriteFrame> {
        let last = self.frames.len().checked_sub(1)?;
        self.frames.get(index.min(last))
    }

    /// Size of the first frame, or zero for an empty set.
    #[must_use]
    pub fn size(&self) -> Vec2 {
        self.frames.first().map_or(Vec2::ZERO, SpriteFrame::size)
    }
}

// ============================================================================
// Frame Clock
// ============================================================================

/// Fractional frame index advanced by a fixed speed every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameClock {
    index: f32,
    speed: f32,
    looping: bool,
}

impl FrameClock {
    /// Create a clock at frame 0.
    #[must_use]
    pub const fn new(speed: f32, looping: bool) -> Self {
        Self {
            index: 0.0,
            speed,
            looping,
        }
    }

    /// Restart at frame 0 with new playback settings.
    pub fn restart(&mut self, speed: f32, looping: bool) {
        *self = Self::new(speed, looping);
    }

    /// Fractional index.
    #[must_use]
    pub fn index(&self) -> f32 {
        self.index
    }

    /// Whole frame currently shown.
    #[must_use]
    pub fn frame(&self) -> usize {
        self.index.max(0.0) as usize
    }

    /// Advance one tick over a clip of `len` frames.
    ///
    /// Returns true when a non-looping clip has run out; the index then holds
    /// on the last frame. Looping clips wrap to 0 and never report finished.
    pub fn advance(&mut self, len: usize) -> bool {
        self.index += self.speed;
        if self.index < len as f32 {
            return false;
        }
        if self.looping {
            self.index = 0.0;
            false
        } else {
            self.index = len.saturating_sub(1) as f32;
            true
        }
    }
}

// ============================================================================
// Time-based Clips
// ============================================================================

/// A clip played at a fixed time per frame.
#[derive(Debug, Clone)]
pub struct Animation {
    frames: FrameSet,
    frame_duration: f32,
    looping: bool,
    current: usize,
    timer: f32,
    finished: bool,
}

impl Animation {
    /// Create a clip. `frame_duration` is in seconds.
    #[must_use]
    pub fn new(frames: FrameSet, frame_duration: f32, looping: bool) -> Self {
        Self {
            frames,
            frame_duration,
            looping,
            current: 0,
            timer: 0.0,
            finished: false,
        }
    }

    /// Advance by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        if self.finished {
            return;
        }
        if self.frames.is_empty() {
            self.finished = !self.looping;
            return;
        }
        self.timer += dt;
        if self.timer < self.frame_duration {
            return;
        }
        self.timer = 0.0;
        self.current += 1;
        if self.current >= self.frames.len() {
            if self.looping {
                self.current = 0;
            } else {
                self.current = self.frames.len() - 1;
                self.finished = true;
            }
        }
    }

    /// Whether a non-looping clip reached its last frame. An empty
    /// non-looping clip finishes on its first update.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Index of the frame shown.
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Frame shown, if the clip has any.
    #[must_use]
    pub fn frame(&self) -> Option<&SpriteFrame> {
        self.frames.get(self.current)
    }

    /// Rewind to the first frame.
    pub fn reset(&mut self) {
        self.current = 0;
        self.timer = 0.0;
        self.finished = false;
    }
}

/// Named clips with one of them playing.
#[derive(Debug, Clone, Default)]
pub struct Animator {
    clips: AHashMap<String, Animation>,
    current: Option<String>,
    /// Mirror frames horizontally when drawn.
    pub flip_x: bool,
}

impl Animator {
    /// Create an empty animator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a clip. The first clip added starts playing.
    pub fn add(&mut self, name: impl Into<String>, clip: Animation) {
        let name = name.into();
        let first = self.current.is_none();
        self.clips.insert(name.clone(), clip);
        if first {
            self.set(&name);
        }
    }

    /// Switch to `name`. Re-selecting the playing clip does not restart it,
    /// and unknown names keep the current clip.
    pub fn set(&mut self, name: &str) {
        if self.current.as_deref() == Some(name) {
            return;
        }
        match self.clips.get_mut(name) {
            Some(clip) => {
                clip.reset();
                self.current = Some(name.to_owned());
            },
            None => warn!("Unknown clip '{name}'"),
        }
    }

    /// Name of the playing clip.
    #[must_use]
    pub fn current_name(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// The playing clip.
    #[must_use]
    pub fn current(&self) -> Option<&Animation> {
        self.current.as_ref().and_then(|name| self.clips.get(name))
    }

    /// Advance the playing clip by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        if let Some(clip) = self.current.as_ref().and_then(|name| self.clips.get_mut(name)) {
            clip.update(dt);
        }
    }

    /// Whether the playing clip has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.current().is_some_and(Animation::is_finished)
    }

    /// Frame to draw.
    #[must_use]
    pub fn frame(&self) -> Option<&SpriteFrame> {
        self.current().and_then(Animation::frame)
    }
}
