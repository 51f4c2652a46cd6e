//! Test collaborators and fixtures.
//!
//! This module provides:
//! - `RecordingAudio` / `RecordingRenderer`: collaborators that log calls
//! - `StubFrameSource`: sized placeholder frames for any pattern
//! - Fixture actors standing on a fixed ground line
//!
//! Shipped publicly so integration tests and tools can drive the core
//! without assets.

#![allow(clippy::expect_used)]

use crate::ambient::ScriptFrames;
use crate::animation::FrameSet;
use crate::audio::{AudioSink, SoundCue};
use crate::player::{Player, PlayerAttacks, PlayerConfig, PlayerFrames, PlayerInput};
use crate::render::{FrameSource, SpriteFrame, SpriteRenderer};
use crate::skeleton::{Skeleton, SkeletonConfig, SkeletonFrames};
use ahash::AHashMap;
use duskblade_common::{Rect, Vec2};

/// Ground line used by every fixture.
pub const GROUND_Y: f32 = 866.0;

/// Fixed step used by the tick helpers.
pub const TICK: f32 = 1.0 / 60.0;

// ============================================================================
// Collaborators
// ============================================================================

/// Remembers every sound it is asked to play.
#[derive(Debug, Clone, Default)]
pub struct RecordingAudio {
    /// Played cues in order.
    pub played: Vec<SoundCue>,
}

impl RecordingAudio {
    /// Names of the played cues in order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.played.iter().map(|cue| cue.name.as_str()).collect()
    }

    /// How many times `name` was played.
    #[must_use]
    pub fn count(&self, name: &str) -> usize {
        self.played.iter().filter(|cue| cue.name == name).count()
    }
}

impl AudioSink for RecordingAudio {
    fn play_sound(&mut self, name: &str, volume: f32, looping: bool) {
        self.played.push(SoundCue {
            name: name.to_string(),
            volume,
            looping,
        });
    }
}

/// One recorded sprite draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCall {
    /// Frame handed over.
    pub frame: SpriteFrame,
    /// Destination rect.
    pub dest: Rect,
    /// Mirrored.
    pub flip_x: bool,
    /// Alpha.
    pub alpha: u8,
}

/// Remembers every draw call.
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    /// Sprite draws in order.
    pub sprites: Vec<DrawCall>,
    /// Health bars as (bounds, fill).
    pub bars: Vec<(Rect, f32)>,
}

impl RecordingRenderer {
    /// Forget everything recorded so far.
    pub fn clear(&mut self) {
        self.sprites.clear();
        self.bars.clear();
    }
}

impl SpriteRenderer for RecordingRenderer {
    fn draw_sprite(&mut self, frame: &SpriteFrame, dest: Rect, flip_x: bool, alpha: u8) {
        self.sprites.push(DrawCall {
            frame: *frame,
            dest,
            flip_x,
            alpha,
        });
    }

    fn draw_bar(&mut self, bounds: Rect, fill: f32) {
        self.bars.push((bounds, fill));
    }
}

/// Hands out placeholder frames. Patterns without an entry get
/// `default_count` frames of `default_size`.
#[derive(Debug, Clone)]
pub struct StubFrameSource {
    clips: AHashMap<String, (usize, Vec2)>,
    default_count: usize,
    default_size: Vec2,
    next_id: u32,
    /// Patterns requested so far.
    pub requests: Vec<String>,
}

impl StubFrameSource {
    /// A source answering every pattern with `count` frames of `size`.
    #[must_use]
    pub fn new(count: usize, size: Vec2) -> Self {
        Self {
            clips: AHashMap::new(),
            default_count: count,
            default_size: size,
            next_id: 0,
            requests: Vec::new(),
        }
    }

    /// Frame counts and sizes matching the fixture actors.
    #[must_use]
    pub fn standard() -> Self {
        let player = Vec2::new(700.0, 200.0);
        let skeleton = Vec2::new(100.0, 120.0);
        Self::new(6, Vec2::new(64.0, 64.0))
            .with_clip("player/idle", 10, player)
            .with_clip("player/run", 10, player)
            .with_clip("player/jump_up", 5, player)
            .with_clip("player/jump_down", 5, player)
            .with_clip("player/attack_thrust", 9, player)
            .with_clip("player/attack_smash", 17, player)
            .with_clip("player/hurt", 6, player)
            .with_clip("player/death", 8, player)
            .with_clip("skeleton/idle", 8, skeleton)
            .with_clip("skeleton/walk", 10, skeleton)
            .with_clip("skeleton/attack_1", 10, skeleton)
            .with_clip("skeleton/attack_2", 9, skeleton)
            .with_clip("skeleton/hurt", 5, skeleton)
            .with_clip("skeleton/death", 13, skeleton)
            .with_clip("swarm/fly", 7, Vec2::new(32.0, 32.0))
    }

    /// Answer `pattern` with `count` frames of `size`.
    #[must_use]
    pub fn with_clip(mut self, pattern: &str, count: usize, size: Vec2) -> Self {
        self.clips.insert(pattern.to_string(), (count, size));
        self
    }
}

impl FrameSource for StubFrameSource {
    fn animation_frames(&mut self, pattern: &str) -> Vec<SpriteFrame> {
        self.requests.push(pattern.to_string());
        let (count, size) = self
            .clips
            .get(pattern)
            .copied()
            .unwrap_or((self.default_count, self.default_size));
        (0..count)
            .map(|_| {
                self.next_id += 1;
                SpriteFrame::new(self.next_id, size.x, size.y)
            })
            .collect()
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// `count` frames of one size.
#[must_use]
pub fn frame_set(count: usize, width: f32, height: f32) -> FrameSet {
    FrameSet::new(
        (0..count)
            .map(|i| SpriteFrame::new(i as u32, width, height))
            .collect(),
    )
}

/// Player clips at 700x200.
#[must_use]
pub fn player_frames() -> PlayerFrames {
    PlayerFrames::load(&mut StubFrameSource::standard())
}

/// Player tuning with the fixture ground line.
#[must_use]
pub fn player_config() -> PlayerConfig {
    PlayerConfig {
        ground_y: GROUND_Y,
        ..PlayerConfig::default()
    }
}

/// Player feet position on the ground line.
#[must_use]
pub fn player_spawn() -> Vec2 {
    Vec2::new(400.0, GROUND_Y)
}

/// A standing player with the standard attacks.
#[must_use]
pub fn test_player() -> Player {
    Player::new(
        player_config(),
        PlayerAttacks::standard().expect("standard attacks are valid"),
        player_frames(),
        player_spawn(),
    )
}

/// Tick `player` with no input until `done` holds, at most `max_ticks`
/// times. Returns whether `done` was reached.
pub fn tick_player_until(
    player: &mut Player,
    max_ticks: usize,
    done: impl Fn(&Player) -> bool,
) -> bool {
    let input = PlayerInput::default();
    for _ in 0..max_ticks {
        if done(player) {
            return true;
        }
        player.update(&input, TICK);
    }
    done(player)
}

/// Skeleton clips at 100x120.
#[must_use]
pub fn skeleton_frames() -> SkeletonFrames {
    SkeletonFrames::load(&mut StubFrameSource::standard())
}

/// A default skeleton standing on the ground line at `center_x`.
#[must_use]
pub fn test_skeleton(center_x: f32) -> Skeleton {
    Skeleton::new(
        SkeletonConfig {
            ground_y: GROUND_Y,
            ..SkeletonConfig::default()
        },
        skeleton_frames(),
        Vec2::new(center_x, GROUND_Y),
        1,
    )
}

/// Scripted enemy clips at 64x64, six frames each.
#[must_use]
pub fn script_frames() -> ScriptFrames {
    ScriptFrames::load(&mut StubFrameSource::standard(), "fixture")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stub_source_sizes() {
        let mut source = StubFrameSource::standard();
        let smash = source.animation_frames("player/attack_smash");
        assert_eq!(smash.len(), 17);
        assert_eq!(smash[0].size(), Vec2::new(700.0, 200.0));

        let other = source.animation_frames("goblin/move");
        assert_eq!(other.len(), 6);
        assert_eq!(source.requests.len(), 2);
        assert_ne!(smash[0].id, other[0].id);
    }

    #[test]
    fn test_recording_audio() {
        let mut audio = RecordingAudio::default();
        audio.play("a");
        audio.play_sound("b", 0.5, true);
        audio.play("a");
        assert_eq!(audio.names(), vec!["a", "b", "a"]);
        assert_eq!(audio.count("a"), 2);
        assert!(audio.played[1].looping);
    }

    #[test]
    fn test_tick_until_gives_up() {
        let mut player = test_player();
        assert!(!tick_player_until(&mut player, 5, |_| false));
        assert!(tick_player_until(&mut player, 5, Player::is_grounded));
    }
}
