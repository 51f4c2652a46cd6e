//! Ambient enemies.
//!
//! This module provides:
//! - `ScriptedEnemy`: a choreographed loop (wait, enter, pause, attack,
//!   optional second pause and attack, exit, re-enter) driven only by
//!   elapsed time and clip completion
//! - Profiles for the bat, goblin and green monster
//! - `DriftingBat`: a swarm member that drifts left on a sine bob
//!
//! None of these read the player. Scripted enemies never deal damage.

use crate::animation::{Animation, Animator, FrameClock, FrameSet};
use crate::entity::{Body, HitboxAlign};
use crate::render::{FrameSource, SpriteRenderer, OPAQUE};
use duskblade_common::{EntityId, Rect, Vec2};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

const CLIP_MOVE: &str = "move";
const CLIP_IDLE: &str = "idle";
const CLIP_ATTACK_1: &str = "attack_1";
const CLIP_ATTACK_2: &str = "attack_2";

// ============================================================================
// Scripted Sequence
// ============================================================================

/// Step of the scripted loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScriptState {
    /// Hidden until the start delay runs out.
    Waiting,
    /// Moving toward the stop point.
    Enter,
    /// Pause before the first attack.
    Idle,
    /// First attack, played once.
    Attack,
    /// Pause before the second attack.
    IdleSecond,
    /// Second attack, played once.
    AttackSecond,
    /// Moving off the far edge.
    Exit,
}

/// Timing and movement of one scripted enemy type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptProfile {
    /// Name used in logs.
    pub name: String,
    /// Horizontal speed (px/s).
    pub speed: f32,
    /// Stop point relative to the screen center.
    pub stop_offset: f32,
    /// Pause before the first attack (s).
    pub idle_secs: f32,
    /// Pause before the second attack (s). `None` means a single attack.
    pub second_idle_secs: Option<f32>,
    /// Time per frame of movement and idle clips (s).
    pub frame_secs: f32,
    /// Time per frame of attack clips (s).
    pub attack_frame_secs: f32,
    /// Mirror the sprite while moving.
    pub flip_x: bool,
}

impl ScriptProfile {
    /// Fast flyer that hovers at the screen center.
    #[must_use]
    pub fn bat() -> Self {
        Self {
            name: "bat".into(),
            speed: 250.0,
            stop_offset: 0.0,
            idle_secs: 0.5,
            second_idle_secs: None,
            frame_secs: 0.1,
            attack_frame_secs: 0.1,
            flip_x: true,
        }
    }

    /// Runner that stops short of the center.
    #[must_use]
    pub fn goblin() -> Self {
        Self {
            name: "goblin".into(),
            speed: 200.0,
            stop_offset: -100.0,
            idle_secs: 0.5,
            second_idle_secs: None,
            frame_secs: 0.1,
            attack_frame_secs: 0.1,
            flip_x: false,
        }
    }

    /// Walker with a two-attack combo.
    #[must_use]
    pub fn green_monster() -> Self {
        Self {
            name: "green_monster".into(),
            speed: 200.0,
            stop_offset: 0.0,
            idle_secs: 0.5,
            second_idle_secs: Some(0.2),
            frame_secs: 0.1,
            attack_frame_secs: 0.15,
            flip_x: false,
        }
    }
}

/// Clips for a scripted enemy.
#[derive(Debug, Clone, Default)]
pub struct ScriptFrames {
    /// Movement loop.
    pub movement: FrameSet,
    /// Idle loop.
    pub idle: FrameSet,
    /// First attack.
    pub attack: FrameSet,
    /// Second attack, for two-attack profiles.
    pub second_attack: FrameSet,
}

impl ScriptFrames {
    /// Load the clips for the named enemy type.
    pub fn load(source: &mut dyn FrameSource, kind: &str) -> Self {
        let pattern = |clip: &str| format!("{kind}/{clip}");
        Self {
            movement: FrameSet::load(source, &pattern("move")),
            idle: FrameSet::load(source, &pattern("idle")),
            attack: FrameSet::load(source, &pattern("attack_1")),
            second_attack: FrameSet::load(source, &pattern("attack_2")),
        }
    }
}

/// An enemy following a fixed entrance, attack and exit loop.
#[derive(Debug, Clone)]
pub struct ScriptedEnemy {
    id: EntityId,
    profile: ScriptProfile,
    animator: Animator,
    rect: Rect,
    screen_width: f32,
    start_delay: f32,
    state: ScriptState,
    timer: f32,
    loops: u32,
}

impl ScriptedEnemy {
    /// Create an enemy standing on `midbottom`. A positive `start_delay`
    /// keeps it hidden for that many seconds.
    #[must_use]
    pub fn new(
        profile: ScriptProfile,
        frames: ScriptFrames,
        midbottom: Vec2,
        screen_width: f32,
        start_delay: f32,
    ) -> Self {
        let mut animator = Animator::new();
        animator.add(CLIP_MOVE, Animation::new(frames.movement.clone(), profile.frame_secs, true));
        animator.add(CLIP_IDLE, Animation::new(frames.idle, profile.frame_secs, true));
        animator.add(
            CLIP_ATTACK_1,
            Animation::new(frames.attack, profile.attack_frame_secs, false),
        );
        animator.add(
            CLIP_ATTACK_2,
            Animation::new(frames.second_attack, profile.attack_frame_secs, false),
        );
        animator.flip_x = profile.flip_x;

        let state = if start_delay > 0.0 {
            ScriptState::Waiting
        } else {
            ScriptState::Enter
        };

        Self {
            id: EntityId::new(),
            rect: Rect::from_midbottom(midbottom, frames.movement.size()),
            profile,
            animator,
            screen_width,
            start_delay,
            state,
            timer: 0.0,
            loops: 0,
        }
    }

    /// Actor id.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Current step.
    #[must_use]
    pub fn state(&self) -> ScriptState {
        self.state
    }

    /// Profile in use.
    #[must_use]
    pub fn profile(&self) -> &ScriptProfile {
        &self.profile
    }

    /// Sprite bounds.
    #[must_use]
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Playing clip.
    #[must_use]
    pub fn clip_name(&self) -> Option<&str> {
        self.animator.current_name()
    }

    /// Completed passes across the screen.
    #[must_use]
    pub fn loops(&self) -> u32 {
        self.loops
    }

    /// Whether the sprite is drawn.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.state != ScriptState::Waiting
    }

    fn stop_x(&self) -> f32 {
        (self.screen_width / 2.0).floor() + self.profile.stop_offset
    }

    fn enter(&mut self, state: ScriptState) {
        trace!("{} {:?} -> {:?}", self.profile.name, self.state, state);
        self.state = state;
        self.timer = 0.0;
    }

    fn advance_x(&mut self, dt: f32) {
        self.rect.translate(self.profile.speed * dt, 0.0);
        self.animator.set(CLIP_MOVE);
        self.animator.flip_x = self.profile.flip_x;
    }

    /// Advance by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        match self.state {
            ScriptState::Waiting => {
                self.timer += dt;
                if self.timer >= self.start_delay {
                    self.enter(ScriptState::Enter);
                }
            },
            ScriptState::Enter => {
                self.advance_x(dt);
                if self.rect.center_x() >= self.stop_x() {
                    self.enter(ScriptState::Idle);
                    self.animator.set(CLIP_IDLE);
                }
            },
            ScriptState::Idle => {
                self.timer += dt;
                if self.timer >= self.profile.idle_secs {
                    self.enter(ScriptState::Attack);
                    self.animator.set(CLIP_ATTACK_1);
                }
            },
            ScriptState::Attack => {
                if self.animator.is_finished() {
                    if self.profile.second_idle_secs.is_some() {
                        self.enter(ScriptState::IdleSecond);
                        self.animator.set(CLIP_IDLE);
                    } else {
                        self.enter(ScriptState::Exit);
                        self.animator.set(CLIP_MOVE);
                    }
                }
            },
            ScriptState::IdleSecond => {
                self.timer += dt;
                if self.timer >= self.profile.second_idle_secs.unwrap_or(0.0) {
                    self.enter(ScriptState::AttackSecond);
                    self.animator.set(CLIP_ATTACK_2);
                }
            },
            ScriptState::AttackSecond => {
                if self.animator.is_finished() {
                    self.enter(ScriptState::Exit);
                    self.animator.set(CLIP_MOVE);
                }
            },
            ScriptState::Exit => {
                self.advance_x(dt);
                if self.rect.left() > self.screen_width {
                    self.rect.set_right(0.0);
                    self.loops += 1;
                    debug!("{} wrapped for pass {}", self.profile.name, self.loops + 1);
                    self.enter(ScriptState::Enter);
                }
            },
        }
        self.animator.update(dt);
    }

    /// Draw the current frame unless still waiting.
    pub fn draw(&self, renderer: &mut dyn SpriteRenderer) {
        if !self.is_visible() {
            return;
        }
        if let Some(frame) = self.animator.frame() {
            renderer.draw_sprite(frame, self.rect, self.animator.flip_x, OPAQUE);
        }
    }
}

// ============================================================================
// Drifting Swarm
// ============================================================================

/// Drift and bob tuning for swarm bats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    /// Slowest leftward speed per tick.
    pub min_speed: f32,
    /// Fastest leftward speed per tick.
    pub max_speed: f32,
    /// Bob height.
    pub amplitude: f32,
    /// Bob phase step per tick.
    pub frequency: f32,
    /// Smallest sprite scale.
    pub min_scale: f32,
    /// Largest sprite scale.
    pub max_scale: f32,
    /// Width and height removed for the collision box.
    pub hitbox_reduction: f32,
    /// Animation frames per tick.
    pub animation_speed: f32,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            min_speed: 2.0,
            max_speed: 4.0,
            amplitude: 20.0,
            frequency: 0.05,
            min_scale: 1.5,
            max_scale: 2.5,
            hitbox_reduction: 20.0,
            animation_speed: 0.15,
        }
    }
}

/// A swarm bat crossing the screen right to left.
#[derive(Debug, Clone)]
pub struct DriftingBat {
    id: EntityId,
    frames: FrameSet,
    body: Body,
    clock: FrameClock,
    speed: f32,
    y_base: f32,
    amplitude: f32,
    frequency: f32,
    ticks: u32,
    removed: bool,
}

impl DriftingBat {
    /// Spawn with the left edge midpoint at `midleft`, bobbing around `y_base`.
    pub fn new(
        config: &DriftConfig,
        frames: FrameSet,
        midleft: Vec2,
        y_base: f32,
        rng: &mut fastrand::Rng,
    ) -> Self {
        let mut lerp = |min: f32, max: f32| min + rng.f32() * (max - min);
        let speed = -lerp(config.min_speed, config.max_speed);
        let size = frames.size() * lerp(config.min_scale, config.max_scale);

        let mut body = Body::new(Rect::new(midleft.x, midleft.y - size.y / 2.0, size.x, size.y));
        body.reduce_hitbox(config.hitbox_reduction, config.hitbox_reduction, HitboxAlign::Center);

        Self {
            id: EntityId::new(),
            frames,
            body,
            clock: FrameClock::new(config.animation_speed, true),
            speed,
            y_base,
            amplitude: config.amplitude,
            frequency: config.frequency,
            ticks: 0,
            removed: false,
        }
    }

    /// Actor id.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Leftward drift per tick (negative).
    #[must_use]
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Sprite bounds.
    #[must_use]
    pub fn rect(&self) -> Rect {
        self.body.rect()
    }

    /// Collision hitbox.
    #[must_use]
    pub fn hitbox(&self) -> Rect {
        self.body.hitbox()
    }

    /// Center of the sprite.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        self.body.center()
    }

    /// Whether the bat left the screen or was struck down.
    #[must_use]
    pub fn is_removed(&self) -> bool {
        self.removed
    }

    /// Remove the bat.
    pub fn strike(&mut self) {
        self.removed = true;
    }

    /// Advance one tick.
    pub fn update(&mut self, scroll: f32) {
        let rect = self.body.rect_mut();
        rect.translate(self.speed - scroll, 0.0);
        self.ticks += 1;
        rect.y = self.y_base + self.amplitude * (self.frequency * self.ticks as f32).sin();
        if rect.right() < 0.0 {
            self.removed = true;
        }
        self.clock.advance(self.frames.len());
    }

    /// Draw the current frame.
    pub fn draw(&self, renderer: &mut dyn SpriteRenderer) {
        if self.removed {
            return;
        }
        if let Some(frame) = self.frames.get(self.clock.frame()) {
            renderer.draw_sprite(frame, self.body.rect(), false, OPAQUE);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{frame_set, script_frames, RecordingRenderer};

    const WIDTH: f32 = 1600.0;
    const DT: f32 = 1.0 / 60.0;

    fn run_until(enemy: &mut ScriptedEnemy, state: ScriptState, max_ticks: usize) -> bool {
        for _ in 0..max_ticks {
            enemy.update(DT);
            if enemy.state() == state {
                return true;
            }
        }
        false
    }

    #[test]
    fn test_waiting_is_hidden() {
        let mut bat = ScriptedEnemy::new(
            ScriptProfile::bat(),
            script_frames(),
            Vec2::new(-50.0, 300.0),
            WIDTH,
            1.0,
        );
        assert_eq!(bat.state(), ScriptState::Waiting);
        let mut renderer = RecordingRenderer::default();
        bat.draw(&mut renderer);
        assert!(renderer.sprites.is_empty());

        assert!(run_until(&mut bat, ScriptState::Enter, 70));
        bat.draw(&mut renderer);
        assert_eq!(renderer.sprites.len(), 1);
        assert!(renderer.sprites[0].flip_x);
    }

    #[test]
    fn test_bat_full_loop() {
        let mut bat = ScriptedEnemy::new(
            ScriptProfile::bat(),
            script_frames(),
            Vec2::new(-50.0, 300.0),
            WIDTH,
            0.0,
        );
        assert_eq!(bat.state(), ScriptState::Enter);

        assert!(run_until(&mut bat, ScriptState::Idle, 600));
        assert!(bat.rect().center_x() >= 800.0);
        assert_eq!(bat.clip_name(), Some("idle"));
        let parked = bat.rect().x;

        assert!(run_until(&mut bat, ScriptState::Attack, 60));
        assert_eq!(bat.rect().x, parked);
        assert!(run_until(&mut bat, ScriptState::Exit, 120));
        assert!(run_until(&mut bat, ScriptState::Enter, 600));
        assert_eq!(bat.loops(), 1);
        assert_eq!(bat.rect().right(), 0.0);
    }

    #[test]
    fn test_goblin_stops_left_of_center() {
        let mut goblin = ScriptedEnemy::new(
            ScriptProfile::goblin(),
            script_frames(),
            Vec2::new(-50.0, 800.0),
            WIDTH,
            0.0,
        );
        assert!(run_until(&mut goblin, ScriptState::Idle, 600));
        let center = goblin.rect().center_x();
        assert!((700.0..710.0).contains(&center));
    }

    #[test]
    fn test_green_monster_two_attacks() {
        let mut monster = ScriptedEnemy::new(
            ScriptProfile::green_monster(),
            script_frames(),
            Vec2::new(-50.0, 800.0),
            WIDTH,
            0.0,
        );
        let mut seen = Vec::new();
        for _ in 0..2000 {
            monster.update(DT);
            if seen.last() != Some(&monster.state()) {
                seen.push(monster.state());
            }
            if monster.state() == ScriptState::Exit {
                break;
            }
        }
        assert_eq!(
            seen,
            vec![
                ScriptState::Enter,
                ScriptState::Idle,
                ScriptState::Attack,
                ScriptState::IdleSecond,
                ScriptState::AttackSecond,
                ScriptState::Exit,
            ]
        );
    }

    #[test]
    fn test_empty_attack_clip_does_not_stall() {
        let mut frames = script_frames();
        frames.attack = FrameSet::default();
        let mut bat = ScriptedEnemy::new(
            ScriptProfile::bat(),
            frames,
            Vec2::new(790.0, 300.0),
            WIDTH,
            0.0,
        );
        assert!(run_until(&mut bat, ScriptState::Exit, 120));
    }

    #[test]
    fn test_drifting_bat_bobs_and_leaves() {
        let mut rng = fastrand::Rng::with_seed(3);
        let config = DriftConfig::default();
        let mut bat = DriftingBat::new(
            &config,
            frame_set(7, 32.0, 32.0),
            Vec2::new(100.0, 200.0),
            200.0,
            &mut rng,
        );
        assert!(bat.speed() <= -2.0 && bat.speed() >= -4.0);
        assert!(bat.rect().width >= 48.0 && bat.rect().width <= 80.0);
        assert_eq!(bat.hitbox().width, bat.rect().width - 20.0);

        let mut min_y = f32::MAX;
        let mut max_y = f32::MIN;
        for _ in 0..200 {
            bat.update(0.0);
            min_y = min_y.min(bat.rect().y);
            max_y = max_y.max(bat.rect().y);
            if bat.is_removed() {
                break;
            }
        }
        assert!(bat.is_removed());
        assert!(max_y <= 220.0 && min_y >= 180.0);
        assert!(max_y - min_y > 10.0);
    }

    #[test]
    fn test_drifting_bat_scrolls() {
        let mut rng = fastrand::Rng::with_seed(9);
        let mut bat = DriftingBat::new(
            &DriftConfig::default(),
            frame_set(7, 32.0, 32.0),
            Vec2::new(500.0, 200.0),
            200.0,
            &mut rng,
        );
        let start = bat.rect().x;
        bat.update(5.0);
        assert!((bat.rect().x - (start + bat.speed() - 5.0)).abs() < 1e-4);
    }
}
