//! Player state machine.
//!
//! This module provides:
//! - `PlayerState`, a flat enum with priority tiers and a per-state
//!   configuration table
//! - The two standard attacks (thrust and smash)
//! - `Player`, which runs input, gravity, movement, animation and
//!   invincibility each tick and exposes the combat query surface used by
//!   the resolver
//!
//! Lower priority values win: a state can always be replaced by one with a
//! lower value, and by anything else only while it is interruptible.
//! Transitions triggered by an animation finishing bypass that rule.

use crate::animation::{FrameClock, FrameSet};
use crate::attack::{AttackDefinition, AttackResult, AttackRuntime, AttackSnapshot};
use crate::audio::{AudioSink, FootstepController, SoundCue, SoundCueQueue};
use crate::entity::{Body, Health};
use crate::hitbox::HitboxGeometry;
use crate::render::{FrameSource, SpriteRenderer, OPAQUE};
use duskblade_common::{EntityId, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Sounds queued while a smash passes these frames.
const SMASH_FRAME_CUES: [(u32, &str); 3] = [
    (3, "smash_phase_1"),
    (7, "smash_phase_2"),
    (11, "smash_phase_3"),
];

/// Alpha used on the dim half of the invincibility flicker.
const FLICKER_ALPHA: u8 = 128;

// ============================================================================
// States
// ============================================================================

/// Player state. The discriminant is the priority tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum PlayerState {
    /// Dead. Terminal until reset.
    Death = 0,
    /// Staggered after taking damage.
    Hurt = 10,
    /// Quick forward stab.
    AttackThrust = 20,
    /// Heavy three-phase swing.
    AttackSmash = 21,
    /// Rising after a jump.
    JumpUp = 30,
    /// Falling.
    JumpDown = 31,
    /// Moving on the ground.
    Run = 40,
    /// Standing still.
    #[default]
    Idle = 50,
}

/// Per-state behavior flags.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateConfig {
    /// Frames advanced per tick.
    pub animation_speed: f32,
    /// Whether the clip loops.
    pub looping: bool,
    /// Whether lower-priority states may replace this one.
    pub interruptible: bool,
    /// Whether damage is ignored while in this state.
    pub grants_invincibility: bool,
    /// Whether horizontal movement is disabled.
    pub locks_movement: bool,
    /// Whether all input is ignored.
    pub locks_input: bool,
}

impl StateConfig {
    const fn locked(animation_speed: f32, invincible: bool, locks_input: bool) -> Self {
        Self {
            animation_speed,
            looping: false,
            interruptible: false,
            grants_invincibility: invincible,
            locks_movement: true,
            locks_input,
        }
    }

    const fn free(animation_speed: f32) -> Self {
        Self {
            animation_speed,
            looping: true,
            interruptible: true,
            grants_invincibility: false,
            locks_movement: false,
            locks_input: false,
        }
    }
}

impl PlayerState {
    /// Every state, highest priority first.
    pub const ALL: [Self; 8] = [
        Self::Death,
        Self::Hurt,
        Self::AttackThrust,
        Self::AttackSmash,
        Self::JumpUp,
        Self::JumpDown,
        Self::Run,
        Self::Idle,
    ];

    /// Priority tier (lower wins).
    #[must_use]
    pub const fn priority(self) -> u8 {
        self as u8
    }

    /// Behavior flags for this state.
    #[must_use]
    pub const fn config(self) -> StateConfig {
        match self {
            Self::Death => StateConfig::locked(0.15, true, true),
            Self::Hurt => StateConfig::locked(0.20, true, true),
            Self::AttackThrust | Self::AttackSmash => StateConfig::locked(0.24, false, false),
            Self::JumpUp | Self::JumpDown | Self::Run | Self::Idle => StateConfig::free(0.27),
        }
    }

    /// Whether this is one of the attack states.
    #[must_use]
    pub const fn is_attack(self) -> bool {
        matches!(self, Self::AttackThrust | Self::AttackSmash)
    }

    /// Whether a request to move from `self` to `target` is allowed.
    #[must_use]
    pub const fn can_transition(self, target: Self) -> bool {
        if self as u8 == target as u8 {
            return false;
        }
        target.priority() < self.priority() || self.config().interruptible
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Player tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Downward acceleration per tick.
    pub gravity: f32,
    /// Vertical velocity set by a jump (negative is up).
    pub jump_velocity: f32,
    /// Y of the ground line.
    pub ground_y: f32,
    /// Height above the ground still treated as grounded.
    pub airborne_threshold: f32,
    /// Ground speed per tick.
    pub move_speed: f32,
    /// Air speed per tick.
    pub air_move_speed: f32,
    /// Left screen bound.
    pub bound_left: f32,
    /// Right screen bound.
    pub bound_right: f32,
    /// Starting health.
    pub max_health: f32,
    /// Collision hitbox insets (left, right, top, bottom) from the sprite.
    pub hitbox_insets: [f32; 4],
    /// Invincibility after the hurt animation (seconds).
    pub hurt_grace_secs: f32,
    /// Footstep cadence (ms).
    pub footstep_interval_ms: u64,
    /// Footstep volume.
    pub footstep_volume: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            gravity: 0.8,
            jump_velocity: -22.0,
            ground_y: 900.0 - 34.0,
            airborne_threshold: 1.0,
            move_speed: 3.4,
            air_move_speed: 5.0,
            bound_left: 0.0,
            bound_right: 1600.0,
            max_health: 100.0,
            hitbox_insets: [315.0, 315.0, 150.0, 0.0],
            hurt_grace_secs: 0.3,
            footstep_interval_ms: 170,
            footstep_volume: 0.85,
        }
    }
}

/// Attack definitions the player can use.
#[derive(Debug, Clone)]
pub struct PlayerAttacks {
    /// Fast single-hit stab.
    pub thrust: Arc<AttackDefinition>,
    /// Slow multi-hit swing.
    pub smash: Arc<AttackDefinition>,
}

impl PlayerAttacks {
    /// The standard thrust and smash.
    pub fn standard() -> AttackResult<Self> {
        let thrust = AttackDefinition::builder("thrust")
            .hit_frames([3])
            .base_damage(15.0)
            .knockback(8.0)
            .knockback_angle(30.0)
            .hit_stop_frames(3)
            .max_hits_per_target(1)
            .frame_damage_modifier(3, 0.5)
            .frame_hitbox(3, HitboxGeometry::new(60.0, 0.0, 70.0, 50.0))
            .startup_frames(0..3)
            .recovery_frames(5..9)
            .build()?;

        let smash = AttackDefinition::builder("smash")
            .hit_frames([3, 7, 11])
            .base_damage(25.0)
            .knockback(15.0)
            .knockback_angle(45.0)
            .hit_stop_frames(5)
            .max_hits_per_target(2)
            .frame_damage_modifier(3, 0.3)
            .frame_damage_modifier(7, 0.5)
            .frame_damage_modifier(11, 0.2)
            .frame_hitbox(3, HitboxGeometry::new(40.0, -30.0, 80.0, 70.0))
            .frame_hitbox(7, HitboxGeometry::new(50.0, 10.0, 90.0, 70.0))
            .frame_hitbox(11, HitboxGeometry::new(70.0, 0.0, 120.0, 70.0))
            .startup_frames(0..5)
            .recovery_frames(13..17)
            .build()?;

        Ok(Self {
            thrust: Arc::new(thrust),
            smash: Arc::new(smash),
        })
    }
}

/// One clip per state.
#[derive(Debug, Clone, Default)]
pub struct PlayerFrames {
    /// Idle loop.
    pub idle: FrameSet,
    /// Run loop.
    pub run: FrameSet,
    /// Rising.
    pub jump_up: FrameSet,
    /// Falling.
    pub jump_down: FrameSet,
    /// Thrust attack.
    pub thrust: FrameSet,
    /// Smash attack.
    pub smash: FrameSet,
    /// Hurt stagger.
    pub hurt: FrameSet,
    /// Death.
    pub death: FrameSet,
}

impl PlayerFrames {
    /// Load every clip from an asset source.
    pub fn load(source: &mut dyn FrameSource) -> Self {
        Self {
            idle: FrameSet::load(source, "player/idle"),
            run: FrameSet::load(source, "player/run"),
            jump_up: FrameSet::load(source, "player/jump_up"),
            jump_down: FrameSet::load(source, "player/jump_down"),
            thrust: FrameSet::load(source, "player/attack_thrust"),
            smash: FrameSet::load(source, "player/attack_smash"),
            hurt: FrameSet::load(source, "player/hurt"),
            death: FrameSet::load(source, "player/death"),
        }
    }

    /// Clip shown in `state`.
    #[must_use]
    pub fn for_state(&self, state: PlayerState) -> &FrameSet {
        match state {
            PlayerState::Death => &self.death,
            PlayerState::Hurt => &self.hurt,
            PlayerState::AttackThrust => &self.thrust,
            PlayerState::AttackSmash => &self.smash,
            PlayerState::JumpUp => &self.jump_up,
            PlayerState::JumpDown => &self.jump_down,
            PlayerState::Run => &self.run,
            PlayerState::Idle => &self.idle,
        }
    }
}

/// Buttons held this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerInput {
    /// Move left.
    pub left: bool,
    /// Move right.
    pub right: bool,
    /// Jump.
    pub jump: bool,
    /// Thrust attack.
    pub thrust: bool,
    /// Smash attack.
    pub smash: bool,
}

/// Serializable view of the player for debug overlays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerDebugInfo {
    /// Current state.
    pub state: PlayerState,
    /// Current animation frame.
    pub frame: u32,
    /// Current health.
    pub health: f32,
    /// Maximum health.
    pub max_health: f32,
    /// Top-left of the sprite.
    pub position: Vec2,
    /// Whether an attack state is active.
    pub is_attacking: bool,
    /// Whether damage is currently ignored.
    pub is_invincible: bool,
    /// Attack runtime details.
    pub attack: AttackSnapshot,
}

// ============================================================================
// Player
// ============================================================================

/// The player character.
#[derive(Debug, Clone)]
pub struct Player {
    id: EntityId,
    config: PlayerConfig,
    attacks: PlayerAttacks,
    frames: PlayerFrames,
    body: Body,
    spawn_midbottom: Vec2,
    state: PlayerState,
    clock: FrameClock,
    attack: AttackRuntime,
    health: Health,
    direction: i8,
    facing_left: bool,
    vertical_velocity: f32,
    invincibility_timer: f32,
    invincibility_duration: f32,
    footsteps: FootstepController,
    smash_cues_played: Vec<u32>,
    elapsed_ms: f64,
    cues: SoundCueQueue,
}

impl Player {
    /// Create a player standing with its feet centered on `spawn_midbottom`.
    #[must_use]
    pub fn new(
        config: PlayerConfig,
        attacks: PlayerAttacks,
        frames: PlayerFrames,
        spawn_midbottom: Vec2,
    ) -> Self {
        let body = Self::spawn_body(&config, &frames, spawn_midbottom);
        let idle = PlayerState::Idle.config();
        Self {
            id: EntityId::new(),
            health: Health::new(config.max_health),
            footsteps: FootstepController::new(
                "footstep",
                config.footstep_interval_ms,
                config.footstep_volume,
            ),
            config,
            attacks,
            frames,
            body,
            spawn_midbottom,
            state: PlayerState::Idle,
            clock: FrameClock::new(idle.animation_speed, idle.looping),
            attack: AttackRuntime::new(),
            direction: 0,
            facing_left: false,
            vertical_velocity: 0.0,
            invincibility_timer: 0.0,
            invincibility_duration: 0.0,
            smash_cues_played: Vec::new(),
            elapsed_ms: 0.0,
            cues: SoundCueQueue::new(),
        }
    }

    fn spawn_body(config: &PlayerConfig, frames: &PlayerFrames, midbottom: Vec2) -> Body {
        let mut body = Body::new(Rect::from_midbottom(midbottom, frames.idle.size()));
        let [left, right, top, bottom] = config.hitbox_insets;
        body.adjust_hitbox_sides(left, right, top, bottom);
        body
    }

    // === Queries ===

    /// Actor id.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> PlayerState {
        self.state
    }

    /// Tuning in use.
    #[must_use]
    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Current health.
    #[must_use]
    pub fn health(&self) -> f32 {
        self.health.current()
    }

    /// Maximum health.
    #[must_use]
    pub fn max_health(&self) -> f32 {
        self.health.max()
    }

    /// Whether the player is in the death state.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.state == PlayerState::Death
    }

    /// Whether an attack state is active.
    #[must_use]
    pub fn is_attacking(&self) -> bool {
        self.state.is_attack()
    }

    /// Whether damage is currently ignored.
    #[must_use]
    pub fn is_invincible(&self) -> bool {
        self.state.config().grants_invincibility || self.invincibility_timer > 0.0
    }

    /// Remaining post-hurt invincibility (seconds).
    #[must_use]
    pub fn invincibility_timer(&self) -> f32 {
        self.invincibility_timer
    }

    /// Whether the player is running with a direction held.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == PlayerState::Run && self.direction != 0
    }

    /// Horizontal input direction (-1, 0 or 1).
    #[must_use]
    pub fn direction(&self) -> i8 {
        self.direction
    }

    /// Whether the sprite faces left.
    #[must_use]
    pub fn facing_left(&self) -> bool {
        self.facing_left
    }

    /// Vertical velocity (negative is up).
    #[must_use]
    pub fn vertical_velocity(&self) -> f32 {
        self.vertical_velocity
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

    /// Whether the feet are on (or within the threshold of) the ground.
    #[must_use]
    pub fn is_grounded(&self) -> bool {
        self.body.rect().bottom() >= self.config.ground_y - self.config.airborne_threshold
    }

    /// Animation frame shown.
    #[must_use]
    pub fn current_frame_index(&self) -> u32 {
        self.clock.frame() as u32
    }

    /// Attack runtime.
    #[must_use]
    pub fn attack_runtime(&self) -> &AttackRuntime {
        &self.attack
    }

    /// Frame the running attack is on, if any.
    #[must_use]
    pub fn current_attack_frame(&self) -> Option<u32> {
        self.attack.is_active().then(|| self.attack.current_frame())
    }

    /// Debug view.
    #[must_use]
    pub fn debug_info(&self) -> PlayerDebugInfo {
        let rect = self.body.rect();
        PlayerDebugInfo {
            state: self.state,
            frame: self.current_frame_index(),
            health: self.health.current(),
            max_health: self.health.max(),
            position: Vec2::new(rect.x, rect.y),
            is_attacking: self.is_attacking(),
            is_invincible: self.is_invincible(),
            attack: self.attack.snapshot(),
        }
    }

    // === Combat surface ===

    /// Whether the current frame can deal damage.
    #[must_use]
    pub fn should_deal_damage(&self) -> bool {
        self.is_attacking() && self.attack.is_hit_frame_active()
    }

    /// Hitbox of the active hit frame.
    #[must_use]
    pub fn attack_hitbox(&self) -> Option<Rect> {
        if !self.is_attacking() {
            return None;
        }
        self.attack.current_hitbox(&self.body.rect(), self.facing_left)
    }

    /// Definition of the running attack.
    #[must_use]
    pub fn attack_definition(&self) -> Option<&Arc<AttackDefinition>> {
        self.attack.definition()
    }

    /// Try to record a hit on `target`.
    pub fn try_register_hit(&mut self, target: EntityId) -> bool {
        self.attack.try_register_hit(target)
    }

    /// Damage of the current attack frame.
    #[must_use]
    pub fn current_attack_damage(&self) -> f32 {
        self.attack.current_damage()
    }

    /// Knockback against a target centered at `target`.
    #[must_use]
    pub fn attack_knockback(&self, target: Vec2) -> Vec2 {
        self.attack
            .knockback_vector(self.body.center(), target, self.facing_left)
    }

    // === Transitions ===

    /// Whether a request to enter `target` would be accepted.
    #[must_use]
    pub fn can_transition_to(&self, target: PlayerState) -> bool {
        self.state.can_transition(target)
    }

    /// Enter `target` if the priority rule allows it.
    pub fn request_transition(&mut self, target: PlayerState) -> bool {
        if !self.can_transition_to(target) {
            return false;
        }
        self.transition_to(target);
        true
    }

    fn transition_to(&mut self, next: PlayerState) {
        if self.is_attacking() && !next.is_attack() {
            self.attack.end();
        }
        if next != PlayerState::Run {
            self.footsteps.reset();
        }
        debug!("Player {:?} -> {:?}", self.state, next);

        let config = next.config();
        self.state = next;
        self.clock.restart(config.animation_speed, config.looping);
        if config.locks_movement {
            self.direction = 0;
        }
    }

    fn transition_to_movement_state(&mut self) {
        let next = if !self.is_grounded() {
            if self.vertical_velocity < 0.0 {
                PlayerState::JumpUp
            } else {
                PlayerState::JumpDown
            }
        } else if self.direction != 0 {
            PlayerState::Run
        } else {
            PlayerState::Idle
        };
        self.transition_to(next);
    }

    // === Actions ===

    /// Apply damage. Returns false when invincible.
    pub fn take_damage(&mut self, amount: f32) -> bool {
        if self.is_invincible() {
            return false;
        }
        self.health.damage(amount.max(0.0));

        if self.health.is_dead() {
            self.transition_to(PlayerState::Death);
            self.cues.push(SoundCue::new("death"));
            info!("Player died");
        } else {
            self.transition_to(PlayerState::Hurt);
            self.cues.push(SoundCue::new("player_hurt"));
            self.invincibility_duration = self.config.hurt_grace_secs;
            debug!(
                "Player took {amount} damage, health {}/{}",
                self.health.current(),
                self.health.max()
            );
        }
        true
    }

    /// Push the player horizontally, clamped to the screen.
    pub fn apply_knockback(&mut self, force_x: f32) {
        self.body.rect_mut().translate(force_x, 0.0);
        self.clamp_to_bounds();
    }

    /// Start a thrust. Rejected while attacking or when the state forbids it.
    pub fn attack_thrust(&mut self) -> bool {
        let definition = Arc::clone(&self.attacks.thrust);
        self.begin_attack(PlayerState::AttackThrust, definition, "thrust")
    }

    /// Start a smash. Rejected while attacking or when the state forbids it.
    pub fn attack_smash(&mut self) -> bool {
        let definition = Arc::clone(&self.attacks.smash);
        self.begin_attack(PlayerState::AttackSmash, definition, "smash")
    }

    fn begin_attack(
        &mut self,
        state: PlayerState,
        definition: Arc<AttackDefinition>,
        sound: &str,
    ) -> bool {
        if self.is_attacking() || !self.can_transition_to(state) {
            return false;
        }
        self.transition_to(state);
        self.attack.begin(definition);
        self.smash_cues_played.clear();
        self.cues.push(SoundCue::new(sound));
        true
    }

    /// Jump. Requires being grounded and a state that allows it.
    pub fn jump(&mut self) -> bool {
        if !self.is_grounded() || !self.can_transition_to(PlayerState::JumpUp) {
            return false;
        }
        self.vertical_velocity = self.config.jump_velocity;
        self.transition_to(PlayerState::JumpUp);
        self.cues.push(SoundCue::new("jump_grunt"));
        self.cues.push(SoundCue::new("jump"));
        true
    }

    /// Extend invincibility to at least `secs`.
    pub fn grant_invincibility(&mut self, secs: f32) {
        self.invincibility_timer = self.invincibility_timer.max(secs);
    }

    /// Restore the spawn state.
    pub fn reset(&mut self) {
        let idle = PlayerState::Idle.config();
        self.health.restore();
        self.state = PlayerState::Idle;
        self.clock.restart(idle.animation_speed, idle.looping);
        self.attack = AttackRuntime::new();
        self.invincibility_timer = 0.0;
        self.invincibility_duration = 0.0;
        self.direction = 0;
        self.facing_left = false;
        self.vertical_velocity = 0.0;
        self.footsteps.reset();
        self.smash_cues_played.clear();
        self.body = Self::spawn_body(&self.config, &self.frames, self.spawn_midbottom);
        info!("Player reset");
    }

    /// Take the sounds queued since the last drain.
    pub fn drain_sound_cues(&mut self) -> Vec<SoundCue> {
        self.cues.drain().collect()
    }

    /// Play the queued sounds on `sink` in the order they were queued.
    pub fn flush_sound_cues(&mut self, sink: &mut dyn AudioSink) {
        self.cues.flush_to(sink);
    }

    // === Tick ===

    /// Advance one tick. `dt` is in seconds.
    pub fn update(&mut self, input: &PlayerInput, dt: f32) {
        self.elapsed_ms += f64::from(dt) * 1000.0;
        self.process_input(input);
        self.apply_gravity();
        self.apply_movement();
        self.update_animation();
        self.update_invincibility(dt);
    }

    fn process_input(&mut self, input: &PlayerInput) {
        let config = self.state.config();
        if config.locks_input {
            return;
        }
        if !config.locks_movement {
            if input.left {
                self.direction = -1;
                self.facing_left = true;
            } else if input.right {
                self.direction = 1;
                self.facing_left = false;
            } else {
                self.direction = 0;
            }
        }
        if input.jump {
            self.jump();
        }
        if input.thrust {
            self.attack_thrust();
        }
        if input.smash {
            self.attack_smash();
        }
    }

    fn apply_gravity(&mut self) {
        self.vertical_velocity += self.config.gravity;
        let ground = self.config.ground_y;
        let rect = self.body.rect_mut();
        rect.translate(0.0, self.vertical_velocity);
        if rect.bottom() >= ground {
            rect.set_bottom(ground);
            self.vertical_velocity = 0.0;
        }
    }

    fn apply_movement(&mut self) {
        if self.direction == 0 {
            return;
        }
        let speed = if self.body.rect().bottom() >= self.config.ground_y - 1.0 {
            self.config.move_speed
        } else {
            self.config.air_move_speed
        };
        self.body
            .rect_mut()
            .translate(f32::from(self.direction) * speed, 0.0);
        self.clamp_to_bounds();
    }

    fn clamp_to_bounds(&mut self) {
        let (left, right) = (self.config.bound_left, self.config.bound_right);
        let rect = self.body.rect_mut();
        if rect.left() < left {
            rect.set_left(left);
        }
        if rect.right() > right {
            rect.set_right(right);
        }
    }

    fn update_invincibility(&mut self, dt: f32) {
        if self.invincibility_timer > 0.0 {
            self.invincibility_timer = (self.invincibility_timer - dt).max(0.0);
        }
    }

    /// Advance the clip. Returns true when a non-looping clip finished.
    fn advance_animation(&mut self) -> bool {
        if self.attack.in_hit_stop() {
            self.attack.update(self.current_frame_index());
            return false;
        }
        let len = self.frames.for_state(self.state).len();
        let finished = self.clock.advance(len);
        if self.is_attacking() {
            self.attack.update(self.current_frame_index());
        }
        finished
    }

    fn update_animation(&mut self) {
        match self.state {
            PlayerState::Death => {
                self.advance_animation();
            },
            PlayerState::Hurt => {
                if self.advance_animation() {
                    self.invincibility_timer = self.invincibility_duration;
                    self.transition_to(PlayerState::Idle);
                }
            },
            PlayerState::AttackThrust => {
                if self.advance_animation() {
                    self.attack.end();
                    self.transition_to_movement_state();
                }
            },
            PlayerState::AttackSmash => {
                let finished = self.advance_animation();
                self.queue_smash_cues();
                if finished {
                    self.attack.end();
                    self.transition_to_movement_state();
                }
            },
            PlayerState::JumpUp => {
                self.advance_animation();
                if self.vertical_velocity >= 0.0 {
                    self.request_transition(PlayerState::JumpDown);
                }
            },
            PlayerState::JumpDown => {
                self.advance_animation();
                if self.is_grounded() {
                    self.transition_to_movement_state();
                }
            },
            PlayerState::Run => {
                self.advance_animation();
                let active =
                    self.body.rect().bottom() >= self.config.ground_y - 1.0 && self.direction != 0;
                self.footsteps
                    .try_play(active, self.elapsed_ms as u64, &mut self.cues);
                if self.direction == 0 {
                    self.request_transition(PlayerState::Idle);
                }
                if !self.is_grounded() {
                    self.request_transition(PlayerState::JumpDown);
                }
            },
            PlayerState::Idle => {
                self.advance_animation();
                if self.direction != 0 {
                    self.request_transition(PlayerState::Run);
                }
                if !self.is_grounded() {
                    self.request_transition(PlayerState::JumpDown);
                }
            },
        }
        trace!("Player {:?} frame {}", self.state, self.clock.index());
    }

    fn queue_smash_cues(&mut self) {
        let frame = self.current_frame_index();
        if self.smash_cues_played.contains(&frame) {
            return;
        }
        if let Some((_, sound)) = SMASH_FRAME_CUES.iter().find(|(f, _)| *f == frame) {
            self.cues.push(SoundCue::new(*sound));
            self.smash_cues_played.push(frame);
        }
    }

    // === Drawing ===

    /// Alpha for this frame. Flickers while invincible outside the hurt state.
    #[must_use]
    pub fn alpha(&self) -> u8 {
        if self.is_invincible() && self.state != PlayerState::Hurt {
            if (self.clock.index() * 10.0) as i64 % 2 == 0 {
                FLICKER_ALPHA
            } else {
                OPAQUE
            }
        } else {
            OPAQUE
        }
    }

    /// Draw the current frame.
    pub fn draw(&self, renderer: &mut dyn SpriteRenderer) {
        if let Some(frame) = self
            .frames
            .for_state(self.state)
            .get(self.clock.frame())
        {
            renderer.draw_sprite(frame, self.body.rect(), self.facing_left, self.alpha());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attack::AttackPhase;
    use crate::testing::{frame_set, test_player};
    use proptest::prelude::*;

    fn idle() -> PlayerInput {
        PlayerInput::default()
    }

    fn tick(player: &mut Player, input: PlayerInput, ticks: usize) {
        for _ in 0..ticks {
            player.update(&input, 1.0 / 60.0);
        }
    }

    #[test]
    fn test_state_table() {
        assert!(PlayerState::Death.config().grants_invincibility);
        assert!(PlayerState::Hurt.config().locks_input);
        assert!(!PlayerState::AttackThrust.config().locks_input);
        assert!(PlayerState::AttackSmash.config().locks_movement);
        assert!(PlayerState::Idle.config().looping);
        assert_eq!(PlayerState::Run.config().animation_speed, 0.27);
        assert_eq!(PlayerState::AttackSmash.priority(), 21);
    }

    #[test]
    fn test_same_state_transition_rejected() {
        for state in PlayerState::ALL {
            assert!(!state.can_transition(state));
        }
    }

    #[test]
    fn test_standard_attacks_build() {
        let attacks = PlayerAttacks::standard().expect("valid attacks");
        assert_eq!(attacks.thrust.max_hits_per_target(), 1);
        assert_eq!(attacks.smash.max_hits_per_target(), 2);
        assert!((attacks.thrust.damage_modifier(3) - 0.5).abs() < 1e-6);
        assert_eq!(attacks.smash.phase_of(12), AttackPhase::Recovery);
    }

    #[test]
    fn test_spawn_on_ground_idle() {
        let mut player = test_player();
        tick(&mut player, idle(), 2);
        assert_eq!(player.state(), PlayerState::Idle);
        assert!(player.is_grounded());
        assert_eq!(player.rect().bottom(), player.config().ground_y);
        assert_eq!(player.hitbox().width, 70.0);
    }

    #[test]
    fn test_run_and_stop() {
        let mut player = test_player();
        tick(&mut player, idle(), 2);
        let start = player.rect().x;
        tick(&mut player, PlayerInput { right: true, ..idle() }, 3);
        assert_eq!(player.state(), PlayerState::Run);
        assert!(player.is_running());
        assert!(player.rect().x > start);

        tick(&mut player, PlayerInput { left: true, ..idle() }, 1);
        assert!(player.facing_left());

        tick(&mut player, idle(), 1);
        assert_eq!(player.state(), PlayerState::Idle);
    }

    #[test]
    fn test_running_plays_footsteps() {
        let mut player = test_player();
        tick(&mut player, idle(), 2);
        player.drain_sound_cues();
        tick(&mut player, PlayerInput { right: true, ..idle() }, 3);
        let cues = player.drain_sound_cues();
        assert_eq!(cues.iter().filter(|c| c.name == "footstep").count(), 1);
        assert!((cues[0].volume - 0.85).abs() < 1e-6);
    }

    #[test]
    fn test_jump_arc() {
        let mut player = test_player();
        tick(&mut player, idle(), 2);
        assert!(player.jump());
        assert_eq!(player.state(), PlayerState::JumpUp);
        let cues: Vec<String> = player.drain_sound_cues().into_iter().map(|c| c.name).collect();
        assert_eq!(cues, vec!["jump_grunt", "jump"]);

        // cannot jump again mid-air
        tick(&mut player, idle(), 1);
        assert!(!player.jump());

        let mut saw_fall = false;
        for _ in 0..120 {
            tick(&mut player, idle(), 1);
            saw_fall |= player.state() == PlayerState::JumpDown;
            if player.state() == PlayerState::Idle {
                break;
            }
        }
        assert!(saw_fall);
        assert_eq!(player.state(), PlayerState::Idle);
        assert!(player.is_grounded());
    }

    #[test]
    fn test_thrust_runs_to_completion() {
        let mut player = test_player();
        tick(&mut player, idle(), 1);
        assert!(player.attack_thrust());
        assert!(player.is_attacking());
        assert!(!player.attack_thrust());
        assert!(!player.attack_smash());

        let mut hit_frames = 0;
        for _ in 0..200 {
            tick(&mut player, idle(), 1);
            if player.should_deal_damage() {
                hit_frames += 1;
                assert!(player.attack_hitbox().is_some());
            }
            if !player.is_attacking() {
                break;
            }
        }
        assert!(hit_frames > 0);
        assert_eq!(player.state(), PlayerState::Idle);
        assert!(!player.attack_runtime().is_active());
    }

    #[test]
    fn test_attack_locks_movement() {
        let mut player = test_player();
        tick(&mut player, idle(), 1);
        player.attack_thrust();
        let x = player.rect().x;
        tick(&mut player, PlayerInput { right: true, ..idle() }, 5);
        assert_eq!(player.rect().x, x);
        assert!(player.is_attacking());
    }

    #[test]
    fn test_attack_from_air_returns_to_air_state() {
        let mut player = test_player();
        tick(&mut player, idle(), 1);
        player.jump();
        tick(&mut player, idle(), 1);
        assert!(player.attack_thrust());
        // thrust lasts ~38 ticks, jump lasts ~55
        for _ in 0..60 {
            tick(&mut player, idle(), 1);
            if !player.is_attacking() {
                break;
            }
        }
        assert!(matches!(player.state(), PlayerState::JumpUp | PlayerState::JumpDown));
    }

    #[test]
    fn test_take_damage_then_grace_window() {
        let mut player = test_player();
        tick(&mut player, idle(), 1);
        assert!(player.take_damage(10.0));
        assert_eq!(player.state(), PlayerState::Hurt);
        assert_eq!(player.health(), 90.0);
        assert!(player.is_invincible());
        assert!(!player.take_damage(10.0));
        assert_eq!(player.health(), 90.0);

        // hurt has 6 frames at 0.2 per tick
        for _ in 0..40 {
            tick(&mut player, idle(), 1);
            if player.state() != PlayerState::Hurt {
                break;
            }
        }
        assert_eq!(player.state(), PlayerState::Idle);
        assert!(player.is_invincible());
        assert!(player.invincibility_timer() > 0.0);

        tick(&mut player, idle(), 30);
        assert!(!player.is_invincible());
        assert!(player.take_damage(5.0));
    }

    #[test]
    fn test_hurt_interrupts_attack() {
        let mut player = test_player();
        tick(&mut player, idle(), 1);
        player.attack_smash();
        assert!(player.take_damage(1.0));
        assert_eq!(player.state(), PlayerState::Hurt);
        assert!(!player.attack_runtime().is_active());
    }

    #[test]
    fn test_death_and_reset() {
        let mut player = test_player();
        tick(&mut player, idle(), 1);
        assert!(player.take_damage(500.0));
        assert!(player.is_dead());
        assert_eq!(player.health(), 0.0);
        let cues: Vec<String> = player.drain_sound_cues().into_iter().map(|c| c.name).collect();
        assert_eq!(cues, vec!["death"]);

        tick(&mut player, PlayerInput { right: true, jump: true, ..idle() }, 200);
        assert!(player.is_dead());

        player.reset();
        assert_eq!(player.state(), PlayerState::Idle);
        assert_eq!(player.health(), player.max_health());
        assert!(!player.is_invincible());
    }

    #[test]
    fn test_grant_invincibility_keeps_longest() {
        let mut player = test_player();
        player.grant_invincibility(1.0);
        player.grant_invincibility(0.2);
        assert_eq!(player.invincibility_timer(), 1.0);
        assert!(!player.take_damage(10.0));
    }

    #[test]
    fn test_invincibility_flicker() {
        let mut player = test_player();
        assert_eq!(player.alpha(), OPAQUE);
        player.grant_invincibility(1.0);
        let mut alphas = Vec::new();
        for _ in 0..4 {
            tick(&mut player, idle(), 1);
            alphas.push(player.alpha());
        }
        assert!(alphas.contains(&FLICKER_ALPHA));
        assert!(alphas.contains(&OPAQUE));
    }

    #[test]
    fn test_knockback_clamped_to_screen() {
        let mut player = test_player();
        player.apply_knockback(-10_000.0);
        assert_eq!(player.rect().left(), player.config().bound_left);
        player.apply_knockback(10_000.0);
        assert_eq!(player.rect().right(), player.config().bound_right);
    }

    #[test]
    fn test_short_frame_list_does_not_stick() {
        let mut frames = crate::testing::player_frames();
        frames.thrust = frame_set(2, 700.0, 200.0);
        let mut player = Player::new(
            crate::testing::player_config(),
            PlayerAttacks::standard().expect("valid attacks"),
            frames,
            crate::testing::player_spawn(),
        );
        tick(&mut player, idle(), 1);
        player.attack_thrust();
        tick(&mut player, idle(), 20);
        assert!(!player.is_attacking());
    }

    #[test]
    fn test_smash_queues_phase_cues_once() {
        let mut player = test_player();
        tick(&mut player, idle(), 1);
        player.drain_sound_cues();
        player.attack_smash();
        tick(&mut player, idle(), 100);
        let names: Vec<String> = player.drain_sound_cues().into_iter().map(|c| c.name).collect();
        assert_eq!(names.iter().filter(|n| *n == "smash_phase_1").count(), 1);
        assert_eq!(names.iter().filter(|n| *n == "smash_phase_2").count(), 1);
        assert_eq!(names.iter().filter(|n| *n == "smash_phase_3").count(), 1);
        assert_eq!(names[0], "smash");
    }

    #[test]
    fn test_debug_info_serializes() {
        let player = test_player();
        let info = player.debug_info();
        let json = serde_json::to_string(&info).expect("serialize");
        assert!(json.contains("Idle"));
    }

    proptest! {
        #[test]
        fn prop_priority_rule(a in 0usize..8, b in 0usize..8) {
            let from = PlayerState::ALL[a];
            let to = PlayerState::ALL[b];
            if to.priority() < from.priority() {
                prop_assert!(from.can_transition(to));
            }
            if from.priority() < to.priority() {
                prop_assert_eq!(to.can_transition(from), true);
                prop_assert_eq!(from.can_transition(to), from.config().interruptible);
            }
        }
    }
}
