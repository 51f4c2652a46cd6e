//! Reactive melee enemy.
//!
//! The skeleton chases a target point and swings when close. Its attacks
//! land at most once per swing: `should_deal_damage` reports a hit frame
//! only until `register_hit` is called, and never twice for the same frame.
//! This is deliberately simpler than the player's multi-hit model.

use crate::animation::{FrameClock, FrameSet};
use crate::entity::{Body, Health, HitboxAlign};
use crate::hitbox::HitboxGeometry;
use crate::render::{FrameSource, SpriteRenderer, OPAQUE};
use duskblade_common::{EntityId, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info, trace};

/// Knockback speeds below this are dropped.
const KNOCKBACK_REST: f32 = 0.1;

/// Health bar size above the sprite.
const HEALTH_BAR_SIZE: Vec2 = Vec2::new(40.0, 5.0);

/// Skeleton behavior state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SkeletonState {
    /// Waiting for a target in range.
    #[default]
    Idle,
    /// Walking toward the target.
    Chase,
    /// Swinging. AI decisions pause until the clip ends.
    Attack,
    /// Staggered. Ignores further damage.
    Hurt,
    /// Dying. Removable once the clip ends.
    Death,
}

/// One skeleton swing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyAttackConfig {
    /// Frames that may land the hit.
    pub hit_frames: BTreeSet<u32>,
    /// Damage dealt.
    pub damage: f32,
    /// Horizontal knockback applied to the target.
    pub knockback: f32,
}

impl EnemyAttackConfig {
    /// Create a swing.
    #[must_use]
    pub fn new(hit_frames: impl IntoIterator<Item = u32>, damage: f32, knockback: f32) -> Self {
        Self {
            hit_frames: hit_frames.into_iter().collect(),
            damage,
            knockback,
        }
    }
}

/// Skeleton tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkeletonConfig {
    /// Chase speed per tick.
    pub speed: f32,
    /// Downward acceleration per tick.
    pub gravity: f32,
    /// Y of the ground line.
    pub ground_y: f32,
    /// Horizontal distance at which chasing starts.
    pub detection_range: f32,
    /// Horizontal distance at which a swing starts.
    pub attack_range: f32,
    /// Maximum vertical distance for chasing or swinging.
    pub vertical_tolerance: f32,
    /// Starting health.
    pub max_health: f32,
    /// Width and height removed from the sprite for the collision box.
    pub hitbox_reduction: [f32; 2],
    /// Fraction of knockback speed kept each tick.
    pub knockback_decay: f32,
    /// Idle clip speed.
    pub idle_speed: f32,
    /// Speed of every other clip.
    pub action_speed: f32,
    /// First swing variant.
    pub primary_attack: EnemyAttackConfig,
    /// Second swing variant.
    pub secondary_attack: EnemyAttackConfig,
    /// Swing reach relative to the sprite. Without it the whole sprite hits.
    pub attack_reach: Option<HitboxGeometry>,
}

impl Default for SkeletonConfig {
    fn default() -> Self {
        Self {
            speed: 2.5,
            gravity: 1.0,
            ground_y: 900.0 - 34.0,
            detection_range: 1000.0,
            attack_range: 60.0,
            vertical_tolerance: 100.0,
            max_health: 30.0,
            hitbox_reduction: [40.0, 20.0],
            knockback_decay: 0.8,
            idle_speed: 0.1,
            action_speed: 0.15,
            primary_attack: EnemyAttackConfig::new([6], 1.0, 8.0),
            secondary_attack: EnemyAttackConfig::new([5, 6], 0.75, 5.0),
            attack_reach: None,
        }
    }
}

/// Skeleton clips.
#[derive(Debug, Clone, Default)]
pub struct SkeletonFrames {
    /// Idle loop.
    pub idle: FrameSet,
    /// Walk loop.
    pub walk: FrameSet,
    /// First swing.
    pub attack_primary: FrameSet,
    /// Second swing.
    pub attack_secondary: FrameSet,
    /// Stagger.
    pub hurt: FrameSet,
    /// Death.
    pub death: FrameSet,
}

impl SkeletonFrames {
    /// Load every clip from an asset source.
    pub fn load(source: &mut dyn FrameSource) -> Self {
        Self {
            idle: FrameSet::load(source, "skeleton/idle"),
            walk: FrameSet::load(source, "skeleton/walk"),
            attack_primary: FrameSet::load(source, "skeleton/attack_1"),
            attack_secondary: FrameSet::load(source, "skeleton/attack_2"),
            hurt: FrameSet::load(source, "skeleton/hurt"),
            death: FrameSet::load(source, "skeleton/death"),
        }
    }
}

/// Which swing is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttackVariant {
    Primary,
    Secondary,
}

/// Single-hit bookkeeping for the current swing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct SwingState {
    variant: Option<AttackVariant>,
    hit_connected: bool,
    last_frame_checked: Option<u32>,
}

impl SwingState {
    fn begin(&mut self, variant: AttackVariant) {
        *self = Self {
            variant: Some(variant),
            ..Self::default()
        };
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// A skeleton enemy.
#[derive(Debug, Clone)]
pub struct Skeleton {
    id: EntityId,
    config: SkeletonConfig,
    frames: SkeletonFrames,
    body: Body,
    state: SkeletonState,
    clock: FrameClock,
    swing: SwingState,
    health: Health,
    facing_left: bool,
    vertical_velocity: f32,
    knockback_velocity: f32,
    removable: bool,
    rng: fastrand::Rng,
}

impl Skeleton {
    /// Create a skeleton standing with its feet centered on `midbottom`.
    #[must_use]
    pub fn new(config: SkeletonConfig, frames: SkeletonFrames, midbottom: Vec2, seed: u64) -> Self {
        let mut body = Body::new(Rect::from_midbottom(midbottom, frames.idle.size()));
        let [width, height] = config.hitbox_reduction;
        body.reduce_hitbox(width, height, HitboxAlign::Bottom);

        Self {
            id: EntityId::new(),
            health: Health::new(config.max_health),
            clock: FrameClock::new(config.idle_speed, true),
            config,
            frames,
            body,
            state: SkeletonState::Idle,
            swing: SwingState::default(),
            facing_left: true,
            vertical_velocity: 0.0,
            knockback_velocity: 0.0,
            removable: false,
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    /// Actor id.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SkeletonState {
        self.state
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

    /// Health as a fraction of max.
    #[must_use]
    pub fn health_ratio(&self) -> f32 {
        self.health.ratio()
    }

    /// Whether the skeleton is dying or dead.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.state == SkeletonState::Death
    }

    /// Whether the death clip has finished.
    #[must_use]
    pub fn is_removable(&self) -> bool {
        self.removable
    }

    /// Whether damage is currently ignored.
    #[must_use]
    pub fn is_invincible(&self) -> bool {
        matches!(self.state, SkeletonState::Hurt | SkeletonState::Death)
    }

    /// Whether a swing is in progress.
    #[must_use]
    pub fn is_attacking(&self) -> bool {
        self.state == SkeletonState::Attack
    }

    /// Whether the sprite faces left.
    #[must_use]
    pub fn facing_left(&self) -> bool {
        self.facing_left
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

    /// Animation frame shown.
    #[must_use]
    pub fn current_frame_index(&self) -> u32 {
        self.clock.frame() as u32
    }

    fn current_attack(&self) -> Option<&EnemyAttackConfig> {
        match self.swing.variant? {
            AttackVariant::Primary => Some(&self.config.primary_attack),
            AttackVariant::Secondary => Some(&self.config.secondary_attack),
        }
    }

    fn clip(&self) -> &FrameSet {
        match self.state {
            SkeletonState::Idle => &self.frames.idle,
            SkeletonState::Chase => &self.frames.walk,
            SkeletonState::Attack => match self.swing.variant {
                Some(AttackVariant::Secondary) => &self.frames.attack_secondary,
                _ => &self.frames.attack_primary,
            },
            SkeletonState::Hurt => &self.frames.hurt,
            SkeletonState::Death => &self.frames.death,
        }
    }

    // === Attack surface ===

    /// Whether the current frame is a hit frame of the running swing.
    #[must_use]
    pub fn is_in_hit_frame(&self) -> bool {
        if self.state != SkeletonState::Attack {
            return false;
        }
        let frame = self.current_frame_index();
        self.current_attack()
            .is_some_and(|attack| attack.hit_frames.contains(&frame))
    }

    /// Report a hit frame at most once per frame, and never after a hit landed.
    pub fn should_deal_damage(&mut self) -> bool {
        if !self.is_in_hit_frame() || self.swing.hit_connected {
            return false;
        }
        let frame = self.current_frame_index();
        if self.swing.last_frame_checked == Some(frame) {
            return false;
        }
        self.swing.last_frame_checked = Some(frame);
        true
    }

    /// Mark the running swing as delivered.
    pub fn register_hit(&mut self) {
        self.swing.hit_connected = true;
    }

    /// Whether the running swing already delivered its hit.
    #[must_use]
    pub fn hit_connected(&self) -> bool {
        self.swing.hit_connected
    }

    /// Damage of the running swing, or 0.
    #[must_use]
    pub fn attack_damage(&self) -> f32 {
        self.current_attack().map_or(0.0, |attack| attack.damage)
    }

    /// Knockback of the running swing, or 0.
    #[must_use]
    pub fn attack_knockback(&self) -> f32 {
        self.current_attack().map_or(0.0, |attack| attack.knockback)
    }

    /// Area the running swing covers.
    #[must_use]
    pub fn attack_hitbox(&self) -> Option<Rect> {
        if !self.is_attacking() {
            return None;
        }
        let rect = self.body.rect();
        Some(match &self.config.attack_reach {
            Some(reach) => reach.to_rect(&rect, self.facing_left),
            None => rect,
        })
    }

    /// Apply damage and a knockback impulse. Ignored while hurt or dying.
    pub fn take_damage(&mut self, amount: f32, knockback: Vec2) -> bool {
        if self.is_invincible() {
            return false;
        }
        self.health.damage(amount.max(0.0));
        self.swing.reset();
        self.knockback_velocity = knockback.x;

        if self.health.is_dead() {
            info!("Skeleton {} died", self.id);
            self.enter(SkeletonState::Death);
        } else {
            debug!(
                "Skeleton {} took {amount} damage, health {}/{}",
                self.id,
                self.health.current(),
                self.health.max()
            );
            self.enter(SkeletonState::Hurt);
        }
        true
    }

    // === Tick ===

    /// Advance one tick.
    ///
    /// `target` is the center of whatever the skeleton hunts; without one
    /// the AI holds its current state. `scroll` shifts the skeleton with
    /// the world.
    pub fn update(&mut self, target: Option<Vec2>, scroll: f32) {
        self.body.rect_mut().translate(-scroll, 0.0);
        self.apply_gravity();
        self.apply_knockback();
        self.update_ai(target);
        self.update_animation();
    }

    fn enter(&mut self, state: SkeletonState) {
        if self.state != state {
            debug!("Skeleton {} {:?} -> {:?}", self.id, self.state, state);
        }
        self.state = state;
        let (speed, looping) = match state {
            SkeletonState::Idle => (self.config.idle_speed, true),
            SkeletonState::Chase => (self.config.action_speed, true),
            _ => (self.config.action_speed, false),
        };
        self.clock.restart(speed, looping);
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

    fn apply_knockback(&mut self) {
        if self.knockback_velocity == 0.0 {
            return;
        }
        self.body.rect_mut().translate(self.knockback_velocity, 0.0);
        self.knockback_velocity *= self.config.knockback_decay;
        if self.knockback_velocity.abs() < KNOCKBACK_REST {
            self.knockback_velocity = 0.0;
        }
    }

    fn update_ai(&mut self, target: Option<Vec2>) {
        if matches!(
            self.state,
            SkeletonState::Hurt | SkeletonState::Death | SkeletonState::Attack
        ) {
            return;
        }
        let Some(target) = target else {
            return;
        };

        let center = self.body.center();
        let dist_x = (center.x - target.x).abs();
        let dist_y = (center.y - target.y).abs();
        let in_band = dist_y < self.config.vertical_tolerance;

        if in_band && dist_x < self.config.attack_range {
            self.begin_attack();
        } else if in_band && dist_x < self.config.detection_range {
            if self.state != SkeletonState::Chase {
                self.enter(SkeletonState::Chase);
            }
            self.chase(target);
        } else if self.state != SkeletonState::Idle {
            self.enter(SkeletonState::Idle);
        }
    }

    fn begin_attack(&mut self) {
        let variant = if self.rng.bool() {
            AttackVariant::Primary
        } else {
            AttackVariant::Secondary
        };
        self.swing.begin(variant);
        self.enter(SkeletonState::Attack);
        debug!("Skeleton {} swings {:?}", self.id, variant);
    }

    fn chase(&mut self, target: Vec2) {
        let speed = self.config.speed;
        if self.body.center().x > target.x {
            self.body.rect_mut().translate(-speed, 0.0);
            self.facing_left = true;
        } else {
            self.body.rect_mut().translate(speed, 0.0);
            self.facing_left = false;
        }
    }

    fn update_animation(&mut self) {
        let len = self.clip().len();
        let finished = self.clock.advance(len);
        trace!("Skeleton {} {:?} frame {}", self.id, self.state, self.clock.index());
        if !finished {
            return;
        }
        match self.state {
            SkeletonState::Death => {
                if !self.removable {
                    debug!("Skeleton {} removable", self.id);
                }
                self.removable = true;
            },
            SkeletonState::Hurt => self.enter(SkeletonState::Idle),
            SkeletonState::Attack => {
                self.swing.reset();
                self.enter(SkeletonState::Idle);
            },
            SkeletonState::Idle | SkeletonState::Chase => {},
        }
    }

    /// Health bar bounds, shown once damaged and while alive.
    #[must_use]
    pub fn health_bar(&self) -> Option<Rect> {
        if !self.health.is_damaged() || self.is_dead() {
            return None;
        }
        let rect = self.body.rect();
        Some(Rect::new(
            rect.center_x() - HEALTH_BAR_SIZE.x / 2.0,
            rect.top() - 10.0,
            HEALTH_BAR_SIZE.x,
            HEALTH_BAR_SIZE.y,
        ))
    }

    /// Draw the current frame and the health bar.
    pub fn draw(&self, renderer: &mut dyn SpriteRenderer) {
        if let Some(frame) = self.clip().get(self.clock.frame()) {
            renderer.draw_sprite(frame, self.body.rect(), self.facing_left, OPAQUE);
        }
        if let Some(bar) = self.health_bar() {
            renderer.draw_bar(bar, self.health.ratio());
        }
    }
}
