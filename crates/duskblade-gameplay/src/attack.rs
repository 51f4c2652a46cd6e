//! Frame-based melee attacks.
//!
//! This module provides:
//! - `AttackDefinition`: immutable per-attack-type data (hit frames, damage,
//!   knockback, per-frame overrides, hit-stop, multi-hit limits)
//! - `AttackRuntime`: per-actor tracking of the attack in progress
//! - Phase classification and batch hit processing
//!
//! Definitions are built once and shared through `Arc`. A runtime is reset
//! on every `begin`, so a target hit during one swing can be hit again by
//! the next one.

use crate::hitbox::HitboxGeometry;
use ahash::{AHashMap, AHashSet};
use duskblade_common::{EntityId, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace};

/// Distance below which attacker and target are treated as coincident.
const KNOCKBACK_EPSILON: f32 = 0.001;

/// Upward share of the fallback knockback when no direction is available.
const FALLBACK_LIFT: f32 = 0.3;

/// Errors raised while building an attack definition.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AttackConfigError {
    /// Base damage below zero (or not a number).
    #[error("attack '{name}': base damage must be >= 0, got {value}")]
    NegativeDamage {
        /// Attack name.
        name: String,
        /// Rejected value.
        value: f32,
    },
    /// Knockback force below zero (or not a number).
    #[error("attack '{name}': knockback force must be >= 0, got {value}")]
    NegativeKnockback {
        /// Attack name.
        name: String,
        /// Rejected value.
        value: f32,
    },
    /// Max hits per target below one.
    #[error("attack '{name}': max hits per target must be >= 1, got {value}")]
    InvalidMaxHits {
        /// Attack name.
        name: String,
        /// Rejected value.
        value: u32,
    },
    /// A per-frame damage modifier below zero.
    #[error("attack '{name}': damage modifier for frame {frame} must be >= 0, got {value}")]
    NegativeModifier {
        /// Attack name.
        name: String,
        /// Frame the modifier applies to.
        frame: u32,
        /// Rejected value.
        value: f32,
    },
}

/// Result type for attack configuration.
pub type AttackResult<T> = Result<T, AttackConfigError>;

// ============================================================================
// Attack Phases
// ============================================================================

/// Phase of an attack, derived from the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackPhase {
    /// Wind-up before the first hit frame.
    Startup,
    /// Inside the damage window.
    Active,
    /// Follow-through after the last hit frame.
    Recovery,
    /// No attack in progress.
    Complete,
}

impl AttackPhase {
    /// Check if this phase can deal damage.
    #[must_use]
    pub fn can_damage(self) -> bool {
        self == Self::Active
    }
}

// ============================================================================
// Attack Definition
// ============================================================================

/// Immutable configuration for one attack type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttackDefinition {
    name: String,
    hit_frames: BTreeSet<u32>,
    base_damage: f32,
    knockback_force: f32,
    knockback_angle_degrees: Option<f32>,
    hit_stop_frames: u32,
    can_hit_multiple_targets: bool,
    max_hits_per_target: u32,
    frame_damage_modifiers: BTreeMap<u32, f32>,
    frame_hitboxes: BTreeMap<u32, HitboxGeometry>,
    default_hitbox: HitboxGeometry,
    startup_frames: BTreeSet<u32>,
    recovery_frames: BTreeSet<u32>,
}

impl AttackDefinition {
    /// Start building a definition with the given name.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> AttackDefinitionBuilder {
        AttackDefinitionBuilder::new(name)
    }

    /// Attack name, used in logs and debug snapshots.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Frames that can deal damage.
    #[must_use]
    pub fn hit_frames(&self) -> &BTreeSet<u32> {
        &self.hit_frames
    }

    /// Check whether `frame` is a hit frame.
    #[must_use]
    pub fn is_hit_frame(&self, frame: u32) -> bool {
        self.hit_frames.contains(&frame)
    }

    /// Damage before per-frame modifiers.
    #[must_use]
    pub fn base_damage(&self) -> f32 {
        self.base_damage
    }

    /// Knockback magnitude.
    #[must_use]
    pub fn knockback_force(&self) -> f32 {
        self.knockback_force
    }

    /// Fixed knockback angle, if any.
    #[must_use]
    pub fn knockback_angle_degrees(&self) -> Option<f32> {
        self.knockback_angle_degrees
    }

    /// Updates frozen on a successful hit.
    #[must_use]
    pub fn hit_stop_frames(&self) -> u32 {
        self.hit_stop_frames
    }

    /// Whether one swing may connect with more than one target.
    #[must_use]
    pub fn can_hit_multiple_targets(&self) -> bool {
        self.can_hit_multiple_targets
    }

    /// Cap on hits against one target per swing.
    #[must_use]
    pub fn max_hits_per_target(&self) -> u32 {
        self.max_hits_per_target
    }

    /// Damage multiplier for a frame (1.0 when not overridden).
    #[must_use]
    pub fn damage_modifier(&self, frame: u32) -> f32 {
        self.frame_damage_modifiers.get(&frame).copied().unwrap_or(1.0)
    }

    /// Hitbox used on a frame.
    #[must_use]
    pub fn hitbox_for_frame(&self, frame: u32) -> HitboxGeometry {
        self.frame_hitboxes
            .get(&frame)
            .copied()
            .unwrap_or(self.default_hitbox)
    }

    /// Classify a frame into a phase.
    ///
    /// Explicit startup/hit/recovery sets win. Other frames are placed by
    /// their position relative to the hit window.
    #[must_use]
    pub fn phase_of(&self, frame: u32) -> AttackPhase {
        if self.startup_frames.contains(&frame) {
            return AttackPhase::Startup;
        }
        if self.hit_frames.contains(&frame) {
            return AttackPhase::Active;
        }
        if self.recovery_frames.contains(&frame) {
            return AttackPhase::Recovery;
        }
        match (self.hit_frames.first(), self.hit_frames.last()) {
            (Some(&first), _) if frame < first => AttackPhase::Startup,
            (_, Some(&last)) if frame > last => AttackPhase::Recovery,
            (Some(_), Some(_)) => AttackPhase::Active,
            _ => AttackPhase::Recovery,
        }
    }
}

/// Builder for [`AttackDefinition`]. Validation happens in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct AttackDefinitionBuilder {
    def: AttackDefinition,
}

impl AttackDefinitionBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            def: AttackDefinition {
                name: name.into(),
                hit_frames: BTreeSet::new(),
                base_damage: 10.0,
                knockback_force: 5.0,
                knockback_angle_degrees: None,
                hit_stop_frames: 0,
                can_hit_multiple_targets: true,
                max_hits_per_target: 1,
                frame_damage_modifiers: BTreeMap::new(),
                frame_hitboxes: BTreeMap::new(),
                default_hitbox: HitboxGeometry::default(),
                startup_frames: BTreeSet::new(),
                recovery_frames: BTreeSet::new(),
            },
        }
    }

    /// Set the damaging frames.
    pub fn hit_frames(mut self, frames: impl IntoIterator<Item = u32>) -> Self {
        self.def.hit_frames = frames.into_iter().collect();
        self
    }

    /// Set base damage.
    pub fn base_damage(mut self, damage: f32) -> Self {
        self.def.base_damage = damage;
        self
    }

    /// Set knockback magnitude.
    pub fn knockback(mut self, force: f32) -> Self {
        self.def.knockback_force = force;
        self
    }

    /// Launch at a fixed angle instead of along the attacker-to-target line.
    pub fn knockback_angle(mut self, degrees: f32) -> Self {
        self.def.knockback_angle_degrees = Some(degrees);
        self
    }

    /// Set hit-stop length in updates.
    pub fn hit_stop_frames(mut self, frames: u32) -> Self {
        self.def.hit_stop_frames = frames;
        self
    }

    /// Allow or forbid hitting more than one target per swing.
    pub fn can_hit_multiple_targets(mut self, allowed: bool) -> Self {
        self.def.can_hit_multiple_targets = allowed;
        self
    }

    /// Set the per-target hit cap.
    pub fn max_hits_per_target(mut self, hits: u32) -> Self {
        self.def.max_hits_per_target = hits;
        self
    }

    /// Scale damage on one frame.
    pub fn frame_damage_modifier(mut self, frame: u32, modifier: f32) -> Self {
        self.def.frame_damage_modifiers.insert(frame, modifier);
        self
    }

    /// Override the hitbox on one frame.
    pub fn frame_hitbox(mut self, frame: u32, hitbox: HitboxGeometry) -> Self {
        self.def.frame_hitboxes.insert(frame, hitbox);
        self
    }

    /// Hitbox used on frames without an override.
    pub fn default_hitbox(mut self, hitbox: HitboxGeometry) -> Self {
        self.def.default_hitbox = hitbox;
        self
    }

    /// Frames explicitly classified as startup.
    pub fn startup_frames(mut self, frames: impl IntoIterator<Item = u32>) -> Self {
        self.def.startup_frames = frames.into_iter().collect();
        self
    }

    /// Frames explicitly classified as recovery.
    pub fn recovery_frames(mut self, frames: impl IntoIterator<Item = u32>) -> Self {
        self.def.recovery_frames = frames.into_iter().collect();
        self
    }

    /// Validate and produce the definition.
    pub fn build(self) -> AttackResult<AttackDefinition> {
        let def = self.def;
        if def.base_damage.is_nan() || def.base_damage < 0.0 {
            return Err(AttackConfigError::NegativeDamage {
                name: def.name,
                value: def.base_damage,
            });
        }
        if def.knockback_force.is_nan() || def.knockback_force < 0.0 {
            return Err(AttackConfigError::NegativeKnockback {
                name: def.name,
                value: def.knockback_force,
            });
        }
        if def.max_hits_per_target < 1 {
            return Err(AttackConfigError::InvalidMaxHits {
                name: def.name,
                value: def.max_hits_per_target,
            });
        }
        if let Some((&frame, &value)) = def
            .frame_damage_modifiers
            .iter()
            .find(|(_, value)| value.is_nan() || **value < 0.0)
        {
            return Err(AttackConfigError::NegativeModifier {
                name: def.name,
                frame,
                value,
            });
        }
        Ok(def)
    }
}

// ============================================================================
// Hit Results
// ============================================================================

/// Outcome of one registered hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitResult {
    /// Target that was hit.
    pub target: EntityId,
    /// Damage to apply.
    pub damage: f32,
    /// Knockback to apply.
    pub knockback: Vec2,
    /// Hit-stop the hit started.
    pub hit_stop_frames: u32,
    /// Frame the hit landed on.
    pub frame: u32,
}

/// Serializable view of a runtime for debug overlays and logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackSnapshot {
    /// Whether an attack is in progress.
    pub active: bool,
    /// Name of the running attack.
    pub attack: Option<String>,
    /// Current frame.
    pub frame: u32,
    /// Current phase.
    pub phase: AttackPhase,
    /// Whether the current frame can deal damage.
    pub hit_frame_active: bool,
    /// Remaining hit-stop updates.
    pub hit_stop_remaining: u32,
    /// Number of distinct targets hit so far.
    pub targets_hit: usize,
}

// ============================================================================
// Attack Runtime
// ============================================================================

/// Tracks the attack an actor is currently performing.
#[derive(Debug, Clone, Default)]
pub struct AttackRuntime {
    definition: Option<Arc<AttackDefinition>>,
    current_frame: u32,
    hit_registry: AHashMap<EntityId, AHashSet<u32>>,
    hit_counts: AHashMap<EntityId, u32>,
    hit_stop_remaining: u32,
}

impl AttackRuntime {
    /// Create an idle runtime.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new attack sequence, discarding everything from the last one.
    pub fn begin(&mut self, definition: Arc<AttackDefinition>) {
        debug!("Attack '{}' started", definition.name());
        self.hit_registry.clear();
        self.hit_counts.clear();
        self.hit_stop_remaining = 0;
        self.current_frame = 0;
        self.definition = Some(definition);
    }

    /// Sync with the owner's animation frame.
    ///
    /// During hit-stop the frame is held and the counter ticks down instead.
    pub fn update(&mut self, frame: u32) {
        if self.definition.is_none() {
            return;
        }
        if self.hit_stop_remaining > 0 {
            self.hit_stop_remaining -= 1;
            trace!("Hit-stop, {} updates left", self.hit_stop_remaining);
            return;
        }
        self.current_frame = frame;
    }

    /// End the attack sequence. Calling this while idle does nothing.
    pub fn end(&mut self) {
        if let Some(def) = self.definition.take() {
            debug!("Attack '{}' ended", def.name());
            self.hit_registry.clear();
            self.hit_counts.clear();
            self.hit_stop_remaining = 0;
            self.current_frame = 0;
        }
    }

    /// Whether an attack is in progress.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.definition.is_some()
    }

    /// Definition of the running attack.
    #[must_use]
    pub fn definition(&self) -> Option<&Arc<AttackDefinition>> {
        self.definition.as_ref()
    }

    /// Frame the attack is on.
    #[must_use]
    pub fn current_frame(&self) -> u32 {
        self.current_frame
    }

    /// Hit-stop updates remaining.
    #[must_use]
    pub fn hit_stop_remaining(&self) -> u32 {
        self.hit_stop_remaining
    }

    /// Whether the attack is frozen by hit-stop.
    #[must_use]
    pub fn in_hit_stop(&self) -> bool {
        self.hit_stop_remaining > 0
    }

    /// True on a hit frame of an active attack outside hit-stop.
    #[must_use]
    pub fn is_hit_frame_active(&self) -> bool {
        match &self.definition {
            Some(def) => self.hit_stop_remaining == 0 && def.is_hit_frame(self.current_frame),
            None => false,
        }
    }

    /// Try to record a hit on `target` at the current frame.
    ///
    /// Rejected outside a hit frame, once the per-target cap is reached, and
    /// when the target was already hit on this exact frame.
    pub fn try_register_hit(&mut self, target: EntityId) -> bool {
        if !self.is_hit_frame_active() {
            return false;
        }
        let Some(def) = self.definition.as_ref() else {
            return false;
        };

        let count = self.hit_counts.get(&target).copied().unwrap_or(0);
        if count >= def.max_hits_per_target() {
            return false;
        }

        let frames = self.hit_registry.entry(target).or_default();
        if !frames.insert(self.current_frame) {
            return false;
        }
        self.hit_counts.insert(target, count + 1);
        self.hit_stop_remaining = def.hit_stop_frames();

        debug!(
            "'{}' hit {} on frame {} ({}/{})",
            def.name(),
            target,
            self.current_frame,
            count + 1,
            def.max_hits_per_target()
        );
        true
    }

    /// Whether `target` has been hit during this sequence.
    #[must_use]
    pub fn has_hit(&self, target: EntityId) -> bool {
        self.hit_counts.contains_key(&target)
    }

    /// Hits landed on `target` during this sequence.
    #[must_use]
    pub fn hit_count(&self, target: EntityId) -> u32 {
        self.hit_counts.get(&target).copied().unwrap_or(0)
    }

    /// All targets hit during this sequence, in id order.
    #[must_use]
    pub fn hit_targets(&self) -> Vec<EntityId> {
        let mut targets: Vec<EntityId> = self.hit_counts.keys().copied().collect();
        targets.sort_unstable();
        targets
    }

    /// Damage of the current frame, or 0 when idle.
    #[must_use]
    pub fn current_damage(&self) -> f32 {
        match &self.definition {
            Some(def) => def.base_damage() * def.damage_modifier(self.current_frame),
            None => 0.0,
        }
    }

    /// Knockback magnitude of the running attack, or 0 when idle.
    #[must_use]
    pub fn knockback_force(&self) -> f32 {
        self.definition
            .as_ref()
            .map_or(0.0, |def| def.knockback_force())
    }

    /// Knockback to apply to a target at `target` from an attacker at `attacker`.
    #[must_use]
    pub fn knockback_vector(&self, attacker: Vec2, target: Vec2, facing_left: bool) -> Vec2 {
        let Some(def) = &self.definition else {
            return Vec2::ZERO;
        };
        let force = def.knockback_force();
        let x_dir = if facing_left { -1.0 } else { 1.0 };

        if let Some(angle) = def.knockback_angle_degrees() {
            let radians = angle.to_radians();
            return Vec2::new(radians.cos() * force * x_dir, -radians.sin() * force);
        }

        let delta = target - attacker;
        let distance = delta.length();
        if distance < KNOCKBACK_EPSILON {
            return Vec2::new(force * x_dir, -force * FALLBACK_LIFT);
        }
        delta / distance * force
    }

    /// Hitbox of the current frame, or `None` outside a hit frame.
    #[must_use]
    pub fn current_hitbox(&self, owner: &Rect, facing_left: bool) -> Option<Rect> {
        if !self.is_hit_frame_active() {
            return None;
        }
        self.definition
            .as_ref()
            .map(|def| def.hitbox_for_frame(self.current_frame).to_rect(owner, facing_left))
    }

    /// Phase of the current frame.
    #[must_use]
    pub fn phase(&self) -> AttackPhase {
        match &self.definition {
            Some(def) => def.phase_of(self.current_frame),
            None => AttackPhase::Complete,
        }
    }

    /// Test every target against the current hitbox and register hits.
    ///
    /// Stops after the first hit when the attack cannot hit multiple targets.
    pub fn process_targets<I>(&mut self, owner: &Rect, facing_left: bool, targets: I) -> Vec<HitResult>
    where
        I: IntoIterator<Item = (EntityId, Rect)>,
    {
        let mut results = Vec::new();
        let Some(hitbox) = self.current_hitbox(owner, facing_left) else {
            return results;
        };
        let multi = self
            .definition
            .as_ref()
            .is_some_and(|def| def.can_hit_multiple_targets());

        for (target, bounds) in targets {
            if !hitbox.intersects(&bounds) {
                continue;
            }
            let frame = self.current_frame;
            let damage = self.current_damage();
            let knockback = self.knockback_vector(owner.center(), bounds.center(), facing_left);
            if !self.try_register_hit(target) {
                continue;
            }
            results.push(HitResult {
                target,
                damage,
                knockback,
                hit_stop_frames: self.hit_stop_remaining,
                frame,
            });
            if !multi {
                break;
            }
        }
        results
    }

    /// Capture the runtime state.
    #[must_use]
    pub fn snapshot(&self) -> AttackSnapshot {
        AttackSnapshot {
            active: self.is_active(),
            attack: self.definition.as_ref().map(|def| def.name().to_owned()),
            frame: self.current_frame,
            phase: self.phase(),
            hit_frame_active: self.is_hit_frame_active(),
            hit_stop_remaining: self.hit_stop_remaining,
            targets_hit: self.hit_counts.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn jab() -> Arc<AttackDefinition> {
        Arc::new(
            AttackDefinition::builder("jab")
                .hit_frames([2])
                .base_damage(10.0)
                .knockback(4.0)
                .hit_stop_frames(2)
                .build()
                .expect("valid definition"),
        )
    }

    fn sweep() -> Arc<AttackDefinition> {
        Arc::new(
            AttackDefinition::builder("sweep")
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
                .startup_frames(0..5)
                .recovery_frames(13..17)
                .build()
                .expect("valid definition"),
        )
    }

    #[test]
    fn test_builder_rejects_invalid_values() {
        let err = AttackDefinition::builder("bad").base_damage(-1.0).build();
        assert!(matches!(err, Err(AttackConfigError::NegativeDamage { .. })));

        let err = AttackDefinition::builder("bad").knockback(-0.5).build();
        assert!(matches!(err, Err(AttackConfigError::NegativeKnockback { .. })));

        let err = AttackDefinition::builder("bad").max_hits_per_target(0).build();
        assert!(matches!(err, Err(AttackConfigError::InvalidMaxHits { value: 0, .. })));

        let err = AttackDefinition::builder("bad").base_damage(f32::NAN).build();
        assert!(err.is_err());

        let err = AttackDefinition::builder("bad")
            .frame_damage_modifier(1, -2.0)
            .build();
        assert!(matches!(err, Err(AttackConfigError::NegativeModifier { frame: 1, .. })));
    }

    #[test]
    fn test_update_is_noop_when_idle() {
        let mut runtime = AttackRuntime::new();
        runtime.update(5);
        assert_eq!(runtime.current_frame(), 0);
        assert!(!runtime.is_hit_frame_active());
        assert!(!runtime.try_register_hit(EntityId::from_raw(1)));
        assert_eq!(runtime.current_damage(), 0.0);
        assert_eq!(runtime.phase(), AttackPhase::Complete);
    }

    #[test]
    fn test_register_hit_only_on_hit_frame() {
        let target = EntityId::from_raw(10);
        let mut runtime = AttackRuntime::new();
        runtime.begin(jab());

        runtime.update(1);
        assert!(!runtime.try_register_hit(target));
        runtime.update(2);
        assert!(runtime.try_register_hit(target));
        assert!(runtime.has_hit(target));
        assert_eq!(runtime.hit_stop_remaining(), 2);
        // frozen by hit-stop, so no longer a damaging frame
        assert!(!runtime.is_hit_frame_active());
    }

    #[test]
    fn test_hit_stop_holds_frame() {
        let target = EntityId::from_raw(11);
        let mut runtime = AttackRuntime::new();
        runtime.begin(jab());
        runtime.update(2);
        assert!(runtime.try_register_hit(target));

        runtime.update(3);
        assert_eq!(runtime.current_frame(), 2);
        assert_eq!(runtime.hit_stop_remaining(), 1);
        runtime.update(3);
        assert_eq!(runtime.current_frame(), 2);
        assert!(!runtime.in_hit_stop());
        runtime.update(3);
        assert_eq!(runtime.current_frame(), 3);
    }

    #[test]
    fn test_same_frame_rejected_after_hit_stop() {
        let target = EntityId::from_raw(12);
        let mut runtime = AttackRuntime::new();
        runtime.begin(sweep());
        runtime.update(3);
        assert!(runtime.try_register_hit(target));
        for _ in 0..5 {
            runtime.update(3);
        }
        assert!(runtime.is_hit_frame_active());
        assert!(!runtime.try_register_hit(target));
        assert_eq!(runtime.hit_count(target), 1);
    }

    #[test]
    fn test_registry_is_scoped_to_one_sequence() {
        let target = EntityId::from_raw(13);
        let mut runtime = AttackRuntime::new();
        runtime.begin(jab());
        runtime.update(2);
        assert!(runtime.try_register_hit(target));
        runtime.end();
        assert!(!runtime.has_hit(target));

        runtime.begin(jab());
        runtime.update(2);
        assert!(runtime.try_register_hit(target));
    }

    #[test]
    fn test_end_is_idempotent() {
        let mut runtime = AttackRuntime::new();
        runtime.end();
        assert!(!runtime.is_active());
        assert_eq!(runtime.snapshot().phase, AttackPhase::Complete);

        runtime.begin(jab());
        runtime.end();
        runtime.end();
        assert!(!runtime.is_active());
        assert!(runtime.hit_targets().is_empty());
    }

    #[test]
    fn test_damage_uses_frame_modifier() {
        let mut runtime = AttackRuntime::new();
        runtime.begin(sweep());
        runtime.update(3);
        assert!((runtime.current_damage() - 7.5).abs() < 1e-4);
        runtime.update(5);
        assert!((runtime.current_damage() - 25.0).abs() < 1e-4);
    }

    #[test]
    fn test_phase_classification() {
        let def = sweep();
        assert_eq!(def.phase_of(0), AttackPhase::Startup);
        assert_eq!(def.phase_of(7), AttackPhase::Active);
        assert_eq!(def.phase_of(9), AttackPhase::Active);
        assert_eq!(def.phase_of(12), AttackPhase::Recovery);
        assert_eq!(def.phase_of(14), AttackPhase::Recovery);

        let empty = AttackDefinition::builder("empty").build().expect("valid");
        assert_eq!(empty.phase_of(0), AttackPhase::Recovery);
    }

    #[test]
    fn test_knockback_with_angle() {
        let mut runtime = AttackRuntime::new();
        runtime.begin(sweep());
        let right = runtime.knockback_vector(Vec2::ZERO, Vec2::new(10.0, 0.0), false);
        let left = runtime.knockback_vector(Vec2::ZERO, Vec2::new(10.0, 0.0), true);
        let expected = 15.0 * std::f32::consts::FRAC_1_SQRT_2;
        assert!((right.x - expected).abs() < 1e-3);
        assert!((right.y + expected).abs() < 1e-3);
        assert!((left.x + expected).abs() < 1e-3);
    }

    #[test]
    fn test_knockback_follows_direction_without_angle() {
        let mut runtime = AttackRuntime::new();
        runtime.begin(jab());
        let kb = runtime.knockback_vector(Vec2::new(0.0, 0.0), Vec2::new(0.0, 10.0), false);
        assert!(kb.x.abs() < 1e-5);
        assert!((kb.y - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_knockback_fallback_when_coincident() {
        let mut runtime = AttackRuntime::new();
        runtime.begin(jab());
        let p = Vec2::new(5.0, 5.0);
        let kb = runtime.knockback_vector(p, p, true);
        assert!(kb.is_finite());
        assert_ne!(kb, Vec2::ZERO);
        assert!((kb.x + 4.0).abs() < 1e-5);
        assert!((kb.y + 1.2).abs() < 1e-5);
    }

    #[test]
    fn test_hitbox_only_on_hit_frame() {
        let owner = Rect::new(0.0, 0.0, 100.0, 100.0);
        let mut runtime = AttackRuntime::new();
        runtime.begin(sweep());
        runtime.update(2);
        assert!(runtime.current_hitbox(&owner, false).is_none());
        runtime.update(3);
        let hitbox = runtime.current_hitbox(&owner, false).expect("hit frame");
        assert_eq!(hitbox.center(), Vec2::new(90.0, 20.0));
        runtime.update(7);
        // default hitbox
        let hitbox = runtime.current_hitbox(&owner, false).expect("hit frame");
        assert_eq!(hitbox.size(), Vec2::new(50.0, 50.0));
    }

    #[test]
    fn test_process_targets_single_target_attack() {
        let def = Arc::new(
            AttackDefinition::builder("stab")
                .hit_frames([0])
                .can_hit_multiple_targets(false)
                .build()
                .expect("valid"),
        );
        let owner = Rect::new(0.0, 0.0, 100.0, 100.0);
        let a = EntityId::from_raw(21);
        let b = EntityId::from_raw(22);
        let mut runtime = AttackRuntime::new();
        runtime.begin(def);

        let hits = runtime.process_targets(
            &owner,
            false,
            [(a, Rect::new(40.0, 40.0, 20.0, 20.0)), (b, Rect::new(45.0, 45.0, 20.0, 20.0))],
        );
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].target, a);
        assert!(!runtime.has_hit(b));
    }

    #[test]
    fn test_process_targets_skips_out_of_range() {
        let owner = Rect::new(0.0, 0.0, 100.0, 100.0);
        let mut runtime = AttackRuntime::new();
        runtime.begin(jab());
        runtime.update(2);
        let far = EntityId::from_raw(30);
        let near = EntityId::from_raw(31);
        let hits = runtime.process_targets(
            &owner,
            false,
            [(far, Rect::new(500.0, 0.0, 10.0, 10.0)), (near, Rect::new(45.0, 45.0, 10.0, 10.0))],
        );
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].target, near);
        assert_eq!(hits[0].frame, 2);
        assert_eq!(hits[0].hit_stop_frames, 2);
    }

    proptest! {
        #[test]
        fn prop_at_most_max_hits_per_target(
            max_hits in 1u32..4,
            hit_frames in proptest::collection::btree_set(0u32..20, 0..8),
            calls_per_frame in 1usize..4,
        ) {
            let def = Arc::new(
                AttackDefinition::builder("prop")
                    .hit_frames(hit_frames)
                    .max_hits_per_target(max_hits)
                    .hit_stop_frames(0)
                    .build()
                    .expect("valid"),
            );
            let target = EntityId::from_raw(99);
            let mut runtime = AttackRuntime::new();
            runtime.begin(def);

            let mut successes = 0u32;
            let mut frames_hit = Vec::new();
            for frame in 0..20 {
                runtime.update(frame);
                for _ in 0..calls_per_frame {
                    if runtime.try_register_hit(target) {
                        successes += 1;
                        frames_hit.push(frame);
                    }
                }
            }
            prop_assert!(successes <= max_hits);
            let mut dedup = frames_hit.clone();
            dedup.dedup();
            prop_assert_eq!(dedup.len(), frames_hit.len());
        }

        #[test]
        fn prop_hit_stop_freezes_frame(stop in 1u32..10, frames in proptest::collection::vec(0u32..30, 1..10)) {
            let def = Arc::new(
                AttackDefinition::builder("freeze")
                    .hit_frames([0])
                    .hit_stop_frames(stop)
                    .build()
                    .expect("valid"),
            );
            let mut runtime = AttackRuntime::new();
            runtime.begin(def);
            prop_assert!(runtime.try_register_hit(EntityId::from_raw(5)));

            for frame in frames {
                let before_frame = runtime.current_frame();
                let before_stop = runtime.hit_stop_remaining();
                runtime.update(frame);
                if before_stop > 0 {
                    prop_assert_eq!(runtime.current_frame(), before_frame);
                    prop_assert_eq!(runtime.hit_stop_remaining(), before_stop - 1);
                } else {
                    prop_assert_eq!(runtime.current_frame(), frame);
                }
            }
        }
    }
}
