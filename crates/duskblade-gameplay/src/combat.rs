//! Combat resolution.
//!
//! Two independent passes run each tick:
//! 1. Player against targets: one registered hit per target per frame,
//!    damage and knockback from the player's current attack frame
//! 2. Enemies against the player: skipped while the player is invincible;
//!    an overlapping enemy always spends its hit, even when the player
//!    shrugs it off
//!
//! An absent hitbox is the normal state between hit frames and simply
//! resolves nothing.

use crate::ambient::DriftingBat;
use crate::attack::HitResult;
use crate::audio::AudioSink;
use crate::player::Player;
use crate::skeleton::Skeleton;
use duskblade_common::{EntityId, Rect, Vec2};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Played for every player hit that lands.
pub const SOUND_PLAYER_STRIKE: &str = "attack_one";

/// Played when an enemy hit lands on the player.
pub const SOUND_PLAYER_HIT: &str = "player_hit";

// ============================================================================
// Seams
// ============================================================================

/// Something the player can hit.
pub trait Damageable {
    /// Actor id used for duplicate-hit tracking.
    fn id(&self) -> EntityId;

    /// Area that receives hits.
    fn hurtbox(&self) -> Rect;

    /// Point knockback is computed toward.
    fn center(&self) -> Vec2;

    /// Whether the target is already dead.
    fn is_dead(&self) -> bool;

    /// Whether the target ignores damage right now.
    fn is_invincible(&self) -> bool;

    /// Apply damage and knockback. Returns false when ignored.
    fn take_damage(&mut self, amount: f32, knockback: Vec2) -> bool;

    /// Sound played when a hit kills the target.
    fn death_sound(&self) -> Option<&'static str> {
        None
    }
}

/// Something whose attacks can hit the player.
pub trait EnemyAttacker: Damageable {
    /// Whether an attack is in progress.
    fn is_attacking(&self) -> bool;

    /// Whether the current frame should try to land a hit.
    fn should_deal_damage(&mut self) -> bool;

    /// Area the attack covers.
    fn attack_hitbox(&self) -> Option<Rect>;

    /// Spend the attack's hit.
    fn register_hit(&mut self);

    /// Damage of the attack.
    fn attack_damage(&self) -> f32;

    /// Horizontal knockback of the attack.
    fn attack_knockback(&self) -> f32;
}

impl Damageable for Skeleton {
    fn id(&self) -> EntityId {
        Skeleton::id(self)
    }

    fn hurtbox(&self) -> Rect {
        self.hitbox()
    }

    fn center(&self) -> Vec2 {
        Skeleton::center(self)
    }

    fn is_dead(&self) -> bool {
        Skeleton::is_dead(self)
    }

    fn is_invincible(&self) -> bool {
        Skeleton::is_invincible(self)
    }

    fn take_damage(&mut self, amount: f32, knockback: Vec2) -> bool {
        Skeleton::take_damage(self, amount, knockback)
    }

    fn death_sound(&self) -> Option<&'static str> {
        Some("skeleton_death")
    }
}

impl EnemyAttacker for Skeleton {
    fn is_attacking(&self) -> bool {
        Skeleton::is_attacking(self)
    }

    fn should_deal_damage(&mut self) -> bool {
        Skeleton::should_deal_damage(self)
    }

    fn attack_hitbox(&self) -> Option<Rect> {
        Skeleton::attack_hitbox(self)
    }

    fn register_hit(&mut self) {
        Skeleton::register_hit(self);
    }

    fn attack_damage(&self) -> f32 {
        Skeleton::attack_damage(self)
    }

    fn attack_knockback(&self) -> f32 {
        Skeleton::attack_knockback(self)
    }
}

impl Damageable for DriftingBat {
    fn id(&self) -> EntityId {
        DriftingBat::id(self)
    }

    fn hurtbox(&self) -> Rect {
        self.hitbox()
    }

    fn center(&self) -> Vec2 {
        DriftingBat::center(self)
    }

    fn is_dead(&self) -> bool {
        self.is_removed()
    }

    fn is_invincible(&self) -> bool {
        false
    }

    fn take_damage(&mut self, _amount: f32, _knockback: Vec2) -> bool {
        self.strike();
        true
    }
}

// ============================================================================
// Passes
// ============================================================================

/// A hit the player took.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageTaken {
    /// Enemy that landed the hit.
    pub attacker: EntityId,
    /// Damage applied.
    pub damage: f32,
    /// Horizontal push applied to the player.
    pub knockback: f32,
}

/// Player attack pass.
///
/// Returns the hits that landed. Stops after the first hit when the attack
/// cannot hit multiple targets.
pub fn resolve_player_attacks<'a, I>(
    player: &mut Player,
    targets: I,
    audio: &mut dyn AudioSink,
) -> Vec<HitResult>
where
    I: IntoIterator<Item = &'a mut dyn Damageable>,
{
    let mut hits = Vec::new();
    if !player.should_deal_damage() {
        return hits;
    }
    let Some(hitbox) = player.attack_hitbox() else {
        return hits;
    };
    let multi = player
        .attack_definition()
        .map_or(true, |def| def.can_hit_multiple_targets());

    for target in targets {
        if target.is_dead() || target.is_invincible() {
            continue;
        }
        if !hitbox.intersects(&target.hurtbox()) {
            continue;
        }
        let id = target.id();
        let frame = player.attack_runtime().current_frame();
        if !player.try_register_hit(id) {
            continue;
        }

        let damage = player.current_attack_damage();
        let knockback = player.attack_knockback(target.center());
        if !target.take_damage(damage, knockback) {
            debug!("{id} refused a hit on frame {frame}");
            continue;
        }
        audio.play(SOUND_PLAYER_STRIKE);
        if target.is_dead() {
            if let Some(sound) = target.death_sound() {
                audio.play(sound);
            }
        }
        debug!("Player hit {id} for {damage} on frame {frame}");

        hits.push(HitResult {
            target: id,
            damage,
            knockback,
            hit_stop_frames: player.attack_runtime().hit_stop_remaining(),
            frame,
        });
        if !multi {
            break;
        }
    }
    hits
}

/// Resolve one enemy's attack against the player.
///
/// Does not check player invincibility up front: an overlapping attack on a
/// hit frame is always spent, and the player's own damage gate decides
/// whether anything happens.
pub fn resolve_enemy_attack(
    player: &mut Player,
    enemy: &mut dyn EnemyAttacker,
    audio: &mut dyn AudioSink,
) -> Option<DamageTaken> {
    if !enemy.is_attacking() || enemy.is_dead() {
        return None;
    }
    if !enemy.should_deal_damage() {
        return None;
    }
    let hitbox = enemy.attack_hitbox()?;
    if !hitbox.intersects(&player.hitbox()) {
        return None;
    }

    enemy.register_hit();
    let damage = enemy.attack_damage();
    if !player.take_damage(damage) {
        return None;
    }

    let mut push = 0.0;
    let force = enemy.attack_knockback();
    if force > 0.0 {
        let direction = if enemy.center().x > player.center().x {
            -1.0
        } else {
            1.0
        };
        push = force * direction;
        player.apply_knockback(push);
    }
    audio.play(SOUND_PLAYER_HIT);
    debug!(
        "{} hit player for {damage}, health {}",
        enemy.id(),
        player.health()
    );

    Some(DamageTaken {
        attacker: enemy.id(),
        damage,
        knockback: push,
    })
}

/// Enemy attack pass. Nothing happens while the player is invincible.
pub fn resolve_enemy_attacks<'a, I>(
    player: &mut Player,
    attackers: I,
    audio: &mut dyn AudioSink,
) -> Vec<DamageTaken>
where
    I: IntoIterator<Item = &'a mut dyn EnemyAttacker>,
{
    if player.is_invincible() {
        return Vec::new();
    }
    attackers
        .into_iter()
        .filter_map(|enemy| resolve_enemy_attack(player, enemy, audio))
        .collect()
}

// ============================================================================
// Resolver
// ============================================================================

/// Outcome of one resolution tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombatReport {
    /// Player hits that landed.
    pub hits_dealt: Vec<HitResult>,
    /// Enemy hits that landed.
    pub hits_taken: Vec<DamageTaken>,
    /// Targets killed this tick.
    pub kills: Vec<EntityId>,
}

impl CombatReport {
    /// Whether nothing happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits_dealt.is_empty() && self.hits_taken.is_empty()
    }
}

/// Running totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatStats {
    /// Player hits landed.
    pub hits_dealt: u32,
    /// Enemy hits landed.
    pub hits_taken: u32,
    /// Enemies killed.
    pub kills: u32,
}

/// Runs both passes over the session's actors and keeps totals.
#[derive(Debug, Clone, Default)]
pub struct CombatResolver {
    stats: CombatStats,
}

impl CombatResolver {
    /// Create a resolver with zeroed totals.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Totals so far.
    #[must_use]
    pub fn stats(&self) -> CombatStats {
        self.stats
    }

    /// Resolve one tick. Nothing is resolved while the player is dead.
    pub fn resolve(
        &mut self,
        player: &mut Player,
        skeletons: &mut [Skeleton],
        swarm: &mut [DriftingBat],
        audio: &mut dyn AudioSink,
    ) -> CombatReport {
        let mut report = CombatReport::default();
        if player.is_dead() {
            return report;
        }

        let alive_before: Vec<EntityId> = skeletons
            .iter()
            .filter(|s| !s.is_dead())
            .map(Skeleton::id)
            .chain(swarm.iter().filter(|b| !b.is_removed()).map(DriftingBat::id))
            .collect();

        let targets = skeletons
            .iter_mut()
            .map(|s| s as &mut dyn Damageable)
            .chain(swarm.iter_mut().map(|b| b as &mut dyn Damageable));
        report.hits_dealt = resolve_player_attacks(player, targets, audio);

        let skeleton_kills = skeletons
            .iter()
            .filter(|s| s.is_dead() && alive_before.contains(&s.id()))
            .map(Skeleton::id);
        let swarm_kills = swarm
            .iter()
            .filter(|b| b.is_removed() && alive_before.contains(&b.id()))
            .map(DriftingBat::id);
        report.kills = skeleton_kills.chain(swarm_kills).collect();

        let attackers = skeletons.iter_mut().map(|s| s as &mut dyn EnemyAttacker);
        report.hits_taken = resolve_enemy_attacks(player, attackers, audio);

        self.stats.hits_dealt += report.hits_dealt.len() as u32;
        self.stats.hits_taken += report.hits_taken.len() as u32;
        self.stats.kills += report.kills.len() as u32;
        report
    }
}
