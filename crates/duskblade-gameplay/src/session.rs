//! Game session orchestration.
//!
//! This module provides the `GameSession` struct which owns every actor of
//! one level and runs the per-tick order:
//! 1. clock
//! 2. spawning (skeletons, swarm bat groups)
//! 3. world scroll from the running player
//! 4. player update
//! 5. enemy updates, reading the player center as their target
//! 6. combat resolution and score
//! 7. removal of finished enemies
//! 8. game-over timer

use crate::ambient::{DriftConfig, DriftingBat, ScriptFrames, ScriptProfile, ScriptedEnemy};
use crate::animation::FrameSet;
use crate::audio::AudioSink;
use crate::combat::{CombatReport, CombatResolver, CombatStats};
use crate::level::{EntityKind, LevelConfig};
use crate::player::{Player, PlayerAttacks, PlayerConfig, PlayerFrames, PlayerInput};
use crate::render::{FrameSource, SpriteRenderer};
use crate::skeleton::{Skeleton, SkeletonConfig, SkeletonFrames};
use crate::spawn::{BatSwarmSchedule, SpawnConfig, Spawner};
use duskblade_common::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Sound played when a skeleton appears.
pub const SOUND_SKELETON_SPAWN: &str = "skeleton_spawn";

/// Sound played when a bat group appears.
pub const SOUND_BATS: &str = "bats";

/// Horizontal spread of one bat group past the right edge.
const BAT_GROUP_SPREAD: f32 = 175.0;

/// Highest bat spawn line.
const BAT_MIN_Y: f32 = 50.0;

/// Session tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Screen width.
    pub screen_width: f32,
    /// Screen height.
    pub screen_height: f32,
    /// World scroll per tick while the player runs.
    pub scroll_speed: f32,
    /// Score per player hit.
    pub score_per_hit: u32,
    /// Score lost per hit taken.
    pub score_penalty: u32,
    /// Time between death and restart (ms).
    pub game_over_delay_ms: u64,
    /// Seed for spawn positions and skeleton variants.
    pub seed: u64,
    /// Player tuning.
    pub player: PlayerConfig,
    /// Skeleton tuning.
    pub skeleton: SkeletonConfig,
    /// Skeleton population limits.
    pub skeleton_spawn: SpawnConfig,
    /// Swarm bat tuning.
    pub drift: DriftConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            screen_width: 1600.0,
            screen_height: 900.0,
            scroll_speed: 5.0,
            score_per_hit: 10,
            score_penalty: 5,
            game_over_delay_ms: 3000,
            seed: 0,
            player: PlayerConfig::default(),
            skeleton: SkeletonConfig::default(),
            skeleton_spawn: SpawnConfig::default(),
            drift: DriftConfig::default(),
        }
    }
}

/// Every clip a session needs, loaded once.
#[derive(Debug, Clone, Default)]
pub struct SessionAssets {
    /// Player clips.
    pub player: PlayerFrames,
    /// Skeleton clips.
    pub skeleton: SkeletonFrames,
    /// Swarm bat flight clip.
    pub swarm: FrameSet,
    /// Scripted bat clips.
    pub bat: ScriptFrames,
    /// Goblin clips.
    pub goblin: ScriptFrames,
    /// Green monster clips.
    pub green_monster: ScriptFrames,
}

impl SessionAssets {
    /// Load every clip from an asset source.
    pub fn load(source: &mut dyn FrameSource) -> Self {
        Self {
            player: PlayerFrames::load(source),
            skeleton: SkeletonFrames::load(source),
            swarm: FrameSet::load(source, "swarm/fly"),
            bat: ScriptFrames::load(source, "bat"),
            goblin: ScriptFrames::load(source, "goblin"),
            green_monster: ScriptFrames::load(source, "green_monster"),
        }
    }

    fn script(&self, kind: EntityKind) -> Option<(ScriptProfile, ScriptFrames)> {
        match kind {
            EntityKind::Bat => Some((ScriptProfile::bat(), self.bat.clone())),
            EntityKind::Goblin => Some((ScriptProfile::goblin(), self.goblin.clone())),
            EntityKind::GreenMonster => {
                Some((ScriptProfile::green_monster(), self.green_monster.clone()))
            }
            EntityKind::Player | EntityKind::Skeleton => None,
        }
    }
}

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Combat outcome.
    pub combat: CombatReport,
    /// World scroll applied to enemies.
    pub scroll: f32,
    /// Skeletons spawned.
    pub skeletons_spawned: usize,
    /// Swarm bats spawned.
    pub bats_spawned: usize,
    /// Whether the session restarted after a game over.
    pub restarted: bool,
}

/// One running level.
#[derive(Debug)]
pub struct GameSession {
    config: SessionConfig,
    assets: SessionAssets,
    player: Player,
    skeletons: Vec<Skeleton>,
    ambient: Vec<ScriptedEnemy>,
    swarm: Vec<DriftingBat>,
    resolver: CombatResolver,
    skeleton_spawner: Spawner,
    swarm_schedule: BatSwarmSchedule,
    rng: fastrand::Rng,
    elapsed_ms: f64,
    score: u32,
    game_over_at: Option<u64>,
    paused: bool,
}

impl GameSession {
    /// Build a session from a level.
    #[must_use]
    pub fn new(
        config: SessionConfig,
        level: &LevelConfig,
        assets: SessionAssets,
        attacks: PlayerAttacks,
    ) -> Self {
        let spawn = level
            .player_spawn()
            .unwrap_or_else(|| Vec2::new(config.screen_width / 4.0, config.player.ground_y));
        let player = Player::new(config.player.clone(), attacks, assets.player.clone(), spawn);

        let ambient = [EntityKind::Bat, EntityKind::Goblin, EntityKind::GreenMonster]
            .into_iter()
            .flat_map(|kind| level.placements(kind))
            .filter_map(|placement| {
                let (profile, frames) = assets.script(placement.kind)?;
                Some(ScriptedEnemy::new(
                    profile,
                    frames,
                    placement.position(),
                    config.screen_width,
                    placement.delay,
                ))
            })
            .collect();

        let mut session = Self {
            rng: fastrand::Rng::with_seed(config.seed),
            skeleton_spawner: Spawner::new(config.skeleton_spawn.clone()),
            swarm_schedule: level.swarm_schedule(),
            config,
            assets,
            player,
            skeletons: Vec::new(),
            ambient,
            swarm: Vec::new(),
            resolver: CombatResolver::new(),
            elapsed_ms: 0.0,
            score: 0,
            game_over_at: None,
            paused: false,
        };

        let placed: Vec<Vec2> = level
            .placements(EntityKind::Skeleton)
            .map(|p| p.position())
            .collect();
        for midbottom in placed {
            session.spawn_skeleton_at(midbottom);
        }

        info!(
            "Session started: {} skeletons, {} ambient actors",
            session.skeletons.len(),
            session.ambient.len()
        );
        session
    }

    // === Queries ===

    /// Session tuning.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The player.
    #[must_use]
    pub fn player(&self) -> &Player {
        &self.player
    }

    /// Mutable access to the player.
    pub fn player_mut(&mut self) -> &mut Player {
        &mut self.player
    }

    /// Live skeletons, dying ones included.
    #[must_use]
    pub fn skeletons(&self) -> &[Skeleton] {
        &self.skeletons
    }

    /// Scripted background actors.
    #[must_use]
    pub fn ambient(&self) -> &[ScriptedEnemy] {
        &self.ambient
    }

    /// Swarm bats on screen.
    #[must_use]
    pub fn swarm(&self) -> &[DriftingBat] {
        &self.swarm
    }

    /// Current score.
    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    /// Combat totals.
    #[must_use]
    pub fn stats(&self) -> CombatStats {
        self.resolver.stats()
    }

    /// Session clock (ms).
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.elapsed_ms as u64
    }

    /// Whether the player is dead and the restart timer is running.
    #[must_use]
    pub fn is_game_over(&self) -> bool {
        self.game_over_at.is_some()
    }

    /// Whether ticks are ignored.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Toggle pause.
    pub fn toggle_pause(&mut self) {
        self.set_paused(!self.paused);
    }

    /// Set pause.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
        debug!("Session paused: {paused}");
    }

    /// Add a skeleton standing on `midbottom`.
    pub fn spawn_skeleton_at(&mut self, midbottom: Vec2) {
        let seed = self.rng.u64(..);
        let skeleton = Skeleton::new(
            self.config.skeleton.clone(),
            self.assets.skeleton.clone(),
            midbottom,
            seed,
        );
        info!("Spawned skeleton {:?} at x={:.0}", skeleton.id(), midbottom.x);
        self.skeletons.push(skeleton);
    }

    // === Tick ===

    /// Advance one tick. `dt` is in seconds.
    pub fn update(
        &mut self,
        input: &PlayerInput,
        dt: f32,
        audio: &mut dyn AudioSink,
    ) -> TickReport {
        let mut report = TickReport::default();
        if self.paused {
            return report;
        }

        self.elapsed_ms += f64::from(dt) * 1000.0;
        let now = self.now_ms();

        report.skeletons_spawned = self.spawn_skeletons(now, audio);
        report.bats_spawned = self.spawn_bats(now, audio);

        report.scroll = if self.player.is_running() {
            self.config.scroll_speed * f32::from(self.player.direction())
        } else {
            0.0
        };

        self.player.update(input, dt);

        let target = (!self.player.is_dead()).then(|| self.player.center());
        for skeleton in &mut self.skeletons {
            skeleton.update(target, report.scroll);
        }
        for enemy in &mut self.ambient {
            enemy.update(dt);
        }
        for bat in &mut self.swarm {
            bat.update(report.scroll);
        }

        report.combat =
            self.resolver
                .resolve(&mut self.player, &mut self.skeletons, &mut self.swarm, audio);
        self.apply_score(&report.combat);

        self.player.flush_sound_cues(audio);

        self.skeletons.retain(|s| !s.is_removable());
        self.swarm.retain(|b| !b.is_removed());

        report.restarted = self.update_game_over(now);
        report
    }

    fn spawn_skeletons(&mut self, now: u64, audio: &mut dyn AudioSink) -> usize {
        if self.player.is_dead() || !self.skeleton_spawner.can_spawn(self.skeletons.len(), now) {
            return 0;
        }
        let x = self
            .skeleton_spawner
            .spawn_x(self.config.screen_width, &mut self.rng);
        let y = self.skeleton_spawner.spawn_y(self.config.skeleton.ground_y);
        self.spawn_skeleton_at(Vec2::new(x, y));
        self.skeleton_spawner.record_spawn(now);
        audio.play(SOUND_SKELETON_SPAWN);
        1
    }

    fn spawn_bats(&mut self, now: u64, audio: &mut dyn AudioSink) -> usize {
        let Some(count) = self.swarm_schedule.poll(now, &mut self.rng) else {
            return 0;
        };
        let max_y = (self.config.screen_height / 2.0).max(BAT_MIN_Y);
        for _ in 0..count {
            let x = self.config.screen_width + self.rng.f32() * BAT_GROUP_SPREAD;
            let y = BAT_MIN_Y + self.rng.f32() * (max_y - BAT_MIN_Y);
            let bat = DriftingBat::new(
                &self.config.drift,
                self.assets.swarm.clone(),
                Vec2::new(x, y),
                y,
                &mut self.rng,
            );
            self.swarm.push(bat);
        }
        audio.play(SOUND_BATS);
        info!("Spawned bat group of {count}");
        count
    }

    fn apply_score(&mut self, combat: &CombatReport) {
        if combat.is_empty() {
            return;
        }
        let gained = combat.hits_dealt.len() as u32 * self.config.score_per_hit;
        let lost = combat.hits_taken.len() as u32 * self.config.score_penalty;
        self.score = (self.score + gained).saturating_sub(lost);
        debug!("Score {} (+{gained}, -{lost})", self.score);
    }

    fn update_game_over(&mut self, now: u64) -> bool {
        if !self.player.is_dead() {
            return false;
        }
        let died_at = *self.game_over_at.get_or_insert_with(|| {
            info!("Game over at {now} ms, score {}", self.score);
            now
        });
        if now.saturating_sub(died_at) < self.config.game_over_delay_ms {
            return false;
        }

        self.player.reset();
        self.skeletons.clear();
        self.swarm.clear();
        self.skeleton_spawner = Spawner::new(self.config.skeleton_spawn.clone());
        self.skeleton_spawner.record_spawn(now);
        self.game_over_at = None;
        info!("Session restarted, score kept at {}", self.score);
        true
    }

    // === Rendering ===

    /// Draw ambient actors, swarm, skeletons, then the player.
    pub fn draw(&self, renderer: &mut dyn SpriteRenderer) {
        for enemy in &self.ambient {
            enemy.draw(renderer);
        }
        for bat in &self.swarm {
            bat.draw(renderer);
        }
        for skeleton in &self.skeletons {
            skeleton.draw(renderer);
        }
        self.player.draw(renderer);
    }
}
