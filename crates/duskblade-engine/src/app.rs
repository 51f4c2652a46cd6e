//! Headless session runner.
//!
//! Drives one level at a fixed step with a scripted input track. Audio and
//! rendering are replaced by collaborators that only log and count.

use crate::config::EngineConfig;
use anyhow::{Context, Result};
use duskblade_common::Rect;
use duskblade_gameplay::testing::StubFrameSource;
use duskblade_gameplay::{
    AudioSink, CombatStats, GameSession, LevelConfig, NullAudio, PlayerAttacks, PlayerInput,
    SessionAssets, SpriteFrame, SpriteRenderer,
};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Length of one input track cycle in ticks.
const TRACK_PERIOD: u64 = 240;

/// Input for `tick` of a repeating run, fight and jump pattern.
#[must_use]
pub fn scripted_input(tick: u64) -> PlayerInput {
    let t = tick % TRACK_PERIOD;
    PlayerInput {
        right: t < 90,
        left: (150..180).contains(&t),
        jump: t == 100,
        thrust: t % 40 == 20,
        smash: t == 200,
    }
}

/// Logs sounds instead of mixing them.
#[derive(Debug)]
pub struct LoggingAudio {
    gain: f32,
    played: BTreeMap<String, u32>,
}

impl LoggingAudio {
    /// Create a sink scaling every volume by `gain`.
    #[must_use]
    pub fn new(gain: f32) -> Self {
        Self {
            gain,
            played: BTreeMap::new(),
        }
    }

    /// Play counts by sound name.
    #[must_use]
    pub fn played(&self) -> &BTreeMap<String, u32> {
        &self.played
    }
}

impl AudioSink for LoggingAudio {
    fn play_sound(&mut self, name: &str, volume: f32, looping: bool) {
        let volume = volume * self.gain;
        debug!("Sound {name} at {volume:.2} (looping: {looping})");
        *self.played.entry(name.to_string()).or_insert(0) += 1;
    }
}

/// Counts draw calls.
#[derive(Debug, Default, Clone, Copy)]
pub struct CountingRenderer {
    /// Sprites drawn.
    pub sprites: u64,
    /// Health bars drawn.
    pub bars: u64,
}

impl SpriteRenderer for CountingRenderer {
    fn draw_sprite(&mut self, _frame: &SpriteFrame, _dest: Rect, _flip_x: bool, _alpha: u8) {
        self.sprites += 1;
    }

    fn draw_bar(&mut self, _bounds: Rect, _fill: f32) {
        self.bars += 1;
    }
}

/// Totals of one run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Ticks simulated.
    pub ticks: u64,
    /// Final score.
    pub score: u32,
    /// Combat totals.
    pub stats: CombatStats,
    /// Restarts after a game over.
    pub restarts: u32,
    /// Skeletons spawned by the session.
    pub skeletons_spawned: u64,
    /// Swarm bats spawned by the session.
    pub bats_spawned: u64,
    /// Draw calls.
    pub draws: CountingRenderer,
    /// Play counts by sound name. Empty when muted.
    pub sounds: BTreeMap<String, u32>,
}

/// Load the configured level and run it to completion.
pub fn run(config: &EngineConfig) -> Result<RunSummary> {
    let level = LevelConfig::load_from(&config.level_path)
        .with_context(|| format!("Failed to load level {}", config.level_path.display()))?;
    let attacks = PlayerAttacks::standard().context("Failed to build player attacks")?;
    let assets = SessionAssets::load(&mut StubFrameSource::standard());
    let mut session = GameSession::new(config.session_config(), &level, assets, attacks);

    let dt = config.fixed_dt();
    let mut logging = LoggingAudio::new(config.sfx_gain());
    let mut muted = NullAudio;
    let audio: &mut dyn AudioSink = if config.mute {
        info!("Audio muted");
        &mut muted
    } else {
        &mut logging
    };
    let mut summary = RunSummary::default();

    info!(
        "Running {} ticks at {} Hz from {}",
        config.run_ticks,
        config.tick_rate,
        config.level_path.display()
    );

    for tick in 0..config.run_ticks {
        let report = session.update(&scripted_input(tick), dt, audio);
        summary.skeletons_spawned += report.skeletons_spawned as u64;
        summary.bats_spawned += report.bats_spawned as u64;
        if report.restarted {
            summary.restarts += 1;
        }
        session.draw(&mut summary.draws);
        summary.ticks += 1;

        if config.log_every > 0 && (tick + 1) % config.log_every == 0 {
            info!(
                "Tick {}: score {}, health {:.0}, {} skeletons, {} bats",
                tick + 1,
                session.score(),
                session.player().health(),
                session.skeletons().len(),
                session.swarm().len()
            );
        }
    }

    summary.score = session.score();
    summary.stats = session.stats();
    summary.sounds = logging.played().clone();

    info!(
        "Run finished: score {}, {} hits dealt, {} taken, {} kills, {} restarts",
        summary.score,
        summary.stats.hits_dealt,
        summary.stats.hits_taken,
        summary.stats.kills,
        summary.restarts
    );
    info!(
        "Spawned {} skeletons and {} bats; drew {} sprites and {} health bars",
        summary.skeletons_spawned,
        summary.bats_spawned,
        summary.draws.sprites,
        summary.draws.bars
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const LEVEL: &str = r#"{
        "spawn_rate_min": 1000,
        "spawn_rate_max": 2000,
        "entities": [
            {"type": "player", "x": 400, "y": 866},
            {"type": "skeleton", "x": 900, "y": 866},
            {"type": "goblin", "x": -60, "y": 866, "delay": 0.5}
        ]
    }"#;

    fn config_with_level(dir: &TempDir, ticks: u64) -> EngineConfig {
        let level_path = dir.path().join("level.json");
        fs::write(&level_path, LEVEL).expect("write level");
        EngineConfig {
            run_ticks: ticks,
            log_every: 0,
            level_path,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_scripted_input_pattern() {
        assert!(scripted_input(0).right);
        assert!(!scripted_input(95).right);
        assert!(scripted_input(100).jump);
        assert!(scripted_input(160).left);
        assert!(scripted_input(20).thrust);
        assert!(scripted_input(200).smash);
        assert_eq!(scripted_input(TRACK_PERIOD + 100), scripted_input(100));
    }

    #[test]
    fn test_logging_audio_counts() {
        let mut audio = LoggingAudio::new(0.5);
        audio.play("bats");
        audio.play("bats");
        audio.play("jump");
        assert_eq!(audio.played().get("bats"), Some(&2));
        assert_eq!(audio.played().get("jump"), Some(&1));
    }

    #[test]
    fn test_headless_run() {
        let dir = TempDir::new().expect("temp dir");
        let config = config_with_level(&dir, 600);

        let summary = run(&config).expect("run succeeds");
        assert_eq!(summary.ticks, 600);
        assert!(summary.draws.sprites >= 600);
        assert!(summary.bats_spawned >= 3);
        assert!(summary.sounds.contains_key("bats"));
    }

    #[test]
    fn test_same_config_same_summary() {
        let dir = TempDir::new().expect("temp dir");
        let config = config_with_level(&dir, 900);

        let first = run(&config).expect("first run");
        let second = run(&config).expect("second run");
        assert_eq!(first.score, second.score);
        assert_eq!(first.stats, second.stats);
        assert_eq!(first.sounds, second.sounds);
    }

    #[test]
    fn test_muted_run_plays_nothing() {
        let dir = TempDir::new().expect("temp dir");
        let config = EngineConfig {
            mute: true,
            ..config_with_level(&dir, 300)
        };

        let summary = run(&config).expect("run succeeds");
        assert_eq!(summary.ticks, 300);
        assert!(summary.bats_spawned >= 3);
        assert!(summary.sounds.is_empty());
    }

    #[test]
    fn test_missing_level_fails() {
        let config = EngineConfig {
            level_path: "/nonexistent/level.json".into(),
            ..EngineConfig::default()
        };
        let err = run(&config).expect_err("missing level");
        assert!(err.to_string().contains("Failed to load level"));
    }
}
