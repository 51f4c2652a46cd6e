//! Engine configuration.
//!
//! Provides the run parameters for the headless runner: screen size, step
//! rate, run length, seed, level path and volumes. Configuration can be
//! loaded from and saved to a TOML file.

use duskblade_common::{DuskbladeError, DuskbladeResult};
use duskblade_gameplay::SessionConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Configuration file name.
pub const CONFIG_FILE: &str = "duskblade.toml";

/// Engine configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === Screen ===
    /// Screen width in pixels
    pub screen_width: f32,
    /// Screen height in pixels
    pub screen_height: f32,

    // === Timing ===
    /// Fixed updates per second
    pub tick_rate: u32,
    /// Ticks to run before exiting
    pub run_ticks: u64,
    /// Ticks between progress log lines (0 disables them)
    pub log_every: u64,

    // === World ===
    /// Seed for spawns and enemy variants
    pub seed: u64,
    /// Level JSON file
    pub level_path: PathBuf,

    // === Audio ===
    /// Master volume (0.0-1.0)
    pub master_volume: f32,
    /// Sound effects volume (0.0-1.0)
    pub sfx_volume: f32,
    /// Footstep volume (0.0-1.0)
    pub footstep_volume: f32,
    /// Discard all sounds
    pub mute: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            screen_width: 1600.0,
            screen_height: 900.0,
            tick_rate: 60,
            run_ticks: 3600,
            log_every: 600,
            seed: 0,
            level_path: PathBuf::from("assets/levels/level_1.json"),
            master_volume: 1.0,
            sfx_volume: 1.0,
            footstep_volume: 0.85,
            mute: false,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a specific path.
    /// Returns default config if the file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read config file: {e}");
                return Self::default();
            },
        };

        match toml::from_str::<Self>(&contents) {
            Ok(mut config) => {
                config.validate();
                info!("Loaded config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to parse config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> DuskbladeResult<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| DuskbladeError::Serialization(e.to_string()))?;
        fs::write(path, contents)?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.screen_width = self.screen_width.clamp(320.0, 7680.0);
        self.screen_height = self.screen_height.clamp(240.0, 4320.0);
        self.tick_rate = self.tick_rate.clamp(10, 240);

        self.master_volume = self.master_volume.clamp(0.0, 1.0);
        self.sfx_volume = self.sfx_volume.clamp(0.0, 1.0);
        self.footstep_volume = self.footstep_volume.clamp(0.0, 1.0);
    }

    /// Seconds per fixed update.
    #[must_use]
    pub fn fixed_dt(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }

    /// Effective sound effect gain.
    #[must_use]
    pub fn sfx_gain(&self) -> f32 {
        self.master_volume * self.sfx_volume
    }

    /// Session tuning for this screen and seed.
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        let mut session = SessionConfig {
            screen_width: self.screen_width,
            screen_height: self.screen_height,
            seed: self.seed,
            ..SessionConfig::default()
        };
        let ground_y = self.screen_height - 34.0;
        session.player.ground_y = ground_y;
        session.player.bound_right = self.screen_width;
        session.player.footstep_volume = self.footstep_volume;
        session.skeleton.ground_y = ground_y;
        session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.tick_rate, 60);
        assert_eq!(config.screen_width, 1600.0);
        assert!((config.fixed_dt() - 1.0 / 60.0).abs() < 1e-6);
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig {
            tick_rate: 1,
            master_volume: 2.0,
            sfx_volume: -1.0,
            ..EngineConfig::default()
        };

        config.validate();

        assert_eq!(config.tick_rate, 10);
        assert_eq!(config.master_volume, 1.0);
        assert_eq!(config.sfx_volume, 0.0);
        assert_eq!(config.sfx_gain(), 0.0);
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join(CONFIG_FILE);

        let config = EngineConfig {
            run_ticks: 120,
            seed: 12345,
            level_path: PathBuf::from("levels/custom.json"),
            ..EngineConfig::default()
        };
        config.save_to(&config_path).expect("Failed to save config");

        let loaded = EngineConfig::load_from(&config_path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = EngineConfig::load_from("/nonexistent/path/duskblade.toml");
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_config_load_invalid_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&config_path, "tick_rate = \"fast\"").expect("write");

        assert_eq!(EngineConfig::load_from(&config_path), EngineConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&config_path, "seed = 7\nmute = true\n").expect("write");

        let loaded = EngineConfig::load_from(&config_path);
        assert_eq!(loaded.seed, 7);
        assert!(loaded.mute);
        assert_eq!(loaded.run_ticks, 3600);
    }

    #[test]
    fn test_session_config_follows_screen() {
        let config = EngineConfig {
            screen_height: 1000.0,
            seed: 3,
            ..EngineConfig::default()
        };
        let session = config.session_config();
        assert_eq!(session.player.ground_y, 966.0);
        assert_eq!(session.skeleton.ground_y, 966.0);
        assert_eq!(session.seed, 3);
    }
}
