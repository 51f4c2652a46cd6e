//! Level data.
//!
//! This module provides:
//! - `LevelConfig`: spawn-rate bounds plus initial entity placement
//! - JSON loading from a file or a string
//!
//! Entity coordinates are the feet (midbottom) of the actor.

use std::fs;
use std::path::Path;

use crate::spawn::BatSwarmSchedule;
use duskblade_common::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur while loading a level.
#[derive(Debug, Error)]
pub enum LevelError {
    /// Failed to read the level file.
    #[error("Failed to read level file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse level JSON.
    #[error("Failed to parse level JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Spawn-rate minimum above maximum.
    #[error("Invalid spawn bounds: min {min} ms > max {max} ms")]
    InvalidSpawnBounds {
        /// Minimum delay
        min: u64,
        /// Maximum delay
        max: u64,
    },
}

/// Result type for level operations.
pub type LevelResult<T> = Result<T, LevelError>;

/// Kind of entity placed by a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Player start.
    Player,
    /// Reactive melee enemy.
    Skeleton,
    /// Scripted bat.
    Bat,
    /// Scripted goblin.
    Goblin,
    /// Scripted two-attack monster.
    GreenMonster,
}

/// One placed entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityPlacement {
    /// What to place.
    #[serde(rename = "type")]
    pub kind: EntityKind,
    /// Feet x.
    pub x: f32,
    /// Feet y.
    pub y: f32,
    /// Seconds before a scripted entity starts moving.
    #[serde(default)]
    pub delay: f32,
}

impl EntityPlacement {
    /// Feet position.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Level description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    /// Shortest delay between bat groups (ms).
    pub spawn_rate_min: u64,
    /// Longest delay between bat groups (ms).
    pub spawn_rate_max: u64,
    /// Initial placements.
    pub entities: Vec<EntityPlacement>,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            spawn_rate_min: 5000,
            spawn_rate_max: 15000,
            entities: Vec::new(),
        }
    }
}

impl LevelConfig {
    /// Parse and validate a level from JSON text.
    pub fn from_json(json: &str) -> LevelResult<Self> {
        let level: Self = serde_json::from_str(json)?;
        level.validate()?;
        debug!(
            "Parsed level: {} entities, bats every {}..{} ms",
            level.entities.len(),
            level.spawn_rate_min,
            level.spawn_rate_max
        );
        Ok(level)
    }

    /// Load and validate a level file.
    pub fn load_from(path: impl AsRef<Path>) -> LevelResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Check the spawn-rate bounds.
    pub fn validate(&self) -> LevelResult<()> {
        if self.spawn_rate_min > self.spawn_rate_max {
            return Err(LevelError::InvalidSpawnBounds {
                min: self.spawn_rate_min,
                max: self.spawn_rate_max,
            });
        }
        Ok(())
    }

    /// Feet position of the first `player` placement.
    #[must_use]
    pub fn player_spawn(&self) -> Option<Vec2> {
        let spawn = self
            .entities
            .iter()
            .find(|e| e.kind == EntityKind::Player)
            .map(EntityPlacement::position);
        if spawn.is_none() {
            warn!("Level has no player placement");
        }
        spawn
    }

    /// Placements of one kind.
    pub fn placements(&self, kind: EntityKind) -> impl Iterator<Item = &EntityPlacement> {
        self.entities.iter().filter(move |e| e.kind == kind)
    }

    /// Bat group timing for this level.
    #[must_use]
    pub fn swarm_schedule(&self) -> BatSwarmSchedule {
        BatSwarmSchedule::new(self.spawn_rate_min, self.spawn_rate_max)
    }
}
