//! Enemy spawning rules.
//!
//! This module provides:
//! - `SpawnConfig` / `Spawner`: a population cap plus a respawn delay
//! - `BatSwarmSchedule`: randomized group timing for drifting bats
//!
//! Everything here decides *when* and *where*. Building the actors is the
//! session's job.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use tracing::trace;

/// Population and timing limits for one enemy type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Most live enemies of this type at once.
    pub max_count: usize,
    /// Nearest spawn distance from the anchor.
    pub min_distance: u32,
    /// Farthest spawn distance from the anchor.
    pub max_distance: u32,
    /// Time between spawns (ms).
    pub respawn_delay_ms: u64,
    /// Vertical offset from the anchor.
    pub spawn_y_offset: f32,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            max_count: 3,
            min_distance: 100,
            max_distance: 300,
            respawn_delay_ms: 5000,
            spawn_y_offset: 0.0,
        }
    }
}

/// Cap-and-cooldown spawn gate.
#[derive(Debug, Clone)]
pub struct Spawner {
    config: SpawnConfig,
    next_spawn_ms: u64,
}

impl Spawner {
    /// Create a spawner that may fire immediately.
    #[must_use]
    pub fn new(config: SpawnConfig) -> Self {
        Self {
            config,
            next_spawn_ms: 0,
        }
    }

    /// Limits in use.
    #[must_use]
    pub fn config(&self) -> &SpawnConfig {
        &self.config
    }

    /// Earliest time of the next spawn (ms).
    #[must_use]
    pub fn next_spawn_ms(&self) -> u64 {
        self.next_spawn_ms
    }

    /// Whether a spawn is allowed with `current_count` alive at `now_ms`.
    #[must_use]
    pub fn can_spawn(&self, current_count: usize, now_ms: u64) -> bool {
        current_count < self.config.max_count && now_ms >= self.next_spawn_ms
    }

    /// Horizontal spawn position past `anchor`.
    pub fn spawn_x(&self, anchor: f32, rng: &mut fastrand::Rng) -> f32 {
        let low = self.config.min_distance.min(self.config.max_distance);
        let high = self.config.max_distance.max(low);
        anchor + rng.u32(low..=high) as f32
    }

    /// Vertical spawn position relative to `anchor`.
    #[must_use]
    pub fn spawn_y(&self, anchor: f32) -> f32 {
        anchor + self.config.spawn_y_offset
    }

    /// Start the cooldown after a spawn at `now_ms`.
    pub fn record_spawn(&mut self, now_ms: u64) {
        self.next_spawn_ms = now_ms.saturating_add(self.config.respawn_delay_ms);
        trace!("Next spawn at {} ms", self.next_spawn_ms);
    }
}

/// Timing of drifting bat groups.
#[derive(Debug, Clone)]
pub struct BatSwarmSchedule {
    delay_ms: RangeInclusive<u64>,
    group_size: RangeInclusive<usize>,
    next_group_ms: u64,
}

impl BatSwarmSchedule {
    /// Groups of 3 to 5, the first one due immediately.
    #[must_use]
    pub fn new(min_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            delay_ms: min_delay_ms.min(max_delay_ms)..=max_delay_ms.max(min_delay_ms),
            group_size: 3..=5,
            next_group_ms: 0,
        }
    }

    /// Earliest time of the next group (ms).
    #[must_use]
    pub fn next_group_ms(&self) -> u64 {
        self.next_group_ms
    }

    /// If a group is due at `now_ms`, schedule the next one and return the
    /// size of this one.
    pub fn poll(&mut self, now_ms: u64, rng: &mut fastrand::Rng) -> Option<usize> {
        if now_ms < self.next_group_ms {
            return None;
        }
        let size = rng.usize(self.group_size.clone());
        self.next_group_ms = now_ms.saturating_add(rng.u64(self.delay_ms.clone()));
        trace!("Bat group of {size}, next at {} ms", self.next_group_ms);
        Some(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawner_cap_and_cooldown() {
        let mut spawner = Spawner::new(SpawnConfig::default());
        assert!(spawner.can_spawn(0, 0));
        assert!(!spawner.can_spawn(3, 0));

        spawner.record_spawn(1000);
        assert!(!spawner.can_spawn(1, 5999));
        assert!(spawner.can_spawn(1, 6000));
    }

    #[test]
    fn test_deadlines_saturate() {
        let mut spawner = Spawner::new(SpawnConfig {
            respawn_delay_ms: u64::MAX,
            ..SpawnConfig::default()
        });
        spawner.record_spawn(1000);
        assert_eq!(spawner.next_spawn_ms(), u64::MAX);
        assert!(!spawner.can_spawn(0, u64::MAX - 1));

        let mut schedule = BatSwarmSchedule::new(5000, 15000);
        let mut rng = fastrand::Rng::with_seed(5);
        assert!(schedule.poll(u64::MAX - 10, &mut rng).is_some());
        assert_eq!(schedule.next_group_ms(), u64::MAX);
    }

    #[test]
    fn test_spawn_position_in_range() {
        let spawner = Spawner::new(SpawnConfig {
            spawn_y_offset: -50.0,
            ..SpawnConfig::default()
        });
        let mut rng = fastrand::Rng::with_seed(11);
        for _ in 0..100 {
            let x = spawner.spawn_x(1600.0, &mut rng);
            assert!((1700.0..=1900.0).contains(&x));
        }
        assert_eq!(spawner.spawn_y(900.0), 850.0);
    }

    #[test]
    fn test_swarm_schedule() {
        let mut schedule = BatSwarmSchedule::new(5000, 15000);
        let mut rng = fastrand::Rng::with_seed(5);

        let size = schedule.poll(0, &mut rng).expect("first group is immediate");
        assert!((3..=5).contains(&size));
        let next = schedule.next_group_ms();
        assert!((5000..=15000).contains(&next));

        assert!(schedule.poll(next - 1, &mut rng).is_none());
        assert!(schedule.poll(next, &mut rng).is_some());
    }

    #[test]
    fn test_swarm_schedule_swapped_bounds() {
        let mut schedule = BatSwarmSchedule::new(2000, 1000);
        let mut rng = fastrand::Rng::with_seed(5);
        schedule.poll(0, &mut rng);
        assert!((1000..=2000).contains(&schedule.next_group_ms()));
    }
}
