//! Audio cues.
//!
//! This module provides:
//! - `AudioSink`, the fire-and-forget seam to the audio collaborator
//! - `SoundCue` / `SoundCueQueue` for actors that emit sounds during update
//! - `FootstepController` to pace repeating step sounds

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::trace;

/// Shortest footstep interval accepted at construction (ms).
const MIN_FOOTSTEP_INTERVAL_MS: u64 = 300;

/// Shortest footstep interval accepted when retuned (ms).
const MIN_FOOTSTEP_RETUNE_MS: u64 = 30;

/// Plays named sounds. Never blocks and never reports completion.
pub trait AudioSink {
    /// Play `name` at `volume` (0.0-1.0), optionally looping.
    fn play_sound(&mut self, name: &str, volume: f32, looping: bool);

    /// Play `name` once at full volume.
    fn play(&mut self, name: &str) {
        self.play_sound(name, 1.0, false);
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAudio;

impl AudioSink for NullAudio {
    fn play_sound(&mut self, _name: &str, _volume: f32, _looping: bool) {}
}

/// One pending sound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundCue {
    /// Sound identifier.
    pub name: String,
    /// Volume (0.0-1.0).
    pub volume: f32,
    /// Whether the sound loops.
    pub looping: bool,
}

impl SoundCue {
    /// A one-shot cue at full volume.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            volume: 1.0,
            looping: false,
        }
    }

    /// Set volume.
    #[must_use]
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume.clamp(0.0, 1.0);
        self
    }
}

/// Cues collected during a tick, flushed to a real sink afterwards.
#[derive(Debug, Clone, Default)]
pub struct SoundCueQueue {
    cues: VecDeque<SoundCue>,
}

impl SoundCueQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a cue.
    pub fn push(&mut self, cue: SoundCue) {
        trace!("Queued sound '{}'", cue.name);
        self.cues.push_back(cue);
    }

    /// Number of pending cues.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cues.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    /// Take every pending cue in order.
    pub fn drain(&mut self) -> impl Iterator<Item = SoundCue> + '_ {
        self.cues.drain(..)
    }

    /// Play every pending cue on `sink`.
    pub fn flush_to(&mut self, sink: &mut dyn AudioSink) {
        for cue in self.cues.drain(..) {
            sink.play_sound(&cue.name, cue.volume, cue.looping);
        }
    }
}

impl AudioSink for SoundCueQueue {
    fn play_sound(&mut self, name: &str, volume: f32, looping: bool) {
        self.push(SoundCue {
            name: name.to_owned(),
            volume,
            looping,
        });
    }
}

/// Paces a repeating step sound while movement is active.
#[derive(Debug, Clone, PartialEq)]
pub struct FootstepController {
    sound: String,
    interval_ms: u64,
    volume: f32,
    last_played_ms: Option<u64>,
}

impl FootstepController {
    /// Create a controller. Intervals under 300 ms are raised to 300.
    #[must_use]
    pub fn new(sound: impl Into<String>, interval_ms: u64, volume: f32) -> Self {
        Self {
            sound: sound.into(),
            interval_ms: interval_ms.max(MIN_FOOTSTEP_INTERVAL_MS),
            volume: volume.clamp(0.0, 1.0),
            last_played_ms: None,
        }
    }

    /// Interval between steps (ms).
    #[must_use]
    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Step volume.
    #[must_use]
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Retune the cadence. Intervals under 30 ms are raised to 30.
    pub fn set_interval(&mut self, interval_ms: u64) {
        self.interval_ms = interval_ms.max(MIN_FOOTSTEP_RETUNE_MS);
    }

    /// Forget the last step so the next active tick plays at once.
    pub fn reset(&mut self) {
        self.last_played_ms = None;
    }

    /// Emit a step into `queue` if movement is active and the interval passed.
    pub fn try_play(&mut self, active: bool, now_ms: u64, queue: &mut SoundCueQueue) {
        if !active {
            self.reset();
            return;
        }
        let due = match self.last_played_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.interval_ms,
        };
        if due {
            queue.push(SoundCue::new(self.sound.clone()).with_volume(self.volume));
            self.last_played_ms = Some(now_ms);
        }
    }
}
