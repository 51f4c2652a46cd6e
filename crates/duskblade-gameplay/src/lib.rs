//! # Duskblade Gameplay
//!
//! Combat and animation core for the Duskblade side-scroller.
//!
//! This crate provides the per-tick gameplay layer:
//! - Frame-indexed attacks with hit windows, hit-stop and per-target limits
//! - Player controller driven by a priority state machine
//! - Reactive skeleton melee AI
//! - Scripted ambient enemies and drifting swarm bats
//! - Combat resolution between the player and every enemy
//! - Spawning, level data and session orchestration
//!
//! Rendering, asset decoding and audio mixing stay outside: the core talks to
//! them through the `SpriteRenderer`, `FrameSource` and `AudioSink` traits.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod ambient;
pub mod animation;
pub mod attack;
pub mod audio;
pub mod combat;
pub mod entity;
pub mod hitbox;
pub mod level;
pub mod player;
pub mod render;
pub mod session;
pub mod skeleton;
pub mod spawn;
pub mod testing;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::ambient::*;
    pub use crate::animation::*;
    pub use crate::attack::*;
    pub use crate::audio::*;
    pub use crate::combat::*;
    pub use crate::entity::*;
    pub use crate::hitbox::*;
    pub use crate::level::*;
    pub use crate::player::*;
    pub use crate::render::*;
    pub use crate::session::*;
    pub use crate::skeleton::*;
    pub use crate::spawn::*;
}

pub use prelude::*;
