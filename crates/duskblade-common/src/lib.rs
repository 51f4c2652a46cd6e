//! # Duskblade Common
//!
//! Common types and shared abstractions for Duskblade.
//!
//! This crate provides foundational types used across all Duskblade crates:
//! - Screen-space geometry (rectangles, vectors)
//! - ID types for actors
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod geometry;
pub mod ids;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::geometry::*;
    pub use crate::ids::*;
}

pub use prelude::*;
